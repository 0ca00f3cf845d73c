pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A resolved `page`/`pageSize` pair. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Defaults to page 1 of 10; non-positive values clamp to 1.
    ///
    /// The page size is also capped at [`MAX_PAGE_SIZE`], so `pageSize=500`
    /// yields 100 rows and reports `pageSize: 100` in the pagination block.
    pub fn resolve(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32,
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE) as u32,
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(PageRequest::resolve(None, None), PageRequest { page: 1, page_size: 10 });
        assert_eq!(PageRequest::resolve(Some(0), Some(-5)), PageRequest { page: 1, page_size: 1 });
        assert_eq!(PageRequest::resolve(Some(3), Some(1_000)).page_size, 100);
    }

    #[test]
    fn skip_counts_previous_pages() {
        assert_eq!(PageRequest::resolve(Some(1), Some(10)).skip(), 0);
        assert_eq!(PageRequest::resolve(Some(4), Some(25)).skip(), 75);
    }
}
