use std::sync::Arc;

use tracing::debug;

use steeple_db::Database;
use steeple_types::api::{LeaderboardEntry, LeaderboardResponse};
use steeple_types::models::Pagination;

use crate::paging::PageRequest;
use crate::{LedgerError, LedgerResult, parse_user_id};

#[derive(Clone)]
pub struct Leaderboard {
    db: Arc<Database>,
}

impl Leaderboard {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// One page of users by balance, plus the requesting user's rank.
    ///
    /// The page, the total and the rank are separate reads, so under
    /// concurrent credits they describe nearby moments rather than one
    /// snapshot. A requesting id that is malformed or unknown yields no rank.
    pub fn get_leaderboard(
        &self,
        page: Option<i64>,
        page_size: Option<i64>,
        requesting_user_id: Option<&str>,
    ) -> LedgerResult<LeaderboardResponse> {
        let paging = PageRequest::resolve(page, page_size);

        let total = self.db.count_users()?;
        let leaderboard = self
            .db
            .list_users_by_tokens_desc(paging.skip(), paging.page_size)?
            .into_iter()
            .map(|user| LeaderboardEntry {
                id: user.id,
                display_name: user.display_name,
                token_count: user.token_count,
            })
            .collect();

        let current_user_rank = match requesting_user_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => match self.rank_of(id) {
                Ok(rank) => Some(rank),
                Err(LedgerError::InvalidIdentity(_)) | Err(LedgerError::NotFound) => {
                    debug!(user_id = id, "No rank for requesting user");
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        Ok(LeaderboardResponse {
            leaderboard,
            pagination: Pagination::new(paging.page, paging.page_size, total),
            current_user_rank,
        })
    }

    /// Strictly-greater rank: one plus the number of users holding more
    /// tokens. Users with equal balances share a rank.
    pub fn rank_of(&self, user_id: &str) -> LedgerResult<u64> {
        let id = parse_user_id(user_id)?;
        let user = self.db.find_user_by_id(id)?.ok_or(LedgerError::NotFound)?;
        Ok(1 + self.db.count_users_with_tokens_above(user.token_count)?)
    }
}
