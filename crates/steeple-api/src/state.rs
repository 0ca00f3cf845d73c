use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use steeple_ledger::{Ledger, LedgerError, LedgerResult};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub ledger: Ledger,
    /// Upper bound on a single ledger operation, store I/O included.
    pub store_timeout: Duration,
}

impl AppStateInner {
    pub fn new(ledger: Ledger, store_timeout: Duration) -> Self {
        Self {
            ledger,
            store_timeout,
        }
    }

    /// Run a ledger operation off the async runtime, bounded by the store
    /// timeout. On timeout the caller gets `StoreTimeout`; the blocking call
    /// itself runs to completion in the background.
    pub async fn run<F, T>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Ledger) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = self.ledger.clone();
        let task = tokio::task::spawn_blocking(move || op(&ledger));

        match tokio::time::timeout(self.store_timeout, task).await {
            Ok(Ok(result)) => result.map_err(ApiError::from),
            Ok(Err(e)) => {
                error!("spawn_blocking join error: {}", e);
                Err(ApiError::Internal)
            }
            Err(_) => {
                error!("Ledger operation exceeded {:?}", self.store_timeout);
                Err(LedgerError::StoreTimeout.into())
            }
        }
    }
}
