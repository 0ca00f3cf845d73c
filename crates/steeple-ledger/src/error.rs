use steeple_db::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid user id: {0}")]
    InvalidIdentity(String),

    #[error("user not found")]
    NotFound,

    #[error("daily bonus already claimed today")]
    AlreadyClaimed,

    #[error("could not generate a unique referral key")]
    KeyGenerationExhausted,

    #[error("store operation timed out")]
    StoreTimeout,

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => LedgerError::NotFound,
            other => LedgerError::Store(other),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
