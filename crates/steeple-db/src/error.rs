use rusqlite::ErrorCode;
use thiserror::Error;

/// Which unique index rejected an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    ExternalId,
    ReferralKey,
    ReferredUser,
    Other,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key on {0:?}")]
    Duplicate(UniqueField),

    #[error("record not found")]
    NotFound,

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("sqlite: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            let message = match &err {
                rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.as_str(),
                _ => "",
            };
            // CHECK constraints (negative balance) are not key collisions.
            if message.starts_with("UNIQUE") {
                return StoreError::Duplicate(unique_field(message));
            }
        }
        StoreError::Sqlite(err)
    }
}

/// Map SQLite's "UNIQUE constraint failed: table.column" message to a field.
fn unique_field(message: &str) -> UniqueField {
    if message.contains("users.external_id") {
        UniqueField::ExternalId
    } else if message.contains("users.referral_key") {
        UniqueField::ReferralKey
    } else if message.contains("referrals.referred_id") {
        UniqueField::ReferredUser
    } else {
        UniqueField::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_messages_map_to_fields() {
        assert_eq!(
            unique_field("UNIQUE constraint failed: users.external_id"),
            UniqueField::ExternalId
        );
        assert_eq!(
            unique_field("UNIQUE constraint failed: users.referral_key"),
            UniqueField::ReferralKey
        );
        assert_eq!(
            unique_field("UNIQUE constraint failed: referrals.referred_id"),
            UniqueField::ReferredUser
        );
        assert_eq!(unique_field("UNIQUE constraint failed: users.id"), UniqueField::Other);
    }
}
