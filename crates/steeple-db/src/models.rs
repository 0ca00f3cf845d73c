//! Database row types: these map directly to SQLite rows.
//! Distinct from steeple-types models to keep the DB layer independent.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use steeple_types::models::{ReferralEdge, User};

use crate::StoreError;

pub struct UserRow {
    pub id: String,
    pub external_id: String,
    pub display_name: Option<String>,
    pub token_count: i64,
    pub referral_key: String,
    pub referred_by: Option<String>,
    pub bonus_claimed_at: String,
    pub last_login: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ReferralRow {
    pub id: String,
    pub referrer_id: String,
    pub referred_id: String,
    pub direct_referrer: bool,
    pub coins_earned: i64,
    pub last_reward_time: String,
    pub created_at: String,
}

/// Insert payload for `users`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub external_id: String,
    pub display_name: Option<String>,
    pub token_count: i64,
    pub referral_key: String,
    pub referred_by: Option<String>,
    pub bonus_claimed_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl NewUser {
    /// The user as it reads back once inserted.
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            external_id: self.external_id.clone(),
            display_name: self.display_name.clone(),
            token_count: self.token_count,
            referral_key: self.referral_key.clone(),
            referred_by: self.referred_by.clone(),
            bonus_claimed_at: truncate(self.bonus_claimed_at),
            last_login: truncate(self.now),
            created_at: truncate(self.now),
            updated_at: truncate(self.now),
        }
    }
}

/// Insert payload for `referrals`.
#[derive(Debug, Clone)]
pub struct NewReferral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub coins_earned: i64,
    pub now: DateTime<Utc>,
}

impl UserRow {
    pub fn into_user(self) -> Result<User, StoreError> {
        Ok(User {
            id: parse_id(&self.id)?,
            bonus_claimed_at: decode_ts(&self.bonus_claimed_at)?,
            last_login: decode_ts(&self.last_login)?,
            created_at: decode_ts(&self.created_at)?,
            updated_at: decode_ts(&self.updated_at)?,
            external_id: self.external_id,
            display_name: self.display_name,
            token_count: self.token_count,
            referral_key: self.referral_key,
            referred_by: self.referred_by,
        })
    }
}

impl ReferralRow {
    pub fn into_edge(self) -> Result<ReferralEdge, StoreError> {
        Ok(ReferralEdge {
            id: parse_id(&self.id)?,
            referrer_id: parse_id(&self.referrer_id)?,
            referred_id: parse_id(&self.referred_id)?,
            direct_referrer: self.direct_referrer,
            coins_earned: self.coins_earned,
            last_reward_time: decode_ts(&self.last_reward_time)?,
            created_at: decode_ts(&self.created_at)?,
        })
    }
}

/// Timestamps are stored as fixed-width RFC 3339 text (microseconds, `Z`),
/// so string order matches time order inside SQL predicates.
pub fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("id '{}': {}", raw, e)))
}

/// Drop sub-microsecond precision, matching what a stored value reads back as.
fn truncate(ts: DateTime<Utc>) -> DateTime<Utc> {
    decode_ts(&encode_ts(ts)).unwrap_or(ts)
}
