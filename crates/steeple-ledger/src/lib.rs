//! Referral-and-reward ledger.
//!
//! Every operation here is synchronous and talks to the store directly;
//! async callers run them on the blocking pool.

pub mod error;
pub mod keys;
pub mod leaderboard;
pub mod onboarding;
pub mod paging;
pub mod referrals;
pub mod rewards;

use std::sync::Arc;

use steeple_db::Database;
use uuid::Uuid;

pub use error::{LedgerError, LedgerResult};
pub use leaderboard::Leaderboard;
pub use onboarding::{Onboarded, Onboarding};
pub use referrals::ReferralLedger;
pub use rewards::{RewardEngine, RewardSchedule};

/// All ledger components, sharing one store handle.
#[derive(Clone)]
pub struct Ledger {
    pub onboarding: Onboarding,
    pub rewards: RewardEngine,
    pub referrals: ReferralLedger,
    pub leaderboard: Leaderboard,
}

impl Ledger {
    pub fn new(db: Arc<Database>, schedule: RewardSchedule) -> Self {
        Self {
            onboarding: Onboarding::new(db.clone(), schedule),
            rewards: RewardEngine::new(db.clone(), schedule),
            referrals: ReferralLedger::new(db.clone()),
            leaderboard: Leaderboard::new(db),
        }
    }
}

/// Parse a caller-supplied user id.
pub fn parse_user_id(raw: &str) -> LedgerResult<Uuid> {
    raw.trim()
        .parse()
        .map_err(|_| LedgerError::InvalidIdentity(raw.to_string()))
}
