use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use tracing::{debug, info};

use steeple_db::Database;
use steeple_types::models::SocialTask;

use crate::{LedgerError, LedgerResult, parse_user_id};

/// Fixed token amounts for every grant the ledger issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardSchedule {
    /// Starting balance bonus for a user who signs up with a referral key.
    pub referred_bonus: i64,
    /// Credited to the referrer when someone signs up with their key.
    pub referrer_bonus: i64,
    pub daily_bonus: i64,
    pub twitter_bonus: i64,
    pub telegram_bonus: i64,
    pub invite_three_bonus: i64,
    pub invite_seven_bonus: i64,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            referred_bonus: 200,
            referrer_bonus: 300,
            daily_bonus: 100,
            twitter_bonus: 500,
            telegram_bonus: 500,
            invite_three_bonus: 1_000,
            invite_seven_bonus: 2_000,
        }
    }
}

impl RewardSchedule {
    pub fn task_bonus(&self, task: SocialTask) -> i64 {
        match task {
            SocialTask::Twitter => self.twitter_bonus,
            SocialTask::Telegram => self.telegram_bonus,
            SocialTask::InviteThree => self.invite_three_bonus,
            SocialTask::InviteSeven => self.invite_seven_bonus,
        }
    }

    /// Tokens a single referral issues in total, to both parties.
    pub fn referral_total(&self) -> i64 {
        self.referred_bonus + self.referrer_bonus
    }
}

/// The daily bonus is available once per UTC calendar date.
pub fn is_daily_bonus_available(last_claim: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    last_claim.date_naive() != now.date_naive()
}

/// Midnight UTC of the day containing `now`.
pub fn utc_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

#[derive(Clone)]
pub struct RewardEngine {
    db: Arc<Database>,
    schedule: RewardSchedule,
}

impl RewardEngine {
    pub fn new(db: Arc<Database>, schedule: RewardSchedule) -> Self {
        Self { db, schedule }
    }

    pub fn claim_daily_bonus(&self, user_id: &str) -> LedgerResult<i64> {
        self.claim_daily_bonus_at(user_id, Utc::now())
    }

    /// Returns the amount credited.
    pub fn claim_daily_bonus_at(&self, user_id: &str, now: DateTime<Utc>) -> LedgerResult<i64> {
        let id = parse_user_id(user_id)?;
        let user = self.db.find_user_by_id(id)?.ok_or(LedgerError::NotFound)?;

        if !is_daily_bonus_available(user.bonus_claimed_at, now) {
            debug!(user_id = %id, claimed_at = %user.bonus_claimed_at, "Daily bonus already claimed");
            return Err(LedgerError::AlreadyClaimed);
        }

        let amount = self.schedule.daily_bonus;
        // A concurrent claim may have landed since the read above.
        if !self.db.claim_daily_bonus(id, amount, utc_day_start(now), now)? {
            return Err(LedgerError::AlreadyClaimed);
        }

        info!(user_id = %id, amount, "Daily bonus claimed");
        Ok(amount)
    }

    /// Credit a social-task bonus. Repeat claims credit again: there is no
    /// per-task claim record.
    pub fn claim_task_bonus(&self, user_id: &str, task: SocialTask) -> LedgerResult<i64> {
        let id = parse_user_id(user_id)?;
        if self.db.find_user_by_id(id)?.is_none() {
            return Err(LedgerError::NotFound);
        }

        let amount = self.schedule.task_bonus(task);
        self.db.increment_tokens(id, amount, Utc::now())?;

        info!(user_id = %id, %task, amount, "Task bonus credited");
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use chrono::{Duration, TimeZone};
    use std::thread;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn availability_compares_calendar_dates() {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        assert!(is_daily_bonus_available(epoch, at(2024, 5, 1, 0, 0)));

        // Late-night claim, next-morning attempt: less than 24h but a new day.
        assert!(is_daily_bonus_available(at(2024, 5, 1, 23, 50), at(2024, 5, 2, 0, 10)));
        // Early claim, late attempt on the same day.
        assert!(!is_daily_bonus_available(at(2024, 5, 1, 0, 5), at(2024, 5, 1, 23, 55)));
        // Same day-of-year, different year.
        assert!(is_daily_bonus_available(at(2023, 5, 1, 12, 0), at(2024, 5, 1, 12, 0)));
    }

    #[test]
    fn day_start_is_utc_midnight() {
        assert_eq!(utc_day_start(at(2024, 5, 1, 17, 42)), at(2024, 5, 1, 0, 0));
    }

    #[test]
    fn daily_bonus_once_per_day() {
        let (db, ledger) = testing::ledger();
        let user = ledger.onboarding.get_or_create_user("1", None, None).unwrap().user;
        let id = user.id.to_string();
        let morning = at(2024, 5, 1, 9, 0);

        assert_eq!(ledger.rewards.claim_daily_bonus_at(&id, morning).unwrap(), 100);
        let err = ledger
            .rewards
            .claim_daily_bonus_at(&id, morning + Duration::hours(14))
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyClaimed));
        assert_eq!(db.find_user_by_id(user.id).unwrap().unwrap().token_count, 100);

        let next_day = at(2024, 5, 2, 0, 1);
        assert_eq!(ledger.rewards.claim_daily_bonus_at(&id, next_day).unwrap(), 100);
        assert_eq!(db.find_user_by_id(user.id).unwrap().unwrap().token_count, 200);
    }

    #[test]
    fn daily_bonus_for_unknown_or_malformed_user() {
        let (_db, ledger) = testing::ledger();

        let err = ledger
            .rewards
            .claim_daily_bonus(&uuid::Uuid::new_v4().to_string())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound));

        let err = ledger.rewards.claim_daily_bonus("not-a-uuid").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidIdentity(_)));
    }

    #[test]
    fn concurrent_daily_claims_credit_once() {
        let (db, ledger) = testing::ledger();
        let user = ledger.onboarding.get_or_create_user("1", None, None).unwrap().user;
        let id = user.id.to_string();
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rewards = ledger.rewards.clone();
                let id = id.clone();
                thread::spawn(move || rewards.claim_daily_bonus_at(&id, now).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(db.find_user_by_id(user.id).unwrap().unwrap().token_count, 100);
    }

    #[test]
    fn task_bonuses_repeat_without_guard() {
        let (db, ledger) = testing::ledger();
        let user = ledger.onboarding.get_or_create_user("1", None, None).unwrap().user;
        let id = user.id.to_string();

        assert_eq!(ledger.rewards.claim_task_bonus(&id, SocialTask::Twitter).unwrap(), 500);
        assert_eq!(ledger.rewards.claim_task_bonus(&id, SocialTask::Twitter).unwrap(), 500);
        assert_eq!(ledger.rewards.claim_task_bonus(&id, SocialTask::InviteSeven).unwrap(), 2_000);
        assert_eq!(db.find_user_by_id(user.id).unwrap().unwrap().token_count, 3_000);

        let err = ledger
            .rewards
            .claim_task_bonus(&uuid::Uuid::new_v4().to_string(), SocialTask::Telegram)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound));
    }

    #[test]
    fn concurrent_task_bonuses_lose_no_updates() {
        let (db, ledger) = testing::ledger();
        let user = ledger.onboarding.get_or_create_user("1", None, None).unwrap().user;
        let id = user.id.to_string();
        let k = 16;

        let handles: Vec<_> = (0..k)
            .map(|_| {
                let rewards = ledger.rewards.clone();
                let id = id.clone();
                thread::spawn(move || rewards.claim_task_bonus(&id, SocialTask::Telegram).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let expected = k * RewardSchedule::default().telegram_bonus;
        assert_eq!(db.find_user_by_id(user.id).unwrap().unwrap().token_count, expected);
    }
}
