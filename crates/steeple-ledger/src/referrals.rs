use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use steeple_db::Database;
use steeple_types::api::{ReferredUser, ReferredUsersResponse};
use steeple_types::models::Pagination;

use crate::paging::PageRequest;
use crate::{LedgerError, LedgerResult, parse_user_id};

/// Width of the trailing window behind `recentEarnings`.
pub fn recent_window() -> Duration {
    Duration::hours(24)
}

#[derive(Clone)]
pub struct ReferralLedger {
    db: Arc<Database>,
}

impl ReferralLedger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Users referred by `referrer_id`, one page at a time.
    ///
    /// Edges whose referred user no longer resolves are dropped from the page
    /// (the pagination totals still count them).
    pub fn list_referred_users(
        &self,
        referrer_id: &str,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> LedgerResult<ReferredUsersResponse> {
        self.list_referred_users_at(referrer_id, page, page_size, Utc::now())
    }

    pub fn list_referred_users_at(
        &self,
        referrer_id: &str,
        page: Option<i64>,
        page_size: Option<i64>,
        now: DateTime<Utc>,
    ) -> LedgerResult<ReferredUsersResponse> {
        let referrer = parse_user_id(referrer_id)?;
        let paging = PageRequest::resolve(page, page_size);

        let total = self.db.count_referrals_by_referrer(referrer)?;
        let edges = self
            .db
            .list_referrals_by_referrer(referrer, paging.skip(), paging.page_size)?;

        let referred_ids: Vec<Uuid> = edges.iter().map(|e| e.referred_id).collect();
        let users = self.db.find_users_by_ids(&referred_ids)?;
        let recent = self
            .db
            .recent_referral_earnings(referrer, &referred_ids, now - recent_window())?;

        let mut referred_users = Vec::with_capacity(edges.len());
        let mut total_recent_earnings = 0;
        for edge in edges {
            let Some(user) = users.get(&edge.referred_id) else {
                debug!(
                    referrer_id = %referrer,
                    referred_id = %edge.referred_id,
                    "Skipping referral to missing user"
                );
                continue;
            };

            let recent_earnings = recent.get(&edge.referred_id).copied().unwrap_or(0);
            total_recent_earnings += recent_earnings;

            referred_users.push(ReferredUser {
                id: user.id,
                external_id: user.external_id.clone(),
                display_name: user.display_name.clone(),
                token_count: user.token_count,
                total_earned: edge.coins_earned,
                recent_earnings,
            });
        }

        Ok(ReferredUsersResponse {
            referred_users,
            pagination: Pagination::new(paging.page, paging.page_size, total),
            total_recent_earnings,
        })
    }

    /// Accumulate `amount` on an existing referral and its trailing window.
    pub fn record_earning(&self, referrer_id: &str, referred_id: &str, amount: i64) -> LedgerResult<()> {
        self.record_earning_at(referrer_id, referred_id, amount, Utc::now())
    }

    pub fn record_earning_at(
        &self,
        referrer_id: &str,
        referred_id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        if amount <= 0 {
            return Err(LedgerError::Validation("earning amount must be positive".into()));
        }
        let referrer = parse_user_id(referrer_id)?;
        let referred = parse_user_id(referred_id)?;

        self.db
            .credit_referral(referrer, referred, amount, now, now - recent_window())?;

        info!(referrer_id = %referrer, referred_id = %referred, amount, "Referral earning recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use steeple_db::models::NewReferral;

    #[test]
    fn lists_referred_users_with_paging() {
        let (_db, ledger) = testing::ledger();
        let a = ledger.onboarding.get_or_create_user("a", None, None).unwrap().user;
        for i in 0..12 {
            ledger
                .onboarding
                .get_or_create_user(&format!("r{i}"), Some(&format!("name{i}")), Some(&a.referral_key))
                .unwrap();
        }
        let a_id = a.id.to_string();

        let first = ledger.referrals.list_referred_users(&a_id, None, None).unwrap();
        assert_eq!(first.referred_users.len(), 10);
        assert_eq!(first.pagination, Pagination::new(1, 10, 12));
        assert_eq!(first.pagination.total_pages, 2);
        assert_eq!(first.referred_users[0].external_id, "r0");
        assert_eq!(first.referred_users[0].token_count, 200);
        assert_eq!(first.referred_users[0].total_earned, 500);
        assert_eq!(first.total_recent_earnings, 0);

        let second = ledger.referrals.list_referred_users(&a_id, Some(2), Some(10)).unwrap();
        assert_eq!(second.referred_users.len(), 2);
        assert_eq!(second.referred_users[1].display_name.as_deref(), Some("name11"));

        let clamped = ledger.referrals.list_referred_users(&a_id, Some(-1), Some(0)).unwrap();
        assert_eq!(clamped.pagination.current_page, 1);
        assert_eq!(clamped.pagination.page_size, 1);
        assert_eq!(clamped.referred_users.len(), 1);
    }

    #[test]
    fn unknown_referrer_has_no_referrals() {
        let (_db, ledger) = testing::ledger();
        let page = ledger
            .referrals
            .list_referred_users(&Uuid::new_v4().to_string(), None, None)
            .unwrap();
        assert!(page.referred_users.is_empty());
        assert_eq!(page.pagination.total_items, 0);

        assert!(matches!(
            ledger.referrals.list_referred_users("nope", None, None),
            Err(LedgerError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn missing_referred_users_are_skipped() {
        let (db, ledger) = testing::ledger();
        let a = ledger.onboarding.get_or_create_user("a", None, None).unwrap().user;
        let b = ledger
            .onboarding
            .get_or_create_user("b", None, Some(&a.referral_key))
            .unwrap()
            .user;

        // Edge to a user that was never stored, inserted with FK checks off
        // the way a partially restored store would look.
        db.with_conn(|conn| {
            conn.pragma_update(None, "foreign_keys", "OFF")?;
            Ok(())
        })
        .unwrap();
        db.insert_referral(&NewReferral {
            id: Uuid::new_v4(),
            referrer_id: a.id,
            referred_id: Uuid::new_v4(),
            coins_earned: 500,
            now: Utc::now(),
        })
        .unwrap();

        let page = ledger
            .referrals
            .list_referred_users(&a.id.to_string(), None, None)
            .unwrap();
        assert_eq!(page.pagination.total_items, 2);
        assert_eq!(page.referred_users.len(), 1);
        assert_eq!(page.referred_users[0].id, b.id);
    }

    #[test]
    fn recent_earnings_cover_trailing_day() {
        let (_db, ledger) = testing::ledger();
        let a = ledger.onboarding.get_or_create_user("a", None, None).unwrap().user;
        let b = ledger
            .onboarding
            .get_or_create_user("b", None, Some(&a.referral_key))
            .unwrap()
            .user;
        let c = ledger
            .onboarding
            .get_or_create_user("c", None, Some(&a.referral_key))
            .unwrap()
            .user;
        let (a_id, b_id, c_id) = (a.id.to_string(), b.id.to_string(), c.id.to_string());
        let now = Utc::now();

        ledger.referrals.record_earning_at(&a_id, &b_id, 40, now - Duration::hours(30)).unwrap();
        ledger.referrals.record_earning_at(&a_id, &c_id, 15, now - Duration::hours(2)).unwrap();
        ledger.referrals.record_earning_at(&a_id, &c_id, 5, now - Duration::hours(1)).unwrap();

        let page = ledger.referrals.list_referred_users_at(&a_id, None, None, now).unwrap();
        let by_id = |id: Uuid| page.referred_users.iter().find(|u| u.id == id).unwrap();

        assert_eq!(by_id(b.id).recent_earnings, 0);
        assert_eq!(by_id(b.id).total_earned, 540);
        assert_eq!(by_id(c.id).recent_earnings, 20);
        assert_eq!(by_id(c.id).total_earned, 520);
        assert_eq!(page.total_recent_earnings, 20);
    }

    #[test]
    fn earnings_require_an_edge_and_positive_amount() {
        let (_db, ledger) = testing::ledger();
        let a = ledger.onboarding.get_or_create_user("a", None, None).unwrap().user;
        let b = ledger.onboarding.get_or_create_user("b", None, None).unwrap().user;
        let (a_id, b_id) = (a.id.to_string(), b.id.to_string());

        assert!(matches!(
            ledger.referrals.record_earning(&a_id, &b_id, 10),
            Err(LedgerError::NotFound)
        ));
        assert!(matches!(
            ledger.referrals.record_earning(&a_id, &b_id, 0),
            Err(LedgerError::Validation(_))
        ));
    }
}
