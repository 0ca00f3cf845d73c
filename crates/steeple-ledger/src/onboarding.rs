use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use steeple_db::models::{NewReferral, NewUser};
use steeple_db::{Database, StoreError, UniqueField};
use steeple_types::models::User;

use crate::keys;
use crate::rewards::RewardSchedule;
use crate::{LedgerError, LedgerResult};

/// Upper bound on referral-key draws (pre-check misses plus insert collisions)
/// for one signup.
pub const MAX_KEY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Onboarded {
    pub user: User,
    pub is_new: bool,
}

/// Find-or-create for users, including referral attribution.
#[derive(Clone)]
pub struct Onboarding {
    db: Arc<Database>,
    schedule: RewardSchedule,
    generate_key: fn() -> String,
    store_user: fn(&Database, &NewUser) -> Result<(), StoreError>,
}

impl Onboarding {
    pub fn new(db: Arc<Database>, schedule: RewardSchedule) -> Self {
        Self {
            db,
            schedule,
            generate_key: keys::generate_referral_key,
            store_user: Database::insert_user,
        }
    }

    /// Return the user for `external_id`, creating it on first sight.
    ///
    /// A second call for the same identity is a plain read: display name and
    /// referral key arguments are ignored, so the referrer can never change.
    /// Concurrent first calls converge on a single user via the unique index
    /// on the external id.
    ///
    /// An unknown or malformed `referral_key` is ignored and the user signs
    /// up organically. Referrer crediting runs after the user is stored and
    /// its failures are logged, not returned.
    pub fn get_or_create_user(
        &self,
        external_id: &str,
        display_name: Option<&str>,
        referral_key: Option<&str>,
    ) -> LedgerResult<Onboarded> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(LedgerError::Validation("externalId is required".into()));
        }

        if let Some(user) = self.db.find_user_by_external_id(external_id)? {
            return Ok(Onboarded { user, is_new: false });
        }

        let referrer = match non_blank(referral_key) {
            Some(key) => self.resolve_referrer(key)?,
            None => None,
        };

        let now = Utc::now();
        let mut new_user = NewUser {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            display_name: non_blank(display_name).map(str::to_string),
            token_count: 0,
            referral_key: String::new(),
            referred_by: None,
            bonus_claimed_at: DateTime::<Utc>::UNIX_EPOCH,
            now,
        };
        if let Some(referrer) = &referrer {
            new_user.referred_by = Some(referrer.referral_key.clone());
            new_user.token_count += self.schedule.referred_bonus;
        }

        let mut attempts = 0;
        loop {
            new_user.referral_key = self.unique_referral_key(&mut attempts)?;

            match (self.store_user)(&self.db, &new_user) {
                Ok(()) => break,
                Err(StoreError::Duplicate(UniqueField::ExternalId)) => {
                    debug!(external_id, "Lost signup race, returning existing user");
                    let user = self
                        .db
                        .find_user_by_external_id(external_id)?
                        .ok_or(LedgerError::Store(StoreError::NotFound))?;
                    return Ok(Onboarded { user, is_new: false });
                }
                Err(StoreError::Duplicate(UniqueField::ReferralKey)) => {
                    warn!(external_id, attempts, "Referral key taken at insert, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            user_id = %new_user.id,
            external_id,
            referred = referrer.is_some(),
            "User created"
        );

        if let Some(referrer) = &referrer {
            self.credit_referrer(referrer, new_user.id, now);
        }

        Ok(Onboarded {
            user: new_user.to_user(),
            is_new: true,
        })
    }

    pub fn get_user(&self, user_id: &str) -> LedgerResult<User> {
        let id = crate::parse_user_id(user_id)?;
        self.db.find_user_by_id(id)?.ok_or(LedgerError::NotFound)
    }

    fn resolve_referrer(&self, key: &str) -> LedgerResult<Option<User>> {
        if !keys::is_well_formed(key) {
            debug!(referral_key = key, "Ignoring malformed referral key");
            return Ok(None);
        }

        let referrer = self.db.find_user_by_referral_key(key)?;
        if referrer.is_none() {
            debug!(referral_key = key, "Ignoring unknown referral key");
        }
        Ok(referrer)
    }

    fn unique_referral_key(&self, attempts: &mut u32) -> LedgerResult<String> {
        while *attempts < MAX_KEY_ATTEMPTS {
            *attempts += 1;
            let key = (self.generate_key)();
            if !self.db.referral_key_exists(&key)? {
                return Ok(key);
            }
            debug!(attempt = *attempts, "Referral key collision");
        }
        Err(LedgerError::KeyGenerationExhausted)
    }

    /// Best-effort: the new user already exists, so nothing here may fail
    /// the signup.
    fn credit_referrer(&self, referrer: &User, referred_id: Uuid, now: DateTime<Utc>) {
        if let Err(e) = self
            .db
            .increment_tokens(referrer.id, self.schedule.referrer_bonus, now)
        {
            warn!(
                referrer_id = %referrer.id,
                referred_id = %referred_id,
                error = %e,
                "Failed to credit referrer bonus"
            );
        }

        let edge = NewReferral {
            id: Uuid::new_v4(),
            referrer_id: referrer.id,
            referred_id,
            coins_earned: self.schedule.referral_total(),
            now,
        };
        if let Err(e) = self.db.insert_referral(&edge) {
            warn!(
                referrer_id = %referrer.id,
                referred_id = %referred_id,
                error = %e,
                "Failed to record referral"
            );
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
