use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use steeple_types::models::{ReferralEdge, User};

use crate::models::{NewReferral, NewUser, ReferralRow, UserRow, encode_ts};
use crate::{Database, StoreError};

const USER_COLUMNS: &str = "id, external_id, display_name, token_count, referral_key, referred_by, \
     bonus_claimed_at, last_login, created_at, updated_at";

const REFERRAL_COLUMNS: &str =
    "id, referrer_id, referred_id, direct_referrer, coins_earned, last_reward_time, created_at";

impl Database {
    // -- Users --

    /// Fails with `Duplicate` if the external id or referral key is taken.
    pub fn insert_user(&self, user: &NewUser) -> Result<(), StoreError> {
        let now = encode_ts(user.now);
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?8)"),
                rusqlite::params![
                    user.id.to_string(),
                    user.external_id,
                    user.display_name,
                    user.token_count,
                    user.referral_key,
                    user.referred_by,
                    encode_ts(user.bonus_claimed_at),
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    pub fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        self.with_conn(|conn| query_user(conn, "external_id", external_id))
    }

    pub fn find_user_by_referral_key(&self, key: &str) -> Result<Option<User>, StoreError> {
        self.with_conn(|conn| query_user(conn, "referral_key", key))
    }

    pub fn referral_key_exists(&self, key: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE referral_key = ?1",
                [key],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Batch-fetch users for a set of ids. Unknown ids are simply absent.
    pub fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id IN ({})",
                placeholders.join(", ")
            );

            let keys: Vec<String> = ids.iter().map(Uuid::to_string).collect();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(keys.iter()), map_user)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|row| row.into_user().map(|user| (user.id, user)))
                .collect()
        })
    }

    /// Atomic `token_count += delta`. Never reads the balance first.
    pub fn increment_tokens(&self, id: Uuid, delta: i64, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET token_count = token_count + ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![delta, encode_ts(now), id.to_string()],
            )?;
            expect_changed(changed)
        })
    }

    pub fn set_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.set_timestamp(id, "last_login", at)
    }

    pub fn set_bonus_claimed_at(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.set_timestamp(id, "bonus_claimed_at", at)
    }

    fn set_timestamp(&self, id: Uuid, column: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let ts = encode_ts(at);
        self.with_conn(|conn| {
            let changed = conn.execute(
                &format!("UPDATE users SET {column} = ?1, updated_at = ?1 WHERE id = ?2"),
                rusqlite::params![ts, id.to_string()],
            )?;
            expect_changed(changed)
        })
    }

    /// Credit the daily bonus unless it was already claimed at or after
    /// `day_start`. The check and the write are one statement, so two
    /// concurrent claims cannot both succeed. Returns whether it was credited.
    pub fn claim_daily_bonus(
        &self,
        id: Uuid,
        amount: i64,
        day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let now = encode_ts(now);
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET token_count = token_count + ?1,
                     bonus_claimed_at = ?2,
                     last_login = ?2,
                     updated_at = ?2
                 WHERE id = ?3 AND bonus_claimed_at < ?4",
                rusqlite::params![amount, now, id.to_string(), encode_ts(day_start)],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Leaderboard --

    pub fn count_users(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    pub fn count_users_with_tokens_above(&self, tokens: i64) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE token_count > ?1",
                [tokens],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Users by balance, highest first. Ties fall back to signup order.
    pub fn list_users_by_tokens_desc(&self, skip: u64, limit: u32) -> Result<Vec<User>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 ORDER BY token_count DESC, created_at ASC, id ASC
                 LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![i64::from(limit), skip as i64], map_user)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(UserRow::into_user).collect()
        })
    }

    // -- Referrals --

    /// Fails with `Duplicate(ReferredUser)` if the user already has a referrer.
    pub fn insert_referral(&self, referral: &NewReferral) -> Result<(), StoreError> {
        let now = encode_ts(referral.now);
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO referrals ({REFERRAL_COLUMNS}) VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)"),
                rusqlite::params![
                    referral.id.to_string(),
                    referral.referrer_id.to_string(),
                    referral.referred_id.to_string(),
                    referral.coins_earned,
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn find_referral_for(&self, referred_id: Uuid) -> Result<Option<ReferralEdge>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REFERRAL_COLUMNS} FROM referrals WHERE referred_id = ?1"
            ))?;
            stmt.query_row([referred_id.to_string()], map_referral)
                .optional()?
                .map(ReferralRow::into_edge)
                .transpose()
        })
    }

    pub fn count_referrals_by_referrer(&self, referrer_id: Uuid) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM referrals WHERE referrer_id = ?1",
                [referrer_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    pub fn list_referrals_by_referrer(
        &self,
        referrer_id: Uuid,
        skip: u64,
        limit: u32,
    ) -> Result<Vec<ReferralEdge>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REFERRAL_COLUMNS} FROM referrals
                 WHERE referrer_id = ?1
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(
                    rusqlite::params![referrer_id.to_string(), i64::from(limit), skip as i64],
                    map_referral,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(ReferralRow::into_edge).collect()
        })
    }

    /// Add `amount` to an existing edge and to the trailing earnings window.
    /// A window whose last earning is older than `window_start` restarts at
    /// `amount`. Both writes commit together.
    pub fn credit_referral(
        &self,
        referrer_id: Uuid,
        referred_id: Uuid,
        amount: i64,
        now: DateTime<Utc>,
        window_start: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let now = encode_ts(now);
        let referrer = referrer_id.to_string();
        let referred = referred_id.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let changed = tx.execute(
                "UPDATE referrals
                 SET coins_earned = coins_earned + ?1, last_reward_time = ?2
                 WHERE referrer_id = ?3 AND referred_id = ?4",
                rusqlite::params![amount, now, referrer, referred],
            )?;
            expect_changed(changed)?;

            tx.execute(
                "INSERT INTO referral_earnings
                     (referrer_id, referred_id, coins_earned, last_earned_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?4)
                 ON CONFLICT (referrer_id, referred_id) DO UPDATE SET
                     coins_earned = CASE
                         WHEN referral_earnings.last_earned_at >= ?5
                             THEN referral_earnings.coins_earned + excluded.coins_earned
                         ELSE excluded.coins_earned
                     END,
                     last_earned_at = excluded.last_earned_at,
                     updated_at = excluded.updated_at",
                rusqlite::params![referrer, referred, amount, now, encode_ts(window_start)],
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    /// Coins each referred user earned the referrer since `since`.
    /// Pairs with no earning in the window are absent from the map.
    pub fn recent_referral_earnings(
        &self,
        referrer_id: Uuid,
        referred_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> Result<HashMap<Uuid, i64>, StoreError> {
        if referred_ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (3..referred_ids.len() + 3).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT referred_id, coins_earned FROM referral_earnings
                 WHERE referrer_id = ?1 AND last_earned_at >= ?2 AND referred_id IN ({})",
                placeholders.join(", ")
            );

            let mut params = vec![referrer_id.to_string(), encode_ts(since)];
            params.extend(referred_ids.iter().map(Uuid::to_string));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut earnings = HashMap::with_capacity(rows.len());
            for (id, coins) in rows {
                let id = id
                    .parse()
                    .map_err(|e| StoreError::Corrupt(format!("referred_id '{}': {}", id, e)))?;
                earnings.insert(id, coins);
            }
            Ok(earnings)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<User>, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;

    stmt.query_row([value], map_user)
        .optional()?
        .map(UserRow::into_user)
        .transpose()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        external_id: row.get(1)?,
        display_name: row.get(2)?,
        token_count: row.get(3)?,
        referral_key: row.get(4)?,
        referred_by: row.get(5)?,
        bonus_claimed_at: row.get(6)?,
        last_login: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn map_referral(row: &Row<'_>) -> rusqlite::Result<ReferralRow> {
    Ok(ReferralRow {
        id: row.get(0)?,
        referrer_id: row.get(1)?,
        referred_id: row.get(2)?,
        direct_referrer: row.get(3)?,
        coins_earned: row.get(4)?,
        last_reward_time: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn expect_changed(changed: usize) -> Result<(), StoreError> {
    if changed == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
