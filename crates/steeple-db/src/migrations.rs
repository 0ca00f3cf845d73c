use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, referrals, referral_earnings)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                external_id         TEXT NOT NULL UNIQUE,
                display_name        TEXT,
                token_count         INTEGER NOT NULL DEFAULT 0 CHECK (token_count >= 0),
                referral_key        TEXT NOT NULL UNIQUE,
                referred_by         TEXT,
                bonus_claimed_at    TEXT NOT NULL,
                last_login          TEXT NOT NULL,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_users_tokens
                ON users(token_count DESC, created_at, id);

            CREATE TABLE referrals (
                id                  TEXT PRIMARY KEY,
                referrer_id         TEXT NOT NULL REFERENCES users(id),
                referred_id         TEXT NOT NULL UNIQUE REFERENCES users(id),
                direct_referrer     INTEGER NOT NULL DEFAULT 1,
                coins_earned        INTEGER NOT NULL DEFAULT 0,
                last_reward_time    TEXT NOT NULL,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_referrals_referrer
                ON referrals(referrer_id, created_at);

            CREATE TABLE referral_earnings (
                referrer_id         TEXT NOT NULL,
                referred_id         TEXT NOT NULL,
                coins_earned        INTEGER NOT NULL DEFAULT 0,
                last_earned_at      TEXT NOT NULL,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL,
                PRIMARY KEY (referrer_id, referred_id)
            );

            CREATE INDEX idx_referral_earnings_window
                ON referral_earnings(referrer_id, last_earned_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
