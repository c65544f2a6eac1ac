//! Session Storage
//! Mission: Persist opaque session tokens with a fixed expiry

use crate::auth::{db::AuthDb, errors::AuthError, models::Session};
use chrono::{DateTime, Duration, SubsecRound, TimeZone, Utc};
use rand::{rngs::OsRng, RngCore};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

/// Sessions live this long and are never extended.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Random bytes per token (hex encoded to twice as many chars)
const TOKEN_BYTES: usize = 32;

#[derive(Clone)]
pub struct SessionStore {
    db: AuthDb,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(db: AuthDb) -> Self {
        Self::with_ttl(db, Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    pub fn with_ttl(db: AuthDb, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint and persist a session for `user_id`
    pub fn create(&self, user_id: i64) -> Result<Session, AuthError> {
        self.create_at(user_id, Utc::now())
    }

    /// Expiry is persisted in unix milliseconds, so `now` is truncated to
    /// the millisecond first and the returned session matches the stored row.
    pub fn create_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let now = now.trunc_subsecs(3);
        let session = Session {
            id: generate_token(),
            user_id,
            expires_at: now + self.ttl,
        };

        self.db.conn().execute(
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id,
                session.user_id,
                session.expires_at.timestamp_millis(),
                now.timestamp_millis()
            ],
        )?;

        debug!("Session issued for user {} (expires {})", user_id, session.expires_at);
        Ok(session)
    }

    /// Look a token up without judging expiry. That is the resolver's call.
    pub fn resolve(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let conn = self.db.conn();
        let row = conn
            .query_row(
                "SELECT id, user_id, expires_at FROM sessions WHERE id = ?1",
                params![token],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.and_then(|(id, user_id, expires_at)| {
            Utc.timestamp_millis_opt(expires_at).single().map(|expires_at| Session {
                id,
                user_id,
                expires_at,
            })
        }))
    }

    /// Remove a session. Unknown tokens are fine.
    pub fn delete(&self, token: &str) -> Result<(), AuthError> {
        let removed = self
            .db
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![token])?;
        debug!("Session delete removed {} row(s)", removed);
        Ok(())
    }

    /// Drop every session already expired at `now`
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AuthError> {
        Ok(self.db.conn().execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![now.timestamp_millis()],
        )?)
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
