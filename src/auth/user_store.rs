//! User Storage
//! Mission: Securely store user accounts with SQLite

use crate::auth::{
    db::AuthDb,
    errors::{is_unique_violation, AuthError},
    models::{User, UserRole},
};
use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

/// User storage with SQLite backend
#[derive(Clone)]
pub struct UserStore {
    db: AuthDb,
    bcrypt_cost: u32,
}

impl UserStore {
    pub fn new(db: AuthDb) -> Self {
        Self::with_cost(db, DEFAULT_COST)
    }

    /// Store hashing with an explicit bcrypt cost (tests use the minimum)
    pub fn with_cost(db: AuthDb, bcrypt_cost: u32) -> Self {
        Self { db, bcrypt_cost }
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }

    /// Create a new user. The password is hashed before it touches the database.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let password_hash = hash(password, self.bcrypt_cost)?;

        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO users (username, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                username,
                email,
                password_hash,
                role.as_str(),
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                debug!("Duplicate registration for {}", email);
                AuthError::DuplicateIdentity
            } else {
                AuthError::Storage(e)
            }
        })?;

        let user = User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            role,
        };

        info!("✅ Created user {} <{}> ({})", user.id, user.email, user.role);

        Ok(user)
    }

    /// Get a user and its stored hash by email
    pub fn find_by_email(&self, email: &str) -> Result<(User, String), AuthError> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT id, username, email, role, password_hash FROM users WHERE email = ?1",
            params![email],
            |row| Ok((user_from_row(row)?, row.get::<_, String>(4)?)),
        )
        .optional()?
        .ok_or(AuthError::NotFound)
    }

    /// Get a user by id
    pub fn find_by_id(&self, id: i64) -> Result<User, AuthError> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT id, username, email, role FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()?
        .ok_or(AuthError::NotFound)
    }

    pub fn count(&self) -> Result<i64, AuthError> {
        let conn = self.db.conn();
        Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(3)?;
    // The CHECK constraint keeps unknown roles out of the table.
    let role = role_str.parse::<UserRole>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        role,
    })
}
