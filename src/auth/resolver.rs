//! Session Resolver
//! Mission: Turn a presented token into a live user, read-only

use crate::auth::{
    errors::AuthError, models::User, session_store::SessionStore, user_store::UserStore,
};
use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Clone)]
pub struct SessionResolver {
    sessions: SessionStore,
    users: UserStore,
}

impl SessionResolver {
    pub fn new(sessions: SessionStore, users: UserStore) -> Self {
        Self { sessions, users }
    }

    pub fn resolve(&self, token: &str) -> Result<User, AuthError> {
        self.resolve_at(token, Utc::now())
    }

    /// Missing, expired and orphaned sessions all collapse into
    /// `Unauthenticated`. Nothing is deleted or renewed here.
    pub fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<User, AuthError> {
        let Some(session) = self.sessions.resolve(token)? else {
            debug!("Unknown session token presented");
            return Err(AuthError::Unauthenticated);
        };

        if session.is_expired_at(now) {
            debug!("Expired session for user {}", session.user_id);
            return Err(AuthError::Unauthenticated);
        }

        match self.users.find_by_id(session.user_id) {
            Ok(user) => Ok(user),
            Err(AuthError::NotFound) => {
                debug!("Orphaned session for missing user {}", session.user_id);
                Err(AuthError::Unauthenticated)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{db::AuthDb, models::UserRole};
    use chrono::{Duration, TimeZone};

    struct Fixture {
        db: AuthDb,
        sessions: SessionStore,
        resolver: SessionResolver,
        user: User,
    }

    fn fixture() -> Fixture {
        let db = AuthDb::in_memory().unwrap();
        let users = UserStore::with_cost(db.clone(), 4);
        let sessions = SessionStore::new(db.clone());
        let user = users
            .create_user("alice", "a@x.com", "pw123", UserRole::Player)
            .unwrap();
        let resolver = SessionResolver::new(sessions.clone(), users);
        Fixture {
            db,
            sessions,
            resolver,
            user,
        }
    }

    #[test]
    fn test_resolves_live_session() {
        let f = fixture();
        let session = f.sessions.create(f.user.id).unwrap();
        assert_eq!(f.resolver.resolve(&session.id).unwrap(), f.user);
    }

    #[test]
    fn test_expiry_boundary() {
        let f = fixture();
        let t = Utc::now();
        let session = f.sessions.create_at(f.user.id, t).unwrap();

        let just_before = t + Duration::hours(23) + Duration::minutes(59);
        let just_after = t + Duration::hours(24) + Duration::minutes(1);

        assert_eq!(f.resolver.resolve_at(&session.id, just_before).unwrap(), f.user);
        assert!(matches!(
            f.resolver.resolve_at(&session.id, just_after),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_sub_second_creation_keeps_full_ttl() {
        let f = fixture();
        let t = Utc.timestamp_opt(1_700_000_000, 900_000_000).unwrap();
        let session = f.sessions.create_at(f.user.id, t).unwrap();

        let half_second_left = t + Duration::hours(24) - Duration::milliseconds(500);
        assert_eq!(
            f.resolver.resolve_at(&session.id, half_second_left).unwrap(),
            f.user
        );
        assert!(matches!(
            f.resolver.resolve_at(&session.id, t + Duration::hours(24)),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_expired_session_not_deleted() {
        let f = fixture();
        let session = f
            .sessions
            .create_at(f.user.id, Utc::now() - Duration::hours(48))
            .unwrap();

        assert!(matches!(
            f.resolver.resolve(&session.id),
            Err(AuthError::Unauthenticated)
        ));
        assert!(f.sessions.resolve(&session.id).unwrap().is_some());
    }

    #[test]
    fn test_unknown_token() {
        let f = fixture();
        assert!(matches!(
            f.resolver.resolve("deadbeef"),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_orphaned_session() {
        let f = fixture();
        let session = f.sessions.create(f.user.id).unwrap();

        {
            let conn = f.db.conn();
            conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
            conn.execute("DELETE FROM users WHERE id = ?1", [f.user.id])
                .unwrap();
        }

        assert!(matches!(
            f.resolver.resolve(&session.id),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_resolution_does_not_extend_expiry() {
        let f = fixture();
        let t = Utc::now();
        let session = f.sessions.create_at(f.user.id, t).unwrap();

        f.resolver.resolve_at(&session.id, t + Duration::hours(12)).unwrap();
        let stored = f.sessions.resolve(&session.id).unwrap().unwrap();
        assert_eq!(stored.expires_at.timestamp(), session.expires_at.timestamp());
    }
}
