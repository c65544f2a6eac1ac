//! Session Sweeper
//! Mission: Periodically drop sessions the resolver already rejects

use crate::auth::session_store::SessionStore;
use chrono::Utc;
use std::time::Duration;
use tokio::{task::JoinHandle, time::interval};
use tracing::{debug, info, warn};

/// Run one purge pass; returns rows removed (0 on error)
pub fn sweep_once(sessions: &SessionStore) -> usize {
    match sessions.purge_expired(Utc::now()) {
        Ok(0) => {
            debug!("Session sweep: nothing to purge");
            0
        }
        Ok(n) => {
            info!("🧹 Purged {} expired session(s)", n);
            n
        }
        Err(e) => {
            warn!("Session sweep failed: {}", e);
            0
        }
    }
}

/// Spawn the background sweeper. `None` when `every` is zero.
pub fn spawn(sessions: SessionStore, every: Duration) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        info!("Session sweeper disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            let sessions = sessions.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || sweep_once(&sessions)).await {
                warn!("Session sweep task failed: {}", e);
            }
        }
    }))
}
