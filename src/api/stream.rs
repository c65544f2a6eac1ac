//! Player-only stream control

use crate::auth::CurrentUser;
use tracing::info;

/// Start stream - POST /start-stream (behind the player `RoleGate`)
pub async fn start_stream(CurrentUser(user): CurrentUser) -> String {
    info!("🎬 Stream started by {} ({})", user.username, user.id);
    format!("Stream started by {}", user.username)
}
