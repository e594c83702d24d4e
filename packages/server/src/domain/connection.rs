//! Connection records and the role model.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Global role of a connected user.
///
/// "Host" is intentionally not a role: it is derived from the room's
/// `host_id` pointer so the two can never fall out of sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Username is on the configured admin allow-list.
    Admin,
    User,
}

/// One live transport session.
///
/// Rooms hold only connection ids; the registry owns the record, including
/// the outbound channel. Dropping the record closes the channel, which in
/// turn tears the socket down.
#[derive(Debug)]
pub struct Connection {
    pub id: String,
    pub username: String,
    pub room_id: Option<String>,
    pub avatar: String,
    pub color: String,
    pub status: String,
    pub role: Role,
    pub sender: mpsc::UnboundedSender<String>,
}

impl Connection {
    pub fn new(id: String, sender: mpsc::UnboundedSender<String>) -> Self {
        let color = generate_user_color(&id);
        let username = format!("User {}", &id[..id.len().min(6)]);
        Self {
            id,
            username,
            room_id: None,
            avatar: String::new(),
            color,
            status: "online".to_string(),
            role: Role::User,
            sender,
        }
    }

    /// Fire-and-forget send; a closed channel only means the peer is
    /// already going away.
    pub fn push(&self, frame: String) {
        if self.sender.send(frame).is_err() {
            tracing::debug!("Dropped frame for disconnecting client '{}'", self.id);
        }
    }
}

const USER_COLORS: [&str; 15] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B739", "#52BE80", "#EC7063", "#5DADE2", "#58D68D", "#F4D03F", "#AF7AC5",
];

/// Pick a stable display color from the connection id.
pub fn generate_user_color(seed: &str) -> String {
    let mut hash: i32 = 0;
    for ch in seed.chars() {
        hash = (ch as i32).wrapping_add((hash << 5).wrapping_sub(hash));
    }
    USER_COLORS[hash.unsigned_abs() as usize % USER_COLORS.len()].to_string()
}
