//! Per-username statistics and room history.
//!
//! Keyed by username rather than connection id so they survive
//! reconnection for as long as the process lives.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub rooms_joined: u64,
    pub messages_sent: u64,
    /// Accumulated time spent in rooms, in milliseconds.
    pub total_time: i64,
    pub favorite_rooms: Vec<String>,
    pub last_seen: i64,
    pub created_at: i64,
}

impl UserStats {
    pub fn new(now: i64) -> Self {
        Self {
            rooms_joined: 0,
            messages_sent: 0,
            total_time: 0,
            favorite_rooms: Vec::new(),
            last_seen: now,
            created_at: now,
        }
    }
}

/// One visit to a room. `left_at` stays `None` while the visit is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHistoryEntry {
    pub room_id: String,
    pub joined_at: i64,
    pub left_at: Option<i64>,
}

impl UserHistoryEntry {
    pub fn open(room_id: String, joined_at: i64) -> Self {
        Self {
            room_id,
            joined_at,
            left_at: None,
        }
    }
}
