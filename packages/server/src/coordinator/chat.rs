//! Chat relay and user profiles.
//!
//! Messages are broadcast but not retained here; durable chat history is
//! a storage-hook concern.

use uuid::Uuid;

use crate::{
    error::EventError,
    protocol::{
        ChatBroadcast, ChatMessagePayload, NotificationKind, ServerEvent, UserProfileDto,
    },
};

use super::Coordinator;

/// How many history entries a profile reply carries at most.
const PROFILE_HISTORY_LIMIT: usize = 50;

/// Notification previews are cut to this many characters.
const NOTIFICATION_PREVIEW_CHARS: usize = 50;

impl Coordinator {
    pub(crate) fn chat_message(
        &mut self,
        conn_id: &str,
        payload: ChatMessagePayload,
    ) -> Result<(), EventError> {
        let conn = self
            .connections
            .get(conn_id)
            .ok_or(EventError::NotConnected)?;
        let room_id = conn.room_id.clone().ok_or(EventError::UserNotInRoom)?;
        let room = self
            .rooms
            .get(&room_id)
            .ok_or_else(|| EventError::RoomNotFound(room_id.clone()))?;
        if room.muted_users.contains(conn_id) {
            return Err(EventError::Muted);
        }

        let username = conn.username.clone();
        let broadcast = ChatBroadcast {
            id: Uuid::new_v4().to_string(),
            user_id: conn_id.to_string(),
            username: username.clone(),
            avatar: conn.avatar.clone(),
            color: conn.color.clone(),
            message: payload.message.clone(),
            timestamp: self.now(),
        };

        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.stats.total_messages += 1;
        }
        if let Some(stats) = self.user_stats.get_mut(&username) {
            stats.messages_sent += 1;
        }

        self.broadcast(&room_id, &ServerEvent::ChatMessage(broadcast));
        self.broadcast_except(
            &room_id,
            conn_id,
            &ServerEvent::Notification {
                kind: NotificationKind::NewMessage,
                message: format!("{username}: {}", preview(&payload.message)),
            },
        );

        let storage = self.storage.clone();
        let message = payload.message;
        tokio::spawn(async move { storage.chat_message(room_id, username, message).await });
        Ok(())
    }

    /// Profile lookup is restricted to the requesting user itself.
    pub(crate) fn get_user_profile(
        &mut self,
        conn_id: &str,
        username: &str,
    ) -> Result<(), EventError> {
        let conn = self
            .connections
            .get(conn_id)
            .ok_or(EventError::NotConnected)?;
        if conn.username != username {
            return Err(EventError::Unauthorized("profile owner"));
        }

        let now = self.now();
        let stats = self
            .user_stats
            .get(username)
            .cloned()
            .unwrap_or_else(|| crate::domain::UserStats::new(now));
        let history = self.history_of(username);
        let history = history[history.len().saturating_sub(PROFILE_HISTORY_LIMIT)..].to_vec();

        let profile = UserProfileDto {
            username: conn.username.clone(),
            avatar: conn.avatar.clone(),
            color: conn.color.clone(),
            status: conn.status.clone(),
            role: conn.role,
            stats,
            history,
        };
        self.push_to(conn_id, &ServerEvent::UserProfile(profile));
        Ok(())
    }
}

fn preview(message: &str) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(NOTIFICATION_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
