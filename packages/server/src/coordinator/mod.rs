//! The session coordinator: authoritative per-room state and event
//! dispatch.
//!
//! One [`Coordinator`] owns every registry (rooms, connections, per-user
//! stats and history) behind a single `Mutex` held by the server state.
//! Each inbound event is fully processed (validation, mutation, broadcast
//! scheduling) before the lock is released, which makes room mutation
//! atomic per event without finer-grained locking. Outbound frames go
//! through the unbounded per-connection channels, so nothing here ever
//! awaits the transport.

mod admin;
mod admission;
mod chat;
mod moderation;
mod playlist;
mod signaling;
mod sync;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use kotatsu_shared::time::Clock;

use crate::{
    config::Config,
    domain::{Connection, Room, Role, UserHistoryEntry, UserStats},
    error::EventError,
    protocol::{ClientEvent, RoomUser, ServerEvent},
    storage::StorageHook,
};

/// Which error event a failed client event maps to.
///
/// Families the original protocol answers with a scoped error get one;
/// the rest fail silently (logged, no reply, no mutation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorScope {
    Room,
    Chat,
    General,
    Admin,
    Profile,
    Silent,
}

pub struct Coordinator {
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
    storage: Arc<dyn StorageHook>,
    rooms: HashMap<String, Room>,
    connections: HashMap<String, Connection>,
    user_stats: HashMap<String, UserStats>,
    user_history: HashMap<String, Vec<UserHistoryEntry>>,
}

impl Coordinator {
    pub fn new(config: Arc<Config>, clock: Arc<dyn Clock>, storage: Arc<dyn StorageHook>) -> Self {
        Self {
            config,
            clock,
            storage,
            rooms: HashMap::new(),
            connections: HashMap::new(),
            user_stats: HashMap::new(),
            user_history: HashMap::new(),
        }
    }

    /// Register a freshly upgraded connection under a new id.
    pub fn register_connection(&mut self, sender: mpsc::UnboundedSender<String>) -> String {
        let id = Uuid::new_v4().to_string();
        self.connections
            .insert(id.clone(), Connection::new(id.clone(), sender));
        tracing::info!("Connection '{}' registered", id);
        id
    }

    /// Dispatch one inbound event. Validation failures become a scoped
    /// error reply to the originator; other connections are unaffected.
    pub fn handle(&mut self, conn_id: &str, event: ClientEvent) {
        let scope = Self::error_scope(&event);
        let result = match event {
            ClientEvent::CreateRoom(p) => self.create_room(conn_id, p),
            ClientEvent::JoinRoom(p) => self.join_room(conn_id, p),
            ClientEvent::ChangeVideo(p) => self.change_video(conn_id, p),
            ClientEvent::VideoControl(p) => self.video_control(conn_id, p),
            ClientEvent::PlaylistAdd(p) => self.playlist_add(conn_id, p),
            ClientEvent::PlaylistRemove(p) => self.playlist_remove(conn_id, p),
            ClientEvent::PlaylistReorder(p) => self.playlist_reorder(conn_id, p),
            ClientEvent::PlaylistNext(p) => self.playlist_next(conn_id, &p.room_id),
            ClientEvent::PlaylistPrevious(p) => self.playlist_previous(conn_id, &p.room_id),
            ClientEvent::VideoEnded(p) => self.video_ended(conn_id, &p.room_id),
            ClientEvent::UpdateRoom(p) => self.update_room(conn_id, p),
            ClientEvent::UpdateUser(p) => self.update_user(conn_id, p),
            ClientEvent::ChatMessage(p) => self.chat_message(conn_id, p),
            ClientEvent::KickUser(p) => self.kick_user(conn_id, p),
            ClientEvent::ToggleMuteUser(p) => self.toggle_mute_user(conn_id, p),
            ClientEvent::TransferHost(p) => self.transfer_host(conn_id, p),
            ClientEvent::DeleteRoom(p) => self.delete_room(conn_id, &p.room_id),
            ClientEvent::ScreenShareOffer(p) => self.screen_share_offer(conn_id, p),
            ClientEvent::ScreenShareAnswer(p) => self.screen_share_answer(conn_id, p),
            ClientEvent::ScreenShareIceCandidate(p) => self.screen_share_ice(conn_id, p),
            ClientEvent::ScreenShareEnd(p) => self.screen_share_end(conn_id, &p.room_id),
            ClientEvent::GetUserProfile(p) => self.get_user_profile(conn_id, &p.username),
            ClientEvent::AdminGetRooms => self.admin_get_rooms(conn_id),
            ClientEvent::AdminGetUsers => self.admin_get_users(conn_id),
            ClientEvent::AdminGetStats => self.admin_get_stats(conn_id),
            ClientEvent::AdminDeleteRoom(p) => self.admin_delete_room(conn_id, &p.room_id),
            ClientEvent::AdminBanUser(p) => self.admin_ban_user(conn_id, &p.target_username),
        };
        if let Err(err) = result {
            self.report(conn_id, scope, err);
        }
    }

    fn error_scope(event: &ClientEvent) -> ErrorScope {
        match event {
            ClientEvent::CreateRoom(_) | ClientEvent::JoinRoom(_) => ErrorScope::Room,
            ClientEvent::ChatMessage(_) => ErrorScope::Chat,
            ClientEvent::GetUserProfile(_) => ErrorScope::Profile,
            ClientEvent::KickUser(_)
            | ClientEvent::ToggleMuteUser(_)
            | ClientEvent::TransferHost(_)
            | ClientEvent::DeleteRoom(_)
            | ClientEvent::UpdateRoom(_) => ErrorScope::General,
            ClientEvent::AdminGetRooms
            | ClientEvent::AdminGetUsers
            | ClientEvent::AdminGetStats
            | ClientEvent::AdminDeleteRoom(_)
            | ClientEvent::AdminBanUser(_) => ErrorScope::Admin,
            _ => ErrorScope::Silent,
        }
    }

    fn report(&self, conn_id: &str, scope: ErrorScope, err: EventError) {
        let message = err.to_string();
        let event = match scope {
            ErrorScope::Room => ServerEvent::RoomError { message },
            ErrorScope::Chat => ServerEvent::ChatError { message },
            ErrorScope::General => ServerEvent::Error { message },
            ErrorScope::Admin => ServerEvent::AdminError { message },
            ErrorScope::Profile => ServerEvent::UserProfileError { message },
            ErrorScope::Silent => {
                tracing::debug!("Ignored invalid event from '{}': {}", conn_id, message);
                return;
            }
        };
        self.push_to(conn_id, &event);
    }

    // ---- accessors used by the HTTP surface -------------------------------

    pub fn rooms(&self) -> &HashMap<String, Room> {
        &self.rooms
    }

    pub fn connections(&self) -> &HashMap<String, Connection> {
        &self.connections
    }

    pub fn stats_of(&self, username: &str) -> Option<&UserStats> {
        self.user_stats.get(username)
    }

    pub fn history_of(&self, username: &str) -> &[UserHistoryEntry] {
        self.user_history.get(username).map_or(&[], Vec::as_slice)
    }

    // ---- shared helpers ---------------------------------------------------

    fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    fn push_to(&self, conn_id: &str, event: &ServerEvent) {
        if let Some(conn) = self.connections.get(conn_id) {
            conn.push(event.encode());
        }
    }

    /// Send to every member of a room, the originator included.
    fn broadcast(&self, room_id: &str, event: &ServerEvent) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let frame = event.encode();
        for member in &room.members {
            if let Some(conn) = self.connections.get(member) {
                conn.push(frame.clone());
            }
        }
    }

    fn broadcast_except(&self, room_id: &str, except: &str, event: &ServerEvent) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let frame = event.encode();
        for member in room.members.iter().filter(|id| *id != except) {
            if let Some(conn) = self.connections.get(member) {
                conn.push(frame.clone());
            }
        }
    }

    /// Roster of a room, with `is_host` derived from the host pointer.
    fn roster(&self, room: &Room) -> Vec<RoomUser> {
        room.members
            .iter()
            .filter_map(|id| self.connections.get(id))
            .map(|conn| RoomUser {
                id: conn.id.clone(),
                username: conn.username.clone(),
                is_host: room.is_host(&conn.id),
                avatar: conn.avatar.clone(),
                color: conn.color.clone(),
                status: conn.status.clone(),
                role: conn.role,
            })
            .collect()
    }

    /// Resolve a client-supplied room id case-insensitively to the stored key.
    fn resolve_room_id(&self, raw: &str) -> Option<String> {
        let normalized = raw.trim().to_uppercase();
        self.rooms
            .keys()
            .find(|id| id.to_uppercase() == normalized)
            .cloned()
    }

    /// The connection must exist, claim this room, and actually be a member.
    fn ensure_member(&self, conn_id: &str, room_id: &str) -> Result<(), EventError> {
        let conn = self
            .connections
            .get(conn_id)
            .ok_or(EventError::NotConnected)?;
        if conn.room_id.as_deref() != Some(room_id) {
            return Err(EventError::UserNotInRoom);
        }
        let room = self
            .rooms
            .get(room_id)
            .ok_or_else(|| EventError::RoomNotFound(room_id.to_string()))?;
        if !room.is_member(conn_id) {
            return Err(EventError::UserNotInRoom);
        }
        Ok(())
    }

    /// Membership plus the host check, for host-only operations.
    fn ensure_host(&self, conn_id: &str, room_id: &str) -> Result<(), EventError> {
        self.ensure_member(conn_id, room_id)?;
        let room = self
            .rooms
            .get(room_id)
            .ok_or_else(|| EventError::RoomNotFound(room_id.to_string()))?;
        if !room.is_host(conn_id) {
            return Err(EventError::Unauthorized("room host"));
        }
        Ok(())
    }

    fn ensure_admin(&self, conn_id: &str) -> Result<(), EventError> {
        let conn = self
            .connections
            .get(conn_id)
            .ok_or(EventError::NotConnected)?;
        if conn.role != Role::Admin {
            return Err(EventError::Unauthorized("admin"));
        }
        Ok(())
    }

    fn resolve_role(&self, username: &str) -> Role {
        if self.config.is_admin_username(username) {
            Role::Admin
        } else {
            Role::User
        }
    }

    /// Generate a fresh 8-character uppercase room id.
    fn generate_room_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }

    // ---- stats & history --------------------------------------------------

    /// Bump the per-username counters for a room entry.
    fn record_room_entry(&mut self, username: &str) {
        if username.is_empty() {
            return;
        }
        let now = self.now();
        let stats = self
            .user_stats
            .entry(username.to_string())
            .or_insert_with(|| UserStats::new(now));
        stats.rooms_joined += 1;
        stats.last_seen = now;
    }

    fn open_history(&mut self, username: &str, room_id: &str) {
        if username.is_empty() {
            return;
        }
        let entry = UserHistoryEntry::open(room_id.to_string(), self.now());
        self.user_history
            .entry(username.to_string())
            .or_default()
            .push(entry);
    }

    /// Close the open history entry for this room, accumulating the
    /// elapsed time into the user's total.
    fn close_history(&mut self, username: &str, room_id: &str) {
        let now = self.now();
        let Some(history) = self.user_history.get_mut(username) else {
            return;
        };
        let Some(last) = history.last_mut() else {
            return;
        };
        if last.room_id == room_id && last.left_at.is_none() {
            last.left_at = Some(now);
            if let Some(stats) = self.user_stats.get_mut(username) {
                stats.total_time += now - last.joined_at;
            }
        }
    }
}
