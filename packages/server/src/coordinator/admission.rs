//! Room admission: create, join, profile updates, disconnect teardown.

use crate::{
    domain::Room,
    error::EventError,
    protocol::{
        CreateRoomPayload, JoinRoomPayload, NotificationKind, RoomStateSnapshot, ServerEvent,
        UpdateUserPayload,
    },
};

use super::Coordinator;

impl Coordinator {
    pub(crate) fn create_room(
        &mut self,
        conn_id: &str,
        payload: CreateRoomPayload,
    ) -> Result<(), EventError> {
        if !self.connections.contains_key(conn_id) {
            return Err(EventError::NotConnected);
        }
        // joining a new session implicitly leaves the previous one
        self.detach_from_room(conn_id);

        let now = self.now();
        let room_id = self.generate_room_id();
        let mut room = Room::new(room_id.clone(), conn_id.to_string(), payload.password, now);
        room.stats.total_views += 1;
        self.rooms.insert(room_id.clone(), room);

        let username = payload.username.trim().to_string();
        self.assume_identity(conn_id, &username, &room_id);
        self.record_room_entry(&username);

        self.push_to(
            conn_id,
            &ServerEvent::RoomCreated {
                room_id: room_id.clone(),
            },
        );
        self.broadcast_membership_joined(conn_id, &room_id);

        let display_name = self
            .connections
            .get(conn_id)
            .map(|c| c.username.clone())
            .unwrap_or_default();
        tracing::info!("Room '{}' created by '{}'", room_id, display_name);

        let storage = self.storage.clone();
        tokio::spawn(async move { storage.room_created(room_id, display_name).await });
        Ok(())
    }

    pub(crate) fn join_room(
        &mut self,
        conn_id: &str,
        payload: JoinRoomPayload,
    ) -> Result<(), EventError> {
        if !self.connections.contains_key(conn_id) {
            return Err(EventError::NotConnected);
        }
        let raw_id = payload.room_id.trim();
        if raw_id.is_empty() {
            return Err(EventError::EmptyRoomId);
        }
        let room_id = self
            .resolve_room_id(raw_id)
            .ok_or_else(|| EventError::RoomNotFound(raw_id.to_uppercase()))?;
        {
            let room = &self.rooms[&room_id];
            if room.has_password() && room.password != payload.password {
                return Err(EventError::BadPassword);
            }
        }

        // validated; from here on the event cannot fail
        self.detach_from_room(conn_id);
        let username = payload.username.trim().to_string();
        self.assume_identity(conn_id, &username, &room_id);
        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.add_member(conn_id.to_string());
            room.stats.total_views += 1;
        }
        self.record_room_entry(&username);
        self.open_history(&username, &room_id);

        if let Some(snapshot) = self.room_snapshot(&room_id, conn_id) {
            self.push_to(conn_id, &ServerEvent::RoomState(snapshot));
        }
        self.broadcast_membership_joined(conn_id, &room_id);

        tracing::info!("Connection '{}' joined room '{}'", conn_id, room_id);
        Ok(())
    }

    pub(crate) fn update_user(
        &mut self,
        conn_id: &str,
        payload: UpdateUserPayload,
    ) -> Result<(), EventError> {
        let conn = self
            .connections
            .get_mut(conn_id)
            .ok_or(EventError::NotConnected)?;
        if let Some(avatar) = payload.avatar {
            conn.avatar = avatar;
        }
        if let Some(status) = payload.status {
            conn.status = status;
        }
        let (avatar, status, room_id) = (conn.avatar.clone(), conn.status.clone(), conn.room_id.clone());
        if let Some(room_id) = room_id {
            self.broadcast(
                &room_id,
                &ServerEvent::UserUpdated {
                    user_id: conn_id.to_string(),
                    avatar,
                    status,
                },
            );
        }
        Ok(())
    }

    /// Tear down a connection entirely. A second call for the same id is a
    /// no-op, which also covers the socket task's cleanup running after a
    /// kick or ban already removed the record.
    pub fn remove_connection(&mut self, conn_id: &str) {
        if !self.connections.contains_key(conn_id) {
            return;
        }
        self.detach_from_room(conn_id);
        if let Some(conn) = self.connections.remove(conn_id) {
            let now = self.now();
            if let Some(stats) = self.user_stats.get_mut(&conn.username) {
                stats.last_seen = now;
            }
            tracing::info!("Connection '{}' disconnected", conn_id);
            let storage = self.storage.clone();
            let username = conn.username;
            tokio::spawn(async move { storage.user_seen(username, now).await });
        }
    }

    /// Remove a connection from its current room, if any: close its open
    /// history entry, destroy the room when it empties, otherwise promote
    /// a new host if needed and broadcast the updated membership.
    pub(crate) fn detach_from_room(&mut self, conn_id: &str) {
        let Some((room_id, username)) = self
            .connections
            .get_mut(conn_id)
            .and_then(|conn| conn.room_id.take().map(|r| (r, conn.username.clone())))
        else {
            return;
        };
        self.close_history(&username, &room_id);

        let mut destroyed = false;
        let mut promoted = None;
        let mut host_id = String::new();
        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.remove_member(conn_id);
            if room.members.is_empty() {
                destroyed = true;
            } else {
                if room.is_host(conn_id) {
                    // no explicit transfer happened: promote the
                    // earliest-joined remaining member
                    room.host_id = room.members[0].clone();
                    promoted = Some(room.host_id.clone());
                }
                host_id = room.host_id.clone();
            }
        } else {
            return;
        }

        if destroyed {
            self.rooms.remove(&room_id);
            tracing::info!("Room '{}' destroyed (no members left)", room_id);
            let storage = self.storage.clone();
            tokio::spawn(async move { storage.room_deleted(room_id).await });
            return;
        }

        let roster = match self.rooms.get(&room_id) {
            Some(room) => self.roster(room),
            None => return,
        };
        self.broadcast(
            &room_id,
            &ServerEvent::UserLeft {
                user_id: conn_id.to_string(),
                username,
                users: roster.clone(),
                host_id: host_id.clone(),
            },
        );
        if let Some(new_host_id) = promoted {
            tracing::info!(
                "Host of room '{}' left; promoted '{}'",
                room_id,
                new_host_id
            );
            self.broadcast(
                &room_id,
                &ServerEvent::HostTransferred {
                    new_host_id,
                    users: roster,
                },
            );
        }
    }

    /// Apply the identity a connection presented at admission.
    fn assume_identity(&mut self, conn_id: &str, username: &str, room_id: &str) {
        let role = self.resolve_role(username);
        if let Some(conn) = self.connections.get_mut(conn_id) {
            if !username.is_empty() {
                conn.username = username.to_string();
            }
            conn.role = role;
            conn.room_id = Some(room_id.to_string());
        }
    }

    /// `user-joined` + notification to the rest of the room.
    fn broadcast_membership_joined(&self, conn_id: &str, room_id: &str) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let username = self
            .connections
            .get(conn_id)
            .map(|c| c.username.clone())
            .unwrap_or_default();
        let event = ServerEvent::UserJoined {
            user_id: conn_id.to_string(),
            username: username.clone(),
            users: self.roster(room),
            host_id: room.host_id.clone(),
        };
        self.broadcast(room_id, &event);
        self.broadcast_except(
            room_id,
            conn_id,
            &ServerEvent::Notification {
                kind: NotificationKind::UserJoined,
                message: format!("{username} joined the room"),
            },
        );
    }

    /// Snapshot of the canonical room state as seen by one member.
    pub(crate) fn room_snapshot(
        &self,
        room_id: &str,
        for_conn_id: &str,
    ) -> Option<RoomStateSnapshot> {
        let room = self.rooms.get(room_id)?;
        Some(RoomStateSnapshot {
            video_url: room.video_url.clone(),
            is_playing: room.is_playing,
            current_time: room.current_time,
            host_id: room.host_id.clone(),
            volume: room.volume,
            users: self.roster(room),
            is_muted: room.muted_users.contains(for_conn_id),
            has_password: room.has_password(),
            playlist: room.playlist.clone(),
            current_playlist_index: room.current_index,
            room_name: room.name.clone(),
            room_description: room.description.clone(),
            max_users: room.max_users,
            category: room.category.clone(),
            tags: room.tags.clone(),
            is_public: room.is_public,
        })
    }
}
