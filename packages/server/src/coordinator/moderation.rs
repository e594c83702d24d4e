//! Host-only room administration: kick, mute, host transfer, settings,
//! deletion.

use crate::{
    error::EventError,
    protocol::{ServerEvent, TargetUserPayload, TransferHostPayload, UpdateRoomPayload},
};

use super::Coordinator;

impl Coordinator {
    pub(crate) fn kick_user(
        &mut self,
        conn_id: &str,
        payload: TargetUserPayload,
    ) -> Result<(), EventError> {
        self.ensure_host(conn_id, &payload.room_id)?;
        let target = payload.target_user_id;
        let is_member = self
            .rooms
            .get(&payload.room_id)
            .is_some_and(|room| room.is_member(&target));
        if !is_member {
            return Err(EventError::UserNotInRoom);
        }

        self.push_to(
            &target,
            &ServerEvent::Kicked {
                message: "You were kicked from the room".to_string(),
            },
        );
        // detaching broadcasts the updated membership to the remaining room
        self.detach_from_room(&target);
        tracing::info!("'{}' kicked from room '{}'", target, payload.room_id);
        Ok(())
    }

    pub(crate) fn toggle_mute_user(
        &mut self,
        conn_id: &str,
        payload: TargetUserPayload,
    ) -> Result<(), EventError> {
        self.ensure_host(conn_id, &payload.room_id)?;
        let target = payload.target_user_id;
        let Some(room) = self.rooms.get_mut(&payload.room_id) else {
            return Err(EventError::RoomNotFound(payload.room_id));
        };
        if !room.is_member(&target) {
            return Err(EventError::UserNotInRoom);
        }
        let is_muted = if room.muted_users.remove(&target) {
            false
        } else {
            room.muted_users.insert(target.clone());
            true
        };

        self.push_to(&target, &ServerEvent::MuteStatus { is_muted });
        self.broadcast(
            &payload.room_id,
            &ServerEvent::UserMuted {
                user_id: target,
                is_muted,
            },
        );
        Ok(())
    }

    pub(crate) fn transfer_host(
        &mut self,
        conn_id: &str,
        payload: TransferHostPayload,
    ) -> Result<(), EventError> {
        self.ensure_host(conn_id, &payload.room_id)?;
        let Some(room) = self.rooms.get_mut(&payload.room_id) else {
            return Err(EventError::RoomNotFound(payload.room_id));
        };
        if !room.is_member(&payload.new_host_id) {
            return Err(EventError::UserNotInRoom);
        }
        room.host_id = payload.new_host_id.clone();

        let roster = match self.rooms.get(&payload.room_id) {
            Some(room) => self.roster(room),
            None => return Ok(()),
        };
        self.broadcast(
            &payload.room_id,
            &ServerEvent::HostTransferred {
                new_host_id: payload.new_host_id,
                users: roster,
            },
        );
        Ok(())
    }

    pub(crate) fn update_room(
        &mut self,
        conn_id: &str,
        payload: UpdateRoomPayload,
    ) -> Result<(), EventError> {
        self.ensure_host(conn_id, &payload.room_id)?;
        let Some(room) = self.rooms.get_mut(&payload.room_id) else {
            return Err(EventError::RoomNotFound(payload.room_id));
        };
        if let Some(name) = payload.name {
            room.name = name;
        }
        if let Some(description) = payload.description {
            room.description = description;
        }
        if let Some(max_users) = payload.max_users {
            room.max_users = max_users;
        }
        if let Some(category) = payload.category {
            room.category = category;
        }
        if let Some(tags) = payload.tags {
            room.tags = tags;
        }
        if let Some(is_public) = payload.is_public {
            room.is_public = is_public;
        }

        let updated = ServerEvent::RoomUpdated {
            name: room.name.clone(),
            description: room.description.clone(),
            max_users: room.max_users,
            category: room.category.clone(),
            tags: room.tags.clone(),
            is_public: room.is_public,
        };
        self.broadcast(&payload.room_id, &updated);
        Ok(())
    }

    pub(crate) fn delete_room(&mut self, conn_id: &str, room_id: &str) -> Result<(), EventError> {
        self.ensure_host(conn_id, room_id)?;
        self.destroy_room(room_id, "The room was deleted by the host");
        Ok(())
    }

    /// Notify every member, close their history entries, and drop the
    /// room. Members stay connected; they are simply roomless afterwards.
    pub(crate) fn destroy_room(&mut self, room_id: &str, notice: &str) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let members = room.members.clone();
        self.broadcast(
            room_id,
            &ServerEvent::RoomDeleted {
                message: notice.to_string(),
            },
        );
        for member in members {
            let username = match self.connections.get_mut(&member) {
                Some(conn) => {
                    conn.room_id = None;
                    conn.username.clone()
                }
                None => continue,
            };
            self.close_history(&username, room_id);
        }
        self.rooms.remove(room_id);
        tracing::info!("Room '{}' deleted", room_id);

        let storage = self.storage.clone();
        let room_id = room_id.to_string();
        tokio::spawn(async move { storage.room_deleted(room_id).await });
    }
}
