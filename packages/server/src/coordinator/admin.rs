//! Administrative surface: inventory, aggregate stats, forced removals.
//!
//! Every entry point is gated on the connection's resolved role; the
//! allow-list lives in [`crate::config::Config`].

use crate::{
    error::EventError,
    protocol::{AdminRoomDto, AdminStatsDto, AdminUserDto, ServerEvent},
};

use super::Coordinator;

impl Coordinator {
    pub(crate) fn admin_get_rooms(&mut self, conn_id: &str) -> Result<(), EventError> {
        self.ensure_admin(conn_id)?;
        let mut rooms: Vec<AdminRoomDto> = self
            .rooms
            .values()
            .map(|room| AdminRoomDto {
                id: room.id.clone(),
                name: room.name.clone(),
                description: room.description.clone(),
                host_id: room.host_id.clone(),
                host_username: self
                    .connections
                    .get(&room.host_id)
                    .map(|conn| conn.username.clone())
                    .unwrap_or_default(),
                user_count: room.members.len(),
                max_users: room.max_users,
                is_public: room.is_public,
                category: room.category.clone(),
                tags: room.tags.clone(),
                created_at: room.created_at,
                stats: room.stats.clone(),
                has_password: !room.password.is_empty(),
            })
            .collect();
        rooms.sort_by_key(|room| room.created_at);
        self.push_to(conn_id, &ServerEvent::AdminRooms(rooms));
        Ok(())
    }

    pub(crate) fn admin_get_users(&mut self, conn_id: &str) -> Result<(), EventError> {
        self.ensure_admin(conn_id)?;
        let now = self.now();
        let mut users: Vec<AdminUserDto> = self
            .connections
            .values()
            .map(|conn| AdminUserDto {
                id: conn.id.clone(),
                username: conn.username.clone(),
                avatar: conn.avatar.clone(),
                color: conn.color.clone(),
                status: conn.status.clone(),
                role: conn.role,
                room_id: conn.room_id.clone(),
                is_host: conn
                    .room_id
                    .as_deref()
                    .and_then(|room_id| self.rooms.get(room_id))
                    .is_some_and(|room| room.is_host(&conn.id)),
                stats: self
                    .user_stats
                    .get(&conn.username)
                    .cloned()
                    .unwrap_or_else(|| crate::domain::UserStats::new(now)),
            })
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        self.push_to(conn_id, &ServerEvent::AdminUsers(users));
        Ok(())
    }

    pub(crate) fn admin_get_stats(&mut self, conn_id: &str) -> Result<(), EventError> {
        self.ensure_admin(conn_id)?;
        let stats = self.global_stats();
        self.push_to(conn_id, &ServerEvent::AdminStats(stats));
        Ok(())
    }

    /// Global totals, shared by the `admin-get-stats` event and the
    /// token-gated HTTP endpoint.
    pub fn global_stats(&self) -> AdminStatsDto {
        AdminStatsDto {
            total_rooms: self.rooms.len(),
            total_users: self.connections.len(),
            total_messages: self.rooms.values().map(|r| r.stats.total_messages).sum(),
            total_videos: self.rooms.values().map(|r| r.stats.total_videos).sum(),
            total_views: self.rooms.values().map(|r| r.stats.total_views).sum(),
            public_rooms: self.rooms.values().filter(|r| r.is_public).count(),
            active_rooms: self
                .rooms
                .values()
                .filter(|r| !r.members.is_empty())
                .count(),
        }
    }

    pub(crate) fn admin_delete_room(
        &mut self,
        conn_id: &str,
        room_id: &str,
    ) -> Result<(), EventError> {
        self.ensure_admin(conn_id)?;
        let room_id = self
            .resolve_room_id(room_id)
            .ok_or_else(|| EventError::RoomNotFound(room_id.to_uppercase()))?;
        self.destroy_room(&room_id, "The room was removed by an administrator");
        self.push_to(conn_id, &ServerEvent::AdminRoomDeleted { room_id });
        Ok(())
    }

    /// Ban every connection carrying this username, the requester's own
    /// included if it matches. Dropping the connection records drops
    /// their senders, which closes the sockets.
    pub(crate) fn admin_ban_user(
        &mut self,
        conn_id: &str,
        target_username: &str,
    ) -> Result<(), EventError> {
        self.ensure_admin(conn_id)?;
        let targets: Vec<String> = self
            .connections
            .values()
            .filter(|conn| conn.username == target_username)
            .map(|conn| conn.id.clone())
            .collect();
        for target in targets {
            self.push_to(
                &target,
                &ServerEvent::Banned {
                    message: "You have been banned by an administrator".to_string(),
                },
            );
            self.remove_connection(&target);
        }
        self.push_to(
            conn_id,
            &ServerEvent::AdminUserBanned {
                username: target_username.to_string(),
            },
        );
        Ok(())
    }
}
