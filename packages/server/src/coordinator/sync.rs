//! Playback synchronization: the canonical clock and its echo broadcast.

use uuid::Uuid;

use crate::{
    domain::PlaylistItem,
    error::EventError,
    protocol::{ChangeVideoPayload, NotificationKind, ServerEvent, VideoControlPayload},
};

use super::Coordinator;

impl Coordinator {
    /// Apply a `video-control` intent to the room's canonical state and
    /// echo the accepted result to every member, the originator included.
    ///
    /// The echo is what clients reconcile against; trusting the local
    /// intent instead would let floating-point and timing differences
    /// accumulate. Intents dropped by the coalescing window produce no
    /// broadcast at all; the first writer's echo already reflects the
    /// accepted value.
    pub(crate) fn video_control(
        &mut self,
        conn_id: &str,
        payload: VideoControlPayload,
    ) -> Result<(), EventError> {
        self.ensure_member(conn_id, &payload.room_id)?;

        let now = self.now();
        let window = self.config.sync_throttle_ms;
        let Some(room) = self.rooms.get_mut(&payload.room_id) else {
            return Err(EventError::RoomNotFound(payload.room_id));
        };
        let applied = room.apply_control(payload.action, payload.time, payload.volume, now, window);
        if !applied {
            return Ok(());
        }

        let sync = ServerEvent::VideoSync {
            action: payload.action,
            time: room.current_time,
            is_playing: room.is_playing,
            volume: room.volume,
            timestamp: now,
        };
        self.broadcast(&payload.room_id, &sync);
        Ok(())
    }

    /// Swap the room's current video, optionally appending it to the
    /// playlist and pointing the current index at it.
    pub(crate) fn change_video(
        &mut self,
        conn_id: &str,
        payload: ChangeVideoPayload,
    ) -> Result<(), EventError> {
        self.ensure_member(conn_id, &payload.room_id)?;
        self.ensure_playlist_authority(conn_id, &payload.room_id)?;

        let username = self
            .connections
            .get(conn_id)
            .map(|c| c.username.clone())
            .unwrap_or_default();
        let now = self.now();

        let mut playlist_changed = false;
        {
            let Some(room) = self.rooms.get_mut(&payload.room_id) else {
                return Err(EventError::RoomNotFound(payload.room_id));
            };
            if payload.add_to_playlist && !payload.video_url.is_empty() {
                room.push_playlist_item(PlaylistItem {
                    id: Uuid::new_v4().to_string(),
                    url: payload.video_url.clone(),
                    added_by: username.clone(),
                    added_at: now,
                });
                room.current_index = room.playlist.len() as i64 - 1;
                playlist_changed = true;
            }
            room.video_url = payload.video_url.clone();
            room.current_time = 0.0;
            room.is_playing = false;
        }

        if playlist_changed {
            self.broadcast_playlist(&payload.room_id);
        }
        self.broadcast(
            &payload.room_id,
            &ServerEvent::VideoChanged {
                video_url: payload.video_url,
                changed_by: username.clone(),
            },
        );
        self.broadcast_except(
            &payload.room_id,
            conn_id,
            &ServerEvent::Notification {
                kind: NotificationKind::VideoChanged,
                message: format!("{username} loaded a new video"),
            },
        );
        Ok(())
    }
}
