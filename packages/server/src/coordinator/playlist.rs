//! Playlist mutations and the current-item pointer.
//!
//! `reorder` is always host-only. The other operations are open to every
//! member unless `restrict_playlist_to_host` is set; the original service
//! shipped with the open policy, so that is the default.

use uuid::Uuid;

use crate::{
    domain::{PlaylistItem, PlaylistRemoval},
    error::EventError,
    protocol::{
        PlaylistAddPayload, PlaylistRemovePayload, PlaylistReorderPayload, ServerEvent, VideoAction,
    },
};

use super::Coordinator;

/// Attribution used when the server itself changes the current video.
const SYSTEM_ACTOR: &str = "System";
const AUTOPLAY_ACTOR: &str = "System (autoplay)";

impl Coordinator {
    pub(crate) fn ensure_playlist_authority(
        &self,
        conn_id: &str,
        room_id: &str,
    ) -> Result<(), EventError> {
        if self.config.restrict_playlist_to_host {
            self.ensure_host(conn_id, room_id)
        } else {
            Ok(())
        }
    }

    pub(crate) fn playlist_add(
        &mut self,
        conn_id: &str,
        payload: PlaylistAddPayload,
    ) -> Result<(), EventError> {
        self.ensure_member(conn_id, &payload.room_id)?;
        self.ensure_playlist_authority(conn_id, &payload.room_id)?;

        let username = self
            .connections
            .get(conn_id)
            .map(|c| c.username.clone())
            .unwrap_or_default();
        let now = self.now();
        let Some(room) = self.rooms.get_mut(&payload.room_id) else {
            return Err(EventError::RoomNotFound(payload.room_id));
        };
        room.push_playlist_item(PlaylistItem {
            id: Uuid::new_v4().to_string(),
            url: payload.video_url,
            added_by: username,
            added_at: now,
        });
        self.broadcast_playlist(&payload.room_id);
        Ok(())
    }

    pub(crate) fn playlist_remove(
        &mut self,
        conn_id: &str,
        payload: PlaylistRemovePayload,
    ) -> Result<(), EventError> {
        self.ensure_member(conn_id, &payload.room_id)?;
        self.ensure_playlist_authority(conn_id, &payload.room_id)?;

        let Some(room) = self.rooms.get_mut(&payload.room_id) else {
            return Err(EventError::RoomNotFound(payload.room_id));
        };
        let removal = room.remove_playlist_item(&payload.video_id);
        let new_url = room.video_url.clone();
        match removal {
            PlaylistRemoval::NotFound => return Ok(()),
            PlaylistRemoval::CurrentChanged => {
                self.broadcast(
                    &payload.room_id,
                    &ServerEvent::VideoChanged {
                        video_url: new_url,
                        changed_by: SYSTEM_ACTOR.to_string(),
                    },
                );
            }
            PlaylistRemoval::Removed | PlaylistRemoval::Cleared => {}
        }
        self.broadcast_playlist(&payload.room_id);
        Ok(())
    }

    pub(crate) fn playlist_reorder(
        &mut self,
        conn_id: &str,
        payload: PlaylistReorderPayload,
    ) -> Result<(), EventError> {
        self.ensure_host(conn_id, &payload.room_id)?;

        let Some(room) = self.rooms.get_mut(&payload.room_id) else {
            return Err(EventError::RoomNotFound(payload.room_id));
        };
        // out-of-range indices are ignored, not raised
        if room.reorder_playlist(payload.from_index, payload.to_index) {
            self.broadcast_playlist(&payload.room_id);
        }
        Ok(())
    }

    pub(crate) fn playlist_next(&mut self, conn_id: &str, room_id: &str) -> Result<(), EventError> {
        self.step_playlist(conn_id, room_id, true)
    }

    pub(crate) fn playlist_previous(
        &mut self,
        conn_id: &str,
        room_id: &str,
    ) -> Result<(), EventError> {
        self.step_playlist(conn_id, room_id, false)
    }

    fn step_playlist(
        &mut self,
        conn_id: &str,
        room_id: &str,
        forward: bool,
    ) -> Result<(), EventError> {
        self.ensure_member(conn_id, room_id)?;
        self.ensure_playlist_authority(conn_id, room_id)?;

        let username = self
            .connections
            .get(conn_id)
            .map(|c| c.username.clone())
            .unwrap_or_default();
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Err(EventError::RoomNotFound(room_id.to_string()));
        };
        let moved = if forward {
            room.advance(false)
        } else {
            room.retreat()
        };
        if !moved {
            // already at the boundary
            return Ok(());
        }
        let video_url = room.video_url.clone();
        self.broadcast(
            room_id,
            &ServerEvent::VideoChanged {
                video_url,
                changed_by: username,
            },
        );
        Ok(())
    }

    /// Manual-advance report from a client whose player reached the end:
    /// move on and autoplay.
    pub(crate) fn video_ended(&mut self, conn_id: &str, room_id: &str) -> Result<(), EventError> {
        self.ensure_member(conn_id, room_id)?;

        let now = self.now();
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Err(EventError::RoomNotFound(room_id.to_string()));
        };
        if !room.advance(true) {
            return Ok(());
        }
        let video_url = room.video_url.clone();
        let volume = room.volume;
        self.broadcast(
            room_id,
            &ServerEvent::VideoChanged {
                video_url,
                changed_by: AUTOPLAY_ACTOR.to_string(),
            },
        );
        self.broadcast(
            room_id,
            &ServerEvent::VideoSync {
                action: VideoAction::Play,
                time: 0.0,
                is_playing: true,
                volume,
                timestamp: now,
            },
        );
        Ok(())
    }

    pub(crate) fn broadcast_playlist(&self, room_id: &str) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        self.broadcast(
            room_id,
            &ServerEvent::PlaylistUpdated {
                playlist: room.playlist.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use crate::{
        config::Config,
        protocol::{
            ClientEvent, PlaylistAddPayload, PlaylistRemovePayload, PlaylistReorderPayload,
            RoomRef, ServerEvent, VideoAction,
        },
        storage::MemoryStorage,
    };
    use std::sync::Arc;

    fn add(room_id: &str, url: &str) -> ClientEvent {
        ClientEvent::PlaylistAdd(PlaylistAddPayload {
            room_id: room_id.to_string(),
            video_url: url.to_string(),
        })
    }

    #[tokio::test]
    async fn any_member_may_add_and_everyone_sees_the_update() {
        let (mut coordinator, _clock) = coordinator();
        let mut host = connect(&mut coordinator);
        let room_id = create_room(&mut coordinator, &mut host, "alice", "");
        let mut member = connect(&mut coordinator);
        join_room(&mut coordinator, &mut member, &room_id, "bob", "");
        host.drain();
        member.drain();

        coordinator.handle(&member.id.clone(), add(&room_id, "https://v.example/1"));
        for peer in [&mut host, &mut member] {
            let ServerEvent::PlaylistUpdated { playlist } = peer.recv() else {
                panic!("expected playlist-updated");
            };
            assert_eq!(playlist.len(), 1);
            assert_eq!(playlist[0].added_by, "bob");
        }
        assert_eq!(coordinator.rooms()[&room_id].stats.total_videos, 1);
    }

    #[tokio::test]
    async fn removing_current_item_triggers_video_changed() {
        let (mut coordinator, _clock) = coordinator();
        let mut host = connect(&mut coordinator);
        let room_id = create_room(&mut coordinator, &mut host, "alice", "");
        coordinator.handle(&host.id.clone(), add(&room_id, "https://v.example/1"));
        coordinator.handle(&host.id.clone(), add(&room_id, "https://v.example/2"));
        // step to the second item so an earlier item can be removed
        for _ in 0..2 {
            coordinator.handle(
                &host.id.clone(),
                ClientEvent::PlaylistNext(RoomRef {
                    room_id: room_id.clone(),
                }),
            );
        }
        host.drain();
        assert_eq!(coordinator.rooms()[&room_id].current_index, 1);

        let current_id = coordinator.rooms()[&room_id].playlist[0].id.clone();
        coordinator.handle(
            &host.id.clone(),
            ClientEvent::PlaylistRemove(PlaylistRemovePayload {
                room_id: room_id.clone(),
                video_id: current_id,
            }),
        );
        // removed item sat before the current one: index shifts, no video change
        let events = host.drain();
        assert!(events
            .iter()
            .all(|e| !matches!(e, ServerEvent::VideoChanged { .. })));

        // now remove the current (and only) item
        let current_id = coordinator.rooms()[&room_id].playlist[0].id.clone();
        coordinator.handle(
            &host.id.clone(),
            ClientEvent::PlaylistRemove(PlaylistRemovePayload {
                room_id: room_id.clone(),
                video_id: current_id,
            }),
        );
        let events = host.drain();
        assert!(events
            .iter()
            .any(|e| matches!(e, ServerEvent::PlaylistUpdated { playlist } if playlist.is_empty())));
        let room = &coordinator.rooms()[&room_id];
        assert_eq!(room.current_index, -1);
        assert_eq!(room.video_url, "");
    }

    #[tokio::test]
    async fn reorder_is_rejected_for_non_hosts() {
        let (mut coordinator, _clock) = coordinator();
        let mut host = connect(&mut coordinator);
        let room_id = create_room(&mut coordinator, &mut host, "alice", "");
        coordinator.handle(&host.id.clone(), add(&room_id, "https://v.example/1"));
        coordinator.handle(&host.id.clone(), add(&room_id, "https://v.example/2"));
        let mut member = connect(&mut coordinator);
        join_room(&mut coordinator, &mut member, &room_id, "bob", "");
        host.drain();
        member.drain();

        coordinator.handle(
            &member.id.clone(),
            ClientEvent::PlaylistReorder(PlaylistReorderPayload {
                room_id: room_id.clone(),
                from_index: 0,
                to_index: 1,
            }),
        );
        // silently ignored: no reply, no reorder
        member.assert_silent();
        assert!(coordinator.rooms()[&room_id].playlist[0]
            .url
            .ends_with("/1"));

        coordinator.handle(
            &host.id.clone(),
            ClientEvent::PlaylistReorder(PlaylistReorderPayload {
                room_id: room_id.clone(),
                from_index: 0,
                to_index: 1,
            }),
        );
        assert!(coordinator.rooms()[&room_id].playlist[0]
            .url
            .ends_with("/2"));
    }

    #[tokio::test]
    async fn next_at_end_and_previous_at_start_are_noops() {
        let (mut coordinator, _clock) = coordinator();
        let mut host = connect(&mut coordinator);
        let room_id = create_room(&mut coordinator, &mut host, "alice", "");
        coordinator.handle(&host.id.clone(), add(&room_id, "https://v.example/1"));
        host.drain();

        // playlist has one item, index still -1; next selects it
        coordinator.handle(
            &host.id.clone(),
            ClientEvent::PlaylistNext(RoomRef {
                room_id: room_id.clone(),
            }),
        );
        assert_eq!(coordinator.rooms()[&room_id].current_index, 0);
        host.drain();

        coordinator.handle(
            &host.id.clone(),
            ClientEvent::PlaylistNext(RoomRef {
                room_id: room_id.clone(),
            }),
        );
        coordinator.handle(
            &host.id.clone(),
            ClientEvent::PlaylistPrevious(RoomRef {
                room_id: room_id.clone(),
            }),
        );
        host.assert_silent();
        assert_eq!(coordinator.rooms()[&room_id].current_index, 0);
    }

    /// Scenario: two items, first playing, the video ends; the room
    /// advances and autoplays the second item.
    #[tokio::test]
    async fn video_ended_advances_with_autoplay() {
        let (mut coordinator, _clock) = coordinator();
        let mut host = connect(&mut coordinator);
        let room_id = create_room(&mut coordinator, &mut host, "alice", "");
        coordinator.handle(&host.id.clone(), add(&room_id, "https://v.example/1"));
        coordinator.handle(&host.id.clone(), add(&room_id, "https://v.example/2"));
        coordinator.handle(
            &host.id.clone(),
            ClientEvent::PlaylistNext(RoomRef {
                room_id: room_id.clone(),
            }),
        );
        host.drain();

        coordinator.handle(
            &host.id.clone(),
            ClientEvent::VideoEnded(RoomRef {
                room_id: room_id.clone(),
            }),
        );

        let events = host.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::VideoChanged { video_url, .. } if video_url.ends_with("/2")
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::VideoSync {
                action: VideoAction::Play,
                time,
                is_playing: true,
                ..
            } if *time == 0.0
        )));
        let room = &coordinator.rooms()[&room_id];
        assert_eq!(room.current_index, 1);
        assert!(room.is_playing);
    }

    #[tokio::test]
    async fn video_ended_at_last_item_does_nothing() {
        let (mut coordinator, _clock) = coordinator();
        let mut host = connect(&mut coordinator);
        let room_id = create_room(&mut coordinator, &mut host, "alice", "");
        coordinator.handle(&host.id.clone(), add(&room_id, "https://v.example/1"));
        coordinator.handle(
            &host.id.clone(),
            ClientEvent::PlaylistNext(RoomRef {
                room_id: room_id.clone(),
            }),
        );
        host.drain();

        coordinator.handle(
            &host.id.clone(),
            ClientEvent::VideoEnded(RoomRef {
                room_id: room_id.clone(),
            }),
        );
        host.assert_silent();
        assert!(!coordinator.rooms()[&room_id].is_playing);
    }

    #[tokio::test]
    async fn host_gated_policy_rejects_member_adds() {
        let config = Config {
            restrict_playlist_to_host: true,
            ..Config::default()
        };
        let (mut coordinator, _clock) = coordinator_with(config, Arc::new(MemoryStorage));
        let mut host = connect(&mut coordinator);
        let room_id = create_room(&mut coordinator, &mut host, "alice", "");
        let mut member = connect(&mut coordinator);
        join_room(&mut coordinator, &mut member, &room_id, "bob", "");
        host.drain();
        member.drain();

        coordinator.handle(&member.id.clone(), add(&room_id, "https://v.example/1"));
        member.assert_silent();
        assert!(coordinator.rooms()[&room_id].playlist.is_empty());

        coordinator.handle(&host.id.clone(), add(&room_id, "https://v.example/1"));
        assert_eq!(coordinator.rooms()[&room_id].playlist.len(), 1);
    }
}
