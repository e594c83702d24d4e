//! Room aggregate: canonical playback state, membership, playlist.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::protocol::VideoAction;

/// One entry of a room's playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub id: String,
    pub url: String,
    pub added_by: String,
    pub added_at: i64,
}

/// Per-room counters, reported through the admin surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub total_views: u64,
    pub total_messages: u64,
    pub total_videos: u64,
}

/// Effect of removing a playlist item, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistRemoval {
    /// No item with that id; nothing changed.
    NotFound,
    /// Item removed; the currently-playing item is unaffected.
    Removed,
    /// The removed item was the current one and playback moved to another
    /// item; a `video-changed` broadcast is due.
    CurrentChanged,
    /// The removed item was the last one; the room has no video any more.
    Cleared,
}

/// The unit of a shared viewing session.
///
/// Invariants upheld by the mutation methods:
/// - `host_id` is a member whenever `members` is non-empty
/// - `muted_users` is a subset of `members`
/// - `current_index` stays within `[-1, playlist.len() - 1]`
/// - `current_time >= 0` and `volume` within `[0, 1]`
///
/// `members` keeps join order; the front of the list is the promotion
/// candidate when the host disconnects without transferring.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub host_id: String,
    pub password: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    /// 0 = unlimited
    pub max_users: u32,
    pub is_public: bool,
    pub created_at: i64,
    pub video_url: String,
    pub is_playing: bool,
    pub current_time: f64,
    pub volume: f64,
    /// Timestamp of the last accepted non-volume playback mutation.
    pub last_update: i64,
    pub members: Vec<String>,
    pub muted_users: HashSet<String>,
    pub playlist: Vec<PlaylistItem>,
    /// Index of the currently-playing playlist item, -1 when none.
    pub current_index: i64,
    pub stats: RoomStats,
}

impl Room {
    pub fn new(id: String, host_id: String, password: String, now: i64) -> Self {
        Self {
            id,
            host_id: host_id.clone(),
            password,
            name: String::new(),
            description: String::new(),
            category: String::new(),
            tags: Vec::new(),
            max_users: 0,
            is_public: false,
            created_at: now,
            video_url: String::new(),
            is_playing: false,
            current_time: 0.0,
            volume: 1.0,
            last_update: now,
            members: vec![host_id],
            muted_users: HashSet::new(),
            playlist: Vec::new(),
            current_index: -1,
            stats: RoomStats::default(),
        }
    }

    pub fn is_host(&self, connection_id: &str) -> bool {
        self.host_id == connection_id
    }

    pub fn is_member(&self, connection_id: &str) -> bool {
        self.members.iter().any(|id| id == connection_id)
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn add_member(&mut self, connection_id: String) {
        if !self.is_member(&connection_id) {
            self.members.push(connection_id);
        }
    }

    pub fn remove_member(&mut self, connection_id: &str) {
        self.members.retain(|id| id != connection_id);
        self.muted_users.remove(connection_id);
    }

    /// Apply a playback-control intent to the canonical state.
    ///
    /// Non-volume actions are coalesced: if less than `window_ms` elapsed
    /// since the last accepted mutation the intent is dropped and `false`
    /// is returned (no broadcast is due). Volume bypasses the window
    /// entirely. Intents missing their required field are invalid input
    /// and are dropped without touching `last_update`.
    pub fn apply_control(
        &mut self,
        action: VideoAction,
        time: Option<f64>,
        volume: Option<f64>,
        now: i64,
        window_ms: i64,
    ) -> bool {
        match action {
            VideoAction::Volume => {
                let Some(v) = volume else { return false };
                self.volume = v.clamp(0.0, 1.0);
                true
            }
            VideoAction::Seek | VideoAction::TimeUpdate if time.is_none() => false,
            _ => {
                if now - self.last_update < window_ms {
                    return false;
                }
                self.last_update = now;
                match action {
                    VideoAction::Play => {
                        self.is_playing = true;
                        if let Some(t) = time {
                            self.current_time = t.max(0.0);
                        }
                    }
                    VideoAction::Pause => {
                        self.is_playing = false;
                        if let Some(t) = time {
                            self.current_time = t.max(0.0);
                        }
                    }
                    // Seek preserves the playing state
                    VideoAction::Seek | VideoAction::TimeUpdate => {
                        self.current_time = time.unwrap_or(0.0).max(0.0);
                    }
                    VideoAction::Volume => unreachable!("handled above"),
                }
                true
            }
        }
    }

    /// Current playlist item's url, if any.
    pub fn current_url(&self) -> Option<&str> {
        usize::try_from(self.current_index)
            .ok()
            .and_then(|i| self.playlist.get(i))
            .map(|item| item.url.as_str())
    }

    pub fn push_playlist_item(&mut self, item: PlaylistItem) {
        self.playlist.push(item);
        self.stats.total_videos += 1;
    }

    /// Remove a playlist item by id, keeping `current_index` pointing at
    /// the same logical item where possible.
    pub fn remove_playlist_item(&mut self, video_id: &str) -> PlaylistRemoval {
        let Some(index) = self.playlist.iter().position(|item| item.id == video_id) else {
            return PlaylistRemoval::NotFound;
        };
        self.playlist.remove(index);

        let index = index as i64;
        if self.current_index == index {
            if self.playlist.is_empty() {
                self.current_index = -1;
                self.video_url.clear();
                return PlaylistRemoval::Cleared;
            }
            // advance to the nearest still-valid index
            self.current_index = index.min(self.playlist.len() as i64 - 1);
            self.load_current(false);
            return PlaylistRemoval::CurrentChanged;
        }
        if self.current_index > index {
            self.current_index -= 1;
        }
        PlaylistRemoval::Removed
    }

    /// Host-only move of one item. Only the two swapped positions update
    /// `current_index`; items in between keep their index.
    pub fn reorder_playlist(&mut self, from_index: usize, to_index: usize) -> bool {
        if from_index >= self.playlist.len() || to_index >= self.playlist.len() {
            return false;
        }
        let moved = self.playlist.remove(from_index);
        self.playlist.insert(to_index, moved);

        if self.current_index == from_index as i64 {
            self.current_index = to_index as i64;
        } else if self.current_index == to_index as i64 {
            self.current_index = from_index as i64;
        }
        true
    }

    /// Advance to the next playlist item. No-op at the last item.
    pub fn advance(&mut self, autoplay: bool) -> bool {
        if self.playlist.is_empty() || self.current_index >= self.playlist.len() as i64 - 1 {
            return false;
        }
        self.current_index += 1;
        self.load_current(autoplay);
        true
    }

    /// Retreat to the previous playlist item. No-op at index 0 (or below).
    pub fn retreat(&mut self) -> bool {
        if self.playlist.is_empty() || self.current_index <= 0 {
            return false;
        }
        self.current_index -= 1;
        self.load_current(false);
        true
    }

    fn load_current(&mut self, autoplay: bool) {
        if let Some(url) = self.current_url() {
            self.video_url = url.to_string();
        }
        self.current_time = 0.0;
        self.is_playing = autoplay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: i64 = 50;

    fn room() -> Room {
        Room::new("R1".to_string(), "host".to_string(), String::new(), 1_000)
    }

    fn item(id: &str) -> PlaylistItem {
        PlaylistItem {
            id: id.to_string(),
            url: format!("https://videos.example/{id}"),
            added_by: "alice".to_string(),
            added_at: 1_000,
        }
    }

    fn room_with_playlist(ids: &[&str], current: i64) -> Room {
        let mut r = room();
        for id in ids {
            r.push_playlist_item(item(id));
        }
        r.current_index = current;
        if let Some(url) = r.current_url() {
            r.video_url = url.to_string();
        }
        r
    }

    #[test]
    fn control_within_window_is_dropped() {
        let mut r = room();
        assert!(r.apply_control(VideoAction::Play, Some(10.0), None, 1_100, WINDOW));
        // 49ms later: dropped, state unchanged
        assert!(!r.apply_control(VideoAction::Pause, Some(20.0), None, 1_149, WINDOW));
        assert!(r.is_playing);
        assert_eq!(r.current_time, 10.0);
        // 50ms later: accepted
        assert!(r.apply_control(VideoAction::Pause, Some(20.0), None, 1_150, WINDOW));
        assert!(!r.is_playing);
        assert_eq!(r.current_time, 20.0);
    }

    #[test]
    fn volume_bypasses_window_and_clamps() {
        let mut r = room();
        assert!(r.apply_control(VideoAction::Play, None, None, 1_100, WINDOW));
        // immediately afterwards, volume still applies
        assert!(r.apply_control(VideoAction::Volume, None, Some(1.7), 1_101, WINDOW));
        assert_eq!(r.volume, 1.0);
        assert!(r.apply_control(VideoAction::Volume, None, Some(-0.3), 1_102, WINDOW));
        assert_eq!(r.volume, 0.0);
        // volume does not consume the window
        assert!(!r.apply_control(VideoAction::Seek, Some(5.0), None, 1_120, WINDOW));
    }

    #[test]
    fn volume_without_value_is_rejected() {
        let mut r = room();
        assert!(!r.apply_control(VideoAction::Volume, None, None, 1_100, WINDOW));
        assert_eq!(r.volume, 1.0);
    }

    #[test]
    fn seek_without_time_does_not_consume_window() {
        let mut r = room();
        assert!(!r.apply_control(VideoAction::Seek, None, None, 1_100, WINDOW));
        assert_eq!(r.last_update, 1_000);
        assert!(r.apply_control(VideoAction::Seek, Some(120.0), None, 1_101, WINDOW));
        assert_eq!(r.current_time, 120.0);
    }

    #[test]
    fn seek_preserves_playing_state_and_clamps_negative_time() {
        let mut r = room();
        r.is_playing = true;
        assert!(r.apply_control(VideoAction::Seek, Some(-5.0), None, 1_100, WINDOW));
        assert!(r.is_playing);
        assert_eq!(r.current_time, 0.0);
    }

    #[test]
    fn remove_current_item_advances_to_nearest() {
        let mut r = room_with_playlist(&["a", "b", "c"], 1);
        assert_eq!(r.remove_playlist_item("b"), PlaylistRemoval::CurrentChanged);
        assert_eq!(r.current_index, 1);
        assert_eq!(r.video_url, "https://videos.example/c");
        assert!(!r.is_playing);
        assert_eq!(r.current_time, 0.0);
    }

    #[test]
    fn remove_last_current_item_clamps_backwards() {
        let mut r = room_with_playlist(&["a", "b"], 1);
        assert_eq!(r.remove_playlist_item("b"), PlaylistRemoval::CurrentChanged);
        assert_eq!(r.current_index, 0);
        assert_eq!(r.video_url, "https://videos.example/a");
    }

    #[test]
    fn remove_only_item_clears_video() {
        let mut r = room_with_playlist(&["a"], 0);
        assert_eq!(r.remove_playlist_item("a"), PlaylistRemoval::Cleared);
        assert_eq!(r.current_index, -1);
        assert_eq!(r.video_url, "");
    }

    #[test]
    fn remove_before_current_shifts_index() {
        let mut r = room_with_playlist(&["a", "b", "c"], 2);
        assert_eq!(r.remove_playlist_item("a"), PlaylistRemoval::Removed);
        assert_eq!(r.current_index, 1);
        assert_eq!(r.current_url(), Some("https://videos.example/c"));
    }

    #[test]
    fn remove_unknown_item_is_noop() {
        let mut r = room_with_playlist(&["a"], 0);
        assert_eq!(r.remove_playlist_item("zzz"), PlaylistRemoval::NotFound);
        assert_eq!(r.playlist.len(), 1);
    }

    #[test]
    fn reorder_swaps_current_index_exactly() {
        let mut r = room_with_playlist(&["a", "b", "c"], 0);
        assert!(r.reorder_playlist(0, 2));
        assert_eq!(r.current_index, 2);
        assert_eq!(r.playlist[2].id, "a");

        // moving some other pair around the current item leaves it alone
        let mut r = room_with_playlist(&["a", "b", "c", "d"], 1);
        assert!(r.reorder_playlist(3, 0));
        assert_eq!(r.current_index, 1);
    }

    #[test]
    fn reorder_out_of_bounds_is_noop() {
        let mut r = room_with_playlist(&["a", "b"], 0);
        assert!(!r.reorder_playlist(0, 5));
        assert_eq!(r.playlist[0].id, "a");
    }

    #[test]
    fn advance_stops_at_last_item() {
        let mut r = room_with_playlist(&["a", "b"], 1);
        assert!(!r.advance(false));
        assert_eq!(r.current_index, 1);
    }

    #[test]
    fn retreat_stops_at_first_item() {
        let mut r = room_with_playlist(&["a", "b"], 0);
        assert!(!r.retreat());
        assert_eq!(r.current_index, 0);
    }

    #[test]
    fn advance_with_autoplay_starts_playback() {
        let mut r = room_with_playlist(&["a", "b"], 0);
        r.current_time = 42.0;
        assert!(r.advance(true));
        assert_eq!(r.current_index, 1);
        assert!(r.is_playing);
        assert_eq!(r.current_time, 0.0);
        assert_eq!(r.video_url, "https://videos.example/b");
    }

    #[test]
    fn remove_member_also_unmutes() {
        let mut r = room();
        r.add_member("m1".to_string());
        r.muted_users.insert("m1".to_string());
        r.remove_member("m1");
        assert!(!r.is_member("m1"));
        assert!(r.muted_users.is_empty());
    }
}
