//! Wire protocol for the WebSocket endpoint.
//!
//! Every frame is a JSON envelope `{"event": "<name>", "data": {...}}`,
//! modeled as two tagged enums: [`ClientEvent`] for inbound frames and
//! [`ServerEvent`] for outbound ones. Payloads are validated here, at the
//! transport boundary, before any coordinator code sees them; frames that
//! do not deserialize are dropped without touching room state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{PlaylistItem, Role, UserHistoryEntry, UserStats};

/// Inbound events, one variant per client-emitted event name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    CreateRoom(CreateRoomPayload),
    JoinRoom(JoinRoomPayload),
    ChangeVideo(ChangeVideoPayload),
    VideoControl(VideoControlPayload),
    PlaylistAdd(PlaylistAddPayload),
    PlaylistRemove(PlaylistRemovePayload),
    PlaylistReorder(PlaylistReorderPayload),
    PlaylistNext(RoomRef),
    PlaylistPrevious(RoomRef),
    VideoEnded(RoomRef),
    UpdateRoom(UpdateRoomPayload),
    UpdateUser(UpdateUserPayload),
    ChatMessage(ChatMessagePayload),
    KickUser(TargetUserPayload),
    ToggleMuteUser(TargetUserPayload),
    TransferHost(TransferHostPayload),
    DeleteRoom(RoomRef),
    ScreenShareOffer(ScreenShareOfferPayload),
    ScreenShareAnswer(ScreenShareAnswerPayload),
    ScreenShareIceCandidate(ScreenShareIcePayload),
    ScreenShareEnd(RoomRef),
    GetUserProfile(UsernameRef),
    AdminGetRooms,
    AdminGetUsers,
    AdminGetStats,
    AdminDeleteRoom(RoomRef),
    AdminBanUser(BanUserPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeVideoPayload {
    pub room_id: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub add_to_playlist: bool,
}

/// Playback-control actions carried by `video-control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoAction {
    Play,
    Pause,
    Seek,
    TimeUpdate,
    Volume,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoControlPayload {
    pub room_id: String,
    pub action: VideoAction,
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistAddPayload {
    pub room_id: String,
    pub video_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRemovePayload {
    pub room_id: String,
    pub video_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistReorderPayload {
    pub room_id: String,
    pub from_index: usize,
    pub to_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameRef {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomPayload {
    pub room_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_users: Option<u32>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    pub avatar: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetUserPayload {
    pub room_id: String,
    pub target_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferHostPayload {
    pub room_id: String,
    pub new_host_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenShareOfferPayload {
    pub room_id: String,
    pub offer: Value,
    #[serde(default)]
    pub target_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenShareAnswerPayload {
    pub room_id: String,
    pub answer: Value,
    #[serde(default)]
    pub target_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenShareIcePayload {
    pub room_id: String,
    pub candidate: Value,
    #[serde(default)]
    pub target_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanUserPayload {
    pub target_username: String,
}

/// One entry of the roster included in membership broadcasts and snapshots.
///
/// `is_host` is derived from the room's host pointer at serialization time;
/// it is never stored on the connection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    pub id: String,
    pub username: String,
    pub is_host: bool,
    pub avatar: String,
    pub color: String,
    pub status: String,
    pub role: Role,
}

/// Full canonical snapshot sent to a connection right after it joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateSnapshot {
    pub video_url: String,
    pub is_playing: bool,
    pub current_time: f64,
    pub host_id: String,
    pub volume: f64,
    pub users: Vec<RoomUser>,
    pub is_muted: bool,
    pub has_password: bool,
    pub playlist: Vec<PlaylistItem>,
    pub current_playlist_index: i64,
    pub room_name: String,
    pub room_description: String,
    pub max_users: u32,
    pub category: String,
    pub tags: Vec<String>,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBroadcast {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub avatar: String,
    pub color: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    UserJoined,
    VideoChanged,
    NewMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileDto {
    pub username: String,
    pub avatar: String,
    pub color: String,
    pub status: String,
    pub role: Role,
    pub stats: UserStats,
    pub history: Vec<UserHistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRoomDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub host_id: String,
    pub host_username: String,
    pub user_count: usize,
    pub max_users: u32,
    pub is_public: bool,
    pub category: String,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub stats: crate::domain::RoomStats,
    pub has_password: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserDto {
    pub id: String,
    pub username: String,
    pub avatar: String,
    pub color: String,
    pub status: String,
    pub role: Role,
    pub room_id: Option<String>,
    pub is_host: bool,
    pub stats: UserStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsDto {
    pub total_rooms: usize,
    pub total_users: usize,
    pub total_messages: u64,
    pub total_videos: u64,
    pub total_views: u64,
    pub public_rooms: usize,
    pub active_rooms: usize,
}

/// Outbound events, one variant per server-emitted event name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    RoomCreated {
        room_id: String,
    },
    RoomState(RoomStateSnapshot),
    UserJoined {
        user_id: String,
        username: String,
        users: Vec<RoomUser>,
        host_id: String,
    },
    UserLeft {
        user_id: String,
        username: String,
        users: Vec<RoomUser>,
        host_id: String,
    },
    UserUpdated {
        user_id: String,
        avatar: String,
        status: String,
    },
    Notification {
        #[serde(rename = "type")]
        kind: NotificationKind,
        message: String,
    },
    VideoChanged {
        video_url: String,
        changed_by: String,
    },
    VideoSync {
        action: VideoAction,
        time: f64,
        is_playing: bool,
        volume: f64,
        timestamp: i64,
    },
    PlaylistUpdated {
        playlist: Vec<PlaylistItem>,
    },
    RoomUpdated {
        name: String,
        description: String,
        max_users: u32,
        category: String,
        tags: Vec<String>,
        is_public: bool,
    },
    ChatMessage(ChatBroadcast),
    MuteStatus {
        is_muted: bool,
    },
    UserMuted {
        user_id: String,
        is_muted: bool,
    },
    HostTransferred {
        new_host_id: String,
        users: Vec<RoomUser>,
    },
    RoomDeleted {
        message: String,
    },
    Kicked {
        message: String,
    },
    Banned {
        message: String,
    },
    ScreenShareOffer {
        offer: Value,
        from_user_id: String,
    },
    ScreenShareAnswer {
        answer: Value,
        from_user_id: String,
    },
    ScreenShareIceCandidate {
        candidate: Value,
        from_user_id: String,
    },
    ScreenShareEnd {
        from_user_id: String,
    },
    UserProfile(UserProfileDto),
    AdminRooms(Vec<AdminRoomDto>),
    AdminUsers(Vec<AdminUserDto>),
    AdminStats(AdminStatsDto),
    AdminRoomDeleted {
        room_id: String,
    },
    AdminUserBanned {
        username: String,
    },
    RoomError {
        message: String,
    },
    ChatError {
        message: String,
    },
    Error {
        message: String,
    },
    AdminError {
        message: String,
    },
    UserProfileError {
        message: String,
    },
}

impl ServerEvent {
    /// Serialize for the wire.
    ///
    /// Outbound events are plain data built by the coordinator, so
    /// serialization cannot fail in practice.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("server events always serialize")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_join_room_envelope() {
        let frame = r#"{"event":"join-room","data":{"roomId":"AB12CD34","username":"alice","password":"abc"}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom(JoinRoomPayload {
                room_id: "AB12CD34".to_string(),
                username: "alice".to_string(),
                password: "abc".to_string(),
            })
        );
    }

    #[test]
    fn deserializes_video_control_with_optional_fields() {
        let frame = r#"{"event":"video-control","data":{"roomId":"R1","action":"seek","time":120.0}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        let ClientEvent::VideoControl(payload) = event else {
            panic!("expected video-control");
        };
        assert_eq!(payload.action, VideoAction::Seek);
        assert_eq!(payload.time, Some(120.0));
        assert_eq!(payload.volume, None);
    }

    #[test]
    fn deserializes_dataless_admin_event() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"admin-get-stats"}"#).unwrap();
        assert_eq!(event, ClientEvent::AdminGetStats);
    }

    #[test]
    fn rejects_unknown_event_name() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"no-such-event"}"#).is_err());
    }

    #[test]
    fn rejects_malformed_payload() {
        // from_index must be a number; the frame must fail closed
        let frame = r#"{"event":"playlist-reorder","data":{"roomId":"R1","fromIndex":"x","toIndex":1}}"#;
        assert!(serde_json::from_str::<ClientEvent>(frame).is_err());
    }

    #[test]
    fn serializes_video_sync_with_camel_case_fields() {
        let event = ServerEvent::VideoSync {
            action: VideoAction::Seek,
            time: 120.0,
            is_playing: false,
            volume: 1.0,
            timestamp: 42,
        };
        let json: serde_json::Value = serde_json::from_str(&event.encode()).unwrap();
        assert_eq!(json["event"], "video-sync");
        assert_eq!(json["data"]["isPlaying"], false);
        assert_eq!(json["data"]["time"], 120.0);
    }

    #[test]
    fn serializes_notification_type_field() {
        let event = ServerEvent::Notification {
            kind: NotificationKind::NewMessage,
            message: "alice: hi".to_string(),
        };
        let json: serde_json::Value = serde_json::from_str(&event.encode()).unwrap();
        assert_eq!(json["data"]["type"], "new-message");
    }
}
