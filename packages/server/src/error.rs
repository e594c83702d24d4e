//! Event-level error taxonomy.
//!
//! Every variant is terminal for a single event only: it becomes a scoped
//! error reply to the originating connection and causes zero state
//! mutation. Nothing here is ever fatal to the process.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Room id must not be empty")]
    EmptyRoomId,

    #[error("Room \"{0}\" not found")]
    RoomNotFound(String),

    #[error("Wrong room password")]
    BadPassword,

    #[error("Only the {0} may perform this operation")]
    Unauthorized(&'static str),

    #[error("User is not in the room")]
    UserNotInRoom,

    #[error("Connection is not registered")]
    NotConnected,

    #[error("You are muted in this room")]
    Muted,
}
