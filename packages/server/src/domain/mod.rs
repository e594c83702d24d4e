//! Domain model of the session coordinator.
//!
//! The [`Room`] aggregate carries all canonical per-room state; connection
//! records and per-username statistics live beside it. Everything here is
//! plain data plus synchronous mutation logic so it can be unit tested
//! without a runtime.

mod connection;
mod room;
mod stats;

pub use connection::{Connection, Role, generate_user_color};
pub use room::{PlaylistItem, PlaylistRemoval, Room, RoomStats};
pub use stats::{UserHistoryEntry, UserStats};
