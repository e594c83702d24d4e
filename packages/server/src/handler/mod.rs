//! Transport-facing handlers: the WebSocket endpoint and the HTTP API.

pub mod http;
pub mod websocket;

pub use http::{get_admin_stats, get_rooms, get_user, health_check};
pub use websocket::websocket_handler;
