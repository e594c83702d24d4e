//! Session coordinator for synchronized watch-party rooms.
//!
//! Clients connect over WebSocket and exchange JSON event envelopes; the
//! coordinator keeps the canonical playback state per room and fans
//! updates out to every member. A small HTTP API exposes the public room
//! directory.

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod runner;
pub mod signal;
pub mod state;
pub mod storage;
