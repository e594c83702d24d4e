//! Shared utilities for the Kotatsu watch-party server.
//!
//! Holds the pieces that are independent of the coordinator itself:
//! time handling (with a clock abstraction for deterministic tests) and
//! the tracing setup used by every binary.

pub mod logger;
pub mod time;
