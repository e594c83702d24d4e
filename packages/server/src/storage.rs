//! Write-only persistence hooks.
//!
//! The coordinator never reads through these: they are fire-and-forget
//! observers invoked after the corresponding broadcast, so a slow or
//! failing backend can never affect live session state. External database
//! adapters implement [`StorageHook`]; the default is a no-op.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StorageProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageHook: Send + Sync {
    async fn room_created(&self, room_id: String, host_username: String);
    async fn room_deleted(&self, room_id: String);
    async fn chat_message(&self, room_id: String, username: String, message: String);
    async fn user_seen(&self, username: String, at_millis: i64);
}

/// In-memory provider: session state already lives in the coordinator, so
/// there is nothing to write.
pub struct MemoryStorage;

#[async_trait]
impl StorageHook for MemoryStorage {
    async fn room_created(&self, room_id: String, host_username: String) {
        tracing::debug!("storage: room '{}' created by '{}'", room_id, host_username);
    }

    async fn room_deleted(&self, room_id: String) {
        tracing::debug!("storage: room '{}' deleted", room_id);
    }

    async fn chat_message(&self, room_id: String, username: String, _message: String) {
        tracing::debug!("storage: chat message in '{}' from '{}'", room_id, username);
    }

    async fn user_seen(&self, username: String, at_millis: i64) {
        tracing::debug!("storage: user '{}' seen at {}", username, at_millis);
    }
}

pub fn build_storage(provider: StorageProvider) -> Arc<dyn StorageHook> {
    match provider {
        StorageProvider::Memory => Arc::new(MemoryStorage),
    }
}
