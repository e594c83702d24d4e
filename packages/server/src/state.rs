//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use kotatsu_shared::time::SystemClock;

use crate::{config::Config, coordinator::Coordinator, storage::build_storage};

/// State handed to every handler.
///
/// The coordinator sits behind one mutex: each inbound event is processed
/// to completion under the lock, and since outbound delivery only queues
/// onto unbounded channels, nothing holds the lock across an await point.
pub struct AppState {
    pub config: Arc<Config>,
    pub coordinator: Mutex<Coordinator>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let storage = build_storage(config.storage_provider);
        let coordinator = Mutex::new(Coordinator::new(
            config.clone(),
            Arc::new(SystemClock),
            storage,
        ));
        Self {
            config,
            coordinator,
        }
    }
}
