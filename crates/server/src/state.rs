use remuxq_core::{Config, Engine, QueueManager};
use std::sync::Arc;

use crate::api::WsBroadcaster;

/// Engine handle shared by the queue; boxed so tests can swap in a mock.
pub type SharedEngine = Arc<dyn Engine>;

/// Shared application state
pub struct AppState {
    config: Config,
    queue: QueueManager<SharedEngine>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    /// Creates the state and a queue publishing to `ws_broadcaster`.
    pub fn new(config: Config, engine: SharedEngine, ws_broadcaster: WsBroadcaster) -> Self {
        let queue = QueueManager::new(
            config.queue.clone(),
            engine,
            Arc::new(ws_broadcaster.clone()),
        );

        Self {
            config,
            queue,
            ws_broadcaster,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &QueueManager<SharedEngine> {
        &self.queue
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
