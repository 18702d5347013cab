//! Application state shared across routes

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::lobby::{MatchResult, RoomRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<RoomRegistry>,
}

impl AppState {
    /// Finished matches are pushed onto `results_tx`
    pub fn new(config: Config, results_tx: mpsc::Sender<MatchResult>) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(RoomRegistry::new(config.rooms.clone(), results_tx));

        Self { config, registry }
    }
}
