use crate::config::Config;
use crate::session::AttendanceSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Service configuration (models, storage path, export dir)
    pub config: Arc<Config>,

    /// Active attendance sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<AttendanceSession>>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
