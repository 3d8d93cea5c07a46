use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use vigia_storage::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub start_time: DateTime<Utc>,
    pub jwt_secret: Arc<String>,
    pub token_expire_secs: u64,
    pub config: Arc<ServerConfig>,
}
