// Application state for HTTP handlers
use crate::application::bridge_service::BridgeService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<BridgeService>,
}
