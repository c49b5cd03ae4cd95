use std::sync::Arc;

use crate::config::Config;
use crate::store::JobStore;

/// Shared application state injected into all route handlers via Axum
/// extractors. The store is the only shared mutable resource; handlers
/// never touch Redis directly.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub config: Config,
}
