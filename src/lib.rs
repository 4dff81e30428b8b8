use std::sync::Arc;

pub mod config;
pub mod logging;
pub mod middleware;
pub mod routes;

use logging::LogSink;
use middleware::logging::EndpointWhitelist;

/// Shared application state. Read-only after startup; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub whitelist: Arc<EndpointWhitelist>,
    pub sink: Arc<dyn LogSink>,
}
