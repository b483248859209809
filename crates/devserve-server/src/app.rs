//! Router construction.
//!
//! Builds the file server router and the live reload router. They are bound
//! to separate ports.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::live_reload::{self, BroadcastHub};
use crate::middleware::headers;
use crate::state::AppState;
use crate::static_files;

/// Path of the live reload WebSocket endpoint.
pub(crate) const RELOAD_PATH: &str = "/";

/// Create the file server router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    static_files::static_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(headers::no_cache_layer())
                .layer(headers::content_type_options_layer()),
        )
        .with_state(state)
}

/// Create the live reload router.
pub(crate) fn create_reload_router(hub: Arc<BroadcastHub>) -> Router {
    Router::new()
        .route(RELOAD_PATH, get(live_reload::ws_handler))
        .with_state(hub)
}
