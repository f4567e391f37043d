//! Router for the bridge endpoints

use axum::{Router, body::Body, http::Request};
use std::sync::Arc;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use oauth2_bridge::AuthBridge;

/// Create a router exposing the bridge endpoints under the configured route prefix
///
/// Spans record the method and path only. The callback query carries the
/// authorization code and state, and the requests carry the ephemeral cookies.
pub fn bridge_router(bridge: Arc<AuthBridge>) -> Router {
    bridge_router_no_trace(bridge).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            })
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`bridge_router`] without the HTTP tracing middleware.
pub fn bridge_router_no_trace(bridge: Arc<AuthBridge>) -> Router {
    let prefix = bridge.config().route_prefix().to_string();
    let routes = super::oauth2::router();

    let router = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&prefix, routes)
    };
    router.with_state(bridge)
}
