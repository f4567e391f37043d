use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header::CACHE_CONTROL},
    response::Redirect,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use oauth2_bridge::{AuthBridge, AuthResponse, BridgeTokenResponse};

use super::error::IntoResponseError;

pub(super) fn router() -> Router<Arc<AuthBridge>> {
    Router::new()
        .route("/oauth2/login", get(login))
        .route("/oauth2/authorized", get(authorized))
        .route("/bridge-token", get(bridge_token))
}

#[derive(Debug, Deserialize)]
struct LoginParams {
    return_to: Option<String>,
}

async fn login(
    State(bridge): State<Arc<AuthBridge>>,
    Query(params): Query<LoginParams>,
) -> Result<(HeaderMap, Redirect), (StatusCode, String)> {
    let (auth_url, headers) = bridge
        .start_login(params.return_to.as_deref())
        .into_response_error()?;

    Ok((headers, Redirect::to(&auth_url)))
}

/// Provider redirect target. Never fails: every outcome is a redirect.
async fn authorized(
    State(bridge): State<Arc<AuthBridge>>,
    query: Result<Query<AuthResponse>, QueryRejection>,
    headers: HeaderMap,
) -> (HeaderMap, Redirect) {
    let params = match query {
        Ok(Query(params)) => params,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable callback query");
            AuthResponse::default()
        }
    };

    let (headers, location) = bridge.authorized(&params, &headers).await;
    (headers, Redirect::to(&location))
}

/// Delete-on-read exchange of the bridging token. Query parameters are ignored.
async fn bridge_token(
    State(bridge): State<Arc<AuthBridge>>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<BridgeTokenResponse>), (StatusCode, String)> {
    let (mut headers, token) = bridge.take_bridge_token(&headers).into_response_error()?;
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok((headers, Json(BridgeTokenResponse { token })))
}
