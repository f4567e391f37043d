use askama::Template;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use oauth2_bridge::LocalUser;
use oauth2_bridge_axum::AuthBridge;

#[derive(Template)]
#[template(path = "index.j2")]
struct IndexTemplate<'a> {
    login_url: &'a str,
}

#[derive(Template)]
#[template(path = "complete.j2")]
struct CompleteTemplate<'a> {
    bridge_token_url: &'a str,
    redirect: &'a str,
}

#[derive(Template)]
#[template(path = "signin.j2")]
struct SigninTemplate<'a> {
    message: &'a str,
    login_url: &'a str,
}

fn render(template: impl Template) -> Result<Html<String>, (StatusCode, String)> {
    template
        .render()
        .map(Html)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

fn login_url(bridge: &AuthBridge) -> String {
    format!("{}/oauth2/login", bridge.config().route_prefix())
}

pub(crate) async fn index(
    State(bridge): State<Arc<AuthBridge>>,
) -> Result<Html<String>, (StatusCode, String)> {
    render(IndexTemplate {
        login_url: &login_url(&bridge),
    })
}

#[derive(Deserialize)]
pub(crate) struct CompleteParams {
    redirect: Option<String>,
}

/// Landing page: the script on it trades the bridging token for a session.
pub(crate) async fn complete(
    State(bridge): State<Arc<AuthBridge>>,
    Query(params): Query<CompleteParams>,
) -> Result<Html<String>, (StatusCode, String)> {
    // Only same-site paths; the bridge already sanitized what it sends here
    let redirect = params
        .redirect
        .filter(|r| r.starts_with('/') && !r.starts_with("//"))
        .unwrap_or_else(|| "/".to_string());
    render(CompleteTemplate {
        bridge_token_url: &format!("{}/bridge-token", bridge.config().route_prefix()),
        redirect: &redirect,
    })
}

#[derive(Deserialize)]
pub(crate) struct SigninParams {
    error: Option<String>,
}

fn error_message(code: Option<&str>) -> &'static str {
    match code {
        None => "Sign in to continue.",
        Some("invalid_state") => "The sign-in request could not be verified. Please try again.",
        Some("session_expired") => "The sign-in attempt took too long. Please try again.",
        Some("access_denied") => "Sign-in was cancelled at the provider.",
        Some("provider_error") => "The identity provider could not complete the sign-in.",
        Some("profile_incomplete") => {
            "Your provider account did not share the profile details this site needs, \
             such as an email address. Update them at the provider or contact support."
        }
        Some("account_error") => {
            "Your account could not be loaded. Please try again or contact support."
        }
        Some(_) => "Something went wrong while signing in.",
    }
}

pub(crate) async fn signin(
    State(bridge): State<Arc<AuthBridge>>,
    Query(params): Query<SigninParams>,
) -> Result<Html<String>, (StatusCode, String)> {
    render(SigninTemplate {
        message: error_message(params.error.as_deref()),
        login_url: &login_url(&bridge),
    })
}

#[derive(Deserialize)]
pub(crate) struct SessionRequest {
    token: String,
}

#[derive(Serialize)]
pub(crate) struct SessionResponse {
    user: LocalUser,
    provider: String,
}

/// Stands in for the first-party session provider: accepts a bridging token
/// and reports who it belongs to.
pub(crate) async fn session(
    State(bridge): State<Arc<AuthBridge>>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    let claims = bridge.verify_bridging_token(&request.token).map_err(|e| {
        tracing::info!(error = %e, "Bridging token rejected");
        (StatusCode::UNAUTHORIZED, "invalid token".to_string())
    })?;

    let user = bridge
        .mapper()
        .get_user(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "User lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "server error".to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "unknown user".to_string()))?;

    tracing::info!(user_id = %user.id, provider = %claims.provider, "Session established");
    Ok(Json(SessionResponse {
        user,
        provider: claims.provider,
    }))
}
