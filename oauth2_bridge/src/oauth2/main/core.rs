use crate::oauth2::config::ProviderConfig;
use crate::oauth2::errors::OAuth2Error;
use crate::utils::constant_time_eq;

use super::pkce::PKCE_METHOD;

/// Builds the provider authorization URL for one login attempt.
///
/// Parameters already present on the configured endpoint are preserved;
/// everything is percent-encoded by the `url` serializer.
pub(crate) fn build_authorization_url(
    config: &ProviderConfig,
    state: &str,
    code_challenge: &str,
) -> String {
    let mut url = config.auth_url.clone();
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.scope)
        .append_pair("state", state)
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", PKCE_METHOD);
    url.into()
}

/// Compares the `state` cookie with the `state` query parameter.
pub(crate) fn csrf_checks(stored: Option<&str>, param: Option<&str>) -> Result<(), OAuth2Error> {
    let (Some(stored), Some(param)) = (stored, param) else {
        tracing::debug!(
            cookie_present = stored.is_some(),
            param_present = param.is_some(),
            "CSRF state incomplete"
        );
        return Err(OAuth2Error::CsrfMissing);
    };

    if !constant_time_eq(stored, param) {
        return Err(OAuth2Error::CsrfMismatch);
    }
    Ok(())
}
