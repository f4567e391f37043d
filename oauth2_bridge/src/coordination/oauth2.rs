use http::HeaderMap;

use crate::oauth2::{
    AuthResponse, BRIDGING_TOKEN_COOKIE, OAUTH_STATE_COOKIE, OAuth2Error, PKCE_VERIFIER_COOKIE,
    PkcePair, RETURN_TO_COOKIE, append_query, build_authorization_url, csrf_checks,
    decode_return_to, encode_return_to, sanitize_return_to,
};
use crate::utils::gen_random_string;

use super::bridge::AuthBridge;
use super::errors::CoordinationError;

/// Length of the CSRF `state` value.
pub const STATE_LEN: usize = 32;

/// Flow cookies as they arrived on the callback request.
struct FlowCookies {
    state: Option<String>,
    verifier: Option<String>,
    return_to: Option<String>,
}

impl AuthBridge {
    /// Starts a login: stores a fresh PKCE verifier and CSRF state in
    /// ephemeral cookies and returns the provider authorization URL together
    /// with the `Set-Cookie` headers.
    ///
    /// `return_to` is kept only when it is a same-origin path.
    #[tracing::instrument(skip_all)]
    pub fn start_login(
        &self,
        return_to: Option<&str>,
    ) -> Result<(String, HeaderMap), CoordinationError> {
        let pkce = PkcePair::generate()?;
        let state = gen_random_string(STATE_LEN)?;
        let ttl = self.config.flow_ttl;

        let mut headers = HeaderMap::new();
        self.store
            .set(&mut headers, OAUTH_STATE_COOKIE, &state, ttl)?;
        self.store
            .set(&mut headers, PKCE_VERIFIER_COOKIE, pkce.verifier(), ttl)?;

        let return_to = match return_to.filter(|r| !r.is_empty()).map(sanitize_return_to) {
            Some(Ok(path)) => Some(path),
            Some(Err(_)) => {
                tracing::warn!("Ignoring invalid return destination");
                None
            }
            None => None,
        };
        match &return_to {
            Some(path) => {
                self.store
                    .set(&mut headers, RETURN_TO_COOKIE, &encode_return_to(path), ttl)?
            }
            // A destination left over from an abandoned attempt must not apply here
            None => self.store.clear(&mut headers, RETURN_TO_COOKIE)?,
        }

        let auth_url = build_authorization_url(&self.config.provider, &state, pkce.challenge());
        tracing::debug!(
            has_return_to = return_to.is_some(),
            "Authorization request prepared"
        );

        Ok((auth_url, headers))
    }

    /// Handles the provider's redirect back to the bridge.
    ///
    /// Always answers with a redirect: to the landing page with a fresh
    /// `bridging_token` cookie on success, to the error page with
    /// `?error=<code>` otherwise. The flow cookies are cleared either way.
    #[tracing::instrument(skip_all, fields(provider = %self.config.provider.provider_name()))]
    pub async fn authorized(
        &self,
        params: &AuthResponse,
        request: &HeaderMap,
    ) -> (HeaderMap, String) {
        let mut headers = HeaderMap::new();

        let outcome = match self.take_flow_cookies(request, &mut headers) {
            Ok(flow) => self.complete_flow(params, flow).await,
            Err(e) => Err(e),
        };

        let outcome = outcome.and_then(|(token, return_to)| {
            self.store.set(
                &mut headers,
                BRIDGING_TOKEN_COOKIE,
                &token,
                self.config.token_ttl,
            )?;
            Ok(return_to)
        });

        match outcome {
            Ok(return_to) => {
                let location = match return_to {
                    Some(path) => append_query(&self.config.landing_url, "redirect", &path),
                    None => self.config.landing_url.clone(),
                };
                tracing::info!("Login bridged");
                (headers, location)
            }
            Err(e) => {
                let location = append_query(&self.config.error_url, "error", e.error_code());
                tracing::debug!(error_code = e.error_code(), "Login failed");
                (headers, location)
            }
        }
    }

    // Every flow cookie is consumed up front so that none of them outlives
    // this request, whatever happens next.
    fn take_flow_cookies(
        &self,
        request: &HeaderMap,
        headers: &mut HeaderMap,
    ) -> Result<FlowCookies, CoordinationError> {
        Ok(FlowCookies {
            state: self.store.take(request, headers, OAUTH_STATE_COOKIE)?,
            verifier: self.store.take(request, headers, PKCE_VERIFIER_COOKIE)?,
            return_to: self.store.take(request, headers, RETURN_TO_COOKIE)?,
        })
    }

    async fn complete_flow(
        &self,
        params: &AuthResponse,
        flow: FlowCookies,
    ) -> Result<(String, Option<String>), CoordinationError> {
        csrf_checks(flow.state.as_deref(), params.state.as_deref())?;

        if let Some(error) = &params.error {
            tracing::debug!(description = ?params.error_description, "Provider error description");
            return Err(OAuth2Error::ProviderDenied(error.clone()).into());
        }

        let verifier = flow.verifier.ok_or(OAuth2Error::PkceMissing)?;
        let pkce = PkcePair::from_verifier(verifier)?;

        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(OAuth2Error::MissingCode)?;

        let profile = self.provider.exchange_code(code, pkce.verifier()).await?;

        let provider_name = self.config.provider.provider_name();
        let user_id = self
            .mapper
            .resolve_or_create_user(provider_name, &profile.subject, &profile)
            .await?;

        let token = self.minter.mint(&user_id, provider_name)?;
        let return_to = flow.return_to.as_deref().and_then(decode_return_to);

        Ok((token, return_to))
    }
}
