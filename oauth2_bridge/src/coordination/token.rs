use http::HeaderMap;

use crate::oauth2::{BRIDGING_TOKEN_COOKIE, validate_origin};

use super::bridge::AuthBridge;
use super::errors::CoordinationError;

impl AuthBridge {
    /// Hands the bridging token to the front end exactly once.
    ///
    /// Returns the token when the request carried the cookie, together with
    /// the header that deletes it. A second call sees `None`. Requests a
    /// browser marks as cross-site are refused without touching the cookie.
    #[tracing::instrument(skip_all)]
    pub fn take_bridge_token(
        &self,
        request: &HeaderMap,
    ) -> Result<(HeaderMap, Option<String>), CoordinationError> {
        validate_origin(request, &self.origin)?;

        let mut headers = HeaderMap::new();
        let token = self
            .store
            .take(request, &mut headers, BRIDGING_TOKEN_COOKIE)?;

        tracing::debug!(present = token.is_some(), "Bridging token exchange");
        Ok((headers, token))
    }
}
