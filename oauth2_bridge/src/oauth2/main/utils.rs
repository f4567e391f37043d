use http::header::{HeaderMap, ORIGIN};
use std::time::Duration;
use url::Url;

use crate::oauth2::errors::OAuth2Error;
use crate::utils::{base64url_decode, base64url_encode};

const MAX_RETURN_TO_LEN: usize = 512;

/// Creates the HTTP client used for every provider call.
///
/// - `timeout`: bounds the whole request, connect included. A code exchange that
///   hangs would otherwise outlive the flow cookies it depends on.
/// - No redirect following: token and userinfo endpoints answer directly.
pub(crate) fn get_client(timeout: Duration) -> Result<reqwest::Client, OAuth2Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| OAuth2Error::HttpClient(e.to_string()))
}

/// Accepts only same-origin relative paths as a post-login destination.
///
/// Rejected: anything not starting with a single `/`, protocol-relative
/// `//host`, `/\host` (treated as `//host` by some browsers), backslashes and
/// control characters anywhere, and overly long values.
pub(crate) fn sanitize_return_to(raw: &str) -> Result<String, OAuth2Error> {
    let valid = raw.len() <= MAX_RETURN_TO_LEN
        && raw.starts_with('/')
        && !raw.starts_with("//")
        && !raw.contains('\\')
        && !raw.chars().any(char::is_control);

    if valid {
        Ok(raw.to_string())
    } else {
        Err(OAuth2Error::InvalidReturnTo)
    }
}

pub(crate) fn encode_return_to(path: &str) -> String {
    base64url_encode(path.as_bytes())
}

/// Decodes a stored destination and re-applies [`sanitize_return_to`]; the
/// cookie is browser-controlled input like any other.
pub(crate) fn decode_return_to(encoded: &str) -> Option<String> {
    let bytes = base64url_decode(encoded).ok()?;
    let path = String::from_utf8(bytes).ok()?;
    sanitize_return_to(&path).ok()
}

/// Appends `key=value` to a URL or path that may already carry a query.
pub(crate) fn append_query(base: &str, key: &str, value: &str) -> String {
    let encoded: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{encoded}")
}

/// `scheme://host[:port]` of an absolute URL.
pub(crate) fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Rejects requests a browser marks as cross-site.
///
/// `Sec-Fetch-Site` must be `same-origin` or `none` when sent, and an `Origin`
/// header, when sent, must equal `expected_origin`. Clients sending neither
/// (older browsers, curl) are let through: the cookie itself is `SameSite=Lax`
/// and `HttpOnly`.
pub(crate) fn validate_origin(
    headers: &HeaderMap,
    expected_origin: &str,
) -> Result<(), OAuth2Error> {
    let fetch_site = headers
        .get("sec-fetch-site")
        .and_then(|h| h.to_str().ok());
    if let Some(site) = fetch_site {
        if site != "same-origin" && site != "none" {
            tracing::warn!(sec_fetch_site = site, "Cross-site request rejected");
            return Err(OAuth2Error::InvalidOrigin(format!(
                "Sec-Fetch-Site: {site}"
            )));
        }
    }

    let origin = headers.get(ORIGIN).map(|h| h.to_str().unwrap_or_default());
    match origin {
        Some(origin) if origin != expected_origin => {
            tracing::warn!(
                expected = expected_origin,
                actual = origin,
                "Request origin mismatch"
            );
            Err(OAuth2Error::InvalidOrigin(format!(
                "Expected Origin: {expected_origin}, Actual Origin: {origin}"
            )))
        }
        _ => Ok(()),
    }
}
