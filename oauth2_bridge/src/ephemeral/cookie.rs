use headers::{Cookie, HeaderMapExt};
use http::header::{HeaderMap, HeaderValue, SET_COOKIE};

use super::errors::CookieError;

/// Upper bound on the lifetime of any ephemeral cookie, in seconds.
pub const MAX_EPHEMERAL_TTL: u64 = 300;

/// Cookie-backed store for values that must be read at most once.
///
/// Every cookie written here is `HttpOnly`, `Path=/` and `SameSite=Lax`. `Lax`
/// keeps the cookies attached to the top-level GET navigation coming back from
/// the identity provider while withholding them from cross-site subresource
/// requests. `Secure` is always set unless the store was explicitly built for
/// plain-HTTP development.
#[derive(Debug, Clone)]
pub struct EphemeralStore {
    secure: bool,
}

impl EphemeralStore {
    pub fn new(secure: bool) -> Self {
        if !secure {
            tracing::warn!("Ephemeral cookies are issued without the Secure attribute");
        }
        Self { secure }
    }

    /// Appends a `Set-Cookie` header for `name=value` that the browser drops
    /// after `max_age` seconds.
    pub fn set(
        &self,
        headers: &mut HeaderMap,
        name: &str,
        value: &str,
        max_age: u64,
    ) -> Result<(), CookieError> {
        validate_name(name)?;
        if value.is_empty() || !value.bytes().all(is_cookie_octet) {
            return Err(CookieError::InvalidValue(name.to_string()));
        }
        if max_age > MAX_EPHEMERAL_TTL {
            return Err(CookieError::TtlTooLong {
                requested: max_age,
                limit: MAX_EPHEMERAL_TTL,
            });
        }

        tracing::debug!(cookie = name, max_age, "Setting ephemeral cookie");
        self.append(headers, name, value, max_age)
    }

    /// Returns the value of `name` from the request, treating an empty value
    /// (a cookie already cleared by us) as absent.
    pub fn get(&self, request: &HeaderMap, name: &str) -> Option<String> {
        let value = request
            .typed_get::<Cookie>()
            .and_then(|cookies| cookies.get(name).map(str::to_string))
            .filter(|v| !v.is_empty());

        tracing::debug!(cookie = name, present = value.is_some(), "Read ephemeral cookie");
        value
    }

    /// Overwrites `name` with an empty value and `Max-Age=0`.
    pub fn clear(&self, headers: &mut HeaderMap, name: &str) -> Result<(), CookieError> {
        validate_name(name)?;
        tracing::debug!(cookie = name, "Clearing ephemeral cookie");
        self.append(headers, name, "", 0)
    }

    /// Delete-on-read: returns the value of `name` and, in the same call,
    /// appends the header that removes it from the browser.
    ///
    /// The clearing header is emitted whenever the request carried the cookie,
    /// even with an empty value, and never when it did not.
    pub fn take(
        &self,
        request: &HeaderMap,
        headers: &mut HeaderMap,
        name: &str,
    ) -> Result<Option<String>, CookieError> {
        validate_name(name)?;

        let raw = request
            .typed_get::<Cookie>()
            .and_then(|cookies| cookies.get(name).map(str::to_string));

        let Some(raw) = raw else {
            tracing::debug!(cookie = name, present = false, "Took ephemeral cookie");
            return Ok(None);
        };

        self.clear(headers, name)?;
        tracing::debug!(cookie = name, present = !raw.is_empty(), "Took ephemeral cookie");

        Ok(Some(raw).filter(|v| !v.is_empty()))
    }

    fn append(
        &self,
        headers: &mut HeaderMap,
        name: &str,
        value: &str,
        max_age: u64,
    ) -> Result<(), CookieError> {
        let secure = if self.secure { " Secure;" } else { "" };
        let cookie =
            format!("{name}={value}; SameSite=Lax;{secure} HttpOnly; Path=/; Max-Age={max_age}");

        let header_value = HeaderValue::from_str(&cookie)
            .map_err(|_| CookieError::Header(format!("unencodable cookie {name}")))?;
        headers.append(SET_COOKIE, header_value);
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), CookieError> {
    // RFC 6265 cookie-name is an RFC 7230 token
    let is_tchar = |b: u8| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b);

    if name.is_empty() || !name.bytes().all(is_tchar) {
        return Err(CookieError::InvalidName(name.to_string()));
    }
    Ok(())
}

// RFC 6265 cookie-octet: printable ASCII minus whitespace, DQUOTE, comma,
// semicolon and backslash.
fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::COOKIE;

    fn request_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn set_cookies(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_set_writes_http_only_secure_cookie() {
        let store = EphemeralStore::new(true);
        let mut headers = HeaderMap::new();

        store
            .set(&mut headers, "oauth_state", "abc-123", 300)
            .expect("set should succeed");

        assert_eq!(
            set_cookies(&headers),
            vec!["oauth_state=abc-123; SameSite=Lax; Secure; HttpOnly; Path=/; Max-Age=300"]
        );
    }

    #[test]
    fn test_set_without_secure_for_development() {
        let store = EphemeralStore::new(false);
        let mut headers = HeaderMap::new();

        store.set(&mut headers, "oauth_state", "abc", 60).unwrap();

        let cookie = &set_cookies(&headers)[0];
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_set_rejects_ttl_above_limit() {
        let store = EphemeralStore::new(true);
        let mut headers = HeaderMap::new();

        let result = store.set(&mut headers, "pkce_verifier", "v", 301);

        assert_eq!(
            result,
            Err(CookieError::TtlTooLong {
                requested: 301,
                limit: 300
            })
        );
        assert!(headers.is_empty());
    }

    #[test]
    fn test_set_rejects_header_injection() {
        let store = EphemeralStore::new(true);
        let mut headers = HeaderMap::new();

        for value in ["a; Domain=evil.example", "a,b", "a b", "a\"b", "a\\b", "a\r\nb", ""] {
            assert!(
                matches!(
                    store.set(&mut headers, "oauth_state", value, 10),
                    Err(CookieError::InvalidValue(_))
                ),
                "value {value:?} should be rejected"
            );
        }
        for name in ["", "bad name", "bad;name", "bad=name"] {
            assert!(matches!(
                store.set(&mut headers, name, "v", 10),
                Err(CookieError::InvalidName(_))
            ));
        }
        assert!(headers.is_empty());
    }

    #[test]
    fn test_get_present_absent_and_empty() {
        let store = EphemeralStore::new(true);
        let request = request_with("other=1; oauth_state=xyz; cleared=");

        assert_eq!(store.get(&request, "oauth_state"), Some("xyz".to_string()));
        assert_eq!(store.get(&request, "missing"), None);
        assert_eq!(store.get(&request, "cleared"), None);
        assert_eq!(store.get(&HeaderMap::new(), "oauth_state"), None);
    }

    #[test]
    fn test_clear_writes_zero_max_age() {
        let store = EphemeralStore::new(true);
        let mut headers = HeaderMap::new();

        store.clear(&mut headers, "bridging_token").unwrap();

        assert_eq!(
            set_cookies(&headers),
            vec!["bridging_token=; SameSite=Lax; Secure; HttpOnly; Path=/; Max-Age=0"]
        );
    }

    #[test]
    fn test_take_reads_and_clears_in_same_response() {
        let store = EphemeralStore::new(true);
        let request = request_with("bridging_token=tok");
        let mut headers = HeaderMap::new();

        let value = store.take(&request, &mut headers, "bridging_token").unwrap();

        assert_eq!(value, Some("tok".to_string()));
        let cookies = set_cookies(&headers);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("bridging_token=;"));
        assert!(cookies[0].ends_with("Max-Age=0"));
    }

    #[test]
    fn test_take_absent_cookie_emits_nothing() {
        let store = EphemeralStore::new(true);
        let mut headers = HeaderMap::new();

        let value = store
            .take(&request_with("unrelated=1"), &mut headers, "bridging_token")
            .unwrap();

        assert_eq!(value, None);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_take_empty_cookie_is_absent_but_cleared() {
        let store = EphemeralStore::new(true);
        let mut headers = HeaderMap::new();

        let value = store
            .take(&request_with("bridging_token="), &mut headers, "bridging_token")
            .unwrap();

        assert_eq!(value, None);
        assert_eq!(set_cookies(&headers).len(), 1);
    }
}
