use serde::{Deserialize, Deserializer, Serialize};

use super::errors::OAuth2Error;

/// Query parameters of the provider's redirect back to the callback.
///
/// Every field is optional so that a provider error redirect (`error=...`
/// without `code`) still reaches the callback logic instead of being rejected
/// by the extractor.
#[derive(Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("code", &self.code.as_ref().map(|_| "<present>"))
            .field("state", &self.state.as_ref().map(|_| "<present>"))
            .field("error", &self.error)
            .field("error_description", &self.error_description)
            .finish()
    }
}

/// Body returned by the bridging token exchange endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeTokenResponse {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct OidcTokenResponse {
    pub(super) access_token: Option<String>,
    #[allow(dead_code)]
    pub(super) token_type: Option<String>,
    pub(super) id_token: Option<String>,
}

/// Identity claims as they appear in an ID token or a userinfo response.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProviderClaims {
    #[serde(default)]
    pub(crate) sub: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub(crate) email_verified: Option<bool>,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) given_name: Option<String>,
    #[serde(default)]
    pub(crate) family_name: Option<String>,
    #[serde(default)]
    pub(crate) picture: Option<String>,
}

// Some providers send `"email_verified": "true"`.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    Ok(
        match Option::<BoolOrString>::deserialize(deserializer)? {
            Some(BoolOrString::Bool(b)) => Some(b),
            Some(BoolOrString::Str(s)) => Some(s.eq_ignore_ascii_case("true")),
            None => None,
        },
    )
}

/// The provider identity after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Stable subject identifier issued by the provider
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

impl ProviderProfile {
    /// Best available human-readable name
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        let joined = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            self.email.clone()
        } else {
            joined
        }
    }
}

impl TryFrom<ProviderClaims> for ProviderProfile {
    type Error = OAuth2Error;

    fn try_from(claims: ProviderClaims) -> Result<Self, Self::Error> {
        let subject = claims
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| OAuth2Error::ProfileIncomplete("sub".to_string()))?;
        let email = claims
            .email
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| OAuth2Error::ProfileIncomplete("email".to_string()))?;

        Ok(Self {
            subject,
            email,
            email_verified: claims.email_verified.unwrap_or(false),
            name: claims.name,
            given_name: claims.given_name,
            family_name: claims.family_name,
            picture: claims.picture,
        })
    }
}
