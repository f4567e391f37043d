use std::sync::Arc;

use crate::bridge_token::{BridgeClaims, JwtTokenMinter, TokenMinter};
use crate::config::{BridgeConfig, ConfigError};
use crate::ephemeral::EphemeralStore;
use crate::oauth2::{IdentityProvider, origin_of};
use crate::userdb::IdentityMapper;

use super::errors::CoordinationError;

/// The identity bridge with all of its collaborators, built once at startup
/// and shared by every request.
pub struct AuthBridge {
    pub(super) config: BridgeConfig,
    pub(super) store: EphemeralStore,
    pub(super) provider: Arc<dyn IdentityProvider>,
    pub(super) mapper: Arc<dyn IdentityMapper>,
    pub(super) minter: Arc<dyn TokenMinter>,
    /// Origin of the redirect URI, i.e. of the site hosting the bridge
    pub(super) origin: String,
}

impl AuthBridge {
    pub fn new(
        config: BridgeConfig,
        provider: Arc<dyn IdentityProvider>,
        mapper: Arc<dyn IdentityMapper>,
    ) -> Result<Self, CoordinationError> {
        let origin = origin_of(config.provider.redirect_uri()).ok_or_else(|| {
            ConfigError::Invalid {
                name: "OAUTH2_REDIRECT_URI",
                reason: "has no origin".to_string(),
            }
        })?;
        let store = EphemeralStore::new(!config.insecure_cookies);
        let minter = Arc::new(JwtTokenMinter::new(&config.token_secret, config.token_ttl));

        tracing::info!(
            provider = config.provider.provider_name(),
            %origin,
            route_prefix = config.route_prefix(),
            "Identity bridge ready"
        );

        Ok(Self {
            config,
            store,
            provider,
            mapper,
            minter,
            origin,
        })
    }

    /// Replaces the default JWT minter.
    pub fn with_minter(mut self, minter: Arc<dyn TokenMinter>) -> Self {
        self.minter = minter;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn mapper(&self) -> &Arc<dyn IdentityMapper> {
        &self.mapper
    }

    /// Checks a bridging token presented to the session-establishment step.
    pub fn verify_bridging_token(&self, token: &str) -> Result<BridgeClaims, CoordinationError> {
        Ok(self.minter.verify(token)?)
    }
}
