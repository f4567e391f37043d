use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::oauth2::ProviderProfile;

use super::errors::UserError;

/// A local account that one or more provider identities resolve to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct LocalUser {
    /// UUID v4, never derived from provider data
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocalUser {
    pub fn from_profile(profile: &ProviderProfile) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: profile.email.clone(),
            display_name: profile.display_name(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Resolves `(provider, subject)` to a local user id, creating the user on
/// first login.
#[async_trait]
pub trait IdentityMapper: Send + Sync {
    async fn resolve_or_create_user(
        &self,
        provider: &str,
        subject: &str,
        profile: &ProviderProfile,
    ) -> Result<String, UserError>;

    async fn get_user(&self, id: &str) -> Result<Option<LocalUser>, UserError>;
}
