use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::oauth2::ProviderProfile;

use super::errors::UserError;
use super::types::{IdentityMapper, LocalUser};

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, LocalUser>,
    identities: HashMap<(String, String), String>,
}

/// Process-local identity store for development and tests.
#[derive(Default)]
pub struct MemoryIdentityMapper {
    state: Mutex<MemoryState>,
}

impl MemoryIdentityMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }
}

#[async_trait]
impl IdentityMapper for MemoryIdentityMapper {
    async fn resolve_or_create_user(
        &self,
        provider: &str,
        subject: &str,
        profile: &ProviderProfile,
    ) -> Result<String, UserError> {
        if provider.is_empty() || subject.is_empty() {
            return Err(UserError::InvalidData(
                "provider and subject are required".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        let key = (provider.to_string(), subject.to_string());

        if let Some(user_id) = state.identities.get(&key).cloned() {
            let user = state.users.get_mut(&user_id).ok_or(UserError::NotFound)?;
            user.email = profile.email.clone();
            user.display_name = profile.display_name();
            user.updated_at = Utc::now();
            tracing::debug!(provider, created = false, "Identity resolved");
            return Ok(user_id);
        }

        let user = LocalUser::from_profile(profile);
        let user_id = user.id.clone();
        state.users.insert(user_id.clone(), user);
        state.identities.insert(key, user_id.clone());
        tracing::debug!(provider, created = true, "Identity resolved");
        Ok(user_id)
    }

    async fn get_user(&self, id: &str) -> Result<Option<LocalUser>, UserError> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }
}
