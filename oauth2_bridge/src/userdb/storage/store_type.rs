use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool};
use std::str::FromStr;

use crate::oauth2::ProviderProfile;
use crate::userdb::{
    errors::UserError,
    types::{IdentityMapper, LocalUser},
};

use super::postgres::*;
use super::sqlite::*;

#[derive(Clone, Debug)]
enum DataStore {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

/// Identity store backed by SQLite or PostgreSQL.
#[derive(Clone, Debug)]
pub struct SqlxIdentityMapper {
    store: DataStore,
}

impl SqlxIdentityMapper {
    /// Opens a pool for `sqlite:...` or `postgres://...` URLs. Call
    /// [`SqlxIdentityMapper::init`] before first use.
    pub async fn connect(url: &str) -> Result<Self, UserError> {
        let store = if url.starts_with("sqlite:") {
            let opts = SqliteConnectOptions::from_str(url)?
                .create_if_missing(true)
                .foreign_keys(true);
            // Every connection to :memory: is its own database
            let max_connections = if url.contains(":memory:") { 1 } else { 5 };
            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(opts)
                .await?;
            DataStore::Sqlite(pool)
        } else if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            DataStore::Postgres(pool)
        } else {
            return Err(UserError::Storage(
                "Unsupported database URL. Supported schemes are 'sqlite:' and 'postgres:'"
                    .to_string(),
            ));
        };

        let backend = match store {
            DataStore::Sqlite(_) => "sqlite",
            DataStore::Postgres(_) => "postgres",
        };
        tracing::info!(backend, "Connected to identity database");
        Ok(Self { store })
    }

    /// Creates the users and identities tables when missing.
    pub async fn init(&self) -> Result<(), UserError> {
        match &self.store {
            DataStore::Sqlite(pool) => create_tables_sqlite(pool).await,
            DataStore::Postgres(pool) => create_tables_postgres(pool).await,
        }
    }
}

#[async_trait]
impl IdentityMapper for SqlxIdentityMapper {
    #[tracing::instrument(skip(self, subject, profile))]
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

        let result = match &self.store {
            DataStore::Sqlite(pool) => {
                resolve_identity_sqlite(pool, provider, subject, profile).await
            }
            DataStore::Postgres(pool) => {
                resolve_identity_postgres(pool, provider, subject, profile).await
            }
        };

        match result {
            Ok((user_id, created)) => {
                tracing::info!(created, "Identity resolved");
                Ok(user_id)
            }
            Err(e) => {
                tracing::error!(error = %e, "Identity resolution failed");
                Err(e)
            }
        }
    }

    async fn get_user(&self, id: &str) -> Result<Option<LocalUser>, UserError> {
        match &self.store {
            DataStore::Sqlite(pool) => get_user_sqlite(pool, id).await,
            DataStore::Postgres(pool) => get_user_postgres(pool, id).await,
        }
    }
}
