use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::oauth2::ProviderProfile;
use crate::userdb::{errors::UserError, types::LocalUser};

use super::config::{DB_TABLE_IDENTITIES, DB_TABLE_USERS};

pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), UserError> {
    let users = DB_TABLE_USERS.as_str();
    let identities = DB_TABLE_IDENTITIES.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {users} (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            display_name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {identities} (
            provider TEXT NOT NULL,
            subject TEXT NOT NULL,
            user_id TEXT NOT NULL REFERENCES {users}(id) ON DELETE CASCADE,
            email TEXT NOT NULL,
            email_verified BOOLEAN NOT NULL DEFAULT FALSE,
            name TEXT,
            picture TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (provider, subject)
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{identities}_user_id ON {identities}(user_id)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn resolve_identity_postgres(
    pool: &Pool<Postgres>,
    provider: &str,
    subject: &str,
    profile: &ProviderProfile,
) -> Result<(String, bool), UserError> {
    let users = DB_TABLE_USERS.as_str();
    let identities = DB_TABLE_IDENTITIES.as_str();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_scalar::<_, String>(&format!(
        "SELECT user_id FROM {identities} WHERE provider = $1 AND subject = $2"
    ))
    .bind(provider)
    .bind(subject)
    .fetch_optional(&mut *tx)
    .await?;

    let created = existing.is_none();
    let user_id = match existing {
        Some(user_id) => {
            sqlx::query(&format!(
                r#"
                UPDATE {identities}
                SET email = $1, email_verified = $2, name = $3, picture = $4, updated_at = $5
                WHERE provider = $6 AND subject = $7
                "#
            ))
            .bind(&profile.email)
            .bind(profile.email_verified)
            .bind(&profile.name)
            .bind(&profile.picture)
            .bind(now)
            .bind(provider)
            .bind(subject)
            .execute(&mut *tx)
            .await?;

            sqlx::query(&format!(
                "UPDATE {users} SET email = $1, display_name = $2, updated_at = $3 WHERE id = $4"
            ))
            .bind(&profile.email)
            .bind(profile.display_name())
            .bind(now)
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;

            user_id
        }
        None => {
            let user = LocalUser::from_profile(profile);
            sqlx::query(&format!(
                r#"
                INSERT INTO {users} (id, email, display_name, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                "#
            ))
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&mut *tx)
            .await?;

            let inserted = sqlx::query(&format!(
                r#"
                INSERT INTO {identities}
                    (provider, subject, user_id, email, email_verified, name, picture, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (provider, subject) DO NOTHING
                "#
            ))
            .bind(provider)
            .bind(subject)
            .bind(&user.id)
            .bind(&profile.email)
            .bind(profile.email_verified)
            .bind(&profile.name)
            .bind(&profile.picture)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                // Lost a race with a concurrent first login for the same identity
                sqlx::query(&format!("DELETE FROM {users} WHERE id = $1"))
                    .bind(&user.id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query_scalar::<_, String>(&format!(
                    "SELECT user_id FROM {identities} WHERE provider = $1 AND subject = $2"
                ))
                .bind(provider)
                .bind(subject)
                .fetch_one(&mut *tx)
                .await?
            } else {
                user.id
            }
        }
    };

    tx.commit().await?;
    Ok((user_id, created))
}

pub(super) async fn get_user_postgres(
    pool: &Pool<Postgres>,
    id: &str,
) -> Result<Option<LocalUser>, UserError> {
    let users = DB_TABLE_USERS.as_str();

    Ok(sqlx::query_as::<_, LocalUser>(&format!(
        "SELECT id, email, display_name, created_at, updated_at FROM {users} WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?)
}
