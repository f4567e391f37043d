//! Database table configuration

use std::{env, sync::LazyLock};

/// Table prefix from environment variable
pub(super) static DB_TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("BRIDGE_DB_TABLE_PREFIX").unwrap_or_else(|_| "bridge_".to_string()));

/// Local users table name
pub(super) static DB_TABLE_USERS: LazyLock<String> =
    LazyLock::new(|| format!("{}users", *DB_TABLE_PREFIX));

/// Provider identities table name
pub(super) static DB_TABLE_IDENTITIES: LazyLock<String> =
    LazyLock::new(|| format!("{}identities", *DB_TABLE_PREFIX));
