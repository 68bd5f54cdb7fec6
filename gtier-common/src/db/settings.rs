//! Settings table access
//!
//! Key/value runtime configuration. Values are stored as text and parsed on
//! read; every key has a built-in default written at database init.

use crate::{Error, Result};
use sqlx::SqlitePool;

pub const GROUPING_ENABLED: &str = "ranking_grouping_enabled";
pub const QUALIFIERS_PER_GROUP: &str = "ranking_qualifiers_per_group";
pub const TIER_POLICY: &str = "ranking_tier_policy";
pub const ELIMINATED_POLICY: &str = "ranking_eliminated_policy";
pub const ELIMINATED_TIER: &str = "ranking_eliminated_tier";
pub const MAX_LOCK_WAIT_MS: &str = "database_max_lock_wait_ms";

/// Built-in defaults, inserted for missing keys by `init_default_settings`
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    (GROUPING_ENABLED, "false"),
    (QUALIFIERS_PER_GROUP, "3"),
    (TIER_POLICY, "S:10,A:20,B:30,C:25,D"),
    (ELIMINATED_POLICY, "exclude"),
    (ELIMINATED_TIER, "D"),
    (MAX_LOCK_WAIT_MS, "5000"),
];

/// Generic setting getter
///
/// Returns `None` when the key is absent; a present but unparsable value is a
/// configuration error.
pub async fn get_setting<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (UPSERT)
pub async fn set_setting<T>(db: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Maximum time a write may spend retrying on a locked database
///
/// **Default:** 5000 ms
pub async fn get_max_lock_wait_ms(db: &SqlitePool) -> Result<u64> {
    get_setting(db, MAX_LOCK_WAIT_MS)
        .await
        .map(|opt| opt.unwrap_or(5000))
}
