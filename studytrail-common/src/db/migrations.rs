//! Database schema migrations
//!
//! Versioned schema migrations allowing seamless database upgrades without
//! manual deletion or data loss.
//!
//! # Migration Guidelines
//!
//! 1. Never modify existing migrations - they must remain stable for users
//!    upgrading from older versions
//! 2. Always add new migrations - create a new migration function for each
//!    schema change
//! 3. Prefer ALTER TABLE over DROP/CREATE to preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// IMPORTANT: increment this when adding new migrations
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    Ok(())
}

/// v1: ensure the is_admin column exists on users
///
/// Databases created before the admin dashboard predate the column; newly
/// created databases get it from CREATE TABLE and this becomes a no-op.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('users') WHERE name = 'is_admin'",
    )
    .fetch_one(pool)
    .await?;

    if has_column == 0 {
        sqlx::query("ALTER TABLE users ADD COLUMN is_admin INTEGER NOT NULL DEFAULT 0")
            .execute(pool)
            .await?;
        info!("Migration v1: added is_admin to users table");
    }

    Ok(())
}
