//! Database initialization
//!
//! Creates the database on first run, applies PRAGMAs, creates all tables
//! idempotently, runs versioned migrations, and seeds default settings.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Apply PRAGMAs, create tables, run migrations, and seed defaults on an
/// existing pool (also used by tests against in-memory databases)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys (cascade deletes depend on this)
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    // Schema creation (idempotent - safe to call multiple times)
    create_schema_version_table(pool).await?;
    create_users_table(pool).await?;
    create_sessions_table(pool).await?;
    create_settings_table(pool).await?;
    create_subjects_table(pool).await?;
    create_chapters_table(pool).await?;
    create_tasks_table(pool).await?;
    create_resources_table(pool).await?;
    create_study_sessions_table(pool).await?;
    create_streaks_table(pool).await?;

    // Versioned migrations run after CREATE TABLE IF NOT EXISTS
    crate::db::migrations::run_migrations(pool).await?;

    // Seed default settings
    init_default_settings(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            is_admin INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            expires_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_subjects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            title TEXT NOT NULL,
            slug TEXT NOT NULL,
            description TEXT,
            overview TEXT,
            overview_generated_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, slug),
            CHECK (length(title) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_subjects_user ON subjects(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_chapters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chapters (
            guid TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL REFERENCES subjects(guid) ON DELETE CASCADE,
            title TEXT NOT NULL,
            slug TEXT NOT NULL,
            intuition TEXT,
            task_flow_transitions TEXT,
            is_completed INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(subject_id, slug),
            CHECK (length(title) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chapters_subject ON chapters(subject_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            guid TEXT PRIMARY KEY,
            chapter_id TEXT NOT NULL REFERENCES chapters(guid) ON DELETE CASCADE,
            description TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (length(description) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_chapter ON tasks(chapter_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_resources_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resources (
            guid TEXT PRIMARY KEY,
            chapter_id TEXT NOT NULL REFERENCES chapters(guid) ON DELETE CASCADE,
            title TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'pdf' CHECK (kind IN ('pdf')),
            url TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_resources_chapter ON resources(chapter_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_study_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS study_sessions (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            chapter_id TEXT REFERENCES chapters(guid) ON DELETE SET NULL,
            duration_minutes INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (duration_minutes > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_study_sessions_user ON study_sessions(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_streaks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS streaks (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE REFERENCES users(guid) ON DELETE CASCADE,
            current_streak INTEGER NOT NULL DEFAULT 0,
            last_study_date TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (current_streak >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values and resets
/// NULL values back to their defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Session and authentication settings
    ensure_setting(pool, "session_timeout_seconds", "2592000").await?; // 30 days

    // HTTP server settings
    ensure_setting(pool, "http_host", "127.0.0.1").await?;
    ensure_setting(pool, "http_port", "5730").await?;

    // Upload settings
    ensure_setting(pool, "upload_max_bytes", "20971520").await?; // 20 MiB

    // AI generation settings
    ensure_setting(pool, "ai_base_url", "https://openrouter.ai/api/v1/chat/completions").await?;
    ensure_setting(pool, "ai_model", "google/gemma-3-27b-it:free").await?;
    ensure_setting(pool, "ai_max_tokens", "2000").await?;
    ensure_setting(pool, "ai_request_timeout_ms", "30000").await?;
    ensure_setting(pool, "ai_rate_limit_ms", "1000").await?;
    ensure_setting(pool, "ai_context_max_chars", "5000").await?;
    ensure_setting(pool, "ai_generated_tasks_max", "7").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ?, updated_at = CURRENT_TIMESTAMP WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Read a setting value, falling back to the given default
pub async fn get_setting_or(pool: &SqlitePool, key: &str, default_value: &str) -> Result<String> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?
        .flatten();

    Ok(value.unwrap_or_else(|| default_value.to_string()))
}
