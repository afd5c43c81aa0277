//! Session persistence
//!
//! Sessions are DB-backed tokens with an absolute expiry. Timestamps use
//! SQLite's CURRENT_TIMESTAMP format (UTC), so expiry checks happen in SQL.

use chrono::{Duration, Utc};
use sqlx::{Row, SqlitePool};
use studytrail_common::auth::generate_session_token;
use studytrail_common::Result;

/// The authenticated caller, as resolved from a session token
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
}

/// Create a session for the user; returns the token
pub async fn create_session(
    pool: &SqlitePool,
    user_id: &str,
    timeout_seconds: i64,
) -> Result<String> {
    let token = generate_session_token();
    let expires_at = (Utc::now() + Duration::seconds(timeout_seconds))
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(&expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolve a token to its user, ignoring expired sessions
pub async fn load_session_user(pool: &SqlitePool, token: &str) -> Result<Option<SessionUser>> {
    let row = sqlx::query(
        r#"
        SELECT u.guid, u.email, u.is_admin
        FROM sessions s
        JOIN users u ON u.guid = s.user_id
        WHERE s.token = ? AND s.expires_at > CURRENT_TIMESTAMP
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| SessionUser {
        user_id: r.get("guid"),
        email: r.get("email"),
        is_admin: r.get::<i64, _>("is_admin") != 0,
    }))
}

/// Delete a session (logout); expired rows are dropped opportunistically
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ? OR expires_at <= CURRENT_TIMESTAMP")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

/// Load the configured session timeout from settings
pub async fn session_timeout_seconds(pool: &SqlitePool) -> Result<i64> {
    let value = studytrail_common::db::init::get_setting_or(pool, "session_timeout_seconds", "2592000")
        .await?;

    value
        .parse::<i64>()
        .map_err(|e| studytrail_common::Error::Config(format!("Invalid session timeout: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use crate::db::users::create_user;

    #[tokio::test]
    async fn session_round_trip() {
        let pool = memory_pool().await;
        let user_id = create_user(&pool, "ada@example.com", None, "h", "s")
            .await
            .unwrap();

        let token = create_session(&pool, &user_id, 3600).await.unwrap();

        let user = load_session_user(&pool, &token)
            .await
            .unwrap()
            .expect("session resolves");
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email, "ada@example.com");

        delete_session(&pool, &token).await.unwrap();
        assert!(load_session_user(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_does_not_resolve() {
        let pool = memory_pool().await;
        let user_id = create_user(&pool, "ada@example.com", None, "h", "s")
            .await
            .unwrap();

        // Already-expired session
        let token = create_session(&pool, &user_id, -60).await.unwrap();

        assert!(load_session_user(&pool, &token).await.unwrap().is_none());
    }
}
