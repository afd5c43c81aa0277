//! User persistence

use sqlx::{Row, SqlitePool};
use studytrail_common::db::models::User;
use studytrail_common::Result;
use uuid::Uuid;

/// Full user row including credential material
///
/// Never serialized; the API returns [`User`] instead.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub guid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub password_salt: String,
    pub is_admin: bool,
    pub created_at: String,
}

impl UserRecord {
    pub fn public(&self) -> User {
        User {
            guid: self.guid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            is_admin: self.is_admin,
            created_at: self.created_at.clone(),
        }
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> UserRecord {
    UserRecord {
        guid: row.get("guid"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        password_hash: row.get("password_hash"),
        password_salt: row.get("password_salt"),
        is_admin: row.get::<i64, _>("is_admin") != 0,
        created_at: row.get("created_at"),
    }
}

/// Insert a new user; returns the generated guid
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    display_name: Option<&str>,
    password_hash: &str,
    password_salt: &str,
) -> Result<String> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO users (guid, email, display_name, password_hash, password_salt)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(email)
    .bind(display_name)
    .bind(password_hash)
    .bind(password_salt)
    .execute(pool)
    .await?;

    Ok(guid)
}

pub async fn load_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRecord>> {
    let row = sqlx::query(
        r#"
        SELECT guid, email, display_name, password_hash, password_salt, is_admin, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| row_to_user(&r)))
}

pub async fn load_user(pool: &SqlitePool, guid: &str) -> Result<Option<UserRecord>> {
    let row = sqlx::query(
        r#"
        SELECT guid, email, display_name, password_hash, password_salt, is_admin, created_at
        FROM users
        WHERE guid = ?
        "#,
    )
    .bind(guid)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| row_to_user(&r)))
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}
