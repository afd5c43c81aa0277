//! Resource (uploaded file) persistence

use sqlx::{Row, SqlitePool};
use studytrail_common::db::models::Resource;
use studytrail_common::Result;
use uuid::Uuid;

fn row_to_resource(row: &sqlx::sqlite::SqliteRow) -> Resource {
    Resource {
        guid: row.get("guid"),
        chapter_id: row.get("chapter_id"),
        title: row.get("title"),
        kind: row.get("kind"),
        url: row.get("url"),
        created_at: row.get("created_at"),
    }
}

pub async fn create_resource(
    pool: &SqlitePool,
    chapter_id: &str,
    title: &str,
    kind: &str,
    url: &str,
) -> Result<Resource> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO resources (guid, chapter_id, title, kind, url) VALUES (?, ?, ?, ?, ?)")
        .bind(&guid)
        .bind(chapter_id)
        .bind(title)
        .bind(kind)
        .bind(url)
        .execute(pool)
        .await?;

    let row = sqlx::query(
        "SELECT guid, chapter_id, title, kind, url, created_at FROM resources WHERE guid = ?",
    )
    .bind(&guid)
    .fetch_one(pool)
    .await?;

    Ok(row_to_resource(&row))
}

/// Load an owned resource (ownership via chapter -> subject -> user)
pub async fn load_resource(pool: &SqlitePool, user_id: &str, guid: &str) -> Result<Option<Resource>> {
    let row = sqlx::query(
        r#"
        SELECT r.guid, r.chapter_id, r.title, r.kind, r.url, r.created_at
        FROM resources r
        JOIN chapters c ON c.guid = r.chapter_id
        JOIN subjects s ON s.guid = c.subject_id
        WHERE r.guid = ? AND s.user_id = ?
        "#,
    )
    .bind(guid)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| row_to_resource(&r)))
}

/// Resources of a chapter in insertion order
pub async fn list_for_chapter(pool: &SqlitePool, chapter_id: &str) -> Result<Vec<Resource>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, chapter_id, title, kind, url, created_at
        FROM resources
        WHERE chapter_id = ?
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(chapter_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_resource).collect())
}

pub async fn delete_resource(pool: &SqlitePool, guid: &str) -> Result<()> {
    sqlx::query("DELETE FROM resources WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;

    Ok(())
}
