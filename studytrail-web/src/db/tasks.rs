//! Task persistence

use sqlx::{Row, SqlitePool};
use studytrail_common::db::models::Task;
use studytrail_common::Result;
use uuid::Uuid;

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Task {
    Task {
        guid: row.get("guid"),
        chapter_id: row.get("chapter_id"),
        description: row.get("description"),
        is_completed: row.get::<i64, _>("is_completed") != 0,
        created_at: row.get("created_at"),
    }
}

pub async fn create_task(pool: &SqlitePool, chapter_id: &str, description: &str) -> Result<String> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO tasks (guid, chapter_id, description) VALUES (?, ?, ?)")
        .bind(&guid)
        .bind(chapter_id)
        .bind(description)
        .execute(pool)
        .await?;

    Ok(guid)
}

/// Bulk insert generated tasks in order
pub async fn create_tasks(
    pool: &SqlitePool,
    chapter_id: &str,
    descriptions: &[String],
) -> Result<Vec<String>> {
    let mut guids = Vec::with_capacity(descriptions.len());

    for description in descriptions {
        guids.push(create_task(pool, chapter_id, description).await?);
    }

    Ok(guids)
}

/// Load an owned task (ownership via chapter -> subject -> user)
pub async fn load_task(pool: &SqlitePool, user_id: &str, guid: &str) -> Result<Option<Task>> {
    let row = sqlx::query(
        r#"
        SELECT t.guid, t.chapter_id, t.description, t.is_completed, t.created_at
        FROM tasks t
        JOIN chapters c ON c.guid = t.chapter_id
        JOIN subjects s ON s.guid = c.subject_id
        WHERE t.guid = ? AND s.user_id = ?
        "#,
    )
    .bind(guid)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| row_to_task(&r)))
}

/// Tasks of a chapter in insertion order
pub async fn list_for_chapter(pool: &SqlitePool, chapter_id: &str) -> Result<Vec<Task>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, chapter_id, description, is_completed, created_at
        FROM tasks
        WHERE chapter_id = ?
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(chapter_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_task).collect())
}

/// Flip completion; returns the new state
pub async fn toggle_task(pool: &SqlitePool, guid: &str) -> Result<bool> {
    sqlx::query(
        r#"
        UPDATE tasks
        SET is_completed = 1 - is_completed, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(guid)
    .execute(pool)
    .await?;

    let completed: i64 = sqlx::query_scalar("SELECT is_completed FROM tasks WHERE guid = ?")
        .bind(guid)
        .fetch_one(pool)
        .await?;

    Ok(completed != 0)
}

pub async fn delete_task(pool: &SqlitePool, guid: &str) -> Result<()> {
    sqlx::query("DELETE FROM tasks WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;

    Ok(())
}
