//! Chapter persistence
//!
//! Ownership runs through the subject: every lookup joins subjects and
//! filters on its user_id.

use sqlx::{Row, SqlitePool};
use studytrail_common::db::models::Chapter;
use studytrail_common::Result;
use uuid::Uuid;

/// Chapter plus the owning subject's title (context for AI prompts)
#[derive(Debug, Clone)]
pub struct ChapterWithSubject {
    pub chapter: Chapter,
    pub subject_title: String,
}

fn row_to_chapter(row: &sqlx::sqlite::SqliteRow) -> Chapter {
    Chapter {
        guid: row.get("guid"),
        subject_id: row.get("subject_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        intuition: row.get("intuition"),
        task_flow_transitions: row.get("task_flow_transitions"),
        is_completed: row.get::<i64, _>("is_completed") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn slug_exists(pool: &SqlitePool, subject_id: &str, slug: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM chapters WHERE subject_id = ? AND slug = ?)",
    )
    .bind(subject_id)
    .bind(slug)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

pub async fn create_chapter(
    pool: &SqlitePool,
    subject_id: &str,
    title: &str,
    slug: &str,
) -> Result<String> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO chapters (guid, subject_id, title, slug) VALUES (?, ?, ?, ?)")
        .bind(&guid)
        .bind(subject_id)
        .bind(title)
        .bind(slug)
        .execute(pool)
        .await?;

    Ok(guid)
}

/// Load an owned chapter together with its subject title
pub async fn load_chapter(
    pool: &SqlitePool,
    user_id: &str,
    guid: &str,
) -> Result<Option<ChapterWithSubject>> {
    let row = sqlx::query(
        r#"
        SELECT c.guid, c.subject_id, c.title, c.slug, c.intuition, c.task_flow_transitions,
               c.is_completed, c.created_at, c.updated_at,
               s.title AS subject_title
        FROM chapters c
        JOIN subjects s ON s.guid = c.subject_id
        WHERE c.guid = ? AND s.user_id = ?
        "#,
    )
    .bind(guid)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| ChapterWithSubject {
        chapter: row_to_chapter(&r),
        subject_title: r.get("subject_title"),
    }))
}

/// Chapters of a subject in insertion order
pub async fn list_for_subject(pool: &SqlitePool, subject_id: &str) -> Result<Vec<Chapter>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, subject_id, title, slug, intuition, task_flow_transitions,
               is_completed, created_at, updated_at
        FROM chapters
        WHERE subject_id = ?
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_chapter).collect())
}

/// Delete an owned chapter (cascades to tasks and resources)
pub async fn delete_chapter(pool: &SqlitePool, user_id: &str, guid: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM chapters
        WHERE guid = ? AND subject_id IN (SELECT guid FROM subjects WHERE user_id = ?)
        "#,
    )
    .bind(guid)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Toggle completion; returns the new state
pub async fn toggle_completed(pool: &SqlitePool, guid: &str) -> Result<bool> {
    sqlx::query(
        r#"
        UPDATE chapters
        SET is_completed = 1 - is_completed, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(guid)
    .execute(pool)
    .await?;

    let completed: i64 = sqlx::query_scalar("SELECT is_completed FROM chapters WHERE guid = ?")
        .bind(guid)
        .fetch_one(pool)
        .await?;

    Ok(completed != 0)
}

/// Store generated intuition text
pub async fn set_intuition(pool: &SqlitePool, guid: &str, intuition: &str) -> Result<()> {
    sqlx::query(
        "UPDATE chapters SET intuition = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(intuition)
    .bind(guid)
    .execute(pool)
    .await?;

    Ok(())
}

/// Store serialized task-flow transitions
pub async fn set_transitions(pool: &SqlitePool, guid: &str, transitions_json: &str) -> Result<()> {
    sqlx::query(
        "UPDATE chapters SET task_flow_transitions = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(transitions_json)
    .bind(guid)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::subjects::create_subject;
    use crate::db::test_support::memory_pool;
    use crate::db::users::create_user;

    async fn fixture(pool: &SqlitePool) -> (String, String) {
        let user = create_user(pool, "ada@example.com", None, "h", "s").await.unwrap();
        let subject = create_subject(pool, &user, "Calculus", "calculus", None)
            .await
            .unwrap();
        (user, subject)
    }

    #[tokio::test]
    async fn chapter_round_trip_and_toggle() {
        let pool = memory_pool().await;
        let (user, subject) = fixture(&pool).await;

        let guid = create_chapter(&pool, &subject, "Limits", "limits").await.unwrap();

        let loaded = load_chapter(&pool, &user, &guid).await.unwrap().unwrap();
        assert_eq!(loaded.chapter.title, "Limits");
        assert_eq!(loaded.subject_title, "Calculus");
        assert!(!loaded.chapter.is_completed);

        assert!(toggle_completed(&pool, &guid).await.unwrap());
        assert!(!toggle_completed(&pool, &guid).await.unwrap());
    }

    #[tokio::test]
    async fn other_users_cannot_see_or_delete() {
        let pool = memory_pool().await;
        let (_user, subject) = fixture(&pool).await;
        let bob = create_user(&pool, "bob@example.com", None, "h", "s").await.unwrap();

        let guid = create_chapter(&pool, &subject, "Limits", "limits").await.unwrap();

        assert!(load_chapter(&pool, &bob, &guid).await.unwrap().is_none());
        assert!(!delete_chapter(&pool, &bob, &guid).await.unwrap());
    }
}
