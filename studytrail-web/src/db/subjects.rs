//! Subject persistence
//!
//! Every query is scoped to the owning user; a row another user owns is
//! indistinguishable from a missing row.

use sqlx::{Row, SqlitePool};
use studytrail_common::db::models::Subject;
use studytrail_common::Result;
use uuid::Uuid;

/// Listing entry: subject plus chapter progress counts
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubjectSummary {
    #[serde(flatten)]
    pub subject: Subject,
    pub chapter_count: i64,
    pub completed_chapters: i64,
}

fn row_to_subject(row: &sqlx::sqlite::SqliteRow) -> Subject {
    Subject {
        guid: row.get("guid"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        overview: row.get("overview"),
        overview_generated_at: row.get("overview_generated_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn slug_exists(pool: &SqlitePool, user_id: &str, slug: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM subjects WHERE user_id = ? AND slug = ?)")
            .bind(user_id)
            .bind(slug)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

pub async fn create_subject(
    pool: &SqlitePool,
    user_id: &str,
    title: &str,
    slug: &str,
    description: Option<&str>,
) -> Result<String> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO subjects (guid, user_id, title, slug, description)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(user_id)
    .bind(title)
    .bind(slug)
    .bind(description)
    .execute(pool)
    .await?;

    Ok(guid)
}

pub async fn load_subject(pool: &SqlitePool, user_id: &str, guid: &str) -> Result<Option<Subject>> {
    let row = sqlx::query(
        r#"
        SELECT guid, user_id, title, slug, description, overview, overview_generated_at,
               created_at, updated_at
        FROM subjects
        WHERE guid = ? AND user_id = ?
        "#,
    )
    .bind(guid)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| row_to_subject(&r)))
}

/// List the user's subjects with chapter counts, newest first
pub async fn list_subjects(pool: &SqlitePool, user_id: &str) -> Result<Vec<SubjectSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT s.guid, s.user_id, s.title, s.slug, s.description, s.overview,
               s.overview_generated_at, s.created_at, s.updated_at,
               COUNT(c.guid) AS chapter_count,
               COALESCE(SUM(c.is_completed), 0) AS completed_chapters
        FROM subjects s
        LEFT JOIN chapters c ON c.subject_id = s.guid
        WHERE s.user_id = ?
        GROUP BY s.guid
        ORDER BY s.created_at DESC, s.guid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| SubjectSummary {
            subject: row_to_subject(r),
            chapter_count: r.get("chapter_count"),
            completed_chapters: r.get("completed_chapters"),
        })
        .collect())
}

/// Delete an owned subject; returns false when nothing matched
pub async fn delete_subject(pool: &SqlitePool, user_id: &str, guid: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM subjects WHERE guid = ? AND user_id = ?")
        .bind(guid)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Store a generated overview
///
/// Stamps overview_generated_at but deliberately not updated_at: staleness
/// detection compares the two.
pub async fn set_overview(pool: &SqlitePool, guid: &str, overview: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE subjects
        SET overview = ?, overview_generated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(overview)
    .bind(guid)
    .execute(pool)
    .await?;

    Ok(())
}

/// Bump updated_at after structural changes (chapter added/removed)
pub async fn touch_subject(pool: &SqlitePool, guid: &str) -> Result<()> {
    sqlx::query("UPDATE subjects SET updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;

    Ok(())
}

/// Whether the stored overview predates the latest subject change
pub fn needs_regeneration(subject: &Subject) -> bool {
    match &subject.overview_generated_at {
        // CURRENT_TIMESTAMP strings sort chronologically
        Some(generated_at) => subject.updated_at > *generated_at,
        None => true,
    }
}
