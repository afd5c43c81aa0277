//! Study sessions, streaks, and progress aggregation

use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use studytrail_common::streak::{advance, StreakAdvance, StreakState};
use studytrail_common::Result;
use uuid::Uuid;

/// Stored streak row
#[derive(Debug, Clone, serde::Serialize)]
pub struct StreakRow {
    pub current_streak: i64,
    pub last_study_date: Option<String>,
}

/// Aggregated progress numbers for the caller
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressStats {
    pub total_subjects: i64,
    pub total_chapters: i64,
    pub completed_chapters: i64,
    pub chapters_with_intuition: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub total_study_minutes: i64,
    pub current_streak: i64,
    pub last_study_date: Option<String>,
    pub subjects: Vec<SubjectProgress>,
}

/// Per-subject completion breakdown
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubjectProgress {
    pub guid: String,
    pub title: String,
    pub chapter_count: i64,
    pub completed_chapters: i64,
}

/// Record a timed study session
pub async fn record_study_session(
    pool: &SqlitePool,
    user_id: &str,
    chapter_id: Option<&str>,
    duration_minutes: i64,
) -> Result<String> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO study_sessions (guid, user_id, chapter_id, duration_minutes)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(user_id)
    .bind(chapter_id)
    .bind(duration_minutes)
    .execute(pool)
    .await?;

    Ok(guid)
}

pub async fn load_streak(pool: &SqlitePool, user_id: &str) -> Result<Option<StreakRow>> {
    let row = sqlx::query(
        "SELECT current_streak, last_study_date FROM streaks WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| StreakRow {
        current_streak: r.get("current_streak"),
        last_study_date: r.get("last_study_date"),
    }))
}

/// Apply a check-in for `today`, persisting whatever the advance decides
pub async fn check_in(pool: &SqlitePool, user_id: &str, today: NaiveDate) -> Result<StreakAdvance> {
    let stored = load_streak(pool, user_id).await?;

    let state = stored.as_ref().and_then(|row| {
        let last = row.last_study_date.as_deref()?;
        let last = NaiveDate::parse_from_str(last, "%Y-%m-%d").ok()?;
        Some(StreakState {
            current_streak: row.current_streak,
            last_study_date: last,
        })
    });

    let outcome = advance(state, today);

    if let Some(new_streak) = outcome.new_streak() {
        let today_str = today.format("%Y-%m-%d").to_string();

        if stored.is_some() {
            sqlx::query(
                r#"
                UPDATE streaks
                SET current_streak = ?, last_study_date = ?, updated_at = CURRENT_TIMESTAMP
                WHERE user_id = ?
                "#,
            )
            .bind(new_streak)
            .bind(&today_str)
            .bind(user_id)
            .execute(pool)
            .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO streaks (guid, user_id, current_streak, last_study_date)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(new_streak)
            .bind(&today_str)
            .execute(pool)
            .await?;
        }
    }

    Ok(outcome)
}

/// Aggregate the caller's progress numbers
pub async fn progress_stats(pool: &SqlitePool, user_id: &str) -> Result<ProgressStats> {
    let totals = sqlx::query(
        r#"
        SELECT COUNT(DISTINCT s.guid) AS total_subjects,
               COUNT(DISTINCT c.guid) AS total_chapters,
               COUNT(DISTINCT CASE WHEN c.is_completed = 1 THEN c.guid END) AS completed_chapters,
               COUNT(DISTINCT CASE WHEN c.intuition IS NOT NULL THEN c.guid END) AS chapters_with_intuition,
               COUNT(DISTINCT t.guid) AS total_tasks,
               COUNT(DISTINCT CASE WHEN t.is_completed = 1 THEN t.guid END) AS completed_tasks
        FROM subjects s
        LEFT JOIN chapters c ON c.subject_id = s.guid
        LEFT JOIN tasks t ON t.chapter_id = c.guid
        WHERE s.user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let total_study_minutes: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(duration_minutes), 0) FROM study_sessions WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let streak = load_streak(pool, user_id).await?;

    let subject_rows = sqlx::query(
        r#"
        SELECT s.guid, s.title,
               COUNT(c.guid) AS chapter_count,
               COALESCE(SUM(c.is_completed), 0) AS completed_chapters
        FROM subjects s
        LEFT JOIN chapters c ON c.subject_id = s.guid
        WHERE s.user_id = ?
        GROUP BY s.guid
        ORDER BY s.created_at DESC, s.rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(ProgressStats {
        total_subjects: totals.get("total_subjects"),
        total_chapters: totals.get("total_chapters"),
        completed_chapters: totals.get("completed_chapters"),
        chapters_with_intuition: totals.get("chapters_with_intuition"),
        total_tasks: totals.get("total_tasks"),
        completed_tasks: totals.get("completed_tasks"),
        total_study_minutes,
        current_streak: streak.as_ref().map(|s| s.current_streak).unwrap_or(0),
        last_study_date: streak.and_then(|s| s.last_study_date),
        subjects: subject_rows
            .iter()
            .map(|r| SubjectProgress {
                guid: r.get("guid"),
                title: r.get("title"),
                chapter_count: r.get("chapter_count"),
                completed_chapters: r.get("completed_chapters"),
            })
            .collect(),
    })
}

/// Instance-wide numbers for the admin dashboard
#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_subjects: i64,
    pub total_study_minutes: i64,
    pub users: Vec<AdminUserRow>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminUserRow {
    pub guid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub subject_count: i64,
    pub study_minutes: i64,
    pub current_streak: i64,
}

pub async fn admin_stats(pool: &SqlitePool) -> Result<AdminStats> {
    let rows = sqlx::query(
        r#"
        SELECT u.guid, u.email, u.display_name,
               (SELECT COUNT(*) FROM subjects s WHERE s.user_id = u.guid) AS subject_count,
               (SELECT COALESCE(SUM(ss.duration_minutes), 0)
                  FROM study_sessions ss WHERE ss.user_id = u.guid) AS study_minutes,
               (SELECT COALESCE(MAX(st.current_streak), 0)
                  FROM streaks st WHERE st.user_id = u.guid) AS current_streak
        FROM users u
        ORDER BY u.created_at DESC, u.rowid DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let users: Vec<AdminUserRow> = rows
        .iter()
        .map(|r| AdminUserRow {
            guid: r.get("guid"),
            email: r.get("email"),
            display_name: r.get("display_name"),
            subject_count: r.get("subject_count"),
            study_minutes: r.get("study_minutes"),
            current_streak: r.get("current_streak"),
        })
        .collect();

    Ok(AdminStats {
        total_users: users.len() as i64,
        total_subjects: users.iter().map(|u| u.subject_count).sum(),
        total_study_minutes: users.iter().map(|u| u.study_minutes).sum(),
        users,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::chapters::{create_chapter, set_intuition, toggle_completed};
    use crate::db::subjects::create_subject;
    use crate::db::tasks::{create_task, toggle_task};
    use crate::db::test_support::memory_pool;
    use crate::db::users::create_user;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn check_in_lifecycle() {
        let pool = memory_pool().await;
        let user = create_user(&pool, "ada@example.com", None, "h", "s").await.unwrap();

        let outcome = check_in(&pool, &user, date(2025, 3, 10)).await.unwrap();
        assert_eq!(outcome, StreakAdvance::Started);

        let outcome = check_in(&pool, &user, date(2025, 3, 10)).await.unwrap();
        assert_eq!(outcome, StreakAdvance::AlreadyCheckedIn);

        let outcome = check_in(&pool, &user, date(2025, 3, 11)).await.unwrap();
        assert_eq!(outcome, StreakAdvance::Incremented { new_streak: 2 });

        let outcome = check_in(&pool, &user, date(2025, 3, 14)).await.unwrap();
        assert_eq!(outcome, StreakAdvance::Reset);

        let streak = load_streak(&pool, &user).await.unwrap().unwrap();
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.last_study_date.as_deref(), Some("2025-03-14"));
    }

    #[tokio::test]
    async fn progress_stats_aggregate() {
        let pool = memory_pool().await;
        let user = create_user(&pool, "ada@example.com", None, "h", "s").await.unwrap();

        let subject = create_subject(&pool, &user, "Calculus", "calculus", None)
            .await
            .unwrap();
        let ch1 = create_chapter(&pool, &subject, "Limits", "limits").await.unwrap();
        let ch2 = create_chapter(&pool, &subject, "Derivatives", "derivatives")
            .await
            .unwrap();

        toggle_completed(&pool, &ch1).await.unwrap();
        set_intuition(&pool, &ch1, "The big picture").await.unwrap();

        let t1 = create_task(&pool, &ch1, "Read").await.unwrap();
        create_task(&pool, &ch2, "Practice").await.unwrap();
        toggle_task(&pool, &t1).await.unwrap();

        record_study_session(&pool, &user, Some(&ch1), 25).await.unwrap();
        record_study_session(&pool, &user, None, 15).await.unwrap();

        let stats = progress_stats(&pool, &user).await.unwrap();
        assert_eq!(stats.total_subjects, 1);
        assert_eq!(stats.total_chapters, 2);
        assert_eq!(stats.completed_chapters, 1);
        assert_eq!(stats.chapters_with_intuition, 1);
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.total_study_minutes, 40);
        assert_eq!(stats.subjects.len(), 1);
        assert_eq!(stats.subjects[0].chapter_count, 2);
    }
}
