//! Database models
//!
//! Row shapes shared between the library and the web service. Timestamps are
//! stored as SQLite CURRENT_TIMESTAMP strings; streak dates as ISO dates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub guid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub guid: String,
    pub user_id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub overview: Option<String>,
    pub overview_generated_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub guid: String,
    pub subject_id: String,
    pub title: String,
    pub slug: String,
    pub intuition: Option<String>,
    pub task_flow_transitions: Option<String>,
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub guid: String,
    pub chapter_id: String,
    pub description: String,
    pub is_completed: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub guid: String,
    pub chapter_id: String,
    pub title: String,
    pub kind: String,
    pub url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    pub guid: String,
    pub user_id: String,
    pub chapter_id: Option<String>,
    pub duration_minutes: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Streak {
    pub guid: String,
    pub user_id: String,
    pub current_streak: i64,
    pub last_study_date: Option<String>,
}
