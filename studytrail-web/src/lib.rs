//! studytrail-web library - HTTP service for the study tracker
//!
//! Subjects own chapters; chapters own tasks and uploaded resources; streaks
//! and study sessions hang off the user. All state lives in SQLite under the
//! resolved root folder.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

use api::session_middleware::SessionLayer;
use services::llm_client::LlmClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Root folder holding the database and uploads
    pub root_folder: PathBuf,
    /// Chat-completions client
    pub llm: Arc<LlmClient>,
    /// Upload size cap, loaded from settings at startup
    pub upload_max_bytes: usize,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        root_folder: PathBuf,
        llm: Arc<LlmClient>,
        upload_max_bytes: usize,
    ) -> Self {
        Self {
            db,
            root_folder,
            llm,
            upload_max_bytes,
        }
    }
}

/// Build application router
///
/// Protected routes sit behind the session layer; registration, login,
/// health, and static uploads are public.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/me", get(api::auth::me))
        .route(
            "/api/subjects",
            get(api::subjects::list_subjects).post(api::subjects::create_subject),
        )
        .route(
            "/api/subjects/:subject_id",
            get(api::subjects::get_subject).delete(api::subjects::delete_subject),
        )
        .route("/api/chapters", post(api::chapters::create_chapter))
        .route(
            "/api/chapters/:chapter_id",
            get(api::chapters::get_chapter).delete(api::chapters::delete_chapter),
        )
        .route(
            "/api/chapters/:chapter_id/complete",
            post(api::chapters::toggle_complete),
        )
        .route("/api/tasks", post(api::tasks::create_task))
        .route("/api/tasks/:task_id/toggle", post(api::tasks::toggle))
        .route("/api/tasks/:task_id", delete(api::tasks::delete_task))
        .route("/api/resources/upload", post(api::resources::upload))
        .route(
            "/api/resources/:resource_id",
            delete(api::resources::delete_resource),
        )
        .route("/api/study/checkin", post(api::study::checkin))
        .route("/api/study/session", post(api::study::record_session))
        .route("/api/study/streak", get(api::study::streak))
        .route("/api/study/progress", get(api::study::progress))
        .route("/api/ai/intuition", post(api::ai::generate_intuition))
        .route("/api/ai/tasks", post(api::ai::generate_tasks))
        .route(
            "/api/ai/subject-overview",
            get(api::ai::get_subject_overview).post(api::ai::generate_subject_overview),
        )
        .route(
            "/api/ai/transitions",
            get(api::ai::get_transitions).post(api::ai::generate_transitions),
        )
        .route("/api/admin/stats", get(api::admin::stats))
        .layer(SessionLayer {
            pool: state.db.clone(),
        });

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/auth/register", post(api::auth::register))
        .route("/api/auth/login", post(api::auth::login))
        .merge(api::health::health_routes())
        .nest_service(
            "/uploads",
            ServeDir::new(studytrail_common::config::uploads_dir(&state.root_folder)),
        );

    // Body limit covers the upload cap plus multipart framing overhead
    let body_limit = state.upload_max_bytes + 64 * 1024;

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
}
