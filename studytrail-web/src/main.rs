//! studytrail-web - personal study tracker service
//!
//! Subjects, chapters, tasks, PDF resources, AI-assisted summaries, study
//! timer sessions, and a daily streak, served over HTTP with SQLite
//! persistence under a resolved root folder.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use studytrail_common::config;
use studytrail_common::db::init_database;
use studytrail_web::services::llm_client::LlmClient;
use studytrail_web::{build_router, AppState};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "studytrail-web", about = "Personal study tracker service")]
struct Args {
    /// Root folder for the database and uploads (overrides env/config)
    #[arg(long)]
    root_folder: Option<String>,

    /// Listen port (overrides the http_port setting)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting studytrail-web v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    // Root folder: CLI arg -> env var -> config file -> OS default
    let root_folder = config::resolve_root_folder(args.root_folder.as_deref());
    config::ensure_root_folder(&root_folder)?;

    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;

    let llm = Arc::new(LlmClient::from_settings(&pool).await?);

    let upload_max_bytes: usize =
        studytrail_common::db::init::get_setting_or(&pool, "upload_max_bytes", "20971520")
            .await?
            .parse()
            .unwrap_or(20 * 1024 * 1024);

    let listen = config::load_listen_config(&pool).await?;
    let port = args.port.unwrap_or(listen.port);

    let state = AppState::new(pool, root_folder, llm, upload_max_bytes);
    let app = build_router(state);

    let addr = format!("{}:{}", listen.host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("studytrail-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
