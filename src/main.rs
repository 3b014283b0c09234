//! College Directory Backend
//!
//! Admin REST backend for colleges, entrance exams and announcements, with
//! SQLite persistence and AI-assisted drafting of exam content.

mod api;
mod config;
mod coordinator;
mod db;
mod errors;
mod generation;
mod models;
mod registry;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};
use coordinator::{Coordinator, RetryPolicy};
use db::{BlobSettings, SqliteStore, TableStore};
use generation::{Completion, ContentGenerator, GeminiClient};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    /// Absent when no completion service is configured
    pub generator: Option<Arc<ContentGenerator>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn TableStore>,
        completion: Option<Arc<dyn Completion>>,
    ) -> Self {
        let retry = RetryPolicy::new(config.store_retry_attempts, Duration::from_millis(100));
        Self {
            coordinator: Arc::new(Coordinator::new(store, retry)),
            generator: completion.map(|c| Arc::new(ContentGenerator::new(c))),
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => subscriber.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting College Directory Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Blob directory: {:?}", config.blob_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database and blob storage
    let pool = db::init_database(&config.db_path, config.upstream_timeout).await?;
    tokio::fs::create_dir_all(&config.blob_dir).await?;
    let store = SqliteStore::new(
        pool,
        BlobSettings {
            root: config.blob_dir.clone(),
            public_base_url: config.public_base_url.clone(),
        },
    );

    // Completion service
    let completion: Option<Arc<dyn Completion>> = match &config.gemini_api_key {
        Some(api_key) => Some(Arc::new(GeminiClient::new(
            &config.gemini_base_url,
            &config.gemini_model,
            api_key.clone(),
            config.upstream_timeout,
        )?)),
        None => {
            tracing::warn!(
                "No completion API key configured (DIRECTORY_GEMINI_API_KEY). Content generation is disabled!"
            );
            None
        }
    };

    let state = AppState::new(config.clone(), Arc::new(store), completion);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Colleges
        .route(
            "/colleges",
            post(api::create_college).get(api::list_colleges),
        )
        .route("/colleges/all", get(api::list_all_colleges))
        .route(
            "/colleges/{uuid}/{category}",
            get(api::get_college)
                .put(api::update_college)
                .delete(api::delete_college),
        )
        // Standalone exams
        .route("/exams", get(api::list_exams).post(api::create_exam))
        .route("/exams/generate", post(api::generate_exam_content))
        .route(
            "/exams/{uuid}",
            get(api::get_exam)
                .put(api::update_exam)
                .delete(api::delete_exam),
        )
        // College-specific exams
        .route(
            "/college-exams",
            get(api::list_college_exams).post(api::create_college_exam),
        )
        .route(
            "/college-exams/{uuid}",
            get(api::get_college_exam)
                .put(api::update_college_exam)
                .delete(api::delete_college_exam),
        )
        // Announcements
        .route(
            "/announcements",
            get(api::list_announcements).post(api::create_announcement),
        )
        .route(
            "/announcements/{id}",
            put(api::update_announcement).delete(api::delete_announcement),
        );

    // Health check and uploaded blobs
    let health_routes = Router::new().route("/health", get(health_check));
    let blobs = ServeDir::new(&state.config.blob_dir);

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .nest_service("/storage", blobs)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
