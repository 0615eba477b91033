mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use config::{BackendKind, ServerConfig};
use services::feedback::{FeedbackRepository, MemoryFeedbackRepository, OfflineFeedbackRepository, PgFeedbackRepository};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env().expect("invalid configuration");
    let feedback = connect_repository(&config).await;
    let state = state::AppState::new(feedback);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "feedback service listening");
    axum::serve(listener, app).await.expect("server failed");
}

/// Pick the repository for the configured backend. A database that cannot be
/// reached is logged and replaced by the offline repository; there is no
/// retry.
async fn connect_repository(config: &ServerConfig) -> Arc<dyn FeedbackRepository> {
    match config.backend {
        BackendKind::Memory => {
            tracing::warn!("using in-memory feedback storage; records are lost on restart");
            Arc::new(MemoryFeedbackRepository::new())
        }
        BackendKind::Postgres => {
            let Some(database_url) = config.database_url.as_deref() else {
                tracing::error!("DATABASE_URL not set; feedback storage unavailable");
                return Arc::new(OfflineFeedbackRepository);
            };
            match db::init_pool(database_url, config.db_max_connections).await {
                Ok(pool) => {
                    tracing::info!("database connected");
                    Arc::new(PgFeedbackRepository::new(pool))
                }
                Err(e) => {
                    tracing::error!(error = %e, "database connection failed; feedback storage unavailable");
                    Arc::new(OfflineFeedbackRepository)
                }
            }
        }
    }
}
