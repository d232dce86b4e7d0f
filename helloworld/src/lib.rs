pub mod config;
pub mod disk;
pub mod dummy;
pub mod error;
pub mod handlers;

use axum::{routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;

pub use config::ServerConfig;
pub use error::AppError;

pub struct AppState {
    pub name: String,
    pub du_path: PathBuf,
    pub dummy_dir: PathBuf,
}

impl From<&ServerConfig> for AppState {
    fn from(config: &ServerConfig) -> Self {
        Self {
            name: config.name.clone(),
            du_path: config.du_path.clone(),
            dummy_dir: config.dummy_dir.clone(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::hello))
        .route("/du", get(handlers::disk_usage))
        .route("/dummy", get(handlers::dummy_stats))
        .route("/api-docs/openapi.json", get(handlers::openapi))
        .fallback(handlers::dummy_action)
        .with_state(state)
}
