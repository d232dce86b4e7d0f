use crate::error::AppError;
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Who `GET /` greets
    pub name: String,
    /// Filesystem reported by `GET /du`
    pub du_path: PathBuf,
    /// Where dummy files are created and counted
    pub dummy_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            name: "World".to_string(),
            du_path: PathBuf::from("/tmp"),
            dummy_dir: PathBuf::from("/tmp/dummy"),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();

        match var("PORT") {
            Some(port) => {
                config.port = port
                    .parse()
                    .map_err(|_| AppError::Config(format!("invalid PORT: {}", port)))?;
            }
            None => info!("defaulting to port {}", config.port),
        }
        if let Some(name) = var("NAME") {
            config.name = name;
        }
        if let Some(path) = var("DU_PATH") {
            config.du_path = PathBuf::from(path);
        }
        if let Some(dir) = var("DUMMY_DIR") {
            config.dummy_dir = PathBuf::from(dir);
        }

        Ok(config)
    }
}
