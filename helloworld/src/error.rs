use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to get disk usage at path: {0}")]
    DiskUsage(#[source] std::io::Error),

    #[error("dummy size limit({limit}MB) exceeded: {requested}MB")]
    SizeLimit { limit: u64, requested: u64 },

    #[error("failed to create dummy directory: {0}")]
    DummyDir(#[source] std::io::Error),

    #[error("failed to create dummy file: {0}")]
    CreateDummy(#[source] std::io::Error),

    #[error("failed to get stats: {0}")]
    Stats(#[source] std::io::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::SizeLimit { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_is_client_error() {
        let err = AppError::SizeLimit {
            limit: 512,
            requested: 600,
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "dummy size limit(512MB) exceeded: 600MB");
    }

    #[test]
    fn test_io_failures_are_server_errors() {
        let err = AppError::Stats(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("failed to get stats: "));
    }
}
