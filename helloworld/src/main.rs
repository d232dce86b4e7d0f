use helloworld::{router, AppError, AppState, ServerConfig};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// How long in-flight requests may take to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("starting server...");
    let config = ServerConfig::from_env()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(Arc::new(AppState::from(&config)));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on port {}", config.port);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => {
            // the listener died without being asked to stop
            result??;
            return Ok(());
        }
        caught = shutdown_signal() => {
            info!("{} signal caught", caught?);
        }
    }

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!("server shutdown failed: {}", e),
        Ok(Err(e)) => error!("server shutdown failed: {}", e),
        Err(_) => error!(
            "server shutdown failed: connections still open after {:?}",
            SHUTDOWN_GRACE
        ),
    }
    info!("server exited");

    Ok(())
}

// SIGINT for Ctrl+C locally, SIGTERM from the platform on scale-down.
async fn shutdown_signal() -> std::io::Result<&'static str> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            Ok("interrupt")
        }
        _ = terminate.recv() => Ok("terminated"),
    }
}
