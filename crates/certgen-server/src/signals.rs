//! Signal handling for graceful shutdown.
//!
//! - SIGTERM/SIGINT (Ctrl-C): stop accepting connections and let in-flight
//!   requests finish

use tracing::{error, info};

/// Completes when the process is asked to shut down.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, initiating shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating shutdown"),
    }
}
