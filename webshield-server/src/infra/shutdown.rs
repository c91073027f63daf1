use tokio::signal;
use tracing::{error, info};

use webshield_core::scan::JobController;

/// Resolve on Ctrl+C or SIGTERM, then stop every live scan so no scanner
/// process group outlives the server.
pub async fn shutdown_signal(controller: JobController) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }

    let stopped = controller.stop_all();
    if stopped > 0 {
        info!(stopped, "stopped running scans");
    }
}
