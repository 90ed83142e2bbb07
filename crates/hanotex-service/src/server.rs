//! Server setup and lifecycle management

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::routes::build_router;
use crate::state::ServiceState;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub struct Server {
    config: ServiceConfig,
    state: ServiceState,
}

impl Server {
    pub async fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let state = ServiceState::bootstrap(&config).await?;
        Ok(Self { config, state })
    }

    /// Serve until Ctrl+C or SIGTERM, then drain pending notifications.
    pub async fn run(self) -> ServiceResult<()> {
        let addr = self.config.server.listen_addr;
        let app = build_router(self.state.clone(), self.config.server.enable_cors);
        let listener = TcpListener::bind(addr).await?;

        info!(%addr, storage_backend = self.config.storage.label(), "hanotexd listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServiceError::Server(e.to_string()))?;

        info!("hanotexd shutting down, flushing notification outbox");
        if let Err(err) = self.state.outbox().flush().await {
            warn!(error = %err, "notification outbox could not be flushed");
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
