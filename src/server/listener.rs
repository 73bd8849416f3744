use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::gateway::Gateway;
use crate::http::connection::Connection;

/// Binds the configured port and serves until the task is dropped.
///
/// Failing to bind is the only fatal error.
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    serve(listener, Arc::new(Gateway::new(cfg))).await
}

/// Accepts connections on `listener` and handles each in its own task.
///
/// This is the process-wide error boundary. A connection that fails or
/// panics is logged and dropped; the accept loop keeps going. A panic may
/// leave that connection's state inconsistent but nothing else, because
/// connections share only the read-only gateway.
pub async fn serve(listener: TcpListener, gateway: Arc<Gateway>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                // Usually fd exhaustion; back off instead of spinning
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };
        debug!("Accepted connection from {}", peer);

        let gateway = gateway.clone();
        let task = tokio::spawn(async move {
            let mut conn = Connection::new(socket, gateway);
            if let Err(e) = conn.run().await {
                warn!("Connection error from {}: {:#}", peer, e);
            }
        });

        tokio::spawn(async move {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!("Connection task for {} panicked, continuing to serve", peer);
                }
            }
        });
    }
}
