use std::sync::Arc;

use console_bff::config::{Config, Mode};
use console_bff::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    // Panics inside connection tasks are contained by the listener; this
    // makes sure they reach the log instead of stderr only.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Unhandled panic");
    }));

    let mode = Mode::from_env();
    let cfg = Arc::new(Config::load(mode));
    tracing::info!(
        ?mode,
        env_file = mode.env_file(),
        backend = %cfg.backend_base_url,
        port = cfg.port,
        "Configuration loaded"
    );
    tracing::debug!(config = ?cfg, "Effective configuration");

    if cfg.backend_url.scheme() != "http" {
        tracing::warn!(
            backend = %cfg.backend_base_url,
            "Only plain http backends are supported, forwarded requests will fail with 502"
        );
    }

    tokio::select! {
        res = server::run(cfg) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
