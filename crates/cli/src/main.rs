use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use engine::{Config, InvocationSettings};
use http::{AppState, serve_http};
use platform::HostPlatform;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lambda=info,engine=info,http=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load configuration")?;
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let settings = InvocationSettings::from_config(&config, &cwd);

    tracing::info!("scratch root: {}", settings.scratch_root.display());
    tracing::info!("default storage root: {}", settings.default_storage_root.display());

    let state = Arc::new(AppState {
        platform: Arc::new(HostPlatform::default()),
        settings,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    serve_http(state, addr)
        .await
        .with_context(|| format!("Server error on {}", addr))?;

    Ok(())
}
