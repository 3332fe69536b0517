use std::net::SocketAddr;
use std::sync::Arc;

use crate::router::{AppState, app_router};

pub async fn serve_http(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("lambda listening on {}", addr);
    axum::serve(listener, app_router(state)).await
}
