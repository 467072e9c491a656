//! HTTP server bootstrap for the capability gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::routes::{self, GatewayState};
use crate::{AppError, Result};

/// Bind `addr` and serve the gateway until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the listener fails to bind or the
/// server loop fails.
pub async fn serve(state: Arc<GatewayState>, addr: SocketAddr, ct: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind gateway on {addr}: {err}")))?;
    serve_on(listener, state, ct).await
}

/// Serve the gateway on an already-bound listener until `ct` is
/// cancelled.
///
/// Split out from [`serve`] so tests can bind an ephemeral port first.
///
/// # Errors
///
/// Returns `AppError::Config` if the server loop fails.
pub async fn serve_on(
    listener: TcpListener,
    state: Arc<GatewayState>,
    ct: CancellationToken,
) -> Result<()> {
    let router = routes::build_router(state);
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "starting capability gateway");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
        })
        .await
        .map_err(|err| AppError::Config(format!("gateway server error: {err}")))?;

    info!("capability gateway shut down");
    Ok(())
}
