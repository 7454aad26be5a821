//! HTTP scrape endpoint for metric-only mode.
//!
//! Provides the following endpoints:
//! - `GET /metrics` - Prometheus-formatted counters
//! - `GET /health` - Liveness probe (always returns 200 OK)

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use tracing::{debug, error, info};

use crate::metrics::PromCounters;

/// Handle returned by [`start`]. The server lives until the process exits.
pub struct ScrapeHandle {
    pub local_addr: SocketAddr,
    pub join_handle: JoinHandle<()>,
}

/// Bind `address` and serve the scrape endpoint from a dedicated thread.
///
/// Binding happens on the calling thread so an unusable address is reported
/// before any input is read.
pub fn start(address: SocketAddr, counters: Arc<PromCounters>) -> std::io::Result<ScrapeHandle> {
    let listener = TcpListener::bind(address)?;
    start_with_listener(listener, counters)
}

/// Serve the scrape endpoint on an already bound listener.
pub fn start_with_listener(
    listener: TcpListener,
    counters: Arc<PromCounters>,
) -> std::io::Result<ScrapeHandle> {
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;

    let join_handle = thread::Builder::new()
        .name("scrape".to_string())
        .spawn(move || {
            // A single-threaded runtime keeps the scrape server off the worker threads.
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("failed to create scrape runtime: {}", e);
                    return;
                }
            };

            rt.block_on(serve(listener, counters));
        })?;

    Ok(ScrapeHandle {
        local_addr,
        join_handle,
    })
}

async fn serve(listener: TcpListener, counters: Arc<PromCounters>) {
    let listener = match tokio::net::TcpListener::from_std(listener) {
        Ok(l) => l,
        Err(e) => {
            error!("failed to register scrape listener: {}", e);
            return;
        }
    };

    if let Ok(addr) = listener.local_addr() {
        info!("serving metrics on http://{}/metrics", addr);
    }

    if let Err(e) = axum::serve(listener, router(counters)).await {
        error!("scrape server error: {}", e);
    }

    debug!("scrape server stopped");
}

pub fn router(counters: Arc<PromCounters>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(counters)
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics_handler(State(counters): State<Arc<PromCounters>>) -> impl IntoResponse {
    match counters.gather() {
        Ok(output) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            error!("failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; charset=utf-8")],
                e.to_string(),
            )
        }
    }
}
