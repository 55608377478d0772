// SPDX-License-Identifier: MIT

//! `/livez`, `/readyz`, `/metrics` HTTP endpoints, shared by all three
//! services (§1 "Out of scope… Prometheus metrics wiring, liveness/readiness
//! HTTP endpoints", §7).

use crate::health::Health;
use crate::shutdown::shutdown_signal;
use axum::routing::get;
use axum::{http::StatusCode, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tokio::net::TcpListener;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[allow(clippy::expect_used)]
fn install_recorder_once() -> PrometheusHandle {
    PROM_HANDLE.get_or_init(|| PrometheusBuilder::new().install_recorder().expect("install global metrics recorder")).clone()
}

async fn readyz(health: Health) -> (StatusCode, &'static str) {
    if health.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

/// Build and serve the shared health/metrics app until a shutdown signal
/// arrives. Each service calls this from its own supervisor task.
pub async fn serve(bind_addr: &str, health: Health) -> std::io::Result<()> {
    let handle = install_recorder_once();
    let metrics_route = get(move || {
        let handle = handle.clone();
        async move { handle.render() }
    });

    let app = Router::new()
        .route("/livez", get(|| async { (StatusCode::OK, "ok") }))
        .route("/readyz", get({
            let health = health.clone();
            move || readyz(health.clone())
        }))
        .route("/metrics", metrics_route);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "health/metrics server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await
}
