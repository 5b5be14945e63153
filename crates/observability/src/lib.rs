//! # klangwerk-observability
//!
//! Observability-Crate fuer Klangwerk:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber (text/json)
//! - Request-Timing Middleware
//! - CPU- und Speicherdaten fuer die Stats-Nachricht

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod system;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, KlangwerkMetriken};
pub use middleware::{request_timing_layer, timing_middleware};
pub use system::{SystemMonitor, SystemSchnappschuss};

use anyhow::Result;
use std::net::SocketAddr;

/// Startet den Observability-HTTP-Server (Metriken + Health)
///
/// Endpunkte:
/// - `GET /metrics` – Prometheus scrape format
/// - `GET /health`  – Health-Check JSON
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    metriken: KlangwerkMetriken,
    health: HealthState,
) -> Result<()> {
    use axum::Router;

    let app = Router::new()
        .merge(metrics_router(metriken))
        .merge(health_router(health));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app).await?;
    Ok(())
}
