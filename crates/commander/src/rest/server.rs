//! Axum HTTP-Server fuer den Commander

use std::net::SocketAddr;

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use klangwerk_observability::request_timing_layer;

use crate::rest::{routes::router, CommanderState};

/// Standard-Port fuer REST und WebSocket
pub const STANDARD_PORT: u16 = 2333;

/// REST-Server-Konfiguration
#[derive(Debug, Clone)]
pub struct RestServerKonfig {
    pub bind_addr: SocketAddr,
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt.
    pub cors_origins: Vec<String>,
}

impl Default for RestServerKonfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], STANDARD_PORT)),
            cors_origins: vec![],
        }
    }
}

/// Axum HTTP-Server fuer REST und WebSocket
pub struct RestServer {
    konfig: RestServerKonfig,
}

impl RestServer {
    pub fn neu(konfig: RestServerKonfig) -> Self {
        Self { konfig }
    }

    fn cors(&self) -> CorsLayer {
        if self.konfig.cors_origins.is_empty() {
            return CorsLayer::permissive();
        }
        let origins: Vec<HeaderValue> = self
            .konfig
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(tower_http::cors::Any)
    }

    /// Startet den Server und laeuft bis zum Shutdown-Signal
    pub async fn starten(self, state: CommanderState) -> Result<()> {
        let mut shutdown_rx: watch::Receiver<bool> = state.shutdown_rx.clone();
        let app = router(state)
            .layer(request_timing_layer())
            .layer(self.cors());

        let listener = tokio::net::TcpListener::bind(self.konfig.bind_addr).await?;
        tracing::info!(addr = %self.konfig.bind_addr, "REST-Server gestartet");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                while shutdown_rx.changed().await.is_ok() {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            })
            .await?;
        tracing::info!("REST-Server beendet");
        Ok(())
    }
}
