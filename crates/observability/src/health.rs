//! Health-Check-Endpunkt fuer Klangwerk
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Bereitschaft

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    /// Nimmt der Server neue Sessions an?
    pub bereit: bool,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    bereit: Arc<AtomicBool>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            bereit: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Uptime in Millisekunden (fuer Stats)
    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn ist_bereit(&self) -> bool {
        self.bereit.load(Ordering::Relaxed)
    }

    /// Beim Herunterfahren auf `false` setzen
    pub fn bereit_setzen(&self, bereit: bool) {
        self.bereit.store(bereit, Ordering::Relaxed);
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let bereit = state.ist_bereit();
    let status = if bereit {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        bereit,
    };

    // 200 auch bei degraded (Probe soll nicht failen)
    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn health_state_frisch_bereit() {
        let state = HealthState::neu();
        assert!(state.uptime_seconds() < 5);
        assert!(state.ist_bereit());
    }

    #[test]
    fn health_state_bereitschaft_umschalten() {
        let state = HealthState::neu();
        state.bereit_setzen(false);
        assert!(!state.ist_bereit());
        state.bereit_setzen(true);
        assert!(state.ist_bereit());
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            bereit: true,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"bereit\":true"));
    }

    #[tokio::test]
    async fn health_endpunkt_degraded_beim_herunterfahren() {
        let state = HealthState::neu();
        state.bereit_setzen(false);
        let antwort = health_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.status, HealthStatus::Degraded);
    }
}
