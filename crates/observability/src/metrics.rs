//! Prometheus-kompatible Metriken fuer Klangwerk
//!
//! Registrierte Metriken:
//! - `klangwerk_sessions` – Gauge: Aktive Sessions
//! - `klangwerk_players` – Gauge: Player aller Sessions
//! - `klangwerk_playing_players` – Gauge: Spielende, nicht pausierte Player
//! - `klangwerk_frames_sent_total` – Counter: An den Transport gelieferte Frames
//! - `klangwerk_frames_nulled_total` – Counter: Takte ohne verfuegbaren Frame
//! - `klangwerk_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `klangwerk_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Klangwerk-Prometheus-Metriken
#[derive(Clone)]
pub struct KlangwerkMetriken {
    pub registry: Arc<Registry>,

    // Session-/Player-Metriken
    pub sessions: IntGauge,
    pub players: IntGauge,
    pub playing_players: IntGauge,

    // Frame-Metriken
    pub frames_sent_total: IntCounter,
    pub frames_nulled_total: IntCounter,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl KlangwerkMetriken {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let sessions = IntGauge::with_opts(Opts::new(
            "klangwerk_sessions",
            "Anzahl aktiver Client-Sessions",
        ))?;
        registry.register(Box::new(sessions.clone()))?;

        let players = IntGauge::with_opts(Opts::new(
            "klangwerk_players",
            "Anzahl Player ueber alle Sessions",
        ))?;
        registry.register(Box::new(players.clone()))?;

        let playing_players = IntGauge::with_opts(Opts::new(
            "klangwerk_playing_players",
            "Anzahl spielender, nicht pausierter Player",
        ))?;
        registry.register(Box::new(playing_players.clone()))?;

        let frames_sent_total = IntCounter::with_opts(Opts::new(
            "klangwerk_frames_sent_total",
            "Gesamtanzahl gelieferter Audio-Frames",
        ))?;
        registry.register(Box::new(frames_sent_total.clone()))?;

        let frames_nulled_total = IntCounter::with_opts(Opts::new(
            "klangwerk_frames_nulled_total",
            "Gesamtanzahl Takte ohne Audio-Frame",
        ))?;
        registry.register(Box::new(frames_nulled_total.clone()))?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("klangwerk_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "klangwerk_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            sessions,
            players,
            playing_players,
            frames_sent_total,
            frames_nulled_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: KlangwerkMetriken) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<KlangwerkMetriken>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(fehler = %err, "Metriken-Export fehlgeschlagen");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
