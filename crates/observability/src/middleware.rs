//! Request-Timing Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage und schreibt sie als
//! strukturiertes Log-Event und in die Prometheus-Histogramme.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;

use crate::metrics::KlangwerkMetriken;

/// Erstellt den Trace-Layer fuer HTTP-Anfragen
pub fn request_timing_layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    tower_http::trace::TraceLayer::new_for_http()
}

/// Axum-Middleware: misst Antwortzeit, loggt und zaehlt
///
/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn_with_state(metriken, timing_middleware))
/// ```
pub async fn timing_middleware(
    State(metriken): State<KlangwerkMetriken>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let methode = req.method().to_string();
    // Routenmuster statt konkretem Pfad, damit IDs keine Label-Explosion ausloesen
    let pfad = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let start = Instant::now();

    let response = next.run(req).await;

    let dauer = start.elapsed();
    let status = response.status().as_u16();

    metriken
        .http_requests_total
        .with_label_values(&[&methode, &pfad, &status.to_string()])
        .inc();
    metriken
        .http_request_duration_seconds
        .with_label_values(&[&methode, &pfad])
        .observe(dauer.as_secs_f64());

    tracing::debug!(
        method = %methode,
        path = %pfad,
        status = status,
        duration_ms = dauer.as_millis() as u64,
        "HTTP-Anfrage abgeschlossen"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn anfrage_wird_gezaehlt() {
        let metriken = KlangwerkMetriken::neu().unwrap();
        let app = Router::new()
            .route("/v4/sessions/:id", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                metriken.clone(),
                timing_middleware,
            ));

        let antwort = app
            .oneshot(
                Request::get("/v4/sessions/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(antwort.status(), 200);

        let wert = metriken
            .http_requests_total
            .with_label_values(&["GET", "/v4/sessions/:id", "200"])
            .get();
        assert_eq!(wert, 1);
    }
}
