//! Axum-Middleware fuer Passwort-Pruefung und Fehlerantworten

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use klangwerk_protocol::ErrorResponse;

use crate::error::CommanderError;
use crate::rest::CommanderState;

/// Extrahiert den Client-IP aus den Request-Headern
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Liest den `Authorization`-Header (ohne Schema, nur das Passwort)
pub fn passwort_aus_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
}

/// Axum-Middleware: lehnt Anfragen mit falschem Passwort mit 401 ab
pub async fn passwort_middleware(
    State(state): State<CommanderState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match passwort_aus_headers(req.headers()) {
        Some(passwort) if passwort == &*state.passwort => next.run(req).await,
        angegeben => {
            tracing::warn!(
                ip = %client_ip(req.headers()),
                methode = %req.method(),
                pfad = %req.uri().path(),
                header_vorhanden = angegeben.is_some(),
                "Autorisierung fehlgeschlagen"
            );
            CommanderError::NichtAutorisiert.into_response()
        }
    }
}

/// Axum-Middleware: traegt den Anfragepfad in Fehlerantworten ein
pub async fn fehler_pfad_middleware(req: Request<Body>, next: Next) -> Response {
    let pfad = req.uri().path().to_string();
    let mut response = next.run(req).await;

    match response.extensions_mut().remove::<ErrorResponse>() {
        Some(mut antwort) => {
            antwort.path = pfad;
            let status = response.status();
            (status, Json(antwort)).into_response()
        }
        None => response,
    }
}
