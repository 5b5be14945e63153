//! WebSocket-Upgrade auf `/v4/websocket`

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use klangwerk_core::SessionId;
use klangwerk_signaling::verbindung_verarbeiten;

use crate::error::{CommanderError, CommanderResult};
use crate::rest::middleware::client_ip;
use crate::rest::CommanderState;

const HEADER_USER_ID: &str = "user-id";
const HEADER_CLIENT_NAME: &str = "client-name";
const HEADER_SESSION_ID: &str = "session-id";

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Oeffnet die Event-Verbindung eines Clients
///
/// `User-Id` ist Pflicht. Mit `Session-Id` setzt der Client eine pausierte
/// Session fort; ist sie unbekannt, entsteht eine neue.
pub async fn websocket(
    State(state): State<CommanderState>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> CommanderResult<Response> {
    let upgrade = upgrade.map_err(|e| CommanderError::eingabe(e.body_text()))?;

    let user_id: u64 = header_text(&headers, HEADER_USER_ID)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CommanderError::eingabe("Header 'User-Id' fehlt oder ist ungueltig"))?;
    let client_name = match header_text(&headers, HEADER_CLIENT_NAME) {
        Some(name) => name.to_string(),
        None => {
            tracing::warn!(ip = %client_ip(&headers), "Client ohne 'Client-Name'-Header");
            "unbekannt".to_string()
        }
    };
    let fortsetzen = header_text(&headers, HEADER_SESSION_ID).map(SessionId::from);

    let registry = state.registry.clone();
    let shutdown_rx = state.shutdown_rx.clone();
    Ok(upgrade.on_upgrade(move |socket| async move {
        match registry.verbinden(user_id, &client_name, fortsetzen.as_ref()) {
            Ok(anmeldung) => verbindung_verarbeiten(socket, anmeldung, shutdown_rx).await,
            Err(e) => tracing::warn!(fehler = %e, user_id, "Anmeldung fehlgeschlagen"),
        }
    }))
}
