//! Fehlertypen fuer den Klangwerk Commander
//!
//! Jeder Fehler wird als `ErrorResponse` ausgeliefert. Den Pfad kennt der
//! Fehler selbst nicht; [`crate::rest::middleware::fehler_pfad_middleware`]
//! traegt ihn nach.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use klangwerk_core::KlangwerkError;
use klangwerk_protocol::ErrorResponse;
use thiserror::Error;

/// Alle moeglichen Fehler im Commander-Crate
#[derive(Debug, Error)]
pub enum CommanderError {
    #[error(transparent)]
    Klangwerk(#[from] KlangwerkError),

    #[error("Authorization-Header fehlt oder ist falsch")]
    NichtAutorisiert,

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),
}

pub type CommanderResult<T> = Result<T, CommanderError>;

impl CommanderError {
    pub fn eingabe(msg: impl Into<String>) -> Self {
        Self::UngueltigeEingabe(msg.into())
    }

    /// HTTP-Statuscode fuer REST-Fehler
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Klangwerk(e) => e.http_status(),
            Self::NichtAutorisiert => 401,
            Self::UngueltigeEingabe(_) => 400,
        }
    }

    /// Nachricht fuer den Client; interne Details bleiben im Log
    pub fn client_nachricht(&self) -> String {
        match self {
            Self::Klangwerk(e) if !e.ist_client_sichtbar() => "Interner Serverfehler".to_string(),
            andere => andere.to_string(),
        }
    }
}

impl From<JsonRejection> for CommanderError {
    fn from(ablehnung: JsonRejection) -> Self {
        Self::UngueltigeEingabe(ablehnung.body_text())
    }
}

impl From<QueryRejection> for CommanderError {
    fn from(ablehnung: QueryRejection) -> Self {
        Self::UngueltigeEingabe(ablehnung.body_text())
    }
}

impl From<PathRejection> for CommanderError {
    fn from(ablehnung: PathRejection) -> Self {
        Self::UngueltigeEingabe(ablehnung.body_text())
    }
}

/// Fehlerantwort ohne Pfad (wird von der Middleware ergaenzt)
pub fn fehler_antwort(status: StatusCode, nachricht: impl Into<String>) -> Response {
    let antwort = ErrorResponse::neu(
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown"),
        nachricht,
        "",
    );
    let mut response = (status, Json(antwort.clone())).into_response();
    response.extensions_mut().insert(antwort);
    response
}

impl IntoResponse for CommanderError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(fehler = ?self, "Anfrage fehlgeschlagen");
        } else {
            tracing::debug!(fehler = %self, status = status.as_u16(), "Anfrage abgelehnt");
        }
        fehler_antwort(status, self.client_nachricht())
    }
}
