//! Fehlertypen fuer den Signaling-Service

use thiserror::Error;

/// Fehlertyp der WebSocket-Verbindung
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Nachricht konnte nicht serialisiert werden
    #[error("Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[from] serde_json::Error),

    /// Fehler im WebSocket-Transport
    #[error("WebSocket-Fehler: {0}")]
    WebSocket(#[from] axum::Error),
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
