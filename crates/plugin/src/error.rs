//! Fehlertypen fuer das Plugin-System

use thiserror::Error;

/// Alle moeglichen Fehler im Plugin-System
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin bereits registriert: {0}")]
    BereitsGeladen(String),

    #[error("Plugin nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Ungueltiger Plugin-Name: {0:?}")]
    UngueltigerName(String),
}

pub type Result<T> = std::result::Result<T, PluginError>;
