//! Fehlertypen der Audio-Engine

use std::sync::Arc;

use klangwerk_core::Schwere;
use thiserror::Error;

/// Fehler beim Kodieren und Dekodieren von Tracks
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Daten unvollstaendig: {0} fehlt")]
    Unvollstaendig(&'static str),

    #[error("Ungueltiges UTF-8 in Feld {0}")]
    UngueltigesUtf8(&'static str),

    #[error("Zeichenkette zu lang fuer Feld {0}")]
    ZuLang(&'static str),

    #[error("Leere Track-Daten")]
    Leer,
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Ladefehler der Engine mit Schweregrad
///
/// Die Ursache ist eine Kette ueber [`std::error::Error::source`]; der
/// Aufrufer laeuft sie bis zum letzten Glied ab.
#[derive(Debug, Clone)]
pub struct FriendlyException {
    pub nachricht: Option<String>,
    pub schwere: Schwere,
    pub ursache: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl FriendlyException {
    pub fn neu(nachricht: impl Into<String>, schwere: Schwere) -> Self {
        Self {
            nachricht: Some(nachricht.into()),
            schwere,
            ursache: None,
        }
    }

    /// Haengt eine Ursache an
    pub fn mit_ursache(mut self, ursache: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.ursache = Some(Arc::new(ursache));
        self
    }
}

impl std::fmt::Display for FriendlyException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.nachricht {
            Some(n) => write!(f, "{n}"),
            None => write!(f, "Unbekannter Ladefehler ({})", self.schwere),
        }
    }
}

impl std::error::Error for FriendlyException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.ursache
            .as_deref()
            .map(|u| u as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error)]
    #[error("Verbindung abgelehnt")]
    struct Netzwerkfehler;

    #[test]
    fn ursache_ueber_source_erreichbar() {
        let fehler = FriendlyException::neu("Video unavailable", Schwere::Common)
            .mit_ursache(Netzwerkfehler);
        let ursache = fehler.source().unwrap();
        assert_eq!(ursache.to_string(), "Verbindung abgelehnt");
        assert!(ursache.source().is_none());
    }

    #[test]
    fn anzeige_ohne_nachricht() {
        let fehler = FriendlyException {
            nachricht: None,
            schwere: Schwere::Fault,
            ursache: None,
        };
        assert!(fehler.to_string().contains("fault"));
    }
}
