//! Fehlertypen fuer Klangwerk
//!
//! Zentraler Fehler-Enum fuer alle client-sichtbaren Fehlerzustaende.
//! Die REST-Schicht bildet jede Variante auf einen HTTP-Status ab.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Globaler Result-Alias fuer Klangwerk
pub type Result<T> = std::result::Result<T, KlangwerkError>;

/// Schweregrad eines Ladefehlers der Audio-Engine
///
/// Dreistufige Taxonomie: `Common` ist ein normaler, fuer den Benutzer
/// bestimmter Fehler, `Suspicious` sollte gemeldet werden, `Fault` ist ein
/// interner Fehler der Engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schwere {
    Common,
    Suspicious,
    Fault,
}

impl std::fmt::Display for Schwere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Common => write!(f, "common"),
            Self::Suspicious => write!(f, "suspicious"),
            Self::Fault => write!(f, "fault"),
        }
    }
}

/// Alle client-sichtbaren Fehler im Klangwerk-System
#[derive(Debug, Error)]
pub enum KlangwerkError {
    // --- Lookup ---
    /// Unbekannte Session oder unbekannter Player
    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    // --- Zustand & Eingabe ---
    /// Befehl passt nicht zum aktuellen Player-Zustand (z.B. Seek ohne Track)
    #[error("Ungueltiger Zustand: {0}")]
    UngueltigerZustand(String),

    /// Ungueltige Eingabe (z.B. leerer Decode-Batch)
    #[error("Ungueltiges Argument: {0}")]
    UngueltigesArgument(String),

    /// Kodierter Track ist fehlerhaft oder wird nicht unterstuetzt
    #[error("Track konnte nicht dekodiert werden: {0}")]
    Dekodierung(String),

    // --- Engine ---
    /// Ladefehler der Engine inklusive Schweregrad und Grundursache
    #[error("Ladefehler ({schwere}): {nachricht}")]
    Aufloesung {
        schwere: Schwere,
        nachricht: String,
        ursache: String,
    },

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl KlangwerkError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Erstellt einen NichtGefunden-Fehler
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    /// Erstellt einen Zustandsfehler
    pub fn zustand(msg: impl Into<String>) -> Self {
        Self::UngueltigerZustand(msg.into())
    }

    /// Erstellt einen Argumentfehler
    pub fn argument(msg: impl Into<String>) -> Self {
        Self::UngueltigesArgument(msg.into())
    }

    /// Erstellt einen Dekodierungsfehler
    pub fn dekodierung(msg: impl Into<String>) -> Self {
        Self::Dekodierung(msg.into())
    }

    /// HTTP-Statuscode fuer REST-Antworten
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NichtGefunden(_) => 404,
            Self::UngueltigerZustand(_) | Self::UngueltigesArgument(_) | Self::Dekodierung(_) => {
                400
            }
            Self::Aufloesung { .. } | Self::Intern(_) | Self::Anyhow(_) => 500,
        }
    }

    /// Gibt true zurueck wenn die Nachricht an den Client weitergegeben werden darf
    ///
    /// Interne Fehler werden nur geloggt, der Client sieht eine generische Meldung.
    pub fn ist_client_sichtbar(&self) -> bool {
        !matches!(self, Self::Intern(_) | Self::Anyhow(_))
    }
}
