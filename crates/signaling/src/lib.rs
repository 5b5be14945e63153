//! klangwerk-signaling – Sessions und WebSocket-Verbindungen
//!
//! Dieser Crate verwaltet die Sessions der verbundenen Clients, deren
//! ausgehende Nachrichten-Queues und die periodischen Server-Statistiken.
//!
//! ## Architektur
//!
//! ```text
//! GET /v4/websocket (Upgrade)
//!     |
//!     v
//! SessionRegistry::verbinden  -> neue oder fortgesetzte Session, `ready`
//!     |
//!     v
//! verbindung_verarbeiten (pro Verbindung ein Task)
//!     |  ClientSender-Queue -> WebSocket
//!     v
//! Session
//!     +-- Player (pro Guild)
//!     +-- VoiceManager
//!     +-- SessionSenke (Queue der aktuellen Verbindung)
//!
//! stats_schleife – Stats an alle Sessions, Prometheus-Metriken
//! ```

pub mod error;
pub mod registry;
pub mod sender;
pub mod session;
pub mod statistik;
pub mod verbindung;

// Bequeme Re-Exporte
pub use error::{SignalingError, SignalingResult};
pub use registry::{Anmeldung, RegistryKonfig, SessionRegistry};
pub use sender::ClientSender;
pub use session::{Session, SessionSenke};
pub use statistik::{metriken_aktualisieren, stats_erstellen, stats_schleife};
pub use verbindung::verbindung_verarbeiten;
