//! klangwerk-commander – REST-Schnittstelle des Klangwerk-Servers
//!
//! - **REST** (/v4/...): Tracks laden und dekodieren, Player und Sessions
//!   steuern, Server-Info und Statistiken
//! - **WebSocket** (/v4/websocket): Upgrade und Uebergabe an die Signaling-Schicht
//!
//! Jede Anfrage muss das konfigurierte Passwort im `Authorization`-Header
//! tragen. Fehler werden als `ErrorResponse` mit Anfragepfad ausgeliefert.

pub mod error;
pub mod rest;

pub use error::{CommanderError, CommanderResult};
pub use rest::{routes::router, CommanderState, RestServer, RestServerKonfig};
