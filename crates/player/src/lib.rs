//! klangwerk-player – Player-Laufzeit pro Guild
//!
//! ## Module
//! - [`codec`] – Track-Kodierung (Base64) und Umwandlung in Protokoll-Tracks
//! - [`plugin_info`] – Zusammenfuehren der Plugin-Metadaten
//! - [`verlust`] – Frame-Verlustzaehler
//! - [`filter`] – Filterkette mit Validierung und Aktivierung
//! - [`plan`] – Periodischer, abbrechbarer Player-Update-Plan
//! - [`lieferant`] – Frame-Lieferant fuer den Voice-Transport
//! - [`player`] – Zustandsmaschine eines Players
//! - [`loader`] – Lade- und Dekodier-Dienst

pub mod codec;
pub mod filter;
pub mod kontext;
pub mod lieferant;
pub mod loader;
pub mod plan;
pub mod player;
pub mod plugin_info;
pub mod verlust;

pub use codec::TrackCodec;
pub use filter::FilterKette;
pub use kontext::{NachrichtenSenke, PlayerKontext};
pub use lieferant::FrameLieferant;
pub use loader::AudioLoader;
pub use plan::UpdatePlan;
pub use player::{Player, PlayerStart, Wiedergabe};
pub use verlust::FrameVerlustZaehler;

/// Maximale Lautstaerke in Prozent
pub const MAX_LAUTSTAERKE: i32 = 1000;
