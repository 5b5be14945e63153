//! klangwerk-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle JSON-Strukturen die zwischen Client und
//! Server ueber REST und WebSocket ausgetauscht werden (Protokoll v4).
//!
//! - [`track`] – Track, TrackInfo, LoadResult, Exception
//! - [`player`] – Player, PlayerState, VoiceState, PlayerUpdate, Session
//! - [`filters`] – Filter-Repraesentation
//! - [`message`] – Ausgehende WebSocket-Nachrichten und Events
//! - [`info`] – Info, Stats und Fehlerantworten

pub mod filters;
pub mod info;
pub mod message;
pub mod player;
pub mod track;

pub use filters::Filters;
pub use info::{ErrorResponse, Info, Stats};
pub use message::{Event, Message, TrackEndReason};
pub use player::{Player, PlayerState, PlayerUpdate, Session, SessionUpdate, VoiceState};
pub use track::{Exception, LoadResult, PlaylistInfo, Track, TrackInfo};

/// Objekt-Typ fuer frei definierbare JSON-Daten (pluginInfo, userData)
pub type JsonObjekt = serde_json::Map<String, serde_json::Value>;

/// Protokoll-Version dieses Servers
pub const PROTOKOLL_VERSION: u8 = 4;
