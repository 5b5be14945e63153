//! klangwerk-engine – Schnittstelle zur Audio-Engine
//!
//! Die Engine loest Identifier zu abspielbaren Tracks auf, kodiert und
//! dekodiert Tracks in eine Binaerdarstellung und stellt pro Guild ein
//! Player-Objekt bereit, das Audio-Frames liefert.
//!
//! - [`track`] – AudioTrack, AudioPlaylist, AudioItem
//! - [`ereignis`] – Engine-Ereignisse und Endgruende
//! - [`schnittstelle`] – Traits `AudioEngine`, `EnginePlayer`, `FilterFabrik`
//! - [`speicher`] – In-Memory-Referenz-Engine (Katalog + Stille-Frames)

pub mod error;
pub mod ereignis;
pub mod schnittstelle;
pub mod speicher;
pub mod track;

pub use error::{EngineError, EngineResult, FriendlyException};
pub use ereignis::{EndeGrund, EngineEreignis};
pub use schnittstelle::{AudioEngine, EnginePlayer, FilterFabrik, FilterStufe};
pub use speicher::SpeicherEngine;
pub use track::{AudioItem, AudioPlaylist, AudioTrack, AudioTrackInfo};

pub use klangwerk_core::Schwere;

/// Dauer eines Audio-Frames in Millisekunden
pub const FRAME_DAUER_MS: u64 = 20;

/// Maximale Groesse eines Opus-Frames in Bytes
pub const MAX_FRAME_GROESSE: usize = 1568;
