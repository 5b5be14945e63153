//! klangwerk-voice – Voice-Transport
//!
//! Der Transport uebertraegt Audio-Frames einer Guild an das Voice-Netzwerk.
//! Er zieht die Frames selbst im 20-ms-Takt ueber einen [`FrameProvider`].
//!
//! ## Module
//! - [`schnittstelle`] – Traits `VoiceManager`, `FrameProvider`, Ereignisse
//! - [`lokal`] – Lokaler Referenz-Transport (ein Task pro Verbindung)

pub mod lokal;
pub mod schnittstelle;

pub use lokal::{LokaleFabrik, LokalerTransport, VerbindungsStatistik};
pub use schnittstelle::{
    FrameProvider, VerbindungsInfo, VoiceEreignis, VoiceError, VoiceManager, VoiceManagerFabrik,
    VoiceResult, VoiceServerInfo,
};

/// Takt des Transports in Millisekunden
pub const FRAME_TAKT_MS: u64 = 20;
