//! Ereignisse, die ein Engine-Player an seinen Besitzer meldet

use crate::error::FriendlyException;
use crate::track::AudioTrack;

/// Grund fuer das Ende eines Tracks aus Sicht der Engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndeGrund {
    /// Track zu Ende gespielt
    Fertig,
    /// Track konnte nicht geladen werden
    LadenFehlgeschlagen,
    /// Gestoppt (auch durch eine Endmarke)
    Gestoppt,
    /// Durch einen neuen Track ersetzt
    Ersetzt,
    /// Player wurde zerstoert
    Aufgeraeumt,
}

/// Ereignis eines Engine-Players
///
/// Wird ueber einen mpsc-Kanal zugestellt, nie ueber Listener-Callbacks.
#[derive(Debug, Clone)]
pub enum EngineEreignis {
    TrackStart(AudioTrack),
    TrackEnde {
        track: AudioTrack,
        grund: EndeGrund,
    },
    TrackFehler {
        track: AudioTrack,
        fehler: FriendlyException,
    },
    /// Keine Frames innerhalb der Schwelle
    TrackHaengt {
        track: AudioTrack,
        schwelle_ms: u64,
    },
    /// Die mit `marker_setzen` gesetzte Position wurde erreicht
    MarkerErreicht(AudioTrack),
}
