//! Engine-seitige Track-Repraesentation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Strukturelle Metadaten eines Tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrackInfo {
    pub titel: String,
    pub autor: String,
    /// Laenge in Millisekunden (`u64::MAX` fuer Streams)
    pub laenge_ms: u64,
    pub identifier: String,
    pub ist_stream: bool,
    pub uri: Option<String>,
    pub artwork_url: Option<String>,
    pub isrc: Option<String>,
}

/// Ein abspielbarer Track der Engine
///
/// `Clone` liefert einen weiteren Griff auf denselben Track (gleiche
/// Position). Eine unabhaengige Kopie liefert [`AudioTrack::klonen`].
#[derive(Debug, Clone)]
pub struct AudioTrack {
    info: AudioTrackInfo,
    quelle: String,
    spulbar: bool,
    position: Arc<AtomicU64>,
}

impl AudioTrack {
    pub fn neu(info: AudioTrackInfo, quelle: impl Into<String>, spulbar: bool) -> Self {
        Self {
            info,
            quelle: quelle.into(),
            spulbar,
            position: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn info(&self) -> &AudioTrackInfo {
        &self.info
    }

    /// Name des Source-Managers, der den Track erzeugt hat
    pub fn quelle(&self) -> &str {
        &self.quelle
    }

    pub fn ist_spulbar(&self) -> bool {
        self.spulbar
    }

    /// Aktuelle Wiedergabeposition in ms
    pub fn position_ms(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    /// Setzt die Position; wird bei nicht spulbaren Tracks ignoriert
    pub fn position_setzen(&self, position_ms: u64) -> bool {
        if !self.spulbar {
            return false;
        }
        self.position
            .store(position_ms.min(self.info.laenge_ms), Ordering::Relaxed);
        true
    }

    /// Rueckt die Position um `ms` vor (nur durch die Engine)
    pub(crate) fn vorruecken(&self, ms: u64) -> u64 {
        self.position.fetch_add(ms, Ordering::Relaxed) + ms
    }

    /// Unabhaengige Kopie mit eigener Position (Startposition 0)
    pub fn klonen(&self) -> Self {
        Self::neu(self.info.clone(), self.quelle.clone(), self.spulbar)
    }

    /// Prueft ob zwei Griffe auf denselben Track zeigen
    pub fn ist_selber(&self, anderer: &AudioTrack) -> bool {
        Arc::ptr_eq(&self.position, &anderer.position)
    }
}

/// Playlist oder Suchergebnis der Engine
#[derive(Debug, Clone)]
pub struct AudioPlaylist {
    pub name: String,
    pub tracks: Vec<AudioTrack>,
    /// Index des vorausgewaehlten Tracks
    pub ausgewaehlt: Option<usize>,
    /// Playlist ist ein Suchergebnis
    pub ist_suche: bool,
}

/// Ergebnis einer erfolgreichen Aufloesung
#[derive(Debug, Clone)]
pub enum AudioItem {
    Track(AudioTrack),
    Playlist(AudioPlaylist),
}
