//! Track-Codec – Bruecke zwischen Engine-Tracks und Protokoll-Tracks
//!
//! ## Design
//! - `encoded` ist Base64 (Standard-Alphabet) der Engine-Binaerdarstellung
//! - `pluginInfo` wird bei jeder Umwandlung neu berechnet
//! - Fehlerursachen werden bis zum letzten Glied der `source()`-Kette verfolgt

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use klangwerk_core::{KlangwerkError, Result};
use klangwerk_engine::{AudioEngine, AudioPlaylist, AudioTrack, FriendlyException};
use klangwerk_plugin::PluginRegistry;
use klangwerk_protocol::track::{Exception, PlaylistInfo, Track, TrackInfo};
use klangwerk_protocol::JsonObjekt;

use crate::plugin_info;

/// Beschreibung der tiefsten Ursache einer Fehlerkette
pub fn grundursache(fehler: &(dyn std::error::Error + 'static)) -> String {
    let mut aktuell = fehler;
    while let Some(naechste) = aktuell.source() {
        aktuell = naechste;
    }
    aktuell.to_string()
}

/// Wandelt einen Engine-Ladefehler in die Protokoll-Exception um
pub fn exception(fehler: &FriendlyException) -> Exception {
    Exception {
        message: fehler.nachricht.clone(),
        severity: fehler.schwere,
        cause: grundursache(fehler),
    }
}

/// Strukturelle Track-Informationen im Protokollformat
pub fn track_info(track: &AudioTrack) -> TrackInfo {
    let info = track.info();
    TrackInfo {
        identifier: info.identifier.clone(),
        is_seekable: track.ist_spulbar(),
        author: info.autor.clone(),
        length: info.laenge_ms,
        is_stream: info.ist_stream,
        position: track.position_ms(),
        title: info.titel.clone(),
        uri: info.uri.clone(),
        source_name: track.quelle().to_string(),
        artwork_url: info.artwork_url.clone(),
        isrc: info.isrc.clone(),
    }
}

/// Kodiert und dekodiert Tracks ueber die Engine
#[derive(Clone)]
pub struct TrackCodec {
    engine: Arc<dyn AudioEngine>,
    plugins: Arc<PluginRegistry>,
}

impl TrackCodec {
    pub fn neu(engine: Arc<dyn AudioEngine>, plugins: Arc<PluginRegistry>) -> Self {
        Self { engine, plugins }
    }

    pub fn engine(&self) -> &Arc<dyn AudioEngine> {
        &self.engine
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    /// Engine-Track -> Base64
    pub fn kodieren(&self, track: &AudioTrack) -> Result<String> {
        let bytes = self
            .engine
            .kodieren(track)
            .map_err(|e| KlangwerkError::intern(format!("Track nicht kodierbar: {e}")))?;
        Ok(STANDARD.encode(bytes))
    }

    /// Base64 -> Engine-Track
    pub fn dekodieren(&self, kodiert: &str) -> Result<AudioTrack> {
        let bytes = STANDARD
            .decode(kodiert.trim())
            .map_err(|e| KlangwerkError::dekodierung(format!("Ungueltiges Base64: {e}")))?;
        self.engine
            .dekodieren(&bytes)
            .map_err(|e| KlangwerkError::dekodierung(e.to_string()))?
            .ok_or_else(|| {
                KlangwerkError::dekodierung(
                    "Unbekannte Version oder kein passender Source-Manager",
                )
            })
    }

    /// Protokoll-Track inklusive frisch berechneter `pluginInfo`
    pub fn zu_track(&self, track: &AudioTrack, user_data: JsonObjekt) -> Result<Track> {
        let kodiert = self.kodieren(track)?;
        Ok(self.zu_track_mit(track, kodiert, user_data))
    }

    /// Wie [`Self::zu_track`], aber mit bereits bekannter Kodierung
    pub fn zu_track_mit(&self, track: &AudioTrack, kodiert: String, user_data: JsonObjekt) -> Track {
        Track {
            encoded: kodiert,
            info: track_info(track),
            plugin_info: plugin_info::track_info(&self.plugins.modifier(), track),
            user_data,
        }
    }

    pub fn playlist_info(&self, playlist: &AudioPlaylist) -> PlaylistInfo {
        PlaylistInfo {
            name: playlist.name.clone(),
            selected_track: playlist
                .ausgewaehlt
                .filter(|&i| i < playlist.tracks.len())
                .and_then(|i| i32::try_from(i).ok())
                .unwrap_or(-1),
        }
    }

    pub fn playlist_plugin_info(&self, playlist: &AudioPlaylist) -> JsonObjekt {
        plugin_info::playlist_info(&self.plugins.modifier(), playlist)
    }
}
