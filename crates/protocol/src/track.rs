//! Track-Strukturen und Ladeergebnisse
//!
//! ## Design
//! - JSON in camelCase
//! - `LoadResult` ist ein adjazent getaggter Enum (`loadType` + `data`)
//! - `pluginInfo` und `userData` sind frei definierbare JSON-Objekte

use klangwerk_core::Schwere;
use serde::{Deserialize, Serialize};

use crate::JsonObjekt;

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// Ein aufgeloester, kodierbarer Track inklusive Protokoll-Metadaten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Base64-kodierte Engine-Repraesentation
    pub encoded: String,
    pub info: TrackInfo,
    /// Von Plugins beigesteuerte Zusatzdaten
    #[serde(default)]
    pub plugin_info: JsonObjekt,
    /// Vom Client gesetzte Daten, unveraendert durchgereicht
    #[serde(default)]
    pub user_data: JsonObjekt,
}

/// Strukturelle Informationen eines Tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    pub is_seekable: bool,
    pub author: String,
    /// Laenge in Millisekunden
    pub length: u64,
    pub is_stream: bool,
    /// Aktuelle Wiedergabeposition in Millisekunden
    pub position: u64,
    pub title: String,
    pub uri: Option<String>,
    pub source_name: String,
    pub artwork_url: Option<String>,
    pub isrc: Option<String>,
}

// ---------------------------------------------------------------------------
// Playlists
// ---------------------------------------------------------------------------

/// Name und vorausgewaehlter Track einer Playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    pub name: String,
    /// Index des vorausgewaehlten Tracks, -1 wenn keiner
    pub selected_track: i32,
}

/// Nutzdaten eines geladenen Playlist-Ergebnisses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub info: PlaylistInfo,
    #[serde(default)]
    pub plugin_info: JsonObjekt,
    pub tracks: Vec<Track>,
}

// ---------------------------------------------------------------------------
// Exception
// ---------------------------------------------------------------------------

/// Client-sichtbarer Fehler beim Laden oder Abspielen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exception {
    pub message: Option<String>,
    pub severity: Schwere,
    /// Beschreibung der tiefsten Ursache
    pub cause: String,
}

// ---------------------------------------------------------------------------
// LoadResult
// ---------------------------------------------------------------------------

/// Leeres Datenobjekt (serialisiert als `{}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leer {}

/// Ergebnis der Aufloesung eines Identifiers
///
/// Genau eine Variante ist pro Aufloesung gesetzt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "loadType", content = "data", rename_all = "lowercase")]
pub enum LoadResult {
    /// Ein einzelner abspielbarer Track
    Track(Track),
    /// Eine Playlist mit Name und Auswahl
    Playlist(Playlist),
    /// Suchergebnis in Engine-Reihenfolge
    Search(Vec<Track>),
    /// Nichts gefunden
    Empty(Leer),
    /// Ladefehler
    Error(Exception),
}

impl LoadResult {
    pub fn track_geladen(track: Track) -> Self {
        Self::Track(track)
    }

    pub fn playlist_geladen(info: PlaylistInfo, plugin_info: JsonObjekt, tracks: Vec<Track>) -> Self {
        Self::Playlist(Playlist {
            info,
            plugin_info,
            tracks,
        })
    }

    pub fn suchergebnis(tracks: Vec<Track>) -> Self {
        Self::Search(tracks)
    }

    pub fn keine_treffer() -> Self {
        Self::Empty(Leer {})
    }

    pub fn fehlgeschlagen(exception: Exception) -> Self {
        Self::Error(exception)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn beispiel_track() -> Track {
        Track {
            encoded: "QAAA".into(),
            info: TrackInfo {
                identifier: "abc".into(),
                is_seekable: true,
                author: "Autor".into(),
                length: 1000,
                is_stream: false,
                position: 0,
                title: "Titel".into(),
                uri: None,
                source_name: "speicher".into(),
                artwork_url: None,
                isrc: None,
            },
            plugin_info: JsonObjekt::new(),
            user_data: JsonObjekt::new(),
        }
    }

    #[test]
    fn track_info_camel_case() {
        let wert = serde_json::to_value(beispiel_track()).unwrap();
        assert_eq!(wert["info"]["isSeekable"], json!(true));
        assert_eq!(wert["info"]["sourceName"], json!("speicher"));
        assert_eq!(wert["info"]["artworkUrl"], json!(null));
        assert_eq!(wert["pluginInfo"], json!({}));
        assert_eq!(wert["userData"], json!({}));
    }

    #[test]
    fn load_result_track_format() {
        let wert = serde_json::to_value(LoadResult::track_geladen(beispiel_track())).unwrap();
        assert_eq!(wert["loadType"], json!("track"));
        assert_eq!(wert["data"]["info"]["title"], json!("Titel"));
    }

    #[test]
    fn load_result_empty_hat_leeres_datenobjekt() {
        let wert = serde_json::to_value(LoadResult::keine_treffer()).unwrap();
        assert_eq!(wert, json!({ "loadType": "empty", "data": {} }));
    }

    #[test]
    fn load_result_error_format() {
        let ergebnis = LoadResult::fehlgeschlagen(Exception {
            message: Some("Video unavailable".into()),
            severity: Schwere::Common,
            cause: "Video unavailable".into(),
        });
        let wert = serde_json::to_value(ergebnis).unwrap();
        assert_eq!(wert["loadType"], json!("error"));
        assert_eq!(wert["data"]["severity"], json!("common"));
    }

    #[test]
    fn load_result_playlist_deserialisierung() {
        let json = json!({
            "loadType": "playlist",
            "data": {
                "info": { "name": "Mix", "selectedTrack": -1 },
                "pluginInfo": {},
                "tracks": []
            }
        });
        let ergebnis: LoadResult = serde_json::from_value(json).unwrap();
        match ergebnis {
            LoadResult::Playlist(p) => {
                assert_eq!(p.info.name, "Mix");
                assert_eq!(p.info.selected_track, -1);
            }
            andere => panic!("Unerwartetes Ergebnis: {andere:?}"),
        }
    }
}
