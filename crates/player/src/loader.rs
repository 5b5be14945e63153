//! Lade- und Dekodier-Dienst
//!
//! Loest Identifier ueber die Engine auf und dekodiert Base64-Tracks.
//! Haelt waehrend der Aufloesung keine Session- oder Player-Sperre.

use klangwerk_core::{KlangwerkError, Result};
use klangwerk_engine::{AudioItem, AudioTrack};
use klangwerk_protocol::{JsonObjekt, LoadResult, Track};
use tracing::{debug, info, warn};

use crate::codec::{self, TrackCodec};

#[derive(Clone)]
pub struct AudioLoader {
    codec: TrackCodec,
}

impl AudioLoader {
    pub fn neu(codec: TrackCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &TrackCodec {
        &self.codec
    }

    /// Loest einen Identifier zu einem Ladeergebnis auf
    ///
    /// Ladefehler der Engine werden zu `LoadResult::Error`; ein `Err` gibt
    /// es nur, wenn ein gefundener Track nicht kodiert werden kann.
    pub async fn laden(&self, identifier: &str) -> Result<LoadResult> {
        info!(identifier = %identifier, "Lade Identifier");

        let item = match self.codec.engine().aufloesen(identifier).await {
            Ok(item) => item,
            Err(fehler) => {
                warn!(
                    identifier = %identifier,
                    schwere = %fehler.schwere,
                    fehler = %fehler,
                    "Laden fehlgeschlagen"
                );
                return Ok(LoadResult::fehlgeschlagen(codec::exception(&fehler)));
            }
        };

        let ergebnis = match item {
            None => {
                debug!(identifier = %identifier, "Keine Treffer");
                LoadResult::keine_treffer()
            }
            Some(AudioItem::Track(track)) => {
                LoadResult::track_geladen(self.codec.zu_track(&track, JsonObjekt::new())?)
            }
            Some(AudioItem::Playlist(playlist)) => {
                let tracks = self.zu_tracks(&playlist.tracks)?;
                if playlist.ist_suche {
                    LoadResult::suchergebnis(tracks)
                } else {
                    LoadResult::playlist_geladen(
                        self.codec.playlist_info(&playlist),
                        self.codec.playlist_plugin_info(&playlist),
                        tracks,
                    )
                }
            }
        };
        Ok(ergebnis)
    }

    fn zu_tracks(&self, tracks: &[AudioTrack]) -> Result<Vec<Track>> {
        tracks
            .iter()
            .map(|t| self.codec.zu_track(t, JsonObjekt::new()))
            .collect()
    }

    /// Dekodiert einen einzelnen Track; `encoded` bleibt der Eingabestring
    pub fn dekodieren(&self, kodiert: &str) -> Result<Track> {
        let track = self.codec.dekodieren(kodiert)?;
        Ok(self
            .codec
            .zu_track_mit(&track, kodiert.to_string(), JsonObjekt::new()))
    }

    /// Dekodiert mehrere Tracks; ein fehlerhafter Eintrag laesst alles scheitern
    pub fn alle_dekodieren(&self, kodiert: &[String]) -> Result<Vec<Track>> {
        if kodiert.is_empty() {
            return Err(KlangwerkError::argument("Keine Tracks zum Dekodieren angegeben"));
        }
        kodiert.iter().map(|k| self.dekodieren(k)).collect()
    }

    /// Engine-Track -> Base64
    pub fn kodieren(&self, track: &AudioTrack) -> Result<String> {
        self.codec.kodieren(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use klangwerk_core::Schwere;
    use klangwerk_engine::speicher::KatalogEintrag;
    use klangwerk_engine::{AudioTrackInfo, SpeicherEngine};
    use klangwerk_plugin::{PluginInfoModifier, PluginRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn info(identifier: &str, titel: &str) -> AudioTrackInfo {
        AudioTrackInfo {
            titel: titel.into(),
            autor: "Band".into(),
            laenge_ms: 215_000,
            identifier: identifier.into(),
            ist_stream: false,
            uri: None,
            artwork_url: None,
            isrc: None,
        }
    }

    fn loader_mit(engine: SpeicherEngine, plugins: PluginRegistry) -> AudioLoader {
        AudioLoader::neu(TrackCodec::neu(Arc::new(engine), Arc::new(plugins)))
    }

    #[tokio::test]
    async fn track_laden() {
        let engine = SpeicherEngine::neu();
        engine.track_eintragen(info("track:123", "Song A"));
        let loader = loader_mit(engine, PluginRegistry::neu());

        match loader.laden("track:123").await.unwrap() {
            LoadResult::Track(t) => {
                assert_eq!(t.info.title, "Song A");
                assert_eq!(t.info.length, 215_000);
                assert_eq!(t.info.source_name, "speicher");
            }
            andere => panic!("Unerwartet: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn suche_behaelt_reihenfolge() {
        let engine = SpeicherEngine::neu();
        engine.eintragen(
            "ytsearch:lied",
            KatalogEintrag::Suche(vec![info("a", "Erster"), info("b", "Zweiter")]),
        );
        let loader = loader_mit(engine, PluginRegistry::neu());

        match loader.laden("ytsearch:lied").await.unwrap() {
            LoadResult::Search(tracks) => {
                let titel: Vec<_> = tracks.iter().map(|t| t.info.title.as_str()).collect();
                assert_eq!(titel, vec!["Erster", "Zweiter"]);
            }
            andere => panic!("Unerwartet: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn playlist_mit_auswahl() {
        let engine = SpeicherEngine::neu();
        engine.eintragen(
            "playlist:mix",
            KatalogEintrag::Playlist {
                name: "Mix".into(),
                tracks: vec![info("a", "A"), info("b", "B")],
                ausgewaehlt: None,
            },
        );
        let loader = loader_mit(engine, PluginRegistry::neu());

        match loader.laden("playlist:mix").await.unwrap() {
            LoadResult::Playlist(p) => {
                assert_eq!(p.info.name, "Mix");
                assert_eq!(p.info.selected_track, -1);
                assert_eq!(p.tracks.len(), 2);
            }
            andere => panic!("Unerwartet: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn unbekannt_ist_leer() {
        let loader = loader_mit(SpeicherEngine::neu(), PluginRegistry::neu());
        assert_eq!(
            loader.laden("gibt-es-nicht").await.unwrap(),
            LoadResult::keine_treffer()
        );
    }

    #[tokio::test]
    async fn ladefehler_wird_error_ergebnis() {
        let engine = SpeicherEngine::neu();
        engine.fehler_eintragen("video:weg", Schwere::Common, "Video unavailable");
        let loader = loader_mit(engine, PluginRegistry::neu());

        match loader.laden("video:weg").await.unwrap() {
            LoadResult::Error(e) => {
                assert_eq!(e.severity, Schwere::Common);
                assert_eq!(e.message.as_deref(), Some("Video unavailable"));
                assert_eq!(e.cause, "Video unavailable");
            }
            andere => panic!("Unerwartet: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn plugin_info_wird_angehaengt() {
        struct Quelle;
        impl PluginInfoModifier for Quelle {
            fn track_plugin_info(&self, track: &AudioTrack) -> Option<JsonObjekt> {
                json!({ "herkunft": track.quelle() }).as_object().cloned()
            }
        }

        let engine = SpeicherEngine::neu();
        engine.track_eintragen(info("track:1", "Eins"));
        let plugins = PluginRegistry::neu();
        plugins
            .registrieren("herkunft", "1.0.0", Some(Arc::new(Quelle)))
            .unwrap();
        let loader = loader_mit(engine, plugins);

        match loader.laden("track:1").await.unwrap() {
            LoadResult::Track(t) => {
                assert_eq!(t.plugin_info.get("herkunft"), Some(&json!("speicher")))
            }
            andere => panic!("Unerwartet: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn dekodieren_behaelt_eingabe() {
        let engine = SpeicherEngine::neu();
        engine.track_eintragen(info("track:123", "Song A"));
        let loader = loader_mit(engine, PluginRegistry::neu());
        let LoadResult::Track(geladen) = loader.laden("track:123").await.unwrap() else {
            panic!("Track erwartet");
        };

        let dekodiert = loader.dekodieren(&geladen.encoded).unwrap();
        assert_eq!(dekodiert.encoded, geladen.encoded);
        assert_eq!(dekodiert.info, geladen.info);
    }

    #[tokio::test]
    async fn leere_liste_ist_argumentfehler() {
        let loader = loader_mit(SpeicherEngine::neu(), PluginRegistry::neu());
        let fehler = loader.alle_dekodieren(&[]).unwrap_err();
        assert!(matches!(fehler, KlangwerkError::UngueltigesArgument(_)));
    }

    #[tokio::test]
    async fn ein_fehlerhafter_eintrag_laesst_alles_scheitern() {
        let engine = SpeicherEngine::neu();
        engine.track_eintragen(info("track:123", "Song A"));
        let loader = loader_mit(engine, PluginRegistry::neu());
        let LoadResult::Track(geladen) = loader.laden("track:123").await.unwrap() else {
            panic!("Track erwartet");
        };

        let fehler = loader
            .alle_dekodieren(&[geladen.encoded.clone(), "kaputt!!".into()])
            .unwrap_err();
        assert!(matches!(fehler, KlangwerkError::Dekodierung(_)));
        assert_eq!(loader.alle_dekodieren(&[geladen.encoded]).unwrap().len(), 1);
    }
}
