//! In-Memory-Referenz-Engine
//!
//! Loest Identifier ueber einen Katalog auf, der zur Laufzeit befuellt wird.
//! Zusaetzlich erzeugt `stille:<ms>` einen Stille-Track beliebiger Laenge.
//! Dient als lauffaehige Standard-Engine und als Testgrundlage.

pub mod kodierung;
pub mod player;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use klangwerk_core::Schwere;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{EngineResult, FriendlyException};
use crate::ereignis::EngineEreignis;
use crate::schnittstelle::{AudioEngine, EnginePlayer};
use crate::track::{AudioItem, AudioPlaylist, AudioTrack, AudioTrackInfo};

pub use player::SpeicherPlayer;

/// Source-Name fuer Katalog-Tracks
pub const QUELLE_SPEICHER: &str = "speicher";
/// Source-Name fuer Stille-Tracks
pub const QUELLE_STILLE: &str = "stille";

const STILLE_PRAEFIX: &str = "stille:";

/// Eintrag im Katalog
#[derive(Debug, Clone)]
pub enum KatalogEintrag {
    Track(AudioTrackInfo),
    Playlist {
        name: String,
        tracks: Vec<AudioTrackInfo>,
        ausgewaehlt: Option<usize>,
    },
    Suche(Vec<AudioTrackInfo>),
    Fehler {
        nachricht: String,
        schwere: Schwere,
        /// Ursachenkette, aeusserste zuerst
        ursachen: Vec<String>,
    },
}

/// In-Memory-Engine mit Katalog
pub struct SpeicherEngine {
    katalog: DashMap<String, KatalogEintrag>,
    verzoegerung: Option<Duration>,
}

impl Default for SpeicherEngine {
    fn default() -> Self {
        Self::neu()
    }
}

impl SpeicherEngine {
    pub fn neu() -> Self {
        Self {
            katalog: DashMap::new(),
            verzoegerung: None,
        }
    }

    /// Simuliert eine langsame Aufloesung (Netzwerk)
    pub fn mit_verzoegerung(mut self, verzoegerung: Duration) -> Self {
        self.verzoegerung = Some(verzoegerung);
        self
    }

    pub fn eintragen(&self, identifier: impl Into<String>, eintrag: KatalogEintrag) {
        self.katalog.insert(identifier.into(), eintrag);
    }

    /// Traegt einen einzelnen Track unter seinem Identifier ein
    pub fn track_eintragen(&self, info: AudioTrackInfo) {
        let identifier = info.identifier.clone();
        self.eintragen(identifier, KatalogEintrag::Track(info));
    }

    pub fn fehler_eintragen(
        &self,
        identifier: impl Into<String>,
        schwere: Schwere,
        nachricht: impl Into<String>,
    ) {
        self.eintragen(
            identifier,
            KatalogEintrag::Fehler {
                nachricht: nachricht.into(),
                schwere,
                ursachen: Vec::new(),
            },
        );
    }

    pub fn katalog_groesse(&self) -> usize {
        self.katalog.len()
    }

    fn stille_track(identifier: &str) -> Option<AudioTrack> {
        let laenge_ms: u64 = identifier.strip_prefix(STILLE_PRAEFIX)?.parse().ok()?;
        Some(AudioTrack::neu(
            AudioTrackInfo {
                titel: format!("Stille ({laenge_ms} ms)"),
                autor: "Klangwerk".to_string(),
                laenge_ms,
                identifier: identifier.to_string(),
                ist_stream: false,
                uri: None,
                artwork_url: None,
                isrc: None,
            },
            QUELLE_STILLE,
            true,
        ))
    }

    fn katalog_track(info: AudioTrackInfo) -> AudioTrack {
        let spulbar = !info.ist_stream;
        AudioTrack::neu(info, QUELLE_SPEICHER, spulbar)
    }

    fn fehler_bauen(nachricht: String, schwere: Schwere, ursachen: Vec<String>) -> FriendlyException {
        // Innerste Ursache zuerst aufbauen, dann nach aussen verketten
        let mut kette: Option<FriendlyException> = None;
        for ursache in ursachen.into_iter().rev() {
            let glied = FriendlyException::neu(ursache, schwere);
            kette = Some(match kette {
                Some(innen) => glied.mit_ursache(innen),
                None => glied,
            });
        }
        let fehler = FriendlyException::neu(nachricht, schwere);
        match kette {
            Some(innen) => fehler.mit_ursache(innen),
            None => fehler,
        }
    }
}

#[async_trait]
impl AudioEngine for SpeicherEngine {
    fn name(&self) -> String {
        format!("klangwerk-speicher {}", env!("CARGO_PKG_VERSION"))
    }

    fn quellen(&self) -> Vec<String> {
        vec![QUELLE_SPEICHER.to_string(), QUELLE_STILLE.to_string()]
    }

    fn player_erstellen(
        &self,
        ereignisse: mpsc::UnboundedSender<EngineEreignis>,
    ) -> Arc<dyn EnginePlayer> {
        Arc::new(SpeicherPlayer::neu(ereignisse))
    }

    fn kodieren(&self, track: &AudioTrack) -> EngineResult<Vec<u8>> {
        kodierung::kodieren(track)
    }

    fn dekodieren(&self, daten: &[u8]) -> EngineResult<Option<AudioTrack>> {
        let Some(roh) = kodierung::dekodieren(daten)? else {
            return Ok(None);
        };
        if !self.quellen().iter().any(|q| *q == roh.quelle) {
            debug!(quelle = %roh.quelle, "Kein Source-Manager fuer Track");
            return Ok(None);
        }
        let track = AudioTrack::neu(roh.info, roh.quelle, roh.spulbar);
        track.position_setzen(roh.position_ms);
        Ok(Some(track))
    }

    async fn aufloesen(&self, identifier: &str) -> Result<Option<AudioItem>, FriendlyException> {
        if let Some(verzoegerung) = self.verzoegerung {
            tokio::time::sleep(verzoegerung).await;
        }

        if let Some(track) = Self::stille_track(identifier) {
            return Ok(Some(AudioItem::Track(track)));
        }

        // Eintrag klonen, damit kein Shard-Lock gehalten wird
        let Some(eintrag) = self.katalog.get(identifier).map(|e| e.value().clone()) else {
            return Ok(None);
        };

        match eintrag {
            KatalogEintrag::Track(info) => Ok(Some(AudioItem::Track(Self::katalog_track(info)))),
            KatalogEintrag::Playlist {
                name,
                tracks,
                ausgewaehlt,
            } => Ok(Some(AudioItem::Playlist(AudioPlaylist {
                name,
                tracks: tracks.into_iter().map(Self::katalog_track).collect(),
                ausgewaehlt,
                ist_suche: false,
            }))),
            KatalogEintrag::Suche(tracks) => Ok(Some(AudioItem::Playlist(AudioPlaylist {
                name: format!("Suchergebnisse fuer: {identifier}"),
                tracks: tracks.into_iter().map(Self::katalog_track).collect(),
                ausgewaehlt: None,
                ist_suche: true,
            }))),
            KatalogEintrag::Fehler {
                nachricht,
                schwere,
                ursachen,
            } => Err(Self::fehler_bauen(nachricht, schwere, ursachen)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn info(identifier: &str, titel: &str) -> AudioTrackInfo {
        AudioTrackInfo {
            titel: titel.into(),
            autor: "Band".into(),
            laenge_ms: 200_000,
            identifier: identifier.into(),
            ist_stream: false,
            uri: None,
            artwork_url: None,
            isrc: None,
        }
    }

    #[tokio::test]
    async fn katalog_track_aufloesen() {
        let engine = SpeicherEngine::neu();
        engine.track_eintragen(info("track:123", "Song A"));
        match engine.aufloesen("track:123").await {
            Ok(Some(AudioItem::Track(t))) => {
                assert_eq!(t.info().titel, "Song A");
                assert_eq!(t.quelle(), QUELLE_SPEICHER);
            }
            andere => panic!("Unerwartet: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn unbekannter_identifier_ist_none() {
        let engine = SpeicherEngine::neu();
        assert!(engine.aufloesen("gibt-es-nicht").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stille_track_mit_laenge() {
        let engine = SpeicherEngine::neu();
        let Ok(Some(AudioItem::Track(t))) = engine.aufloesen("stille:1500").await else {
            panic!("Stille-Track erwartet");
        };
        assert_eq!(t.info().laenge_ms, 1500);
        assert_eq!(t.quelle(), QUELLE_STILLE);
        assert!(engine.aufloesen("stille:abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fehler_mit_ursachenkette() {
        let engine = SpeicherEngine::neu();
        engine.eintragen(
            "kaputt",
            KatalogEintrag::Fehler {
                nachricht: "Laden fehlgeschlagen".into(),
                schwere: Schwere::Suspicious,
                ursachen: vec!["HTTP 500".into(), "Socket geschlossen".into()],
            },
        );
        let fehler = engine.aufloesen("kaputt").await.unwrap_err();
        assert_eq!(fehler.schwere, Schwere::Suspicious);

        let erste = fehler.source().unwrap();
        assert_eq!(erste.to_string(), "HTTP 500");
        let zweite = erste.source().unwrap();
        assert_eq!(zweite.to_string(), "Socket geschlossen");
        assert!(zweite.source().is_none());
    }

    #[test]
    fn dekodieren_unbekannte_quelle_ist_none() {
        let engine = SpeicherEngine::neu();
        let fremd = AudioTrack::neu(info("x", "Fremd"), "youtube", true);
        let bytes = engine.kodieren(&fremd).unwrap();
        assert!(engine.dekodieren(&bytes).unwrap().is_none());
    }

    #[test]
    fn dekodieren_erhaelt_struktur() {
        let engine = SpeicherEngine::neu();
        let track = SpeicherEngine::katalog_track(info("track:1", "Eins"));
        let bytes = engine.kodieren(&track).unwrap();
        let zurueck = engine.dekodieren(&bytes).unwrap().unwrap();
        assert_eq!(zurueck.info(), track.info());
        assert_eq!(zurueck.quelle(), track.quelle());
    }
}
