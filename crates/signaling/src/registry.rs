//! Session-Registry – alle Sessions des Servers
//!
//! Haelt die geteilten Dienste (Codec, Loader, Voice-Fabrik) und legt
//! Sessions beim Verbindungsaufbau an oder setzt sie fort.

use std::sync::Arc;
use std::time::{Duration, Instant};

use klangwerk_core::{KlangwerkError, Result, SessionId};
use klangwerk_engine::AudioEngine;
use klangwerk_player::verlust::ERWARTETE_FRAMES_PRO_MINUTE;
use klangwerk_player::{AudioLoader, TrackCodec};
use klangwerk_plugin::PluginRegistry;
use klangwerk_protocol::info::FrameStats;
use klangwerk_protocol::Message;
use klangwerk_voice::VoiceManagerFabrik;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::sender::ClientSender;
use crate::session::{Session, SessionAufbau, SessionMap};

/// Einstellungen, die jede neue Session uebernimmt
#[derive(Debug, Clone)]
pub struct RegistryKonfig {
    /// Abstand der periodischen PlayerUpdate-Nachrichten
    pub update_intervall: Duration,
    /// Resume-Timeout neuer Sessions in Sekunden
    pub standard_timeout_sek: u64,
    /// Per Konfiguration deaktivierte Filter
    pub filter_deaktiviert: Vec<String>,
}

impl Default for RegistryKonfig {
    fn default() -> Self {
        Self {
            update_intervall: Duration::from_secs(5),
            standard_timeout_sek: 60,
            filter_deaktiviert: Vec::new(),
        }
    }
}

/// Ergebnis eines Verbindungsaufbaus
pub struct Anmeldung {
    pub session: Session,
    /// Nummer der Verbindung fuer `Session::verbindung_beendet`
    pub verbindung_nr: u64,
    /// Ausgehende Nachrichten; die erste ist immer `ready`
    pub empfaenger: mpsc::Receiver<Message>,
    pub fortgesetzt: bool,
}

struct RegistryInner {
    sessions: Arc<SessionMap>,
    codec: TrackCodec,
    loader: AudioLoader,
    voice_fabrik: Arc<dyn VoiceManagerFabrik>,
    konfig: RegistryKonfig,
    start: Instant,
}

/// Zentrale Registry aller Sessions
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn neu(
        engine: Arc<dyn AudioEngine>,
        plugins: Arc<PluginRegistry>,
        voice_fabrik: Arc<dyn VoiceManagerFabrik>,
        konfig: RegistryKonfig,
    ) -> Self {
        let codec = TrackCodec::neu(engine, plugins);
        Self {
            inner: Arc::new(RegistryInner {
                sessions: Arc::new(SessionMap::new()),
                loader: AudioLoader::neu(codec.clone()),
                codec,
                voice_fabrik,
                konfig,
                start: Instant::now(),
            }),
        }
    }

    pub fn konfig(&self) -> &RegistryKonfig {
        &self.inner.konfig
    }

    pub fn codec(&self) -> &TrackCodec {
        &self.inner.codec
    }

    pub fn loader(&self) -> &AudioLoader {
        &self.inner.loader
    }

    pub fn uptime_ms(&self) -> u64 {
        self.inner.start.elapsed().as_millis() as u64
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Meldet einen Client an
    ///
    /// Ist `fortsetzen` die ID einer Session desselben Users, die nach einem
    /// Verbindungsende auf einen Resume wartet, wird diese uebernommen, sonst
    /// entsteht eine neue. Die `ready`-Nachricht liegt bereits in der Queue,
    /// bevor gepufferte oder andere Nachrichten eingereiht werden.
    pub fn verbinden(
        &self,
        user_id: u64,
        client_name: &str,
        fortsetzen: Option<&SessionId>,
    ) -> Result<Anmeldung> {
        if let Some(id) = fortsetzen {
            if let Some(anmeldung) = self.fortsetzen(user_id, id) {
                return Ok(anmeldung);
            }
            debug!(session_id = %id, user_id, "Resume nicht moeglich – neue Session");
        }

        let session = self.erstellen(user_id, client_name)?;
        let (sender, empfaenger) = ClientSender::kanal(session.id().clone());
        sender.senden(Message::Ready {
            resumed: false,
            session_id: session.id().clone(),
        });
        let verbindung_nr = session.verbinden(sender)?;

        Ok(Anmeldung {
            session,
            verbindung_nr,
            empfaenger,
            fortgesetzt: false,
        })
    }

    fn fortsetzen(&self, user_id: u64, id: &SessionId) -> Option<Anmeldung> {
        let session = self.inner.sessions.get(id).map(|s| s.value().clone())?;
        if session.user_id() != user_id {
            warn!(
                session_id = %id,
                user_id,
                besitzer = session.user_id(),
                "Resume mit fremder User-Id abgelehnt"
            );
            return None;
        }
        if !session.wartet_auf_resume() {
            return None;
        }

        let (sender, empfaenger) = ClientSender::kanal(session.id().clone());
        sender.senden(Message::Ready {
            resumed: true,
            session_id: session.id().clone(),
        });
        let verbindung_nr = session.fortsetzen(sender)?;

        Some(Anmeldung {
            session,
            verbindung_nr,
            empfaenger,
            fortgesetzt: true,
        })
    }

    /// Legt eine Session ohne Verbindung an
    pub fn erstellen(&self, user_id: u64, client_name: &str) -> Result<Session> {
        let session = Session::neu(SessionAufbau {
            user_id,
            client_name: client_name.to_string(),
            codec: self.inner.codec.clone(),
            voice_fabrik: self.inner.voice_fabrik.as_ref(),
            update_intervall: self.inner.konfig.update_intervall,
            timeout_sek: self.inner.konfig.standard_timeout_sek,
            sessions: Arc::downgrade(&self.inner.sessions),
        })?;
        self.inner
            .sessions
            .insert(session.id().clone(), session.clone());
        Ok(session)
    }

    /// Sucht eine Session; unbekannte IDs sind `NichtGefunden`
    pub fn per_id(&self, id: &SessionId) -> Result<Session> {
        self.inner
            .sessions
            .get(id)
            .map(|s| s.value().clone())
            .ok_or_else(|| KlangwerkError::nicht_gefunden(format!("Session {id} nicht gefunden")))
    }

    pub fn anzahl(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn alle(&self) -> Vec<Session> {
        self.inner
            .sessions
            .iter()
            .map(|e| e.value().clone())
            .collect()
    }

    /// Sendet eine Nachricht an alle verbundenen Sessions
    pub fn an_alle_senden(&self, nachricht: &Message) {
        for session in self.alle() {
            session.senden(nachricht.clone());
        }
    }

    /// Zerstoert alle Sessions (Herunterfahren)
    pub fn alle_zerstoeren(&self) {
        let sessions = self.alle();
        for session in &sessions {
            session.zerstoeren();
        }
        info!(anzahl = sessions.len(), "Alle Sessions zerstoert");
    }

    // -----------------------------------------------------------------------
    // Statistik
    // -----------------------------------------------------------------------

    pub fn player_anzahl(&self) -> usize {
        self.alle().iter().map(Session::anzahl_player).sum()
    }

    pub fn spielende_player_anzahl(&self) -> usize {
        self.alle()
            .iter()
            .map(|s| s.spielende_player().len())
            .sum()
    }

    /// Frame-Statistik der letzten Minute, gemittelt ueber alle spielenden
    /// Player mit verwertbaren Daten
    pub fn frame_statistik(&self) -> Option<FrameStats> {
        let minuten: Vec<(u64, u64)> = self
            .alle()
            .iter()
            .flat_map(Session::spielende_player)
            .filter(|p| p.verlust().daten_verwertbar())
            .map(|p| p.verlust().letzte_minute())
            .collect();
        frame_stats_mitteln(&minuten)
    }
}

/// Mittelt (gesendet, verloren)-Paare zu FrameStats
fn frame_stats_mitteln(minuten: &[(u64, u64)]) -> Option<FrameStats> {
    if minuten.is_empty() {
        return None;
    }
    let anzahl = minuten.len() as i64;
    let erwartet = ERWARTETE_FRAMES_PRO_MINUTE as i64;

    let (mut gesendet, mut verloren, mut defizit) = (0i64, 0i64, 0i64);
    for &(erfolge, verluste) in minuten {
        let (erfolge, verluste) = (erfolge as i64, verluste as i64);
        gesendet += erfolge;
        verloren += verluste;
        defizit += erwartet - (erfolge + verluste);
    }

    Some(FrameStats {
        sent: gesendet / anzahl,
        nulled: verloren / anzahl,
        deficit: defizit / anzahl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use klangwerk_core::GuildId;
    use klangwerk_engine::SpeicherEngine;
    use klangwerk_voice::LokaleFabrik;

    fn registry() -> SessionRegistry {
        SessionRegistry::neu(
            Arc::new(SpeicherEngine::neu()),
            Arc::new(PluginRegistry::neu()),
            Arc::new(LokaleFabrik),
            RegistryKonfig::default(),
        )
    }

    #[tokio::test]
    async fn verbinden_sendet_ready_zuerst() {
        let registry = registry();
        let mut anmeldung = registry.verbinden(1, "bot", None).unwrap();
        assert!(!anmeldung.fortgesetzt);
        assert_eq!(registry.anzahl(), 1);

        match anmeldung.empfaenger.recv().await {
            Some(Message::Ready {
                resumed,
                session_id,
            }) => {
                assert!(!resumed);
                assert_eq!(&session_id, anmeldung.session.id());
            }
            andere => panic!("Unerwartete erste Nachricht: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn resume_uebernimmt_bestehende_session() {
        let registry = registry();
        let erste = registry.verbinden(1, "bot", None).unwrap();
        let id = erste.session.id().clone();
        erste.session.resume_aktualisieren(klangwerk_protocol::SessionUpdate {
            resuming: Some(true),
            timeout: Some(60),
        });
        erste.session.player_oder_erstellen(GuildId(3)).unwrap();
        erste.session.verbindung_beendet(erste.verbindung_nr);

        let mut zweite = registry.verbinden(1, "bot", Some(&id)).unwrap();
        assert!(zweite.fortgesetzt);
        assert!(zweite.session.ist_selber(&erste.session));
        assert_eq!(zweite.session.anzahl_player(), 1);
        assert!(matches!(
            zweite.empfaenger.recv().await,
            Some(Message::Ready { resumed: true, .. })
        ));
    }

    #[tokio::test]
    async fn verbundene_session_wird_nicht_uebernommen() {
        let registry = registry();
        let erste = registry.verbinden(1, "bot", None).unwrap();
        erste.session.resume_aktualisieren(klangwerk_protocol::SessionUpdate {
            resuming: Some(true),
            timeout: None,
        });
        let id = erste.session.id().clone();

        let zweite = registry.verbinden(1, "bot", Some(&id)).unwrap();
        assert!(!zweite.fortgesetzt);
        assert!(!zweite.session.ist_selber(&erste.session));
        assert_eq!(registry.anzahl(), 2);

        // die erste Verbindung bleibt die aktuelle
        erste.session.verbindung_beendet(erste.verbindung_nr);
        assert!(erste.session.wartet_auf_resume());
    }

    #[tokio::test]
    async fn resume_mit_fremder_user_id_erstellt_neue_session() {
        let registry = registry();
        let erste = registry.verbinden(1, "bot", None).unwrap();
        erste.session.resume_aktualisieren(klangwerk_protocol::SessionUpdate {
            resuming: Some(true),
            timeout: None,
        });
        erste.session.verbindung_beendet(erste.verbindung_nr);
        let id = erste.session.id().clone();

        let fremd = registry.verbinden(2, "anderer", Some(&id)).unwrap();
        assert!(!fremd.fortgesetzt);
        assert_ne!(fremd.session.id(), &id);
        assert!(erste.session.wartet_auf_resume());

        let eigene = registry.verbinden(1, "bot", Some(&id)).unwrap();
        assert!(eigene.fortgesetzt);
    }

    #[tokio::test]
    async fn ohne_resuming_gibt_es_nichts_fortzusetzen() {
        let registry = registry();
        let erste = registry.verbinden(1, "bot", None).unwrap();
        let id = erste.session.id().clone();
        erste.session.verbindung_beendet(erste.verbindung_nr);
        assert!(erste.session.ist_zerstoert());

        let zweite = registry.verbinden(1, "bot", Some(&id)).unwrap();
        assert!(!zweite.fortgesetzt);
    }

    #[tokio::test]
    async fn nachrichten_aus_der_pause_folgen_auf_ready() {
        let registry = registry();
        let erste = registry.verbinden(1, "bot", None).unwrap();
        erste.session.resume_aktualisieren(klangwerk_protocol::SessionUpdate {
            resuming: Some(true),
            timeout: None,
        });
        erste.session.verbindung_beendet(erste.verbindung_nr);

        let update = Message::PlayerUpdate {
            guild_id: GuildId(4),
            state: klangwerk_protocol::PlayerState {
                time: 1,
                position: 2,
                connected: false,
                ping: -1,
            },
        };
        erste.session.senden(update.clone());

        let mut zweite = registry
            .verbinden(1, "bot", Some(erste.session.id()))
            .unwrap();
        assert!(zweite.fortgesetzt);
        assert!(matches!(
            zweite.empfaenger.recv().await,
            Some(Message::Ready { resumed: true, .. })
        ));
        assert_eq!(zweite.empfaenger.recv().await, Some(update));
    }

    #[tokio::test]
    async fn resume_unbekannter_id_erstellt_neue_session() {
        let registry = registry();
        let id = SessionId::from("gibtesnichtxxxxx");
        let anmeldung = registry.verbinden(1, "bot", Some(&id)).unwrap();
        assert!(!anmeldung.fortgesetzt);
        assert_ne!(anmeldung.session.id(), &id);
    }

    #[tokio::test]
    async fn per_id_unbekannt_ist_nicht_gefunden() {
        let registry = registry();
        let fehler = registry.per_id(&SessionId::from("x")).unwrap_err();
        assert_eq!(fehler.http_status(), 404);
    }

    #[tokio::test]
    async fn zerstoerte_session_verschwindet_aus_registry() {
        let registry = registry();
        let session = registry.erstellen(1, "bot").unwrap();
        session.player_oder_erstellen(GuildId(1)).unwrap();
        session.player_oder_erstellen(GuildId(2)).unwrap();
        assert_eq!(registry.player_anzahl(), 2);

        session.zerstoeren();
        assert_eq!(registry.anzahl(), 0);
        assert_eq!(registry.player_anzahl(), 0);
        assert!(registry.per_id(session.id()).is_err());
    }

    #[tokio::test]
    async fn alle_zerstoeren_leert_registry() {
        let registry = registry();
        registry.erstellen(1, "a").unwrap();
        registry.erstellen(2, "b").unwrap();
        registry.alle_zerstoeren();
        assert_eq!(registry.anzahl(), 0);
    }

    #[test]
    fn frame_stats_leer_ist_none() {
        assert_eq!(frame_stats_mitteln(&[]), None);
    }

    #[test]
    fn frame_stats_werden_gemittelt() {
        let stats = frame_stats_mitteln(&[(3000, 0), (2700, 100)]).unwrap();
        assert_eq!(stats.sent, 2850);
        assert_eq!(stats.nulled, 50);
        // (0 + 200) / 2
        assert_eq!(stats.deficit, 100);
    }
}
