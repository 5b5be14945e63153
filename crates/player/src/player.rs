//! Player – Wiedergabe-Zustandsmaschine einer Guild
//!
//! ## Zustaende
//! `Leerlauf` -> `Spielt` <-> `Pausiert`, jeder Zustand -> `Zerstoert`.
//! `Zerstoert` ist endgueltig: jeder weitere Befehl liefert
//! `UngueltigerZustand`, spaete Engine-Ereignisse werden verworfen.
//!
//! ## Nebenlaeufigkeit
//! Client-Befehle und Engine-Ereignisse laufen durch dieselbe Sperre. Die
//! Engine meldet ueber einen mpsc-Kanal, ein Task pro Player arbeitet ihn
//! ab. Der Task haelt nur eine schwache Referenz, damit der Player beim
//! Verwerfen des letzten Handles freigegeben wird. Ueber ein `.await`
//! wird die Sperre nie gehalten.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use klangwerk_core::{GuildId, KlangwerkError, Result};
use klangwerk_engine::{AudioTrack, EndeGrund, EngineEreignis, EnginePlayer};
use klangwerk_protocol::message::Event;
use klangwerk_protocol::{
    JsonObjekt, Message, Player as PlayerDto, PlayerState, TrackEndReason, VoiceState,
};
use klangwerk_voice::{VoiceError, VoiceServerInfo};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::codec;
use crate::filter::FilterKette;
use crate::kontext::PlayerKontext;
use crate::lieferant::FrameLieferant;
use crate::plan::UpdatePlan;
use crate::verlust::FrameVerlustZaehler;
use crate::MAX_LAUTSTAERKE;

/// Wiedergabezustand eines Players
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wiedergabe {
    Leerlauf,
    Spielt,
    Pausiert,
    Zerstoert,
}

fn ende_grund(grund: EndeGrund) -> TrackEndReason {
    match grund {
        EndeGrund::Fertig => TrackEndReason::Finished,
        EndeGrund::LadenFehlgeschlagen => TrackEndReason::LoadFailed,
        EndeGrund::Gestoppt => TrackEndReason::Stopped,
        EndeGrund::Ersetzt => TrackEndReason::Replaced,
        EndeGrund::Aufgeraeumt => TrackEndReason::Cleanup,
    }
}

fn zerstoert_fehler() -> KlangwerkError {
    KlangwerkError::zustand("Player wurde zerstoert")
}

struct PlayerZustand {
    wiedergabe: Wiedergabe,
    /// Laufender Track mit den userData des Clients
    aktuell: Option<(AudioTrack, JsonObjekt)>,
    /// Vom naechsten Track ersetzter Track (fuer dessen Ende-Ereignis)
    vorherig: Option<(AudioTrack, JsonObjekt)>,
    filter: FilterKette,
    endmarke_erreicht: bool,
    plan: Option<UpdatePlan>,
}

impl PlayerZustand {
    fn user_data(&self, track: &AudioTrack) -> JsonObjekt {
        [&self.aktuell, &self.vorherig]
            .into_iter()
            .flatten()
            .find(|(t, _)| t.ist_selber(track))
            .map(|(_, daten)| daten.clone())
            .unwrap_or_default()
    }

    fn pruefen(&self) -> Result<()> {
        if self.wiedergabe == Wiedergabe::Zerstoert {
            Err(zerstoert_fehler())
        } else {
            Ok(())
        }
    }
}

struct PlayerInner {
    guild_id: GuildId,
    kontext: Arc<PlayerKontext>,
    engine_player: Arc<dyn EnginePlayer>,
    verlust: Arc<FrameVerlustZaehler>,
    plaene_gestartet: AtomicU64,
    zustand: Mutex<PlayerZustand>,
}

/// Handle auf einen Player (billig klonbar)
/// Noch nicht gestarteter Ereignis-Task eines Players
pub struct PlayerStart {
    inner: Weak<PlayerInner>,
    laufzeit: tokio::runtime::Handle,
    rx: mpsc::UnboundedReceiver<EngineEreignis>,
}

impl PlayerStart {
    pub fn starten(self) {
        self.laufzeit.spawn(ereignis_schleife(self.inner, self.rx));
    }
}

#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("guild_id", &self.inner.guild_id)
            .field("wiedergabe", &self.wiedergabe())
            .finish()
    }
}

impl Player {
    /// Erstellt einen Player samt Engine-Player und Ereignis-Task
    pub fn neu(guild_id: GuildId, kontext: Arc<PlayerKontext>) -> Self {
        let (player, start) = Self::vorbereiten(guild_id, kontext);
        start.starten();
        player
    }

    /// Erstellt einen Player, ohne den Ereignis-Task zu starten
    ///
    /// Bis [`PlayerStart::starten`] laufen Engine-Ereignisse nur auf.
    pub fn vorbereiten(guild_id: GuildId, kontext: Arc<PlayerKontext>) -> (Self, PlayerStart) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine_player = kontext.codec.engine().player_erstellen(tx);

        let inner = Arc::new(PlayerInner {
            guild_id,
            kontext,
            engine_player,
            verlust: Arc::new(FrameVerlustZaehler::neu()),
            plaene_gestartet: AtomicU64::new(0),
            zustand: Mutex::new(PlayerZustand {
                wiedergabe: Wiedergabe::Leerlauf,
                aktuell: None,
                vorherig: None,
                filter: FilterKette::neu(),
                endmarke_erreicht: false,
                plan: None,
            }),
        });

        let start = PlayerStart {
            inner: Arc::downgrade(&inner),
            laufzeit: inner.kontext.laufzeit.clone(),
            rx,
        };
        debug!(guild_id = %guild_id, "Player erstellt");
        (Self { inner }, start)
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn guild_id(&self) -> GuildId {
        self.inner.guild_id
    }

    pub fn wiedergabe(&self) -> Wiedergabe {
        self.inner.zustand.lock().wiedergabe
    }

    pub fn ist_zerstoert(&self) -> bool {
        self.wiedergabe() == Wiedergabe::Zerstoert
    }

    /// Laeuft ein Track und ist nicht pausiert?
    pub fn ist_spielend(&self) -> bool {
        self.inner.engine_player.aktueller_track().is_some()
            && !self.inner.engine_player.ist_pausiert()
            && !self.ist_zerstoert()
    }

    pub fn aktueller_track(&self) -> Option<AudioTrack> {
        self.inner.engine_player.aktueller_track()
    }

    pub fn verlust(&self) -> &Arc<FrameVerlustZaehler> {
        &self.inner.verlust
    }

    pub fn filter(&self) -> FilterKette {
        self.inner.zustand.lock().filter.clone()
    }

    /// Zeigen beide Handles auf denselben Player?
    pub fn ist_selber(&self, anderer: &Player) -> bool {
        Arc::ptr_eq(&self.inner, &anderer.inner)
    }

    pub fn plan_aktiv(&self) -> bool {
        self.inner
            .zustand
            .lock()
            .plan
            .as_ref()
            .is_some_and(UpdatePlan::ist_aktiv)
    }

    /// Track, fuer den der aktive Update-Plan gestartet wurde
    pub fn plan_track(&self) -> Option<AudioTrack> {
        self.inner
            .zustand
            .lock()
            .plan
            .as_ref()
            .filter(|p| p.ist_aktiv())
            .map(|p| p.track().clone())
    }

    /// Wie oft seit Erstellung ein Update-Plan gestartet wurde
    pub fn plaene_gestartet(&self) -> u64 {
        self.inner.plaene_gestartet.load(Ordering::Relaxed)
    }

    /// Momentaufnahme des Wiedergabezustands
    pub fn snapshot(&self) -> PlayerState {
        let verbindung = self.inner.kontext.voice.verbindung(self.inner.guild_id);
        PlayerState {
            time: chrono::Utc::now().timestamp_millis(),
            position: self
                .inner
                .engine_player
                .aktueller_track()
                .map(|t| t.position_ms())
                .unwrap_or(0),
            connected: verbindung.as_ref().is_some_and(|v| v.offen),
            ping: verbindung.map(|v| v.ping).unwrap_or(-1),
        }
    }

    /// Vollstaendige Protokoll-Darstellung (GET/PATCH-Antwort)
    pub fn zu_protokoll(&self) -> Result<PlayerDto> {
        let (user_data, filters) = {
            let z = self.inner.zustand.lock();
            let user_data = self
                .inner
                .engine_player
                .aktueller_track()
                .map(|t| (z.user_data(&t), t));
            (user_data, z.filter.filters().clone())
        };

        let track = match user_data {
            Some((daten, t)) => Some(self.inner.kontext.codec.zu_track(&t, daten)?),
            None => None,
        };

        let voice = self
            .inner
            .kontext
            .voice
            .verbindung(self.inner.guild_id)
            .map(|v| VoiceState {
                token: v.server.token,
                endpoint: v.server.endpoint,
                session_id: v.server.session_id,
            })
            .unwrap_or_default();

        Ok(PlayerDto {
            guild_id: self.inner.guild_id,
            track,
            volume: self.inner.engine_player.lautstaerke(),
            paused: self.inner.engine_player.ist_pausiert(),
            state: self.snapshot(),
            voice,
            filters,
        })
    }

    // -----------------------------------------------------------------------
    // Befehle
    // -----------------------------------------------------------------------

    /// Startet einen Track und sendet sofort ein PlayerUpdate
    pub fn abspielen(&self, track: AudioTrack, user_data: JsonObjekt) -> Result<()> {
        {
            let mut z = self.inner.zustand.lock();
            z.pruefen()?;
            z.vorherig = z.aktuell.take();
            z.aktuell = Some((track.clone(), user_data));
            z.endmarke_erreicht = false;
            z.wiedergabe = Wiedergabe::Spielt;
            self.inner.engine_player.pause_setzen(false);
            self.inner.engine_player.abspielen(track);
        }
        info!(guild_id = %self.inner.guild_id, "Wiedergabe gestartet");
        self.update_senden();
        Ok(())
    }

    /// Stoppt die Wiedergabe; der Update-Plan endet mit dem Ende-Ereignis
    pub fn stoppen(&self) -> Result<()> {
        let mut z = self.inner.zustand.lock();
        z.pruefen()?;
        z.wiedergabe = Wiedergabe::Leerlauf;
        self.inner.engine_player.stoppen();
        Ok(())
    }

    pub fn pause_setzen(&self, pausiert: bool) -> Result<()> {
        let mut z = self.inner.zustand.lock();
        z.pruefen()?;
        let war_pausiert = self.inner.engine_player.ist_pausiert();
        self.inner.engine_player.pause_setzen(pausiert);

        if self.inner.engine_player.aktueller_track().is_some() {
            z.wiedergabe = if pausiert {
                Wiedergabe::Pausiert
            } else {
                Wiedergabe::Spielt
            };
            match (war_pausiert, pausiert) {
                (false, true) => self.inner.verlust.pausiert(),
                (true, false) => self.inner.verlust.fortgesetzt(),
                _ => {}
            }
        }
        Ok(())
    }

    /// Springt an eine Position; im Leerlauf ein Zustandsfehler
    pub fn suchen(&self, position_ms: u64) -> Result<()> {
        let z = self.inner.zustand.lock();
        z.pruefen()?;
        let track = match (z.wiedergabe, self.inner.engine_player.aktueller_track()) {
            (Wiedergabe::Leerlauf, _) | (_, None) => {
                return Err(KlangwerkError::zustand(
                    "Suchen ist ohne laufenden Track nicht moeglich",
                ))
            }
            (_, Some(track)) => track,
        };
        if !track.position_setzen(position_ms) {
            debug!(
                guild_id = %self.inner.guild_id,
                identifier = %track.info().identifier,
                "Track ist nicht spulbar, Position unveraendert"
            );
        }
        Ok(())
    }

    /// Setzt die Lautstaerke, begrenzt auf 0..=1000
    pub fn lautstaerke_setzen(&self, lautstaerke: i32) -> Result<()> {
        let z = self.inner.zustand.lock();
        z.pruefen()?;
        let begrenzt = lautstaerke.clamp(0, MAX_LAUTSTAERKE);
        self.inner.engine_player.lautstaerke_setzen(begrenzt as u16);
        Ok(())
    }

    /// Setzt oder entfernt die Endmarke des laufenden Tracks
    pub fn endzeit_setzen(&self, endzeit_ms: Option<u64>) -> Result<()> {
        let z = self.inner.zustand.lock();
        z.pruefen()?;
        self.inner.engine_player.marker_setzen(endzeit_ms);
        Ok(())
    }

    /// Ersetzt die userData des laufenden Tracks
    pub fn user_data_setzen(&self, user_data: JsonObjekt) -> Result<()> {
        let mut z = self.inner.zustand.lock();
        z.pruefen()?;
        match z.aktuell.as_mut() {
            Some((_, daten)) => {
                *daten = user_data;
                Ok(())
            }
            None => Err(KlangwerkError::zustand(
                "userData ohne laufenden Track nicht moeglich",
            )),
        }
    }

    /// Ersetzt die Filterkette und aktiviert sie neu
    pub fn filter_setzen(&self, kette: FilterKette) -> Result<()> {
        let mut z = self.inner.zustand.lock();
        z.pruefen()?;
        kette.aktivieren(self.inner.engine_player.as_ref());
        z.filter = kette;
        Ok(())
    }

    /// Verbindet die Guild mit dem Voice-Server und haengt den Lieferanten an
    pub async fn voice_aktualisieren(&self, voice: VoiceState) -> Result<()> {
        self.inner.zustand.lock().pruefen()?;
        if !voice.ist_vollstaendig() {
            return Err(KlangwerkError::argument(
                "Unvollstaendiger Voice-State: token, endpoint und sessionId sind Pflicht",
            ));
        }

        let guild_id = self.inner.guild_id;
        let server = VoiceServerInfo {
            session_id: voice.session_id,
            endpoint: voice.endpoint,
            token: voice.token,
        };
        self.inner
            .kontext
            .voice
            .verbinden(guild_id, server)
            .await
            .map_err(|e| match e {
                VoiceError::Unvollstaendig => KlangwerkError::argument(e.to_string()),
                VoiceError::Geschlossen => KlangwerkError::zustand(e.to_string()),
            })?;

        // Zwischenzeitlich zerstoert: Verbindung gleich wieder abbauen
        if self.ist_zerstoert() {
            self.inner.kontext.voice.trennen(guild_id);
            return Err(zerstoert_fehler());
        }

        let lieferant = FrameLieferant::neu(
            Arc::clone(&self.inner.engine_player),
            Arc::clone(&self.inner.verlust),
        );
        if !self
            .inner
            .kontext
            .voice
            .provider_setzen(guild_id, Box::new(lieferant))
        {
            warn!(guild_id = %guild_id, "Frame-Lieferant konnte nicht gesetzt werden");
        }
        debug!(guild_id = %guild_id, "Voice-Verbindung aktualisiert");
        Ok(())
    }

    /// Zerstoert den Player; mehrfacher Aufruf ist wirkungslos
    pub fn zerstoeren(&self) {
        let laufend = {
            let mut z = self.inner.zustand.lock();
            if z.wiedergabe == Wiedergabe::Zerstoert {
                return;
            }
            z.wiedergabe = Wiedergabe::Zerstoert;
            if let Some(plan) = z.plan.take() {
                plan.abbrechen();
            }
            self.inner
                .engine_player
                .aktueller_track()
                .map(|t| (z.user_data(&t), t))
        };

        self.inner.engine_player.zerstoeren();
        self.inner.kontext.voice.trennen(self.inner.guild_id);

        if let Some((user_data, track)) = laufend {
            self.event_senden(&track, user_data, |guild_id, track| Event::TrackEndEvent {
                guild_id,
                track,
                reason: TrackEndReason::Cleanup,
            });
        }
        info!(guild_id = %self.inner.guild_id, "Player zerstoert");
    }

    // -----------------------------------------------------------------------
    // Engine-Ereignisse
    // -----------------------------------------------------------------------

    /// Verarbeitet ein Ereignis des Engine-Players
    pub fn ereignis_verarbeiten(&self, ereignis: EngineEreignis) {
        let mut z = self.inner.zustand.lock();
        if z.wiedergabe == Wiedergabe::Zerstoert {
            trace!(guild_id = %self.inner.guild_id, "Ereignis nach Zerstoerung verworfen");
            return;
        }

        match ereignis {
            EngineEreignis::TrackStart(track) => {
                self.inner.verlust.track_gestartet();
                let aktiv = z.plan.as_ref().is_some_and(UpdatePlan::ist_aktiv);
                if !aktiv {
                    z.plan = Some(self.plan_starten(track.clone()));
                }
                let user_data = z.user_data(&track);
                drop(z);
                self.event_senden(&track, user_data, |guild_id, track| {
                    Event::TrackStartEvent { guild_id, track }
                });
            }
            EngineEreignis::TrackEnde { track, grund } => {
                self.inner.verlust.track_beendet();
                if let Some(plan) = z.plan.take() {
                    plan.abbrechen();
                }

                let mut reason = ende_grund(grund);
                if reason == TrackEndReason::Stopped && z.endmarke_erreicht {
                    reason = TrackEndReason::Finished;
                }
                z.endmarke_erreicht = false;

                if self.inner.engine_player.aktueller_track().is_none() {
                    z.wiedergabe = Wiedergabe::Leerlauf;
                }
                let user_data = z.user_data(&track);
                if z.vorherig.as_ref().is_some_and(|(t, _)| t.ist_selber(&track)) {
                    z.vorherig = None;
                }
                drop(z);

                debug!(guild_id = %self.inner.guild_id, grund = ?reason, "Track beendet");
                self.event_senden(&track, user_data, |guild_id, track| Event::TrackEndEvent {
                    guild_id,
                    track,
                    reason,
                });
            }
            EngineEreignis::TrackFehler { track, fehler } => {
                let user_data = z.user_data(&track);
                drop(z);
                warn!(
                    guild_id = %self.inner.guild_id,
                    schwere = %fehler.schwere,
                    fehler = %fehler,
                    "Fehler waehrend der Wiedergabe"
                );
                let exception = codec::exception(&fehler);
                self.event_senden(&track, user_data, |guild_id, track| {
                    Event::TrackExceptionEvent {
                        guild_id,
                        track,
                        exception,
                    }
                });
            }
            EngineEreignis::TrackHaengt { track, schwelle_ms } => {
                let user_data = z.user_data(&track);
                drop(z);
                warn!(guild_id = %self.inner.guild_id, schwelle_ms, "Track haengt");
                self.event_senden(&track, user_data, |guild_id, track| Event::TrackStuckEvent {
                    guild_id,
                    track,
                    threshold_ms: schwelle_ms,
                });
            }
            EngineEreignis::MarkerErreicht(_) => {
                z.endmarke_erreicht = true;
                self.inner.engine_player.stoppen();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    fn plan_starten(&self, track: AudioTrack) -> UpdatePlan {
        self.inner.plaene_gestartet.fetch_add(1, Ordering::Relaxed);
        let schwach = Arc::downgrade(&self.inner);
        UpdatePlan::starten(
            &self.inner.kontext.laufzeit,
            self.inner.kontext.update_intervall,
            track,
            move |token| {
                let Some(inner) = schwach.upgrade() else {
                    return;
                };
                let player = Player { inner };
                {
                    // Abbruch unter der Sperre pruefen, damit nach dem Ende
                    // kein verspaetetes Update mehr rausgeht
                    let z = player.inner.zustand.lock();
                    if token.is_cancelled() || z.wiedergabe == Wiedergabe::Zerstoert {
                        return;
                    }
                }
                player.update_senden();
            },
        )
    }

    fn update_senden(&self) {
        if self.ist_zerstoert() {
            return;
        }
        self.inner.kontext.senden(Message::PlayerUpdate {
            guild_id: self.inner.guild_id,
            state: self.snapshot(),
        });
    }

    fn event_senden<F>(&self, track: &AudioTrack, user_data: JsonObjekt, bauen: F)
    where
        F: FnOnce(GuildId, klangwerk_protocol::Track) -> Event,
    {
        match self.inner.kontext.codec.zu_track(track, user_data) {
            Ok(t) => self
                .inner
                .kontext
                .senden(Message::Event(bauen(self.inner.guild_id, t))),
            Err(e) => warn!(
                guild_id = %self.inner.guild_id,
                fehler = %e,
                "Ereignis verworfen, Track nicht kodierbar"
            ),
        }
    }
}

async fn ereignis_schleife(
    schwach: Weak<PlayerInner>,
    mut rx: mpsc::UnboundedReceiver<EngineEreignis>,
) {
    while let Some(ereignis) = rx.recv().await {
        let Some(inner) = schwach.upgrade() else {
            break;
        };
        Player { inner }.ereignis_verarbeiten(ereignis);
    }
    trace!("Ereignis-Schleife beendet");
}
