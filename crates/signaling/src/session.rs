//! Session – Zustand eines verbundenen Clients
//!
//! Eine Session haelt die Player aller Guilds eines Clients, dessen
//! Voice-Manager und die ausgehende Nachrichten-Queue.
//!
//! ## Lebenszyklus
//! ```text
//! verbinden -> Verbunden -> verbindung_beendet -+-> resuming: Pausiert -> verbinden (Resume)
//!                                               |                     -> Timeout -> zerstoeren
//!                                               +-> sonst: zerstoeren
//! ```
//!
//! Waehrend die Session pausiert ist, spielen die Player weiter; Nachrichten
//! an den Client werden gepuffert und nach dem Resume zugestellt.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use klangwerk_core::{GuildId, KlangwerkError, Result, SessionId};
use klangwerk_player::{NachrichtenSenke, Player, PlayerKontext, TrackCodec};
use klangwerk_protocol::message::Event;
use klangwerk_protocol::{Message, Session as ResumeKonfig, SessionUpdate};
use klangwerk_voice::{VoiceEreignis, VoiceManagerFabrik};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::sender::ClientSender;

/// Alle Sessions, indiziert nach ID
pub(crate) type SessionMap = DashMap<SessionId, Session>;

// ---------------------------------------------------------------------------
// SessionSenke
// ---------------------------------------------------------------------------

/// Maximale Anzahl gepufferter Nachrichten einer pausierten Session
pub const PAUSE_PUFFER_GROESSE: usize = 256;

#[derive(Default)]
struct SenkeZustand {
    verbindung: Option<(u64, ClientSender)>,
    /// `Some`, solange die Session auf einen Resume wartet
    puffer: Option<VecDeque<Message>>,
}

/// Ausgehender Kanal einer Session
///
/// Jede Verbindung bekommt eine laufende Nummer. Nur die aktuelle
/// Verbindung darf die Senke trennen, eine abgeloeste alte Verbindung
/// bleibt wirkungslos. Waehrend einer Resume-Pause werden Nachrichten
/// gepuffert; bei vollem Puffer faellt die aelteste heraus.
pub struct SessionSenke {
    session_id: SessionId,
    zustand: Mutex<SenkeZustand>,
}

impl SessionSenke {
    fn neu(session_id: SessionId) -> Self {
        Self {
            session_id,
            zustand: Mutex::new(SenkeZustand::default()),
        }
    }

    /// Haengt eine Verbindung an; eine laufende Pause wird verworfen
    fn verbinden(&self, nr: u64, sender: ClientSender) {
        let mut zustand = self.zustand.lock();
        zustand.puffer = None;
        zustand.verbindung = Some((nr, sender));
    }

    /// Setzt eine pausierte Senke fort und stellt den Puffer zu
    ///
    /// Schlaegt fehl, wenn die Senke nicht pausiert ist.
    fn fortsetzen(&self, nr: u64, sender: ClientSender) -> bool {
        let mut zustand = self.zustand.lock();
        if zustand.verbindung.is_some() {
            return false;
        }
        let Some(puffer) = zustand.puffer.take() else {
            return false;
        };
        let anzahl = puffer.len();
        for nachricht in puffer {
            sender.senden(nachricht);
        }
        zustand.verbindung = Some((nr, sender));
        debug!(session_id = %self.session_id, nachgeholt = anzahl, "Gepufferte Nachrichten zugestellt");
        true
    }

    /// Trennt die Verbindung, falls `nr` noch die aktuelle ist
    ///
    /// Mit `pausieren` beginnt die Senke zu puffern.
    fn trennen(&self, nr: u64, pausieren: bool) -> bool {
        let mut zustand = self.zustand.lock();
        if !zustand
            .verbindung
            .as_ref()
            .is_some_and(|(aktuell, _)| *aktuell == nr)
        {
            return false;
        }
        zustand.verbindung = None;
        if pausieren {
            zustand.puffer = Some(VecDeque::new());
        }
        true
    }

    fn alle_trennen(&self) {
        let mut zustand = self.zustand.lock();
        zustand.verbindung = None;
        zustand.puffer = None;
    }

    fn ist_verbunden(&self) -> bool {
        self.zustand.lock().verbindung.is_some()
    }

    fn ist_pausiert(&self) -> bool {
        let zustand = self.zustand.lock();
        zustand.verbindung.is_none() && zustand.puffer.is_some()
    }
}

impl NachrichtenSenke for SessionSenke {
    fn senden(&self, nachricht: Message) {
        let mut zustand = self.zustand.lock();
        let zustand = &mut *zustand;
        match (&zustand.verbindung, &mut zustand.puffer) {
            (Some((_, sender)), _) => {
                sender.senden(nachricht);
            }
            (None, Some(puffer)) => {
                if puffer.len() >= PAUSE_PUFFER_GROESSE {
                    puffer.pop_front();
                    trace!(session_id = %self.session_id, "Pause-Puffer voll – aelteste Nachricht verworfen");
                }
                puffer.push_back(nachricht);
            }
            (None, None) => {
                trace!(session_id = %self.session_id, "Keine Verbindung – Nachricht verworfen")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Bausteine fuer eine neue Session
pub(crate) struct SessionAufbau<'a> {
    pub user_id: u64,
    pub client_name: String,
    pub codec: TrackCodec,
    pub voice_fabrik: &'a dyn VoiceManagerFabrik,
    pub update_intervall: Duration,
    pub timeout_sek: u64,
    pub sessions: Weak<SessionMap>,
}

struct SessionInner {
    id: SessionId,
    user_id: u64,
    client_name: String,
    players: DashMap<GuildId, Player>,
    kontext: Arc<PlayerKontext>,
    senke: Arc<SessionSenke>,
    resume: Mutex<ResumeKonfig>,
    verbindung_nr: AtomicU64,
    zerstoert: AtomicBool,
    resume_abbruch: Mutex<Option<CancellationToken>>,
    sessions: Weak<SessionMap>,
}

/// Handle auf eine Session (billig klonbar)
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("user_id", &self.inner.user_id)
            .field("players", &self.inner.players.len())
            .finish()
    }
}

impl Session {
    /// Erstellt eine Session ohne Verbindung
    ///
    /// Muss innerhalb einer tokio-Laufzeit aufgerufen werden.
    pub(crate) fn neu(aufbau: SessionAufbau<'_>) -> Result<Self> {
        let laufzeit = tokio::runtime::Handle::try_current()
            .map_err(|e| KlangwerkError::intern(format!("Keine tokio-Laufzeit: {e}")))?;

        let id = SessionId::neu();
        let senke = Arc::new(SessionSenke::neu(id.clone()));
        let (voice_tx, voice_rx) = mpsc::unbounded_channel();
        let voice = aufbau.voice_fabrik.erstellen(aufbau.user_id, voice_tx);

        let kontext = Arc::new(PlayerKontext {
            codec: aufbau.codec,
            voice,
            senke: senke.clone(),
            update_intervall: aufbau.update_intervall,
            laufzeit: laufzeit.clone(),
        });

        laufzeit.spawn(voice_weiterleiten(Arc::clone(&senke), voice_rx));

        info!(
            session_id = %id,
            user_id = aufbau.user_id,
            client = %aufbau.client_name,
            "Session erstellt"
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                id,
                user_id: aufbau.user_id,
                client_name: aufbau.client_name,
                players: DashMap::new(),
                kontext,
                senke,
                resume: Mutex::new(ResumeKonfig {
                    resuming: false,
                    timeout: aufbau.timeout_sek,
                }),
                verbindung_nr: AtomicU64::new(0),
                zerstoert: AtomicBool::new(false),
                resume_abbruch: Mutex::new(None),
                sessions: aufbau.sessions,
            }),
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.inner.id
    }

    pub fn user_id(&self) -> u64 {
        self.inner.user_id
    }

    pub fn client_name(&self) -> &str {
        &self.inner.client_name
    }

    pub fn ist_zerstoert(&self) -> bool {
        self.inner.zerstoert.load(Ordering::Acquire)
    }

    /// Zeigen beide Handles auf dieselbe Session?
    pub fn ist_selber(&self, andere: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &andere.inner)
    }

    // -----------------------------------------------------------------------
    // Player
    // -----------------------------------------------------------------------

    pub fn player(&self, guild_id: GuildId) -> Option<Player> {
        self.inner.players.get(&guild_id).map(|p| p.value().clone())
    }

    /// Liefert den Player der Guild und legt ihn bei Bedarf an
    ///
    /// Solange der Player existiert, liefert jeder Aufruf dasselbe Handle.
    pub fn player_oder_erstellen(&self, guild_id: GuildId) -> Result<Player> {
        if self.ist_zerstoert() {
            return Err(KlangwerkError::zustand("Session wurde zerstoert"));
        }

        if let Some(player) = self.player(guild_id) {
            return Ok(player);
        }

        // Der Ereignis-Task startet erst nach Freigabe des Shard-Locks
        let (player, start) = match self.inner.players.entry(guild_id) {
            Entry::Occupied(e) => (e.get().clone(), None),
            Entry::Vacant(e) => {
                let (player, start) =
                    Player::vorbereiten(guild_id, Arc::clone(&self.inner.kontext));
                e.insert(player.clone());
                (player, Some(start))
            }
        };
        if let Some(start) = start {
            start.starten();
        }

        // Zerstoerung lief parallel: der Player darf nicht ueberleben
        if self.ist_zerstoert() {
            self.inner.players.remove(&guild_id);
            player.zerstoeren();
            return Err(KlangwerkError::zustand("Session wurde zerstoert"));
        }
        Ok(player)
    }

    /// Entfernt und zerstoert den Player einer Guild
    pub fn player_entfernen(&self, guild_id: GuildId) -> bool {
        match self.inner.players.remove(&guild_id) {
            Some((_, player)) => {
                player.zerstoeren();
                debug!(session_id = %self.inner.id, guild_id = %guild_id, "Player entfernt");
                true
            }
            None => false,
        }
    }

    pub fn players(&self) -> Vec<Player> {
        self.inner.players.iter().map(|e| e.value().clone()).collect()
    }

    pub fn anzahl_player(&self) -> usize {
        self.inner.players.len()
    }

    /// Player mit laufendem, nicht pausiertem Track
    pub fn spielende_player(&self) -> Vec<Player> {
        self.inner
            .players
            .iter()
            .filter(|e| e.value().ist_spielend())
            .map(|e| e.value().clone())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Nachrichten & Verbindung
    // -----------------------------------------------------------------------

    /// Reiht eine Nachricht ein, ohne zu blockieren
    pub fn senden(&self, nachricht: Message) {
        self.inner.senke.senden(nachricht);
    }

    pub fn ist_verbunden(&self) -> bool {
        self.inner.senke.ist_verbunden()
    }

    /// Haengt eine (neue) Verbindung an und bricht einen laufenden
    /// Resume-Timeout ab. Liefert die Verbindungsnummer.
    pub fn verbinden(&self, sender: ClientSender) -> Result<u64> {
        if self.ist_zerstoert() {
            return Err(KlangwerkError::zustand("Session wurde zerstoert"));
        }
        if let Some(abbruch) = self.inner.resume_abbruch.lock().take() {
            abbruch.cancel();
        }
        let nr = self.inner.verbindung_nr.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.senke.verbinden(nr, sender);
        debug!(session_id = %self.inner.id, verbindung = nr, "Verbindung angehaengt");
        Ok(nr)
    }

    /// Wartet die Session nach einem Verbindungsende auf einen Resume?
    pub fn wartet_auf_resume(&self) -> bool {
        !self.ist_zerstoert() && self.inner.senke.ist_pausiert()
    }

    /// Setzt eine pausierte Session mit einer neuen Verbindung fort
    ///
    /// Gepufferte Nachrichten folgen auf alles, was bereits in `sender`
    /// liegt. Liefert `None`, wenn die Session nicht auf einen Resume wartet.
    pub fn fortsetzen(&self, sender: ClientSender) -> Option<u64> {
        if self.ist_zerstoert() {
            return None;
        }
        let nr = self.inner.verbindung_nr.fetch_add(1, Ordering::AcqRel) + 1;
        if !self.inner.senke.fortsetzen(nr, sender) {
            return None;
        }
        if let Some(abbruch) = self.inner.resume_abbruch.lock().take() {
            abbruch.cancel();
        }
        info!(session_id = %self.inner.id, verbindung = nr, "Session fortgesetzt");
        Some(nr)
    }

    /// Meldet das Ende der Verbindung `nr`
    ///
    /// Mit aktiviertem Resuming wird die Session pausiert, sonst zerstoert.
    /// Eine bereits abgeloeste Verbindung aendert nichts.
    pub fn verbindung_beendet(&self, nr: u64) {
        let konfig = self.resume_konfig();
        if !self.inner.senke.trennen(nr, konfig.resuming) {
            trace!(session_id = %self.inner.id, verbindung = nr, "Abgeloeste Verbindung beendet");
            return;
        }

        if konfig.resuming {
            info!(
                session_id = %self.inner.id,
                timeout_sek = konfig.timeout,
                "Verbindung getrennt – Session wartet auf Resume"
            );
            self.pausieren(Duration::from_secs(konfig.timeout));
        } else {
            info!(session_id = %self.inner.id, "Verbindung getrennt – Session wird beendet");
            self.zerstoeren();
        }
    }

    fn pausieren(&self, timeout: Duration) {
        let abbruch = CancellationToken::new();
        if let Some(alt) = self.inner.resume_abbruch.lock().replace(abbruch.clone()) {
            alt.cancel();
        }

        let schwach = Arc::downgrade(&self.inner);
        self.inner.kontext.laufzeit.spawn(async move {
            tokio::select! {
                _ = abbruch.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    let Some(inner) = schwach.upgrade() else {
                        return;
                    };
                    let session = Session { inner };
                    if !session.ist_verbunden() {
                        info!(session_id = %session.id(), "Resume-Timeout abgelaufen");
                        session.zerstoeren();
                    }
                }
            }
        });
    }

    // -----------------------------------------------------------------------
    // Resume-Konfiguration
    // -----------------------------------------------------------------------

    pub fn resume_konfig(&self) -> ResumeKonfig {
        *self.inner.resume.lock()
    }

    /// Uebernimmt die gesetzten Felder und liefert die neue Konfiguration
    pub fn resume_aktualisieren(&self, update: SessionUpdate) -> ResumeKonfig {
        let mut konfig = self.inner.resume.lock();
        if let Some(resuming) = update.resuming {
            konfig.resuming = resuming;
        }
        if let Some(timeout) = update.timeout {
            konfig.timeout = timeout;
        }
        debug!(
            session_id = %self.inner.id,
            resuming = konfig.resuming,
            timeout_sek = konfig.timeout,
            "Resume-Konfiguration aktualisiert"
        );
        *konfig
    }

    // -----------------------------------------------------------------------
    // Zerstoerung
    // -----------------------------------------------------------------------

    /// Zerstoert alle Player, schliesst den Voice-Manager und entfernt die
    /// Session aus der Registry. Mehrfacher Aufruf ist wirkungslos.
    pub fn zerstoeren(&self) {
        if self.inner.zerstoert.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(abbruch) = self.inner.resume_abbruch.lock().take() {
            abbruch.cancel();
        }

        let players = self.players();
        self.inner.players.clear();
        for player in &players {
            player.zerstoeren();
        }

        self.inner.kontext.voice.schliessen();
        self.inner.senke.alle_trennen();

        if let Some(sessions) = self.inner.sessions.upgrade() {
            sessions.remove_if(&self.inner.id, |_, s| s.ist_selber(self));
        }

        info!(
            session_id = %self.inner.id,
            player = players.len(),
            "Session zerstoert"
        );
    }
}

/// Leitet Ereignisse des Voice-Managers als WebSocketClosedEvent weiter
async fn voice_weiterleiten(
    senke: Arc<SessionSenke>,
    mut rx: mpsc::UnboundedReceiver<VoiceEreignis>,
) {
    while let Some(ereignis) = rx.recv().await {
        match ereignis {
            VoiceEreignis::Geschlossen {
                guild_id,
                code,
                grund,
                von_remote,
            } => {
                info!(
                    session_id = %senke.session_id,
                    guild_id = %guild_id,
                    code,
                    grund = %grund,
                    "Voice-Verbindung geschlossen"
                );
                senke.senden(Message::Event(Event::WebSocketClosedEvent {
                    guild_id,
                    code,
                    reason: grund,
                    by_remote: von_remote,
                }));
            }
        }
    }
    trace!(session_id = %senke.session_id, "Voice-Weiterleitung beendet");
}
