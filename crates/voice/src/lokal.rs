//! Lokaler Referenz-Transport
//!
//! Pro Guild-Verbindung laeuft ein tokio-Task, der im 20-ms-Takt einen Frame
//! vom [`FrameProvider`] zieht und zaehlt, statt ihn ins Netz zu senden.
//!
//! ```text
//! provider_setzen() --mpsc--> Frame-Task (interval 20 ms)
//!                                 |
//!                                 +--> kann_liefern() / frame_abrufen()
//!                                 +--> VerbindungsStatistik
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use dashmap::DashMap;
use klangwerk_core::GuildId;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::schnittstelle::{
    FrameProvider, VerbindungsInfo, VoiceEreignis, VoiceError, VoiceManager, VoiceManagerFabrik,
    VoiceResult, VoiceServerInfo,
};
use crate::FRAME_TAKT_MS;

/// Puffergroesse des Frame-Tasks (maximale Opus-Framegroesse)
const PUFFER_GROESSE: usize = 1568;

/// Groesse der Provider-Queue pro Verbindung
const PROVIDER_QUEUE_GROESSE: usize = 4;

// ---------------------------------------------------------------------------
// VerbindungsStatistik
// ---------------------------------------------------------------------------

/// Zaehler einer Verbindung
#[derive(Debug, Default)]
pub struct VerbindungsStatistik {
    gesendet: AtomicU64,
    leer: AtomicU64,
    bytes: AtomicU64,
}

impl VerbindungsStatistik {
    /// Anzahl uebertragener Frames
    pub fn gesendet(&self) -> u64 {
        self.gesendet.load(Ordering::Relaxed)
    }

    /// Anzahl Takte ohne Frame
    pub fn leer(&self) -> u64 {
        self.leer.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Verbindung
// ---------------------------------------------------------------------------

struct Verbindung {
    server: VoiceServerInfo,
    statistik: Arc<VerbindungsStatistik>,
    provider_tx: mpsc::Sender<Box<dyn FrameProvider>>,
    abbruch: CancellationToken,
}

impl Verbindung {
    fn starten(guild_id: GuildId, server: VoiceServerInfo) -> Self {
        let (provider_tx, provider_rx) = mpsc::channel(PROVIDER_QUEUE_GROESSE);
        let statistik = Arc::new(VerbindungsStatistik::default());
        let abbruch = CancellationToken::new();

        tokio::spawn(frame_schleife(
            guild_id,
            provider_rx,
            Arc::clone(&statistik),
            abbruch.clone(),
        ));

        Self {
            server,
            statistik,
            provider_tx,
            abbruch,
        }
    }
}

impl Drop for Verbindung {
    fn drop(&mut self) {
        self.abbruch.cancel();
    }
}

async fn frame_schleife(
    guild_id: GuildId,
    mut provider_rx: mpsc::Receiver<Box<dyn FrameProvider>>,
    statistik: Arc<VerbindungsStatistik>,
    abbruch: CancellationToken,
) {
    let mut takt = tokio::time::interval(Duration::from_millis(FRAME_TAKT_MS));
    takt.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut provider: Option<Box<dyn FrameProvider>> = None;
    let mut puffer = BytesMut::with_capacity(PUFFER_GROESSE);

    loop {
        tokio::select! {
            _ = abbruch.cancelled() => break,
            neu = provider_rx.recv() => match neu {
                Some(p) => {
                    tracing::debug!(guild_id = %guild_id, "Frame-Provider gesetzt");
                    provider = Some(p);
                }
                None => break,
            },
            _ = takt.tick() => {
                if let Some(p) = provider.as_mut() {
                    if p.kann_liefern() {
                        p.frame_abrufen(&mut puffer);
                        statistik.gesendet.fetch_add(1, Ordering::Relaxed);
                        statistik.bytes.fetch_add(puffer.len() as u64, Ordering::Relaxed);
                        puffer.clear();
                    } else {
                        statistik.leer.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }

    tracing::debug!(guild_id = %guild_id, "Frame-Task beendet");
}

// ---------------------------------------------------------------------------
// LokalerTransport
// ---------------------------------------------------------------------------

/// Lokaler VoiceManager eines Clients
#[derive(Clone)]
pub struct LokalerTransport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    user_id: u64,
    verbindungen: DashMap<GuildId, Verbindung>,
    ereignisse: mpsc::UnboundedSender<VoiceEreignis>,
    geschlossen: AtomicBool,
}

impl LokalerTransport {
    pub fn neu(user_id: u64, ereignisse: mpsc::UnboundedSender<VoiceEreignis>) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                user_id,
                verbindungen: DashMap::new(),
                ereignisse,
                geschlossen: AtomicBool::new(false),
            }),
        }
    }

    pub fn user_id(&self) -> u64 {
        self.inner.user_id
    }

    pub fn anzahl_verbindungen(&self) -> usize {
        self.inner.verbindungen.len()
    }

    pub fn statistik(&self, guild_id: GuildId) -> Option<Arc<VerbindungsStatistik>> {
        self.inner
            .verbindungen
            .get(&guild_id)
            .map(|v| Arc::clone(&v.statistik))
    }

    /// Simuliert das Schliessen der Verbindung durch das Voice-Netzwerk
    pub fn fernschliessen(&self, guild_id: GuildId, code: u16, grund: impl Into<String>) {
        if self.inner.verbindungen.remove(&guild_id).is_none() {
            return;
        }
        let grund = grund.into();
        tracing::info!(guild_id = %guild_id, code, grund = %grund, "Voice-Verbindung entfernt geschlossen");
        let _ = self.inner.ereignisse.send(VoiceEreignis::Geschlossen {
            guild_id,
            code,
            grund,
            von_remote: true,
        });
    }
}

#[async_trait]
impl VoiceManager for LokalerTransport {
    fn verbindung(&self, guild_id: GuildId) -> Option<VerbindungsInfo> {
        self.inner
            .verbindungen
            .get(&guild_id)
            .map(|v| VerbindungsInfo {
                offen: !v.abbruch.is_cancelled(),
                ping: 0,
                server: v.server.clone(),
            })
    }

    async fn verbinden(&self, guild_id: GuildId, server: VoiceServerInfo) -> VoiceResult<()> {
        if self.inner.geschlossen.load(Ordering::Acquire) {
            return Err(VoiceError::Geschlossen);
        }
        if server.token.is_empty() || server.endpoint.is_empty() || server.session_id.is_empty() {
            return Err(VoiceError::Unvollstaendig);
        }

        let verbindung = Verbindung::starten(guild_id, server);
        if self.inner.verbindungen.insert(guild_id, verbindung).is_some() {
            tracing::debug!(guild_id = %guild_id, "Bestehende Voice-Verbindung ersetzt");
        }
        tracing::info!(guild_id = %guild_id, user_id = self.inner.user_id, "Voice-Verbindung aufgebaut");
        Ok(())
    }

    fn trennen(&self, guild_id: GuildId) {
        if self.inner.verbindungen.remove(&guild_id).is_some() {
            tracing::info!(guild_id = %guild_id, "Voice-Verbindung getrennt");
        }
    }

    fn provider_setzen(&self, guild_id: GuildId, provider: Box<dyn FrameProvider>) -> bool {
        let Some(verbindung) = self.inner.verbindungen.get(&guild_id) else {
            tracing::debug!(guild_id = %guild_id, "Keine Voice-Verbindung fuer Frame-Provider");
            return false;
        };
        match verbindung.provider_tx.try_send(provider) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(guild_id = %guild_id, fehler = %e, "Frame-Provider nicht zugestellt");
                false
            }
        }
    }

    fn schliessen(&self) {
        if self.inner.geschlossen.swap(true, Ordering::AcqRel) {
            return;
        }
        let anzahl = self.inner.verbindungen.len();
        self.inner.verbindungen.clear();
        tracing::debug!(user_id = self.inner.user_id, anzahl, "Voice-Manager geschlossen");
    }
}

/// Fabrik fuer lokale Transporte
#[derive(Debug, Default, Clone, Copy)]
pub struct LokaleFabrik;

impl VoiceManagerFabrik for LokaleFabrik {
    fn erstellen(
        &self,
        user_id: u64,
        ereignisse: mpsc::UnboundedSender<VoiceEreignis>,
    ) -> Arc<dyn VoiceManager> {
        Arc::new(LokalerTransport::neu(user_id, ereignisse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> VoiceServerInfo {
        VoiceServerInfo {
            session_id: "sitzung".into(),
            endpoint: "voice.local".into(),
            token: "geheim".into(),
        }
    }

    /// Liefert jeden zweiten Takt einen Frame
    struct Wechselnd {
        zaehler: u32,
    }

    impl FrameProvider for Wechselnd {
        fn kann_liefern(&mut self) -> bool {
            self.zaehler += 1;
            self.zaehler % 2 == 0
        }

        fn frame_abrufen(&mut self, ziel: &mut BytesMut) {
            ziel.extend_from_slice(&[0xF8, 0xFF, 0xFE]);
        }
    }

    #[tokio::test]
    async fn verbinden_und_trennen() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let transport = LokalerTransport::neu(1, tx);
        let guild = GuildId(10);

        assert!(transport.verbindung(guild).is_none());
        transport.verbinden(guild, server()).await.unwrap();

        let info = transport.verbindung(guild).unwrap();
        assert!(info.offen);
        assert_eq!(info.server.endpoint, "voice.local");

        transport.trennen(guild);
        assert!(transport.verbindung(guild).is_none());
    }

    #[tokio::test]
    async fn unvollstaendige_daten_abgelehnt() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let transport = LokalerTransport::neu(1, tx);
        let mut daten = server();
        daten.token.clear();
        let fehler = transport.verbinden(GuildId(1), daten).await.unwrap_err();
        assert!(matches!(fehler, VoiceError::Unvollstaendig));
    }

    #[tokio::test]
    async fn provider_ohne_verbindung_abgelehnt() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let transport = LokalerTransport::neu(1, tx);
        assert!(!transport.provider_setzen(GuildId(1), Box::new(Wechselnd { zaehler: 0 })));
    }

    #[tokio::test(start_paused = true)]
    async fn frame_task_zaehlt_frames() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let transport = LokalerTransport::neu(1, tx);
        let guild = GuildId(3);
        transport.verbinden(guild, server()).await.unwrap();
        assert!(transport.provider_setzen(guild, Box::new(Wechselnd { zaehler: 0 })));

        tokio::time::sleep(Duration::from_millis(FRAME_TAKT_MS * 20 + 5)).await;

        let statistik = transport.statistik(guild).unwrap();
        let gesamt = statistik.gesendet() + statistik.leer();
        assert!(gesamt >= 10, "zu wenige Takte: {gesamt}");
        assert!(statistik.gesendet() > 0);
        assert_eq!(statistik.bytes(), statistik.gesendet() * 3);
    }

    #[tokio::test]
    async fn fernschliessen_meldet_ereignis() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = LokalerTransport::neu(1, tx);
        let guild = GuildId(5);
        transport.verbinden(guild, server()).await.unwrap();

        transport.fernschliessen(guild, 4006, "Session is no longer valid");
        match rx.recv().await {
            Some(VoiceEreignis::Geschlossen {
                code, von_remote, ..
            }) => {
                assert_eq!(code, 4006);
                assert!(von_remote);
            }
            andere => panic!("Unerwartet: {andere:?}"),
        }
        assert!(transport.verbindung(guild).is_none());
    }

    #[tokio::test]
    async fn schliessen_ist_endgueltig() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let transport = LokalerTransport::neu(1, tx);
        transport.verbinden(GuildId(1), server()).await.unwrap();

        transport.schliessen();
        transport.schliessen();
        assert_eq!(transport.anzahl_verbindungen(), 0);
        assert!(matches!(
            transport.verbinden(GuildId(1), server()).await,
            Err(VoiceError::Geschlossen)
        ));
    }
}
