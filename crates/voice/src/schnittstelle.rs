//! Schnittstellen zwischen Player und Voice-Transport

use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use klangwerk_core::GuildId;
use thiserror::Error;
use tokio::sync::mpsc;

/// Fehler des Voice-Transports
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Voice-Manager ist geschlossen")]
    Geschlossen,

    #[error("Unvollstaendige Voice-Server-Daten")]
    Unvollstaendig,
}

pub type VoiceResult<T> = Result<T, VoiceError>;

/// Verbindungsdaten des Voice-Servers einer Guild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceServerInfo {
    pub session_id: String,
    pub endpoint: String,
    pub token: String,
}

/// Momentaufnahme einer Voice-Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbindungsInfo {
    pub offen: bool,
    /// Ping in ms, -1 wenn unbekannt
    pub ping: i64,
    pub server: VoiceServerInfo,
}

/// Zustandsaenderungen, die der Transport an die Session meldet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEreignis {
    Geschlossen {
        guild_id: GuildId,
        code: u16,
        grund: String,
        von_remote: bool,
    },
}

/// Frame-Quelle fuer eine Verbindung
///
/// Gehoert genau einem Transport-Task. Beide Methoden werden aus diesem
/// Task aufgerufen und muessen ohne I/O und ohne Warten auskommen.
pub trait FrameProvider: Send + 'static {
    /// Versucht einen Frame vorzubereiten
    fn kann_liefern(&mut self) -> bool;

    /// Schreibt den vorbereiteten Frame nach `ziel`
    fn frame_abrufen(&mut self, ziel: &mut BytesMut);
}

/// Verwaltet die Voice-Verbindungen eines Clients
#[async_trait]
pub trait VoiceManager: Send + Sync {
    fn verbindung(&self, guild_id: GuildId) -> Option<VerbindungsInfo>;

    /// Baut eine Verbindung auf (ersetzt eine bestehende)
    async fn verbinden(&self, guild_id: GuildId, server: VoiceServerInfo) -> VoiceResult<()>;

    fn trennen(&self, guild_id: GuildId);

    /// Uebergibt die Frame-Quelle; `false` wenn keine Verbindung besteht
    fn provider_setzen(&self, guild_id: GuildId, provider: Box<dyn FrameProvider>) -> bool;

    /// Trennt alle Verbindungen; spaetere Aufrufe sind wirkungslos
    fn schliessen(&self);
}

/// Erstellt einen VoiceManager pro Client-Session
pub trait VoiceManagerFabrik: Send + Sync {
    fn erstellen(
        &self,
        user_id: u64,
        ereignisse: mpsc::UnboundedSender<VoiceEreignis>,
    ) -> Arc<dyn VoiceManager>;
}
