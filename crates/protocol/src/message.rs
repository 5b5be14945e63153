//! Ausgehende WebSocket-Nachrichten
//!
//! ## Design
//! - Getaggt ueber `op` (ready, playerUpdate, stats, event)
//! - Events zusaetzlich ueber `type` getaggt
//! - Der Server sendet, der Client empfaengt; es gibt keine eingehenden Ops

use klangwerk_core::{GuildId, SessionId};
use serde::{Deserialize, Serialize};

use crate::info::Stats;
use crate::player::PlayerState;
use crate::track::{Exception, Track};

/// Nachricht vom Server an den Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Message {
    /// Erste Nachricht nach dem Verbindungsaufbau
    #[serde(rename_all = "camelCase")]
    Ready { resumed: bool, session_id: SessionId },
    /// Periodischer Zustand eines Players
    #[serde(rename_all = "camelCase")]
    PlayerUpdate { guild_id: GuildId, state: PlayerState },
    /// Periodische Server-Statistiken
    Stats(Stats),
    /// Ereignis eines Players
    Event(Event),
}

/// Grund fuer das Ende eines Tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackEndReason {
    /// Track wurde vollstaendig abgespielt (oder Endmarke erreicht)
    Finished,
    /// Track konnte nicht geladen werden
    LoadFailed,
    /// Wiedergabe wurde gestoppt
    Stopped,
    /// Ein neuer Track hat den alten ersetzt
    Replaced,
    /// Player wurde aufgeraeumt
    Cleanup,
}

impl TrackEndReason {
    /// Darf der Client nach diesem Ende den naechsten Track starten?
    pub fn darf_naechsten_starten(&self) -> bool {
        matches!(self, Self::Finished | Self::LoadFailed)
    }
}

/// Ereignisse eines Players
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    TrackStartEvent { guild_id: GuildId, track: Track },
    #[serde(rename_all = "camelCase")]
    TrackEndEvent {
        guild_id: GuildId,
        track: Track,
        reason: TrackEndReason,
    },
    #[serde(rename_all = "camelCase")]
    TrackExceptionEvent {
        guild_id: GuildId,
        track: Track,
        exception: Exception,
    },
    #[serde(rename_all = "camelCase")]
    TrackStuckEvent {
        guild_id: GuildId,
        track: Track,
        threshold_ms: u64,
    },
    /// Die Voice-Verbindung einer Guild wurde geschlossen
    #[serde(rename_all = "camelCase")]
    WebSocketClosedEvent {
        guild_id: GuildId,
        code: u16,
        reason: String,
        by_remote: bool,
    },
}

impl Event {
    /// Guild, auf die sich das Ereignis bezieht
    pub fn guild_id(&self) -> GuildId {
        match self {
            Self::TrackStartEvent { guild_id, .. }
            | Self::TrackEndEvent { guild_id, .. }
            | Self::TrackExceptionEvent { guild_id, .. }
            | Self::TrackStuckEvent { guild_id, .. }
            | Self::WebSocketClosedEvent { guild_id, .. } => *guild_id,
        }
    }
}
