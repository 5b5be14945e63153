//! Player- und Session-Strukturen der REST-API

use klangwerk_core::GuildId;
use serde::{Deserialize, Deserializer, Serialize};

use crate::filters::Filters;
use crate::track::Track;
use crate::JsonObjekt;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Vollstaendiger Zustand eines Players (GET/PATCH-Antwort)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub guild_id: GuildId,
    pub track: Option<Track>,
    pub volume: u16,
    pub paused: bool,
    pub state: PlayerState,
    pub voice: VoiceState,
    pub filters: Filters,
}

/// Momentaufnahme des Wiedergabezustands
///
/// Wird bei jedem Broadcast-Tick und jeder Abfrage neu berechnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Erfassungszeitpunkt (Unix-Millisekunden)
    pub time: i64,
    /// Trackposition zum Erfassungszeitpunkt in Millisekunden
    pub position: u64,
    /// Ist die Voice-Verbindung offen?
    pub connected: bool,
    /// Ping der Voice-Verbindung in ms, -1 wenn unbekannt
    pub ping: i64,
}

/// Voice-Server-Daten einer Guild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceState {
    pub token: String,
    pub endpoint: String,
    pub session_id: String,
}

impl VoiceState {
    /// Prueft ob alle Felder gesetzt sind
    pub fn ist_vollstaendig(&self) -> bool {
        !self.token.is_empty() && !self.endpoint.is_empty() && !self.session_id.is_empty()
    }
}

// ---------------------------------------------------------------------------
// PlayerUpdate (PATCH-Body)
// ---------------------------------------------------------------------------

/// Unterscheidet "Feld fehlt" (`None`) von "Feld ist null" (`Some(None)`)
fn doppelt_optional<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Track-Angabe im PlayerUpdate
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdateTrack {
    /// Kodierter Track; `null` stoppt die Wiedergabe
    #[serde(default, deserialize_with = "doppelt_optional")]
    pub encoded: Option<Option<String>>,
    /// Identifier, der vor dem Abspielen aufgeloest wird
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub user_data: Option<JsonObjekt>,
}

/// Aenderungen an einem Player (alle Felder optional)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    #[serde(default)]
    pub track: Option<PlayerUpdateTrack>,
    /// Veraltete Kurzform von `track.encoded`
    #[serde(default, deserialize_with = "doppelt_optional")]
    pub encoded_track: Option<Option<String>>,
    /// Veraltete Kurzform von `track.identifier`
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub position: Option<u64>,
    /// Endzeit in ms; `null` entfernt die Endmarke
    #[serde(default, deserialize_with = "doppelt_optional")]
    pub end_time: Option<Option<u64>>,
    /// Wird auf 0..=1000 begrenzt
    #[serde(default)]
    pub volume: Option<i32>,
    #[serde(default)]
    pub paused: Option<bool>,
    #[serde(default)]
    pub filters: Option<Filters>,
    #[serde(default)]
    pub voice: Option<VoiceState>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Resume-Konfiguration einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub resuming: bool,
    /// Sekunden bis eine getrennte Session verworfen wird
    pub timeout: u64,
}

/// Aenderungen an einer Session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[serde(default)]
    pub resuming: Option<bool>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn player_update_unterscheidet_null_und_fehlend() {
        let fehlend: PlayerUpdate = serde_json::from_value(json!({})).unwrap();
        assert_eq!(fehlend.encoded_track, None);
        assert_eq!(fehlend.end_time, None);

        let null: PlayerUpdate =
            serde_json::from_value(json!({ "encodedTrack": null, "endTime": null })).unwrap();
        assert_eq!(null.encoded_track, Some(None));
        assert_eq!(null.end_time, Some(None));
    }

    #[test]
    fn player_update_track_objekt() {
        let update: PlayerUpdate = serde_json::from_value(json!({
            "track": { "encoded": "QAAA", "userData": { "wunsch": "von Anna" } },
            "volume": 80,
            "paused": false
        }))
        .unwrap();
        let track = update.track.unwrap();
        assert_eq!(track.encoded, Some(Some("QAAA".to_string())));
        assert_eq!(
            track.user_data.unwrap().get("wunsch"),
            Some(&json!("von Anna"))
        );
        assert_eq!(update.volume, Some(80));
    }

    #[test]
    fn player_state_format() {
        let state = PlayerState {
            time: 1_700_000_000_000,
            position: 1500,
            connected: true,
            ping: -1,
        };
        let wert = serde_json::to_value(state).unwrap();
        assert_eq!(
            wert,
            json!({ "time": 1_700_000_000_000i64, "position": 1500, "connected": true, "ping": -1 })
        );
    }

    #[test]
    fn voice_state_vollstaendigkeit() {
        let mut voice = VoiceState {
            token: "t".into(),
            endpoint: "e".into(),
            session_id: "s".into(),
        };
        assert!(voice.ist_vollstaendig());
        voice.endpoint.clear();
        assert!(!voice.ist_vollstaendig());
    }
}
