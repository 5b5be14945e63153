//! Server-Informationen, Statistiken und Fehlerantworten

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Info
// ---------------------------------------------------------------------------

/// Antwort von `GET /v4/info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    pub version: Version,
    /// Build-Zeitpunkt (Unix-Millisekunden), 0 wenn unbekannt
    pub build_time: i64,
    /// Name und Version der Audio-Engine
    pub engine: String,
    pub source_managers: Vec<String>,
    /// Verfuegbare (nicht deaktivierte) Filter
    pub filters: Vec<String>,
    pub plugins: Vec<PluginBeschreibung>,
}

/// Semantische Version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub semver: String,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre_release: Option<String>,
}

impl Version {
    /// Zerlegt eine Versionszeichenkette wie `1.2.3-beta`
    pub fn parsen(semver: &str) -> Self {
        let (kern, pre_release) = match semver.split_once('-') {
            Some((k, p)) => (k, Some(p.to_string())),
            None => (semver, None),
        };
        let mut teile = kern.split('.').map(|t| t.parse::<u32>().unwrap_or(0));
        Self {
            semver: semver.to_string(),
            major: teile.next().unwrap_or(0),
            minor: teile.next().unwrap_or(0),
            patch: teile.next().unwrap_or(0),
            pre_release,
        }
    }
}

/// Name und Version eines geladenen Plugins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginBeschreibung {
    pub name: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Server-Statistiken (REST und WebSocket)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub players: u32,
    pub playing_players: u32,
    /// Uptime in Millisekunden
    pub uptime: u64,
    pub memory: Speicher,
    pub cpu: Cpu,
    /// Nur in WebSocket-Nachrichten und nur mit verwertbaren Daten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_stats: Option<FrameStats>,
}

/// Speicherverbrauch in Bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speicher {
    pub free: u64,
    pub used: u64,
    pub allocated: u64,
    pub reservable: u64,
}

/// CPU-Auslastung (0.0–1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cpu {
    pub cores: u32,
    pub system_load: f64,
    /// Last dieses Prozesses
    pub lavalink_load: f64,
}

/// Frame-Statistiken der letzten Minute, gemittelt ueber spielende Player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    pub sent: i64,
    pub nulled: i64,
    /// Erwartete minus gelieferte Frames
    pub deficit: i64,
}

// ---------------------------------------------------------------------------
// Fehlerantwort
// ---------------------------------------------------------------------------

/// Strukturierte Fehlerantwort der REST-API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Zeitpunkt (Unix-Millisekunden)
    pub timestamp: i64,
    pub status: u16,
    /// Kurzbeschreibung des Status (z.B. "Not Found")
    pub error: String,
    pub message: String,
    pub path: String,
}

impl ErrorResponse {
    /// Erstellt eine Fehlerantwort mit aktuellem Zeitstempel
    pub fn neu(status: u16, error: impl Into<String>, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            status,
            error: error.into(),
            message: message.into(),
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_parsen() {
        let v = Version::parsen("4.1.2-rc1");
        assert_eq!((v.major, v.minor, v.patch), (4, 1, 2));
        assert_eq!(v.pre_release.as_deref(), Some("rc1"));

        let v = Version::parsen("0.1.0");
        assert_eq!(v.pre_release, None);
        assert_eq!(v.minor, 1);
    }

    #[test]
    fn stats_ohne_frame_stats() {
        let stats = Stats {
            players: 2,
            playing_players: 1,
            uptime: 1000,
            memory: Speicher {
                free: 1,
                used: 2,
                allocated: 3,
                reservable: 4,
            },
            cpu: Cpu {
                cores: 4,
                system_load: 0.5,
                lavalink_load: 0.1,
            },
            frame_stats: None,
        };
        let wert = serde_json::to_value(&stats).unwrap();
        assert_eq!(wert["playingPlayers"], json!(1));
        assert_eq!(wert["cpu"]["systemLoad"], json!(0.5));
        assert!(wert.get("frameStats").is_none());
    }

    #[test]
    fn fehlerantwort_format() {
        let antwort = ErrorResponse::neu(404, "Not Found", "Session not found", "/v4/sessions/x");
        let wert = serde_json::to_value(&antwort).unwrap();
        assert_eq!(wert["status"], json!(404));
        assert_eq!(wert["path"], json!("/v4/sessions/x"));
        assert!(wert["timestamp"].as_i64().unwrap() > 0);
    }
}
