//! Gemeinsame Identifikationstypen fuer Klangwerk
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Laenge einer Session-ID in Zeichen
pub const SESSION_ID_LAENGE: usize = 16;

/// Discord-Guild-ID (Snowflake)
///
/// Auf dem Draht als String uebertragen, intern als u64 gehalten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuildId(pub u64);

impl GuildId {
    /// Gibt den inneren Snowflake-Wert zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for GuildId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

impl Serialize for GuildId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for GuildId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Eindeutige Session-ID (16 Kleinbuchstaben/Ziffern)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn neu() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(SESSION_ID_LAENGE);
        Self(id)
    }

    /// Gibt die ID als &str zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::neu()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_eindeutig() {
        let a = SessionId::neu();
        let b = SessionId::neu();
        assert_ne!(a, b, "Zwei neue SessionIds muessen verschieden sein");
    }

    #[test]
    fn session_id_format() {
        let id = SessionId::neu();
        assert_eq!(id.as_str().len(), SESSION_ID_LAENGE);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn guild_id_als_string_serialisiert() {
        let id = GuildId(817327181659111454);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"817327181659111454\"");
        let zurueck: GuildId = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, id);
    }

    #[test]
    fn guild_id_ungueltig() {
        assert!("abc".parse::<GuildId>().is_err());
        assert!(serde_json::from_str::<GuildId>("\"-1\"").is_err());
    }
}
