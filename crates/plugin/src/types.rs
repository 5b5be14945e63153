//! Grundlegende Typen fuer das Plugin-System

use klangwerk_engine::{AudioPlaylist, AudioTrack};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name und Version eines Plugins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMeta {
    pub name: String,
    pub version: String,
}

/// Erweiterung, die zusaetzliche `pluginInfo`-Daten beisteuert
///
/// Wird bei jeder Track-Erzeugung erneut befragt. Implementierungen duerfen
/// Zustand halten; das Ergebnis wird nicht zwischengespeichert.
pub trait PluginInfoModifier: Send + Sync {
    fn track_plugin_info(&self, _track: &AudioTrack) -> Option<Map<String, Value>> {
        None
    }

    fn playlist_plugin_info(&self, _playlist: &AudioPlaylist) -> Option<Map<String, Value>> {
        None
    }
}
