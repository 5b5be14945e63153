//! Zusammenfuehren der `pluginInfo`-Daten
//!
//! Die Modifier werden in Registrierungsreihenfolge befragt. Bei gleichen
//! Schluesseln gewinnt der spaetere Modifier.

use std::sync::Arc;

use klangwerk_engine::{AudioPlaylist, AudioTrack};
use klangwerk_plugin::PluginInfoModifier;
use klangwerk_protocol::JsonObjekt;

fn zusammenfuehren<F>(modifier: &[Arc<dyn PluginInfoModifier>], beitrag: F) -> JsonObjekt
where
    F: Fn(&dyn PluginInfoModifier) -> Option<JsonObjekt>,
{
    modifier
        .iter()
        .filter_map(|m| beitrag(m.as_ref()))
        .fold(JsonObjekt::new(), |mut gesamt, teil| {
            gesamt.extend(teil);
            gesamt
        })
}

/// `pluginInfo` eines Tracks
pub fn track_info(modifier: &[Arc<dyn PluginInfoModifier>], track: &AudioTrack) -> JsonObjekt {
    zusammenfuehren(modifier, |m| m.track_plugin_info(track))
}

/// `pluginInfo` einer Playlist
pub fn playlist_info(
    modifier: &[Arc<dyn PluginInfoModifier>],
    playlist: &AudioPlaylist,
) -> JsonObjekt {
    zusammenfuehren(modifier, |m| m.playlist_plugin_info(playlist))
}
