//! Traits der Audio-Engine
//!
//! Klangwerk haengt nur von diesen Schnittstellen ab. Die mitgelieferte
//! [`crate::SpeicherEngine`] ist eine Implementierung davon.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::sync::mpsc;

use crate::error::{EngineResult, FriendlyException};
use crate::ereignis::EngineEreignis;
use crate::track::{AudioItem, AudioTrack};

/// Eine konfigurierte Filterstufe (Name + Parameter)
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStufe {
    pub name: String,
    pub parameter: serde_json::Value,
}

/// Liefert der Engine die Filterstufen fuer die Signalverarbeitung
pub trait FilterFabrik: Send + Sync {
    fn stufen(&self) -> Vec<FilterStufe>;
}

/// Player-Objekt der Engine (eines pro Guild)
///
/// Alle Methoden sind nicht-blockierend. `liefern` wird aus dem
/// Transport-Task aufgerufen und darf weder I/O noch lange Sperren machen.
pub trait EnginePlayer: Send + Sync {
    /// Startet einen Track; ein laufender Track endet mit `Ersetzt`
    fn abspielen(&self, track: AudioTrack);

    /// Stoppt den aktuellen Track (Ende mit `Gestoppt`)
    fn stoppen(&self);

    fn pause_setzen(&self, pausiert: bool);

    fn ist_pausiert(&self) -> bool;

    fn lautstaerke_setzen(&self, lautstaerke: u16);

    fn lautstaerke(&self) -> u16;

    fn aktueller_track(&self) -> Option<AudioTrack>;

    /// Schreibt den naechsten Frame in `puffer`; `false` wenn keiner bereit ist
    fn liefern(&self, puffer: &mut BytesMut) -> bool;

    fn filter_fabrik_setzen(&self, fabrik: Option<Arc<dyn FilterFabrik>>);

    /// Setzt (oder entfernt) eine Positionsmarke in ms
    fn marker_setzen(&self, position_ms: Option<u64>);

    /// Gibt alle Ressourcen frei; ein laufender Track endet mit `Aufgeraeumt`
    fn zerstoeren(&self);
}

/// Die Audio-Engine
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Name und Version fuer `/v4/info`
    fn name(&self) -> String;

    /// Namen aller registrierten Source-Manager
    fn quellen(&self) -> Vec<String>;

    /// Erstellt ein Player-Objekt, das Ereignisse ueber `ereignisse` meldet
    fn player_erstellen(
        &self,
        ereignisse: mpsc::UnboundedSender<EngineEreignis>,
    ) -> Arc<dyn EnginePlayer>;

    fn kodieren(&self, track: &AudioTrack) -> EngineResult<Vec<u8>>;

    /// Dekodiert einen Track
    ///
    /// `Ok(None)` bei unbekannter Version oder fehlendem Source-Manager,
    /// `Err` bei beschaedigten Daten.
    fn dekodieren(&self, daten: &[u8]) -> EngineResult<Option<AudioTrack>>;

    /// Loest einen Identifier auf; `Ok(None)` wenn nichts gefunden wurde
    async fn aufloesen(&self, identifier: &str) -> Result<Option<AudioItem>, FriendlyException>;
}
