//! Player-Objekt der Speicher-Engine
//!
//! Liefert pro Aufruf einen Opus-Stille-Frame und rueckt die Position um
//! eine Frame-Dauer vor. Endet der Track, wird `TrackEnde(Fertig)` gemeldet.

use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::ereignis::{EndeGrund, EngineEreignis};
use crate::schnittstelle::{EnginePlayer, FilterFabrik};
use crate::track::AudioTrack;
use crate::FRAME_DAUER_MS;

/// Opus-Stille-Frame
pub const STILLE_FRAME: [u8; 3] = [0xF8, 0xFF, 0xFE];

/// Standard-Lautstaerke in Prozent
pub const STANDARD_LAUTSTAERKE: u16 = 100;

struct Zustand {
    track: Option<AudioTrack>,
    pausiert: bool,
    lautstaerke: u16,
    marker: Option<u64>,
    filter: Option<Arc<dyn FilterFabrik>>,
    zerstoert: bool,
}

pub struct SpeicherPlayer {
    zustand: Mutex<Zustand>,
    ereignisse: mpsc::UnboundedSender<EngineEreignis>,
}

impl SpeicherPlayer {
    pub(crate) fn neu(ereignisse: mpsc::UnboundedSender<EngineEreignis>) -> Self {
        Self {
            zustand: Mutex::new(Zustand {
                track: None,
                pausiert: false,
                lautstaerke: STANDARD_LAUTSTAERKE,
                marker: None,
                filter: None,
                zerstoert: false,
            }),
            ereignisse,
        }
    }

    fn melden(&self, ereignis: EngineEreignis) {
        if self.ereignisse.send(ereignis).is_err() {
            trace!("Ereignis-Empfaenger geschlossen");
        }
    }

    /// Anzahl der aktiven Filterstufen
    pub fn filter_stufen(&self) -> usize {
        self.zustand
            .lock()
            .filter
            .as_ref()
            .map(|f| f.stufen().len())
            .unwrap_or(0)
    }
}

impl EnginePlayer for SpeicherPlayer {
    fn abspielen(&self, track: AudioTrack) {
        let mut z = self.zustand.lock();
        if z.zerstoert {
            return;
        }
        if let Some(alt) = z.track.take() {
            self.melden(EngineEreignis::TrackEnde {
                track: alt,
                grund: EndeGrund::Ersetzt,
            });
        }
        debug!(identifier = %track.info().identifier, "Track gestartet");
        z.track = Some(track.clone());
        z.marker = None;
        self.melden(EngineEreignis::TrackStart(track));
    }

    fn stoppen(&self) {
        let mut z = self.zustand.lock();
        z.marker = None;
        if let Some(alt) = z.track.take() {
            self.melden(EngineEreignis::TrackEnde {
                track: alt,
                grund: EndeGrund::Gestoppt,
            });
        }
    }

    fn pause_setzen(&self, pausiert: bool) {
        self.zustand.lock().pausiert = pausiert;
    }

    fn ist_pausiert(&self) -> bool {
        self.zustand.lock().pausiert
    }

    fn lautstaerke_setzen(&self, lautstaerke: u16) {
        self.zustand.lock().lautstaerke = lautstaerke;
    }

    fn lautstaerke(&self) -> u16 {
        self.zustand.lock().lautstaerke
    }

    fn aktueller_track(&self) -> Option<AudioTrack> {
        self.zustand.lock().track.clone()
    }

    fn liefern(&self, puffer: &mut BytesMut) -> bool {
        let mut z = self.zustand.lock();
        if z.zerstoert || z.pausiert {
            return false;
        }
        let Some(track) = z.track.clone() else {
            return false;
        };

        let info = track.info();
        if !info.ist_stream && track.position_ms() >= info.laenge_ms {
            z.track = None;
            z.marker = None;
            self.melden(EngineEreignis::TrackEnde {
                track,
                grund: EndeGrund::Fertig,
            });
            return false;
        }

        let position = track.vorruecken(FRAME_DAUER_MS);
        if let Some(marke) = z.marker {
            if position >= marke {
                z.marker = None;
                self.melden(EngineEreignis::MarkerErreicht(track));
            }
        }

        puffer.put_slice(&STILLE_FRAME);
        true
    }

    fn filter_fabrik_setzen(&self, fabrik: Option<Arc<dyn FilterFabrik>>) {
        self.zustand.lock().filter = fabrik;
    }

    fn marker_setzen(&self, position_ms: Option<u64>) {
        self.zustand.lock().marker = position_ms;
    }

    fn zerstoeren(&self) {
        let mut z = self.zustand.lock();
        if z.zerstoert {
            return;
        }
        z.zerstoert = true;
        z.filter = None;
        if let Some(alt) = z.track.take() {
            self.melden(EngineEreignis::TrackEnde {
                track: alt,
                grund: EndeGrund::Aufgeraeumt,
            });
        }
    }
}
