//! Frame-Lieferant – verbindet Engine-Player und Voice-Transport
//!
//! Gehoert genau einem Transport-Task. Nimmt keine Player-Sperre; der
//! einzige geteilte Zustand ist der Engine-Player und der Verlustzaehler.

use std::sync::Arc;

use bytes::BytesMut;
use klangwerk_engine::{EnginePlayer, MAX_FRAME_GROESSE};
use klangwerk_voice::FrameProvider;

use crate::verlust::FrameVerlustZaehler;

pub struct FrameLieferant {
    engine_player: Arc<dyn EnginePlayer>,
    verlust: Arc<FrameVerlustZaehler>,
    puffer: BytesMut,
}

impl FrameLieferant {
    pub fn neu(engine_player: Arc<dyn EnginePlayer>, verlust: Arc<FrameVerlustZaehler>) -> Self {
        Self {
            engine_player,
            verlust,
            puffer: BytesMut::with_capacity(MAX_FRAME_GROESSE),
        }
    }
}

impl FrameProvider for FrameLieferant {
    fn kann_liefern(&mut self) -> bool {
        self.puffer.clear();
        if self.engine_player.liefern(&mut self.puffer) {
            self.verlust.erfolg();
            true
        } else {
            self.verlust.verlust();
            false
        }
    }

    fn frame_abrufen(&mut self, ziel: &mut BytesMut) {
        ziel.extend_from_slice(&self.puffer);
        self.puffer.clear();
    }
}
