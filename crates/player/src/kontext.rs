//! Gemeinsamer Kontext aller Player einer Session

use std::sync::Arc;
use std::time::Duration;

use klangwerk_protocol::Message;
use klangwerk_voice::VoiceManager;

use crate::codec::TrackCodec;

/// Ausgehender Nachrichtenkanal zum Client
///
/// `senden` darf nie blockieren. Ist der Kanal voll oder geschlossen, wird
/// die Nachricht verworfen.
pub trait NachrichtenSenke: Send + Sync {
    fn senden(&self, nachricht: Message);
}

/// Alles, was ein Player von seiner Session braucht
pub struct PlayerKontext {
    pub codec: TrackCodec,
    pub voice: Arc<dyn VoiceManager>,
    pub senke: Arc<dyn NachrichtenSenke>,
    /// Abstand der periodischen PlayerUpdate-Nachrichten
    pub update_intervall: Duration,
    /// Laufzeit fuer Ereignis-Tasks und Update-Plaene
    pub laufzeit: tokio::runtime::Handle,
}

impl PlayerKontext {
    pub fn senden(&self, nachricht: Message) {
        self.senke.senden(nachricht);
    }
}
