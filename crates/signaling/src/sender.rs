//! Ausgehende Nachrichten-Queue einer WebSocket-Verbindung

use klangwerk_core::SessionId;
use klangwerk_protocol::Message;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 256;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub session_id: SessionId,
    pub tx: mpsc::Sender<Message>,
}

impl ClientSender {
    /// Erstellt Sender und Empfaenger einer neuen Queue
    pub fn kanal(session_id: SessionId) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        (Self { session_id, tx }, rx)
    }

    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: Message) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(session_id = %self.session_id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(session_id = %self.session_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use klangwerk_core::GuildId;
    use klangwerk_protocol::PlayerState;

    fn update() -> Message {
        Message::PlayerUpdate {
            guild_id: GuildId(1),
            state: PlayerState {
                time: 0,
                position: 0,
                connected: false,
                ping: -1,
            },
        }
    }

    #[tokio::test]
    async fn senden_und_empfangen() {
        let (sender, mut rx) = ClientSender::kanal(SessionId::from("a"));
        assert!(sender.senden(update()));
        assert_eq!(rx.recv().await, Some(update()));
    }

    #[test]
    fn volle_queue_verwirft_ohne_blockieren() {
        let (sender, _rx) = ClientSender::kanal(SessionId::from("a"));
        for _ in 0..SEND_QUEUE_GROESSE {
            assert!(sender.senden(update()));
        }
        assert!(!sender.senden(update()));
    }

    #[test]
    fn geschlossene_queue_verwirft() {
        let (sender, rx) = ClientSender::kanal(SessionId::from("a"));
        drop(rx);
        assert!(!sender.senden(update()));
    }
}
