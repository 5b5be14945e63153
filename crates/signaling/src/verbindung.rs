//! WebSocket-Verbindung eines Clients
//!
//! Jede Verbindung laeuft in einem eigenen tokio-Task. Der Server sendet,
//! der Client empfaengt; eingehende Textnachrichten werden ignoriert.
//!
//! ## Ablauf
//! ```text
//! Upgrade -> ready -> (playerUpdate | stats | event)* -> Close
//!                                                         |
//!                                         Session::verbindung_beendet
//! ```

use std::borrow::Cow;

use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};
use klangwerk_protocol::Message;
use tokio::sync::watch;

use crate::error::{SignalingError, SignalingResult};
use crate::registry::Anmeldung;
use crate::session::Session;

/// Verarbeitet eine angemeldete WebSocket-Verbindung bis zu ihrem Ende
pub async fn verbindung_verarbeiten(
    socket: WebSocket,
    anmeldung: Anmeldung,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let Anmeldung {
        session,
        verbindung_nr,
        mut empfaenger,
        fortgesetzt,
    } = anmeldung;

    tracing::info!(
        session_id = %session.id(),
        client = %session.client_name(),
        fortgesetzt,
        "WebSocket-Verbindung geoeffnet"
    );

    let (mut schreiber, mut leser) = socket.split();

    loop {
        tokio::select! {
            // Ausgehende Nachricht aus der Session
            ausgehend = empfaenger.recv() => {
                let Some(nachricht) = ausgehend else {
                    // Sender verworfen: Session zerstoert oder Verbindung abgeloest
                    tracing::debug!(session_id = %session.id(), "Send-Queue geschlossen");
                    let _ = schreiber.send(schliessen(close_code::NORMAL, "Session beendet")).await;
                    break;
                };
                if let Err(e) = nachricht_senden(&mut schreiber, &nachricht).await {
                    tracing::warn!(
                        session_id = %session.id(),
                        fehler = %e,
                        "Senden fehlgeschlagen"
                    );
                    break;
                }
            }

            // Eingehende Nachricht vom Client
            eingehend = leser.next() => {
                match eingehend {
                    Some(Ok(WsMessage::Close(frame))) => {
                        tracing::info!(
                            session_id = %session.id(),
                            code = ?frame.as_ref().map(|f| f.code),
                            "Verbindung vom Client geschlossen"
                        );
                        break;
                    }
                    Some(Ok(WsMessage::Text(text))) => {
                        tracing::trace!(
                            session_id = %session.id(),
                            laenge = text.len(),
                            "Eingehende Nachricht ignoriert"
                        );
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(
                            session_id = %session.id(),
                            fehler = %e,
                            "WebSocket-Lesefehler"
                        );
                        break;
                    }
                    None => {
                        tracing::info!(session_id = %session.id(), "Verbindung vom Client getrennt");
                        break;
                    }
                }
            }

            // Shutdown-Signal
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!(session_id = %session.id(), "Shutdown-Signal – Verbindung wird getrennt");
                    let _ = schreiber.send(schliessen(close_code::AWAY, "Server wird heruntergefahren")).await;
                    break;
                }
            }
        }
    }

    beenden(&session, verbindung_nr);
}

async fn nachricht_senden<S>(schreiber: &mut S, nachricht: &Message) -> SignalingResult<()>
where
    S: Sink<WsMessage, Error = axum::Error> + Unpin,
{
    let text = serde_json::to_string(nachricht)?;
    schreiber
        .send(WsMessage::Text(text))
        .await
        .map_err(SignalingError::from)
}

fn schliessen(code: u16, grund: &'static str) -> WsMessage {
    WsMessage::Close(Some(CloseFrame {
        code,
        reason: Cow::Borrowed(grund),
    }))
}

fn beenden(session: &Session, verbindung_nr: u64) {
    session.verbindung_beendet(verbindung_nr);
    tracing::info!(session_id = %session.id(), "Verbindungs-Task beendet");
}
