//! Server-Statistiken: Stats-Nachricht und Prometheus-Metriken

use std::sync::Arc;
use std::time::Duration;

use klangwerk_observability::{KlangwerkMetriken, SystemMonitor};
use klangwerk_protocol::info::{Cpu, Speicher};
use klangwerk_protocol::{Message, Stats};
use tokio::sync::watch;

use crate::registry::SessionRegistry;

/// Stellt die aktuellen Server-Statistiken zusammen
///
/// `frameStats` gibt es nur auf Wunsch (WebSocket) und nur, wenn mindestens
/// ein Player verwertbare Minutendaten hat.
pub fn stats_erstellen(
    registry: &SessionRegistry,
    monitor: &SystemMonitor,
    mit_frames: bool,
) -> Stats {
    let system = monitor.schnappschuss();
    Stats {
        players: registry.player_anzahl() as u32,
        playing_players: registry.spielende_player_anzahl() as u32,
        uptime: registry.uptime_ms(),
        memory: Speicher {
            free: system.speicher_frei,
            used: system.speicher_benutzt,
            allocated: system.speicher_zugewiesen,
            reservable: system.speicher_reservierbar,
        },
        cpu: Cpu {
            cores: system.kerne,
            system_load: system.system_last,
            lavalink_load: system.prozess_last,
        },
        frame_stats: if mit_frames {
            registry.frame_statistik()
        } else {
            None
        },
    }
}

/// Uebertraegt Session-, Player- und Frame-Zahlen in die Prometheus-Metriken
pub fn metriken_aktualisieren(registry: &SessionRegistry, metriken: &KlangwerkMetriken) {
    let sessions = registry.alle();
    metriken.sessions.set(sessions.len() as i64);

    let mut players = 0i64;
    let mut spielend = 0i64;
    for session in &sessions {
        for player in session.players() {
            players += 1;
            if player.ist_spielend() {
                spielend += 1;
            }
            let (gesendet, verloren) = player.verlust().abholen();
            metriken.frames_sent_total.inc_by(gesendet);
            metriken.frames_nulled_total.inc_by(verloren);
        }
    }
    metriken.players.set(players);
    metriken.playing_players.set(spielend);
}

/// Sendet periodisch Stats an alle Sessions und aktualisiert die Metriken
///
/// Laeuft bis das Shutdown-Signal kommt.
pub async fn stats_schleife(
    registry: SessionRegistry,
    monitor: Arc<SystemMonitor>,
    metriken: Option<KlangwerkMetriken>,
    intervall: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut takt = tokio::time::interval(intervall.max(Duration::from_secs(1)));
    takt.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = takt.tick() => {
                if let Some(metriken) = &metriken {
                    metriken_aktualisieren(&registry, metriken);
                }
                if registry.anzahl() == 0 {
                    continue;
                }
                let stats = stats_erstellen(&registry, &monitor, true);
                tracing::trace!(
                    players = stats.players,
                    playing_players = stats.playing_players,
                    "Stats gesendet"
                );
                registry.an_alle_senden(&Message::Stats(stats));
            }
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::debug!("Stats-Schleife beendet");
                    break;
                }
            }
        }
    }
}
