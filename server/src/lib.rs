//! klangwerk-server – Bibliotheks-Root
//!
//! Verdrahtet Engine, Voice-Transport, Plugins, Session-Registry,
//! REST-Server und Observability zu einem lauffaehigen Knoten.

pub mod config;

use std::sync::Arc;

use anyhow::Result;
use config::ServerConfig;
use klangwerk_commander::{CommanderState, RestServer, RestServerKonfig};
use klangwerk_engine::SpeicherEngine;
use klangwerk_observability::{
    observability_server_starten, HealthState, KlangwerkMetriken, SystemMonitor,
};
use klangwerk_plugin::PluginRegistry;
use klangwerk_signaling::{stats_schleife, SessionRegistry};
use klangwerk_voice::LokaleFabrik;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Engine, Plugins und Voice-Transport anlegen
    /// 2. Observability-Server starten (falls aktiviert)
    /// 3. Stats-Schleife starten
    /// 4. REST/WebSocket-Server starten
    /// 5. Auf Ctrl-C warten, dann alle Sessions zerstoeren
    pub async fn starten(self) -> Result<()> {
        let config = self.config;
        let rest_adresse = config.rest_bind_adresse()?;

        tracing::info!(
            server_name = %config.server.name,
            adresse = %rest_adresse,
            "Server startet"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let engine = Arc::new(SpeicherEngine::neu());
        let plugins = Arc::new(PluginRegistry::neu());
        let registry = SessionRegistry::neu(
            engine,
            plugins,
            Arc::new(LokaleFabrik),
            config.registry_konfig(),
        );
        tracing::info!(
            engine = %registry.codec().engine().name(),
            plugins = registry.codec().plugins().anzahl(),
            deaktivierte_filter = ?config.filter.deaktiviert,
            frame_puffer_ms = config.player.frame_puffer_ms,
            "Engine bereit"
        );

        let monitor = Arc::new(SystemMonitor::neu());
        let health = HealthState::neu();

        let mut state = CommanderState::neu(
            registry.clone(),
            monitor.clone(),
            config.server.passwort.as_str(),
            shutdown_rx.clone(),
        );

        let metriken = if config.observability.aktiviert {
            let metriken = KlangwerkMetriken::neu()?;
            let adresse = config.observability_bind_adresse()?;
            let server_metriken = metriken.clone();
            let server_health = health.clone();
            tokio::spawn(async move {
                if let Err(e) =
                    observability_server_starten(adresse, server_metriken, server_health).await
                {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            });
            state = state.mit_metriken(metriken.clone());
            Some(metriken)
        } else {
            None
        };

        let stats_task = tokio::spawn(stats_schleife(
            registry.clone(),
            monitor,
            metriken,
            config.stats_intervall(),
            shutdown_rx.clone(),
        ));

        let rest = RestServer::neu(RestServerKonfig {
            bind_addr: rest_adresse,
            cors_origins: config.netzwerk.cors_origins.clone(),
        });
        let mut rest_task = tokio::spawn(rest.starten(state));

        health.bereit_setzen(true);
        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");

        let vorzeitig = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                None
            }
            ergebnis = &mut rest_task => Some(ergebnis),
        };

        health.bereit_setzen(false);
        let _ = shutdown_tx.send(true);
        registry.alle_zerstoeren();
        let _ = stats_task.await;

        let ergebnis = match vorzeitig {
            Some(ergebnis) => ergebnis,
            None => rest_task.await,
        };
        ergebnis??;

        tracing::info!("Server beendet");
        Ok(())
    }
}
