//! REST-Interface fuer den Klangwerk Commander

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

use std::sync::Arc;

use klangwerk_observability::{KlangwerkMetriken, SystemMonitor};
use klangwerk_signaling::SessionRegistry;
use tokio::sync::watch;

/// Axum-State fuer den Commander-REST-Server
#[derive(Clone)]
pub struct CommanderState {
    pub registry: SessionRegistry,
    pub monitor: Arc<SystemMonitor>,
    /// Erwarteter Wert des `Authorization`-Headers
    pub passwort: Arc<str>,
    /// Wird beim Herunterfahren auf `true` gesetzt
    pub shutdown_rx: watch::Receiver<bool>,
    pub metriken: Option<KlangwerkMetriken>,
}

impl CommanderState {
    pub fn neu(
        registry: SessionRegistry,
        monitor: Arc<SystemMonitor>,
        passwort: impl Into<Arc<str>>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            registry,
            monitor,
            passwort: passwort.into(),
            shutdown_rx,
            metriken: None,
        }
    }

    /// Zaehlt HTTP-Anfragen in den uebergebenen Metriken
    pub fn mit_metriken(mut self, metriken: KlangwerkMetriken) -> Self {
        self.metriken = Some(metriken);
        self
    }
}

pub use server::{RestServer, RestServerKonfig};
