//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{bail, Context};
use klangwerk_observability::logging::{log_format_gueltig, log_level_gueltig};
use klangwerk_player::filter;
use klangwerk_signaling::RegistryKonfig;
use serde::{Deserialize, Serialize};

/// Umgebungsvariable mit dem Pfad der Konfigurationsdatei
pub const ENV_CONFIG: &str = "KLANGWERK_CONFIG";
/// Standardpfad der Konfigurationsdatei
pub const STANDARD_PFAD: &str = "config.toml";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen (REST + WebSocket)
    pub netzwerk: NetzwerkEinstellungen,
    /// Player-Einstellungen
    pub player: PlayerEinstellungen,
    /// Gesperrte Filter
    pub filter: FilterEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
    /// Session-Einstellungen
    pub sessions: SessionEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers (nur fuer Logs)
    pub name: String,
    /// Erwarteter Wert des `Authorization`-Headers
    pub passwort: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Klangwerk".into(),
            passwort: "youshallnotpass".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer REST und WebSocket
    pub bind_adresse: String,
    pub port: u16,
    /// CORS-Origins fuer REST (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 2333,
            cors_origins: vec![],
        }
    }
}

/// Player-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerEinstellungen {
    /// Abstand der PlayerUpdate-Nachrichten in Sekunden
    pub update_intervall_sek: u64,
    /// Frame-Puffer der Engine in Millisekunden (nur informativ)
    pub frame_puffer_ms: u64,
    /// Abstand der Stats-Nachrichten in Sekunden
    pub stats_intervall_sek: u64,
}

impl Default for PlayerEinstellungen {
    fn default() -> Self {
        Self {
            update_intervall_sek: 5,
            frame_puffer_ms: 400,
            stats_intervall_sek: 60,
        }
    }
}

/// Per Konfiguration gesperrte Filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterEinstellungen {
    /// Filternamen wie `karaoke` oder `timescale`
    pub deaktiviert: Vec<String>,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

/// Session-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEinstellungen {
    /// Resume-Timeout neuer Sessions in Sekunden
    pub standard_timeout_sek: u64,
}

impl Default for SessionEinstellungen {
    fn default() -> Self {
        Self {
            standard_timeout_sek: 60,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Pfad aus `KLANGWERK_CONFIG`, sonst `config.toml`
    pub fn pfad_aus_env() -> String {
        std::env::var(ENV_CONFIG).unwrap_or_else(|_| STANDARD_PFAD.into())
    }

    /// Prueft Werte, die serde allein nicht abdeckt
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if self.server.passwort.is_empty() {
            bail!("server.passwort darf nicht leer sein");
        }
        for name in &self.filter.deaktiviert {
            if !filter::NAMEN.contains(&name.as_str()) {
                bail!("filter.deaktiviert: unbekannter Filter '{name}'");
            }
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!("logging.level: ungueltiger Wert '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("logging.format: ungueltiger Wert '{}'", self.logging.format);
        }
        self.rest_bind_adresse()?;
        Ok(())
    }

    fn ip(&self) -> anyhow::Result<IpAddr> {
        self.netzwerk
            .bind_adresse
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{}'", self.netzwerk.bind_adresse))
    }

    /// Bind-Adresse fuer REST und WebSocket
    pub fn rest_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        Ok(SocketAddr::new(self.ip()?, self.netzwerk.port))
    }

    /// Bind-Adresse fuer den Observability-Server
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        Ok(SocketAddr::new(self.ip()?, self.observability.port))
    }

    /// Einstellungen fuer neue Sessions
    pub fn registry_konfig(&self) -> RegistryKonfig {
        RegistryKonfig {
            update_intervall: Duration::from_secs(self.player.update_intervall_sek),
            standard_timeout_sek: self.sessions.standard_timeout_sek,
            filter_deaktiviert: self.filter.deaktiviert.clone(),
        }
    }

    pub fn stats_intervall(&self) -> Duration {
        Duration::from_secs(self.player.stats_intervall_sek)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.netzwerk.port, 2333);
        assert_eq!(cfg.player.update_intervall_sek, 5);
        assert_eq!(cfg.player.stats_intervall_sek, 60);
        assert_eq!(cfg.sessions.standard_timeout_sek, 60);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.pruefen().is_ok());
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.rest_bind_adresse().unwrap().to_string(), "0.0.0.0:2333");
        assert_eq!(
            cfg.observability_bind_adresse().unwrap().to_string(),
            "0.0.0.0:9300"
        );
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            passwort = "geheim"

            [netzwerk]
            port = 8080

            [filter]
            deaktiviert = ["karaoke", "lowPass"]
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.passwort, "geheim");
        assert_eq!(cfg.netzwerk.port, 8080);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");
        assert_eq!(cfg.server.name, "Klangwerk");

        let registry = cfg.registry_konfig();
        assert_eq!(registry.filter_deaktiviert, vec!["karaoke", "lowPass"]);
        assert_eq!(registry.update_intervall, Duration::from_secs(5));
        assert!(cfg.pruefen().is_ok());
    }

    #[test]
    fn unbekannter_filter_wird_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.filter.deaktiviert.push("hall".into());
        assert!(cfg.pruefen().is_err());
    }

    #[test]
    fn leeres_passwort_wird_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.server.passwort.clear();
        assert!(cfg.pruefen().is_err());
    }

    #[test]
    fn ungueltige_bind_adresse() {
        let mut cfg = ServerConfig::default();
        cfg.netzwerk.bind_adresse = "irgendwo".into();
        assert!(cfg.rest_bind_adresse().is_err());
        assert!(cfg.pruefen().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standard() {
        let cfg = ServerConfig::laden("/gibt/es/nicht/klangwerk.toml").unwrap();
        assert_eq!(cfg.netzwerk.port, 2333);
    }
}
