//! Server-Endpunkte: Info, Stats und Version

use axum::extract::State;
use axum::response::Json;
use klangwerk_core::KlangwerkError;
use klangwerk_player::filter;
use klangwerk_protocol::info::{PluginBeschreibung, Version};
use klangwerk_protocol::{Info, Stats};
use klangwerk_signaling::stats_erstellen;

use crate::error::CommanderResult;
use crate::rest::CommanderState;

/// Versionsstring des Servers
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `GET /v4/info`
pub async fn info(State(state): State<CommanderState>) -> Json<Info> {
    let codec = state.registry.codec();
    let deaktiviert = &state.registry.konfig().filter_deaktiviert;

    Json(Info {
        version: Version::parsen(VERSION),
        build_time: option_env!("KLANGWERK_BUILD_TIME")
            .and_then(|t| t.parse().ok())
            .unwrap_or(0),
        engine: codec.engine().name(),
        source_managers: codec.engine().quellen(),
        filters: filter::NAMEN
            .iter()
            .filter(|name| !deaktiviert.iter().any(|d| d == *name))
            .map(|name| name.to_string())
            .collect(),
        plugins: codec
            .plugins()
            .alle()
            .into_iter()
            .map(|meta| PluginBeschreibung {
                name: meta.name,
                version: meta.version,
            })
            .collect(),
    })
}

/// `GET /v4/stats` (ohne frameStats)
pub async fn stats(State(state): State<CommanderState>) -> CommanderResult<Json<Stats>> {
    let registry = state.registry.clone();
    let monitor = state.monitor.clone();
    // sysinfo blockiert beim Auffrischen
    let stats = tokio::task::spawn_blocking(move || stats_erstellen(&registry, &monitor, false))
        .await
        .map_err(|e| KlangwerkError::intern(format!("Stats-Task abgebrochen: {e}")))?;
    Ok(Json(stats))
}

/// `GET /version` als Klartext
pub async fn version() -> &'static str {
    VERSION
}
