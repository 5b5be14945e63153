//! Route-Definitionen fuer die REST-API (/v4/...)

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use klangwerk_observability::timing_middleware;

use crate::rest::middleware::{fehler_pfad_middleware, passwort_middleware};
use crate::rest::{handlers, CommanderState};

/// Erstellt den /v4/-Router ohne Middleware
pub fn v4_router() -> Router<CommanderState> {
    Router::new()
        // Tracks
        .route("/v4/loadtracks", get(handlers::track::load_tracks))
        .route("/v4/decodetrack", get(handlers::track::decode_track))
        .route("/v4/decodetracks", post(handlers::track::decode_tracks))
        // Sessions und Player
        .route(
            "/v4/sessions/:session_id",
            patch(handlers::session::update_session),
        )
        .route(
            "/v4/sessions/:session_id/players",
            get(handlers::player::get_players),
        )
        .route(
            "/v4/sessions/:session_id/players/:guild_id",
            get(handlers::player::get_player)
                .patch(handlers::player::update_player)
                .delete(handlers::player::destroy_player),
        )
        // Server
        .route("/v4/info", get(handlers::info::info))
        .route("/v4/stats", get(handlers::info::stats))
        .route("/v4/websocket", get(handlers::websocket::websocket))
}

/// Vollstaendige Anwendung mit Passwort-Pruefung und Fehlerpfaden
///
/// Auch `/version` verlangt das Passwort.
pub fn router(state: CommanderState) -> Router {
    let mut app = v4_router()
        .route("/version", get(handlers::info::version))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            passwort_middleware,
        ))
        .layer(middleware::from_fn(fehler_pfad_middleware));

    if let Some(metriken) = state.metriken.clone() {
        app = app.layer(middleware::from_fn_with_state(metriken, timing_middleware));
    }

    app.with_state(state)
}
