//! Session-Endpunkt: Resume-Konfiguration

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Json;
use klangwerk_protocol::{Session as ResumeKonfig, SessionUpdate};

use crate::error::CommanderResult;
use crate::rest::handlers::session_finden;
use crate::rest::CommanderState;

/// `PATCH /v4/sessions/:session_id`
pub async fn update_session(
    State(state): State<CommanderState>,
    pfad: Result<Path<String>, PathRejection>,
    body: Result<Json<SessionUpdate>, JsonRejection>,
) -> CommanderResult<Json<ResumeKonfig>> {
    let Path(session_id) = pfad?;
    let session = session_finden(&state, &session_id)?;
    let Json(update) = body?;

    let konfig = session.resume_aktualisieren(update);
    tracing::info!(
        session_id = %session.id(),
        resuming = konfig.resuming,
        timeout = konfig.timeout,
        "Session aktualisiert"
    );
    Ok(Json(konfig))
}
