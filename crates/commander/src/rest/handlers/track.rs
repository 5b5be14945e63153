//! Track-Endpunkte: Laden und Dekodieren

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Json;
use klangwerk_protocol::{LoadResult, Track};
use serde::Deserialize;

use crate::error::{CommanderError, CommanderResult};
use crate::rest::CommanderState;

#[derive(Debug, Deserialize)]
pub struct LadenQuery {
    pub identifier: Option<String>,
}

/// `GET /v4/loadtracks?identifier=...`
pub async fn load_tracks(
    State(state): State<CommanderState>,
    query: Result<Query<LadenQuery>, QueryRejection>,
) -> CommanderResult<Json<LoadResult>> {
    let Query(query) = query?;
    let identifier = query
        .identifier
        .filter(|i| !i.trim().is_empty())
        .ok_or_else(|| CommanderError::eingabe("Parameter 'identifier' fehlt"))?;

    tracing::debug!(identifier = %identifier, "Tracks werden geladen");
    Ok(Json(state.registry.loader().laden(&identifier).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DekodierQuery {
    pub encoded_track: Option<String>,
    /// Aeltere Clients senden `track`
    pub track: Option<String>,
}

/// `GET /v4/decodetrack?encodedTrack=...`
pub async fn decode_track(
    State(state): State<CommanderState>,
    query: Result<Query<DekodierQuery>, QueryRejection>,
) -> CommanderResult<Json<Track>> {
    let Query(query) = query?;
    let kodiert = query
        .encoded_track
        .or(query.track)
        .ok_or_else(|| CommanderError::eingabe("Parameter 'encodedTrack' fehlt"))?;
    Ok(Json(state.registry.loader().dekodieren(&kodiert)?))
}

/// `POST /v4/decodetracks` mit einem JSON-Array kodierter Tracks
pub async fn decode_tracks(
    State(state): State<CommanderState>,
    body: Result<Json<Vec<String>>, JsonRejection>,
) -> CommanderResult<Json<Vec<Track>>> {
    let Json(kodiert) = body?;
    if kodiert.is_empty() {
        return Err(CommanderError::eingabe("Keine Tracks angegeben"));
    }
    Ok(Json(state.registry.loader().alle_dekodieren(&kodiert)?))
}
