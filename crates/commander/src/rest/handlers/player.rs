//! Player-Endpunkte einer Session

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use klangwerk_engine::AudioTrack;
use klangwerk_player::{FilterKette, Player};
use klangwerk_protocol::{JsonObjekt, LoadResult, Player as PlayerDto, PlayerUpdate};
use klangwerk_signaling::Session;
use serde::Deserialize;

use crate::error::{CommanderError, CommanderResult};
use crate::rest::handlers::{guild_parsen, session_finden};
use crate::rest::CommanderState;

/// `GET /v4/sessions/:session_id/players`
pub async fn get_players(
    State(state): State<CommanderState>,
    pfad: Result<Path<String>, PathRejection>,
) -> CommanderResult<Json<Vec<PlayerDto>>> {
    let Path(session_id) = pfad?;
    let session = session_finden(&state, &session_id)?;
    let players = session
        .players()
        .iter()
        .map(Player::zu_protokoll)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(players))
}

/// `GET /v4/sessions/:session_id/players/:guild_id`
pub async fn get_player(
    State(state): State<CommanderState>,
    pfad: Result<Path<(String, String)>, PathRejection>,
) -> CommanderResult<Json<PlayerDto>> {
    let Path((session_id, guild_id)) = pfad?;
    let session = session_finden(&state, &session_id)?;
    let guild_id = guild_parsen(&guild_id)?;
    let player = session.player(guild_id).ok_or_else(|| {
        klangwerk_core::KlangwerkError::nicht_gefunden(format!("Player fuer Guild {guild_id}"))
    })?;
    Ok(Json(player.zu_protokoll()?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AktualisierenQuery {
    #[serde(default)]
    pub no_replace: bool,
}

/// `PATCH /v4/sessions/:session_id/players/:guild_id?noReplace=...`
pub async fn update_player(
    State(state): State<CommanderState>,
    pfad: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<AktualisierenQuery>, QueryRejection>,
    body: Result<Json<PlayerUpdate>, JsonRejection>,
) -> CommanderResult<Json<PlayerDto>> {
    let Path((session_id, guild_id)) = pfad?;
    let session = session_finden(&state, &session_id)?;
    let guild_id = guild_parsen(&guild_id)?;
    let Query(query) = query?;
    let Json(update) = body?;

    let player = player_aktualisieren(&state, &session, guild_id, update, query.no_replace).await?;
    Ok(Json(player.zu_protokoll()?))
}

/// `DELETE /v4/sessions/:session_id/players/:guild_id`
///
/// Ein fehlender Player ist kein Fehler.
pub async fn destroy_player(
    State(state): State<CommanderState>,
    pfad: Result<Path<(String, String)>, PathRejection>,
) -> CommanderResult<StatusCode> {
    let Path((session_id, guild_id)) = pfad?;
    let session = session_finden(&state, &session_id)?;
    let guild_id = guild_parsen(&guild_id)?;
    if session.player_entfernen(guild_id) {
        tracing::info!(session_id = %session.id(), guild_id = %guild_id, "Player entfernt");
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// PATCH-Logik
// ---------------------------------------------------------------------------

/// Gewuenschter Trackwechsel aus einem PlayerUpdate
enum Trackwechsel {
    Keiner,
    Stoppen,
    Spielen(AudioTrack),
}

/// Vereinheitlicht `track`, `encodedTrack` und `identifier`
fn track_angabe(
    update: &mut PlayerUpdate,
) -> CommanderResult<(Option<Option<String>>, Option<String>, Option<JsonObjekt>)> {
    let kurzform = update.encoded_track.is_some() || update.identifier.is_some();
    let angabe = match update.track.take() {
        Some(_) if kurzform => {
            return Err(CommanderError::eingabe(
                "'track' darf nicht mit 'encodedTrack' oder 'identifier' kombiniert werden",
            ))
        }
        Some(track) => (track.encoded, track.identifier, track.user_data),
        None => (update.encoded_track.take(), update.identifier.take(), None),
    };
    if angabe.0.is_some() && angabe.1.is_some() {
        return Err(CommanderError::eingabe(
            "Nur eines von 'encoded' und 'identifier' angeben",
        ));
    }
    Ok(angabe)
}

/// Loest einen Identifier zu genau einem Track auf
async fn einzelnen_track_laden(state: &CommanderState, identifier: &str) -> CommanderResult<AudioTrack> {
    match state.registry.loader().laden(identifier).await? {
        LoadResult::Track(track) => Ok(state.registry.codec().dekodieren(&track.encoded)?),
        LoadResult::Error(fehler) => Err(CommanderError::eingabe(format!(
            "Track konnte nicht geladen werden: {}",
            fehler.message.unwrap_or_default()
        ))),
        _ => Err(CommanderError::eingabe(format!(
            "Kein einzelner Track fuer '{identifier}' gefunden"
        ))),
    }
}

/// Wendet ein PlayerUpdate an
///
/// Track und Filter werden vollstaendig geprueft, bevor sich am Player
/// etwas aendert. Ein fehlender Player wird angelegt.
async fn player_aktualisieren(
    state: &CommanderState,
    session: &Session,
    guild_id: klangwerk_core::GuildId,
    mut update: PlayerUpdate,
    no_replace: bool,
) -> CommanderResult<Player> {
    let (encoded, identifier, user_data) = track_angabe(&mut update)?;

    let wechsel = match (encoded, identifier) {
        (Some(None), _) => Trackwechsel::Stoppen,
        (Some(Some(kodiert)), _) => Trackwechsel::Spielen(state.registry.codec().dekodieren(&kodiert)?),
        (None, Some(identifier)) => Trackwechsel::Spielen(einzelnen_track_laden(state, &identifier).await?),
        (None, None) => Trackwechsel::Keiner,
    };
    let filter = update
        .filters
        .take()
        .map(|f| FilterKette::aus_filters(f, &state.registry.konfig().filter_deaktiviert))
        .transpose()?;

    let player = session.player_oder_erstellen(guild_id)?;

    if let Some(voice) = update.voice.take() {
        player.voice_aktualisieren(voice).await?;
    }
    if let Some(kette) = filter {
        player.filter_setzen(kette)?;
    }
    if let Some(lautstaerke) = update.volume {
        player.lautstaerke_setzen(lautstaerke)?;
    }

    let gestartet = match wechsel {
        Trackwechsel::Spielen(_) if no_replace && player.aktueller_track().is_some() => {
            tracing::debug!(
                guild_id = %guild_id,
                "noReplace gesetzt, laufender Track bleibt"
            );
            false
        }
        Trackwechsel::Spielen(track) => {
            if let Some(position) = update.position {
                track.position_setzen(position);
            }
            player.abspielen(track, user_data.clone().unwrap_or_default())?;
            if let Some(Some(ende)) = update.end_time {
                player.endzeit_setzen(Some(ende))?;
            }
            if let Some(pausiert) = update.paused {
                player.pause_setzen(pausiert)?;
            }
            true
        }
        Trackwechsel::Stoppen => {
            player.stoppen()?;
            if let Some(pausiert) = update.paused {
                player.pause_setzen(pausiert)?;
            }
            return Ok(player);
        }
        Trackwechsel::Keiner => false,
    };

    if !gestartet {
        if let Some(pausiert) = update.paused {
            player.pause_setzen(pausiert)?;
        }
        // Position, Endmarke und userData betreffen nur einen laufenden Track
        if player.aktueller_track().is_some() {
            if let Some(position) = update.position {
                player.suchen(position)?;
            }
            if let Some(ende) = update.end_time {
                player.endzeit_setzen(ende)?;
            }
            if let Some(daten) = user_data {
                player.user_data_setzen(daten)?;
            }
        }
    }
    Ok(player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use klangwerk_protocol::player::PlayerUpdateTrack;

    #[test]
    fn track_und_kurzform_schliessen_sich_aus() {
        let mut update = PlayerUpdate {
            track: Some(PlayerUpdateTrack::default()),
            identifier: Some("track:1".into()),
            ..Default::default()
        };
        assert!(track_angabe(&mut update).is_err());
    }

    #[test]
    fn encoded_und_identifier_schliessen_sich_aus() {
        let mut update = PlayerUpdate {
            track: Some(PlayerUpdateTrack {
                encoded: Some(Some("QUFB".into())),
                identifier: Some("track:1".into()),
                user_data: None,
            }),
            ..Default::default()
        };
        assert!(track_angabe(&mut update).is_err());
    }

    #[test]
    fn kurzform_wird_uebernommen() {
        let mut update = PlayerUpdate {
            encoded_track: Some(None),
            ..Default::default()
        };
        let (encoded, identifier, user_data) = track_angabe(&mut update).unwrap();
        assert_eq!(encoded, Some(None));
        assert!(identifier.is_none());
        assert!(user_data.is_none());
    }
}
