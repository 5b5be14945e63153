//! REST-Handler, gruppiert nach Ressource

pub mod info;
pub mod player;
pub mod session;
pub mod track;
pub mod websocket;

use klangwerk_core::{GuildId, SessionId};
use klangwerk_signaling::Session;

use crate::error::{CommanderError, CommanderResult};
use crate::rest::CommanderState;

/// Sucht eine Session; unbekannte IDs ergeben 404
pub(crate) fn session_finden(state: &CommanderState, session_id: &str) -> CommanderResult<Session> {
    Ok(state.registry.per_id(&SessionId::from(session_id))?)
}

/// Guild-IDs kommen als Dezimal-Snowflake im Pfad
pub(crate) fn guild_parsen(roh: &str) -> CommanderResult<GuildId> {
    roh.parse()
        .map_err(|_| CommanderError::eingabe(format!("Ungueltige Guild-ID: {roh}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guild_id_wird_geparst() {
        assert_eq!(guild_parsen("817327181659111454").unwrap(), GuildId(817327181659111454));
        assert!(matches!(
            guild_parsen("abc"),
            Err(CommanderError::UngueltigeEingabe(_))
        ));
        assert!(guild_parsen("-1").is_err());
    }
}
