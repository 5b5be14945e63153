//! Binaerformat fuer Tracks der Speicher-Engine
//!
//! Aufbau (Big Endian):
//! ```text
//! u8  version
//! str titel | str autor | u64 laenge | str identifier | u8 stream
//! opt uri | opt artwork | opt isrc
//! str quelle | u8 spulbar | u64 position
//! ```
//! `str` = u16 Laenge + UTF-8, `opt` = u8 vorhanden + `str`.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{EngineError, EngineResult};
use crate::track::{AudioTrack, AudioTrackInfo};

/// Aktuelle Version des Formats
pub const KODIER_VERSION: u8 = 1;

fn str_schreiben(puffer: &mut BytesMut, feld: &'static str, wert: &str) -> EngineResult<()> {
    let laenge = u16::try_from(wert.len()).map_err(|_| EngineError::ZuLang(feld))?;
    puffer.put_u16(laenge);
    puffer.put_slice(wert.as_bytes());
    Ok(())
}

fn opt_schreiben(puffer: &mut BytesMut, feld: &'static str, wert: Option<&str>) -> EngineResult<()> {
    match wert {
        Some(w) => {
            puffer.put_u8(1);
            str_schreiben(puffer, feld, w)
        }
        None => {
            puffer.put_u8(0);
            Ok(())
        }
    }
}

pub(crate) fn kodieren(track: &AudioTrack) -> EngineResult<Vec<u8>> {
    let info = track.info();
    let mut puffer = BytesMut::with_capacity(128);

    puffer.put_u8(KODIER_VERSION);
    str_schreiben(&mut puffer, "titel", &info.titel)?;
    str_schreiben(&mut puffer, "autor", &info.autor)?;
    puffer.put_u64(info.laenge_ms);
    str_schreiben(&mut puffer, "identifier", &info.identifier)?;
    puffer.put_u8(info.ist_stream as u8);
    opt_schreiben(&mut puffer, "uri", info.uri.as_deref())?;
    opt_schreiben(&mut puffer, "artwork_url", info.artwork_url.as_deref())?;
    opt_schreiben(&mut puffer, "isrc", info.isrc.as_deref())?;
    str_schreiben(&mut puffer, "quelle", track.quelle())?;
    puffer.put_u8(track.ist_spulbar() as u8);
    puffer.put_u64(track.position_ms());

    Ok(puffer.to_vec())
}

// ---------------------------------------------------------------------------
// Lesen
// ---------------------------------------------------------------------------

struct Leser<'a> {
    daten: &'a [u8],
}

impl<'a> Leser<'a> {
    fn u8(&mut self, feld: &'static str) -> EngineResult<u8> {
        if self.daten.remaining() < 1 {
            return Err(EngineError::Unvollstaendig(feld));
        }
        Ok(self.daten.get_u8())
    }

    fn u64(&mut self, feld: &'static str) -> EngineResult<u64> {
        if self.daten.remaining() < 8 {
            return Err(EngineError::Unvollstaendig(feld));
        }
        Ok(self.daten.get_u64())
    }

    fn bool(&mut self, feld: &'static str) -> EngineResult<bool> {
        Ok(self.u8(feld)? != 0)
    }

    fn string(&mut self, feld: &'static str) -> EngineResult<String> {
        if self.daten.remaining() < 2 {
            return Err(EngineError::Unvollstaendig(feld));
        }
        let laenge = self.daten.get_u16() as usize;
        if self.daten.remaining() < laenge {
            return Err(EngineError::Unvollstaendig(feld));
        }
        let wert = std::str::from_utf8(&self.daten[..laenge])
            .map_err(|_| EngineError::UngueltigesUtf8(feld))?
            .to_string();
        self.daten.advance(laenge);
        Ok(wert)
    }

    fn optional(&mut self, feld: &'static str) -> EngineResult<Option<String>> {
        if self.bool(feld)? {
            self.string(feld).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Gelesener Track vor der Pruefung der Quelle
#[derive(Debug)]
pub(crate) struct Rohtrack {
    pub info: AudioTrackInfo,
    pub quelle: String,
    pub spulbar: bool,
    pub position_ms: u64,
}

/// Liest einen Track; `Ok(None)` bei unbekannter Version
pub(crate) fn dekodieren(daten: &[u8]) -> EngineResult<Option<Rohtrack>> {
    if daten.is_empty() {
        return Err(EngineError::Leer);
    }
    let mut leser = Leser { daten };

    if leser.u8("version")? != KODIER_VERSION {
        return Ok(None);
    }

    let titel = leser.string("titel")?;
    let autor = leser.string("autor")?;
    let laenge_ms = leser.u64("laenge")?;
    let identifier = leser.string("identifier")?;
    let ist_stream = leser.bool("stream")?;
    let uri = leser.optional("uri")?;
    let artwork_url = leser.optional("artwork_url")?;
    let isrc = leser.optional("isrc")?;
    let quelle = leser.string("quelle")?;
    let spulbar = leser.bool("spulbar")?;
    let position_ms = leser.u64("position")?;

    Ok(Some(Rohtrack {
        info: AudioTrackInfo {
            titel,
            autor,
            laenge_ms,
            identifier,
            ist_stream,
            uri,
            artwork_url,
            isrc,
        },
        quelle,
        spulbar,
        position_ms,
    }))
}
