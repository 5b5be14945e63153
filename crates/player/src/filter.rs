//! Filterkette eines Players
//!
//! Die Signalverarbeitung selbst liegt in der Engine. Die Kette prueft die
//! Parameter, entscheidet ob ueberhaupt ein Filter aktiv ist und reicht die
//! Stufen ueber [`FilterFabrik`] an den Engine-Player weiter.

use std::sync::Arc;

use klangwerk_core::{KlangwerkError, Result};
use klangwerk_engine::{EnginePlayer, FilterFabrik, FilterStufe};
use klangwerk_protocol::filters::{Band, ChannelMix, Distortion, Karaoke, Timescale};
use klangwerk_protocol::Filters;
use serde::Serialize;

/// Namen aller eingebauten Filter (Reihenfolge wie auf dem Draht)
pub const NAMEN: [&str; 10] = [
    "volume",
    "equalizer",
    "karaoke",
    "timescale",
    "tremolo",
    "vibrato",
    "rotation",
    "distortion",
    "channelMix",
    "lowPass",
];

/// Anzahl der Equalizer-Baender
pub const EQ_BAENDER: u8 = 15;

fn ungleich(wert: Option<f32>, standard: f32) -> bool {
    wert.is_some_and(|w| (w - standard).abs() > f32::EPSILON)
}

fn ungleich64(wert: Option<f64>, standard: f64) -> bool {
    wert.is_some_and(|w| (w - standard).abs() > f64::EPSILON)
}

fn pruefen(bedingung: bool, meldung: impl FnOnce() -> String) -> Result<()> {
    if bedingung {
        Ok(())
    } else {
        Err(KlangwerkError::argument(meldung()))
    }
}

// ---------------------------------------------------------------------------
// Aktivitaet pro Filter
// ---------------------------------------------------------------------------

fn equalizer_aktiv(baender: &[Band]) -> bool {
    baender.iter().any(|b| b.gain.abs() > f32::EPSILON)
}

fn karaoke_aktiv(k: &Karaoke) -> bool {
    // Fehlende Pegel bedeuten 1.0 (Effekt voll an)
    let level = k.level.unwrap_or(1.0);
    let mono = k.mono_level.unwrap_or(1.0);
    level.abs() > f32::EPSILON || mono.abs() > f32::EPSILON
}

fn timescale_aktiv(t: &Timescale) -> bool {
    ungleich64(t.speed, 1.0) || ungleich64(t.pitch, 1.0) || ungleich64(t.rate, 1.0)
}

fn distortion_aktiv(d: &Distortion) -> bool {
    ungleich(d.sin_offset, 0.0)
        || ungleich(d.cos_offset, 0.0)
        || ungleich(d.tan_offset, 0.0)
        || ungleich(d.offset, 0.0)
        || ungleich(d.sin_scale, 1.0)
        || ungleich(d.cos_scale, 1.0)
        || ungleich(d.tan_scale, 1.0)
        || ungleich(d.scale, 1.0)
}

fn channel_mix_aktiv(c: &ChannelMix) -> bool {
    ungleich(c.left_to_left, 1.0)
        || ungleich(c.left_to_right, 0.0)
        || ungleich(c.right_to_left, 0.0)
        || ungleich(c.right_to_right, 1.0)
}

// ---------------------------------------------------------------------------
// FilterKette
// ---------------------------------------------------------------------------

/// Gepruefte Filterkonfiguration eines Players
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterKette {
    filters: Filters,
}

impl FilterKette {
    /// Leere Kette (kein Filter aktiv)
    pub fn neu() -> Self {
        Self::default()
    }

    /// Prueft die Filter und baut daraus eine Kette
    ///
    /// `deaktiviert` enthaelt Filternamen, die per Konfiguration gesperrt sind.
    pub fn aus_filters(filters: Filters, deaktiviert: &[String]) -> Result<Self> {
        for name in gesetzte_namen(&filters) {
            if deaktiviert.iter().any(|d| d == name) {
                return Err(KlangwerkError::argument(format!(
                    "Filter '{name}' ist deaktiviert"
                )));
            }
        }
        for name in filters.plugin_filters.keys() {
            if deaktiviert.iter().any(|d| d == name) {
                return Err(KlangwerkError::argument(format!(
                    "Plugin-Filter '{name}' ist deaktiviert"
                )));
            }
        }

        validieren(&filters)?;
        Ok(Self { filters })
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// `true` wenn mindestens ein Filter vom Standard abweicht
    pub fn ist_aktiv(&self) -> bool {
        let f = &self.filters;
        ungleich(f.volume, 1.0)
            || f.equalizer.as_deref().is_some_and(equalizer_aktiv)
            || f.karaoke.as_ref().is_some_and(karaoke_aktiv)
            || f.timescale.as_ref().is_some_and(timescale_aktiv)
            || f.tremolo.as_ref().is_some_and(|t| ungleich(t.depth, 0.0))
            || f.vibrato.as_ref().is_some_and(|v| ungleich(v.depth, 0.0))
            || f.rotation.as_ref().is_some_and(|r| ungleich64(r.rotation_hz, 0.0))
            || f.distortion.as_ref().is_some_and(distortion_aktiv)
            || f.channel_mix.as_ref().is_some_and(channel_mix_aktiv)
            || f.low_pass.as_ref().is_some_and(|l| l.smoothing.is_some_and(|s| s > 1.0))
            || !f.plugin_filters.is_empty()
    }

    /// Installiert die Kette am Engine-Player oder entfernt sie
    pub fn aktivieren(&self, player: &dyn EnginePlayer) {
        if self.ist_aktiv() {
            player.filter_fabrik_setzen(Some(Arc::new(self.clone())));
        } else {
            player.filter_fabrik_setzen(None);
        }
    }
}

fn gesetzte_namen(f: &Filters) -> Vec<&'static str> {
    let gesetzt = [
        f.volume.is_some(),
        f.equalizer.is_some(),
        f.karaoke.is_some(),
        f.timescale.is_some(),
        f.tremolo.is_some(),
        f.vibrato.is_some(),
        f.rotation.is_some(),
        f.distortion.is_some(),
        f.channel_mix.is_some(),
        f.low_pass.is_some(),
    ];
    NAMEN
        .iter()
        .zip(gesetzt)
        .filter_map(|(name, ist)| ist.then_some(*name))
        .collect()
}

fn validieren(f: &Filters) -> Result<()> {
    if let Some(volume) = f.volume {
        pruefen((0.0..=5.0).contains(&volume), || {
            format!("volume muss zwischen 0.0 und 5.0 liegen, war {volume}")
        })?;
    }

    if let Some(baender) = &f.equalizer {
        for b in baender {
            pruefen(b.band < EQ_BAENDER, || {
                format!("Equalizer-Band {} ausserhalb 0..=14", b.band)
            })?;
            pruefen((-0.25..=1.0).contains(&b.gain), || {
                format!("Equalizer-Gain {} ausserhalb -0.25..=1.0", b.gain)
            })?;
        }
    }

    if let Some(t) = &f.timescale {
        for (name, wert) in [("speed", t.speed), ("pitch", t.pitch), ("rate", t.rate)] {
            if let Some(w) = wert {
                pruefen(w > 0.0, || format!("timescale.{name} muss groesser 0 sein"))?;
            }
        }
    }

    if let Some(t) = &f.tremolo {
        if let Some(freq) = t.frequency {
            pruefen(freq > 0.0, || "tremolo.frequency muss groesser 0 sein".into())?;
        }
        if let Some(tiefe) = t.depth {
            pruefen(tiefe > 0.0 && tiefe <= 1.0, || {
                "tremolo.depth muss in (0, 1] liegen".into()
            })?;
        }
    }

    if let Some(v) = &f.vibrato {
        if let Some(freq) = v.frequency {
            pruefen(freq > 0.0 && freq <= 14.0, || {
                "vibrato.frequency muss in (0, 14] liegen".into()
            })?;
        }
        if let Some(tiefe) = v.depth {
            pruefen(tiefe > 0.0 && tiefe <= 1.0, || {
                "vibrato.depth muss in (0, 1] liegen".into()
            })?;
        }
    }

    Ok(())
}

fn stufe<T: Serialize>(name: &str, wert: &T) -> FilterStufe {
    FilterStufe {
        name: name.to_string(),
        parameter: serde_json::to_value(wert).unwrap_or(serde_json::Value::Null),
    }
}

impl FilterFabrik for FilterKette {
    fn stufen(&self) -> Vec<FilterStufe> {
        let f = &self.filters;
        let mut stufen = Vec::new();

        if ungleich(f.volume, 1.0) {
            stufen.push(stufe("volume", &f.volume));
        }
        if let Some(eq) = f.equalizer.as_ref().filter(|e| equalizer_aktiv(e)) {
            stufen.push(stufe("equalizer", eq));
        }
        if let Some(k) = f.karaoke.as_ref().filter(|k| karaoke_aktiv(k)) {
            stufen.push(stufe("karaoke", k));
        }
        if let Some(t) = f.timescale.as_ref().filter(|t| timescale_aktiv(t)) {
            stufen.push(stufe("timescale", t));
        }
        if let Some(t) = f.tremolo.as_ref().filter(|t| ungleich(t.depth, 0.0)) {
            stufen.push(stufe("tremolo", t));
        }
        if let Some(v) = f.vibrato.as_ref().filter(|v| ungleich(v.depth, 0.0)) {
            stufen.push(stufe("vibrato", v));
        }
        if let Some(r) = f.rotation.as_ref().filter(|r| ungleich64(r.rotation_hz, 0.0)) {
            stufen.push(stufe("rotation", r));
        }
        if let Some(d) = f.distortion.as_ref().filter(|d| distortion_aktiv(d)) {
            stufen.push(stufe("distortion", d));
        }
        if let Some(c) = f.channel_mix.as_ref().filter(|c| channel_mix_aktiv(c)) {
            stufen.push(stufe("channelMix", c));
        }
        if let Some(l) = f
            .low_pass
            .as_ref()
            .filter(|l| l.smoothing.is_some_and(|s| s > 1.0))
        {
            stufen.push(stufe("lowPass", l));
        }
        for (name, parameter) in &f.plugin_filters {
            stufen.push(FilterStufe {
                name: name.clone(),
                parameter: parameter.clone(),
            });
        }
        stufen
    }
}
