//! Filter-Repraesentation auf dem Draht
//!
//! Jeder Filter ist optional. Ein fehlender Filter bedeutet "nicht gesetzt";
//! die Standardwerte legt die Filterkette im Player fest.

use serde::{Deserialize, Serialize};

use crate::JsonObjekt;

/// Alle Filter eines Players
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equalizer: Option<Vec<Band>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub karaoke: Option<Karaoke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timescale: Option<Timescale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<Tremolo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<Vibrato>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distortion: Option<Distortion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_mix: Option<ChannelMix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_pass: Option<LowPass>,
    /// Filter-Konfiguration von Plugins, unveraendert durchgereicht
    #[serde(default, skip_serializing_if = "JsonObjekt::is_empty")]
    pub plugin_filters: JsonObjekt,
}

/// Ein Band des 15-Band-Equalizers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Band 0..=14
    pub band: u8,
    /// Verstaerkung -0.25..=1.0
    pub gain: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Karaoke {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mono_level: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_band: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_width: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timescale {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tremolo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vibrato {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_hz: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distortion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sin_offset: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sin_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cos_offset: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cos_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tan_offset: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tan_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMix {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_to_left: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_to_right: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_to_left: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_to_right: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LowPass {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<f32>,
}
