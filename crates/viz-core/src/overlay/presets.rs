//! Band-to-layer mappings for the overlay.
//!
//! A preset is a pure function of the smoothed bands; switching presets never
//! touches geometry.

use super::layers::Layer;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresetOutput {
    /// Indexed by [`Layer::index`].
    pub opacity: [f32; 4],
    pub heart_scale: f32,
    pub veins_flow_speed: f32,
}

impl PresetOutput {
    #[inline]
    pub fn layer_opacity(&self, layer: Layer) -> f32 {
        self.opacity[layer.index()]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetId {
    #[default]
    Classic,
    Pulse,
    Neural,
    Xray,
}

type PresetFn = fn(f32, f32, f32) -> PresetOutput;

impl PresetId {
    pub const ALL: [PresetId; 4] = [
        PresetId::Classic,
        PresetId::Pulse,
        PresetId::Neural,
        PresetId::Xray,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PresetId::Classic => "classic",
            PresetId::Pulse => "pulse",
            PresetId::Neural => "neural",
            PresetId::Xray => "xray",
        }
    }

    fn mapping(self) -> PresetFn {
        match self {
            PresetId::Classic => classic,
            PresetId::Pulse => pulse,
            PresetId::Neural => neural,
            PresetId::Xray => xray,
        }
    }

    /// Evaluate the preset and apply the per-layer opacity floors.
    pub fn evaluate(self, bass: f32, mid: f32, high: f32) -> PresetOutput {
        let mut out = (self.mapping())(
            bass.clamp(0.0, 1.0),
            mid.clamp(0.0, 1.0),
            high.clamp(0.0, 1.0),
        );
        for layer in Layer::ALL {
            let o = &mut out.opacity[layer.index()];
            *o = o.clamp(layer.opacity_floor(), 1.0);
        }
        out
    }
}

impl FromStr for PresetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetId::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown preset: {s}"))
    }
}

// Body follows overall energy, veins the mids, brain the highs, heart the bass.
fn classic(bass: f32, mid: f32, high: f32) -> PresetOutput {
    let energy = (bass + mid + high) / 3.0;
    PresetOutput {
        opacity: [
            0.05 + energy * 0.25,
            0.05 + mid * 0.6,
            0.03 + high * 0.55,
            0.05 + bass * 0.8,
        ],
        heart_scale: 1.0 + bass * 0.25,
        veins_flow_speed: 0.5 + mid * 2.0,
    }
}

// Heart-forward: strong bass pulse, everything else subdued.
fn pulse(bass: f32, mid: f32, high: f32) -> PresetOutput {
    let kick = bass * bass;
    PresetOutput {
        opacity: [
            0.05 + kick * 0.15,
            0.05 + (bass * 0.5 + mid * 0.2),
            0.03 + high * 0.2,
            0.1 + kick * 0.9,
        ],
        heart_scale: 1.0 + kick * 0.45,
        veins_flow_speed: 0.8 + bass * 3.0,
    }
}

// Brain-forward: highs light the brain, mids drive the vessel flow.
fn neural(bass: f32, mid: f32, high: f32) -> PresetOutput {
    PresetOutput {
        opacity: [
            0.05 + mid * 0.1,
            0.05 + mid * 0.35,
            0.1 + (high * 0.7 + mid * 0.2),
            0.05 + bass * 0.4,
        ],
        heart_scale: 1.0 + bass * 0.15,
        veins_flow_speed: 0.3 + mid * 1.5 + high * 1.0,
    }
}

// Faint shell with bright internals.
fn xray(bass: f32, mid: f32, high: f32) -> PresetOutput {
    let energy = (bass + mid + high) / 3.0;
    PresetOutput {
        opacity: [
            0.05 + energy * 0.05,
            0.2 + mid * 0.5,
            0.2 + high * 0.5,
            0.25 + bass * 0.6,
        ],
        heart_scale: 1.0 + bass * 0.2,
        veins_flow_speed: 1.0 + energy * 2.0,
    }
}
