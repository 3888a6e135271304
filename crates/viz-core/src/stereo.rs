//! Stereo field metrics from independent left/right magnitude buffers.

use crate::bands::{smooth, BandExtractor, BandSplit, FrequencyBands};
use crate::constants::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StereoMetrics {
    pub stereo_width: f32,
    pub panning: f32,
    pub phase_correlation: f32,
    pub mid_energy: f32,
    pub side_energy: f32,
    pub mid_side_ratio: f32,
    pub left: FrequencyBands,
    pub right: FrequencyBands,
}

impl StereoMetrics {
    /// Record reported when stereo analysis is off or a channel is missing.
    pub const NEUTRAL: Self = Self {
        stereo_width: 0.0,
        panning: 0.0,
        phase_correlation: 1.0,
        mid_energy: 0.0,
        side_energy: 0.0,
        mid_side_ratio: 0.0,
        left: FrequencyBands::ZERO,
        right: FrequencyBands::ZERO,
    };
}

impl Default for StereoMetrics {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Clone, Debug)]
pub struct StereoAnalyzer {
    enabled: bool,
    width: f32,
    panning: f32,
    mid: f32,
    side: f32,
    phase: f32,
    left: BandExtractor,
    right: BandExtractor,
}

impl Default for StereoAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl StereoAnalyzer {
    pub fn new() -> Self {
        Self {
            enabled: true,
            width: 0.0,
            panning: 0.0,
            mid: 0.0,
            side: 0.0,
            phase: 1.0,
            left: BandExtractor::with_split(BandSplit::fractional(), STEREO_SMOOTHING),
            right: BandExtractor::with_split(BandSplit::fractional(), STEREO_SMOOTHING),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn analyze(&mut self, left: Option<&[u8]>, right: Option<&[u8]>) -> StereoMetrics {
        let (l, r) = match (self.enabled, left, right) {
            (true, Some(l), Some(r)) if !l.is_empty() && !r.is_empty() => (l, r),
            _ => return StereoMetrics::NEUTRAL,
        };
        let n = l.len().min(r.len());
        let (l, r) = (&l[..n], &r[..n]);

        let mut sum_l = 0.0_f32;
        let mut sum_r = 0.0_f32;
        let mut sum_diff = 0.0_f32;
        for (&a, &b) in l.iter().zip(r) {
            let (a, b) = (a as f32, b as f32);
            sum_l += a;
            sum_r += b;
            sum_diff += (a - b).abs();
        }
        let total = sum_l + sum_r;

        let raw_width = if total > 0.0 {
            (2.0 * sum_diff / total).min(1.0)
        } else {
            0.0
        };
        let raw_pan = if total > 0.0 {
            ((sum_r - sum_l) / total).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let raw_mid = (total / 2.0) / n as f32 / BYTE_MAX;
        let raw_side = (sum_diff / 2.0) / n as f32 / BYTE_MAX;
        let raw_phase = pearson(l, r, sum_l / n as f32, sum_r / n as f32);

        self.width = smooth(self.width, raw_width, STEREO_SMOOTHING);
        self.panning = smooth(self.panning, raw_pan, STEREO_SMOOTHING);
        self.mid = smooth(self.mid, raw_mid, STEREO_SMOOTHING);
        self.side = smooth(self.side, raw_side, STEREO_SMOOTHING);
        self.phase = smooth(self.phase, raw_phase, PHASE_SMOOTHING);

        let ms_total = self.mid + self.side;
        StereoMetrics {
            stereo_width: self.width,
            panning: self.panning,
            phase_correlation: self.phase,
            mid_energy: self.mid,
            side_energy: self.side,
            mid_side_ratio: if ms_total > 0.0 {
                self.side / ms_total
            } else {
                0.0
            },
            left: self.left.extract(l),
            right: self.right.extract(r),
        }
    }

    pub fn reset(&mut self) {
        self.width = 0.0;
        self.panning = 0.0;
        self.mid = 0.0;
        self.side = 0.0;
        self.phase = 1.0;
        self.left.reset();
        self.right.reset();
    }
}

// Pearson correlation of the two magnitude series. Flat series are treated
// as perfectly in phase.
fn pearson(l: &[u8], r: &[u8], mean_l: f32, mean_r: f32) -> f32 {
    let mut cov = 0.0_f32;
    let mut var_l = 0.0_f32;
    let mut var_r = 0.0_f32;
    for (&a, &b) in l.iter().zip(r) {
        let da = a as f32 - mean_l;
        let db = b as f32 - mean_r;
        cov += da * db;
        var_l += da * da;
        var_r += db * db;
    }
    let denom = (var_l * var_r).sqrt();
    if denom <= f32::EPSILON {
        return 1.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}
