//! Bass/mid/high reduction of an 8-bit magnitude buffer.
//!
//! The extractor owns its smoothing state; create one per consumer and call
//! [`BandExtractor::reset`] on track change.

use crate::constants::*;
use serde::{Deserialize, Serialize};

/// Smoothed per-band energies in \[0, 1\].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBands {
    pub bass: f32,
    pub mid: f32,
    pub high: f32,
}

impl FrequencyBands {
    pub const ZERO: Self = Self {
        bass: 0.0,
        mid: 0.0,
        high: 0.0,
    };

    pub fn new(bass: f32, mid: f32, high: f32) -> Self {
        Self { bass, mid, high }
    }

    /// Mean of the three bands.
    #[inline]
    pub fn energy(&self) -> f32 {
        (self.bass + self.mid + self.high) / 3.0
    }

    #[inline]
    pub fn as_array(&self) -> [f32; 3] {
        [self.bass, self.mid, self.high]
    }
}

/// How a buffer is divided into the three bands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BandSplit {
    /// Absolute bin indices, tuned for a 1024-bin buffer.
    Fixed { bass_end: usize, mid_end: usize },
    /// Fractions of the buffer length, independent of its size.
    Fraction { bass: f32, mid: f32 },
}

impl Default for BandSplit {
    fn default() -> Self {
        BandSplit::Fixed {
            bass_end: BASS_END_INDEX,
            mid_end: MID_END_INDEX,
        }
    }
}

impl BandSplit {
    pub fn fractional() -> Self {
        BandSplit::Fraction {
            bass: BASS_FRACTION,
            mid: MID_FRACTION,
        }
    }

    /// Bin boundaries `(bass_end, mid_end)` clamped to `len`.
    pub fn bounds(&self, len: usize) -> (usize, usize) {
        let (b, m) = match *self {
            BandSplit::Fixed { bass_end, mid_end } => (bass_end, mid_end),
            BandSplit::Fraction { bass, mid } => (
                (len as f32 * bass).round() as usize,
                (len as f32 * mid).round() as usize,
            ),
        };
        let b = b.min(len);
        (b, m.clamp(b, len))
    }
}

#[inline]
fn mean_normalized(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: u32 = data.iter().map(|&v| v as u32).sum();
    sum as f32 / data.len() as f32 / BYTE_MAX
}

/// Unsmoothed band means for `data` under `split`.
pub fn raw_bands(data: &[u8], split: BandSplit) -> FrequencyBands {
    let (b, m) = split.bounds(data.len());
    FrequencyBands {
        bass: mean_normalized(&data[..b]),
        mid: mean_normalized(&data[b..m]),
        high: mean_normalized(&data[m..]),
    }
}

#[inline]
pub(crate) fn smooth(prev: f32, raw: f32, factor: f32) -> f32 {
    prev * factor + raw * (1.0 - factor)
}

#[derive(Clone, Debug)]
pub struct BandExtractor {
    split: BandSplit,
    smoothing: f32,
    smoothed: FrequencyBands,
}

impl Default for BandExtractor {
    fn default() -> Self {
        Self::new(BAND_SMOOTHING)
    }
}

impl BandExtractor {
    pub fn new(smoothing: f32) -> Self {
        Self::with_split(BandSplit::default(), smoothing)
    }

    pub fn with_split(split: BandSplit, smoothing: f32) -> Self {
        Self {
            split,
            smoothing: smoothing.clamp(0.0, 0.999),
            smoothed: FrequencyBands::ZERO,
        }
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = smoothing.clamp(0.0, 0.999);
    }

    /// Reduce `data` to smoothed bands.
    ///
    /// An empty buffer yields zero bands and leaves the smoothing state
    /// untouched, so a dropped frame does not drag the display toward silence.
    pub fn extract(&mut self, data: &[u8]) -> FrequencyBands {
        if data.is_empty() {
            return FrequencyBands::ZERO;
        }
        let raw = raw_bands(data, self.split);
        let f = self.smoothing;
        self.smoothed = FrequencyBands {
            bass: smooth(self.smoothed.bass, raw.bass, f),
            mid: smooth(self.smoothed.mid, raw.mid, f),
            high: smooth(self.smoothed.high, raw.high, f),
        };
        self.smoothed
    }

    /// Last value returned by [`extract`](Self::extract).
    pub fn current(&self) -> FrequencyBands {
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.smoothed = FrequencyBands::ZERO;
    }
}
