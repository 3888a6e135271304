//! One analysis pass per render tick.
//!
//! The pipeline produces a single [`AudioFrame`] that the particle field and
//! the overlay both read, so neither consumer ever sees a partially updated
//! band set.

use crate::analysis::{AdvancedAnalyzer, AdvancedMetrics, AnalyzerConfig};
use crate::bands::{BandExtractor, FrequencyBands};
use crate::stereo::{StereoAnalyzer, StereoMetrics};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AudioFrame {
    pub bands: FrequencyBands,
    pub metrics: AdvancedMetrics,
    pub stereo: StereoMetrics,
}

pub struct AudioPipeline {
    bands: BandExtractor,
    advanced: AdvancedAnalyzer,
    stereo: StereoAnalyzer,
    advanced_enabled: bool,
    last: AudioFrame,
}

impl Default for AudioPipeline {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl AudioPipeline {
    pub fn new(config: AnalyzerConfig) -> Self {
        let mut stereo = StereoAnalyzer::new();
        stereo.set_enabled(false);
        Self {
            bands: BandExtractor::default(),
            advanced: AdvancedAnalyzer::new(config),
            stereo,
            advanced_enabled: true,
            last: AudioFrame::default(),
        }
    }

    pub fn set_advanced_enabled(&mut self, enabled: bool) {
        self.advanced_enabled = enabled;
    }

    pub fn set_stereo_enabled(&mut self, enabled: bool) {
        self.stereo.set_enabled(enabled);
    }

    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.bands.set_smoothing(smoothing);
    }

    pub fn advanced_mut(&mut self) -> &mut AdvancedAnalyzer {
        &mut self.advanced
    }

    /// Run every enabled analyzer over this tick's buffers.
    ///
    /// `mono` feeds the band extractor and the advanced analyzer; the optional
    /// `(left, right)` pair feeds the stereo analyzer.
    pub fn analyze(
        &mut self,
        mono: Option<&[u8]>,
        stereo: Option<(&[u8], &[u8])>,
        now_sec: f64,
    ) -> &AudioFrame {
        let data = mono.unwrap_or(&[]);
        let bands = self.bands.extract(data);
        let metrics = if self.advanced_enabled {
            self.advanced.analyze(data, now_sec)
        } else {
            AdvancedMetrics::default()
        };
        let stereo = match stereo {
            Some((l, r)) => self.stereo.analyze(Some(l), Some(r)),
            None => self.stereo.analyze(None, None),
        };
        self.last = AudioFrame {
            bands,
            metrics,
            stereo,
        };
        &self.last
    }

    pub fn last(&self) -> &AudioFrame {
        &self.last
    }

    /// Clear all smoothing and history, e.g. on track change.
    pub fn reset(&mut self) {
        self.bands.reset();
        self.advanced.reset();
        self.stereo.reset();
        self.last = AudioFrame::default();
    }
}
