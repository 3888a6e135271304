//! Spectral features, beat/onset detection and chroma over one magnitude buffer.
//!
//! [`AdvancedAnalyzer`] is deliberately a stateful object: flux, beat, onset
//! and the smoothed features all depend on previous buffers. Each test (and
//! each audio source) should own its own instance and call
//! [`AdvancedAnalyzer::reset`] on track change.

mod beat;
mod chroma;
mod onset;

pub use beat::{BeatDetector, BeatResult};
pub use chroma::{pitch_class, Chroma, ChromaAnalyzer};
pub use onset::{OnsetDetector, OnsetResult};

use crate::bands::{raw_bands, smooth, BandSplit};
use crate::constants::*;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub sample_rate: f32,
    pub fft_size: usize,
    /// Higher values lower the beat and onset thresholds.
    pub sensitivity: f32,
    pub rolloff_fraction: f32,
    pub chroma_enabled: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            fft_size: DEFAULT_FFT_SIZE,
            sensitivity: 1.0,
            rolloff_fraction: DEFAULT_ROLLOFF_FRACTION,
            chroma_enabled: false,
        }
    }
}

impl AnalyzerConfig {
    #[inline]
    pub fn hz_per_bin(&self) -> f32 {
        self.sample_rate / self.fft_size.max(1) as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdvancedMetrics {
    pub spectral_centroid: f32,
    pub spectral_flux: f32,
    pub spectral_rolloff: f32,
    pub zero_crossing_rate: f32,
    pub rms_energy: f32,
    pub is_beat: bool,
    pub beat_intensity: f32,
    pub bpm: f32,
    pub is_onset: bool,
    pub onset_intensity: f32,
    pub chroma: Option<Chroma>,
}

impl Default for AdvancedMetrics {
    fn default() -> Self {
        Self {
            spectral_centroid: 0.0,
            spectral_flux: 0.0,
            spectral_rolloff: 0.0,
            zero_crossing_rate: 0.0,
            rms_energy: 0.0,
            is_beat: false,
            beat_intensity: 0.0,
            bpm: BPM_DEFAULT,
            is_onset: false,
            onset_intensity: 0.0,
            chroma: None,
        }
    }
}

pub struct AdvancedAnalyzer {
    config: AnalyzerConfig,
    centroid: f32,
    flux: f32,
    rms: f32,
    prev_spectrum: Vec<f32>,
    has_prev: bool,
    beat: BeatDetector,
    onset: OnsetDetector,
    chroma: ChromaAnalyzer,
}

impl Default for AdvancedAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl AdvancedAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let bins = config.fft_size / 2;
        Self {
            config,
            centroid: 0.0,
            flux: 0.0,
            rms: 0.0,
            prev_spectrum: vec![0.0; bins],
            has_prev: false,
            beat: BeatDetector::new(),
            onset: OnsetDetector::new(),
            chroma: ChromaAnalyzer::new(),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.config.sensitivity = sensitivity.max(0.01);
    }

    pub fn set_chroma_enabled(&mut self, enabled: bool) {
        self.config.chroma_enabled = enabled;
    }

    /// Analyze one buffer. `now_sec` must come from a monotonic clock.
    pub fn analyze(&mut self, data: &[u8], now_sec: f64) -> AdvancedMetrics {
        if data.is_empty() {
            return AdvancedMetrics {
                bpm: self.beat.bpm(),
                ..AdvancedMetrics::default()
            };
        }
        let hz = self.config.hz_per_bin();

        let raw_centroid = spectral_centroid(data, hz);
        self.centroid = smooth(self.centroid, raw_centroid, CENTROID_SMOOTHING);

        let raw_flux = self.spectral_flux(data);
        self.flux = smooth(self.flux, raw_flux, FLUX_SMOOTHING);

        let raw_rms = rms(data);
        self.rms = smooth(self.rms, raw_rms, RMS_SMOOTHING);

        let rolloff = spectral_rolloff(data, self.config.rolloff_fraction);
        let zcr = high_energy_ratio(data);

        let sensitivity = self.config.sensitivity;
        let bass = raw_bands(data, BandSplit::default()).bass;
        let beat = self.beat.process(bass, sensitivity, now_sec);
        let onset = self.onset.process(raw_flux, sensitivity);

        let chroma = self
            .config
            .chroma_enabled
            .then(|| self.chroma.compute(data, hz));

        AdvancedMetrics {
            spectral_centroid: self.centroid,
            spectral_flux: self.flux,
            spectral_rolloff: rolloff,
            zero_crossing_rate: zcr,
            rms_energy: self.rms,
            is_beat: beat.is_beat,
            beat_intensity: beat.intensity,
            bpm: beat.bpm,
            is_onset: onset.is_onset,
            onset_intensity: onset.intensity,
            chroma,
        }
    }

    // Rising energy only. The first buffer seeds the history and reports 0.
    fn spectral_flux(&mut self, data: &[u8]) -> f32 {
        if self.prev_spectrum.len() != data.len() {
            self.prev_spectrum.resize(data.len(), 0.0);
            self.has_prev = false;
        }
        let mut rise = 0.0;
        for (prev, &m) in self.prev_spectrum.iter_mut().zip(data) {
            let v = m as f32 / BYTE_MAX;
            rise += (v - *prev).max(0.0);
            *prev = v;
        }
        if !self.has_prev {
            self.has_prev = true;
            return 0.0;
        }
        (rise * FLUX_SCALE / data.len() as f32).min(1.0)
    }

    pub fn reset(&mut self) {
        self.centroid = 0.0;
        self.flux = 0.0;
        self.rms = 0.0;
        self.reset_flux_history();
        self.beat.reset();
        self.onset.reset();
    }

    pub fn reset_flux_history(&mut self) {
        self.prev_spectrum.iter_mut().for_each(|v| *v = 0.0);
        self.has_prev = false;
    }

    pub fn reset_beat(&mut self) {
        self.beat.reset();
    }

    pub fn reset_onset(&mut self) {
        self.onset.reset();
    }
}

/// Magnitude-weighted mean frequency, normalised to [`CENTROID_CEILING_HZ`].
pub fn spectral_centroid(data: &[u8], hz_per_bin: f32) -> f32 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (i, &m) in data.iter().enumerate() {
        let m = m as f32;
        weighted += i as f32 * hz_per_bin * m;
        total += m;
    }
    if total <= 0.0 {
        return 0.0;
    }
    (weighted / total / CENTROID_CEILING_HZ).min(1.0)
}

pub fn rms(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sq: f32 = data
        .iter()
        .map(|&m| {
            let v = m as f32 / BYTE_MAX;
            v * v
        })
        .sum();
    (sq / data.len() as f32).sqrt()
}

/// Normalised index below which `fraction` of the total magnitude lies.
pub fn spectral_rolloff(data: &[u8], fraction: f32) -> f32 {
    let total: f32 = data.iter().map(|&m| m as f32).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let target = total * fraction;
    let mut cum = 0.0;
    for (i, &m) in data.iter().enumerate() {
        cum += m as f32;
        if cum >= target {
            return i as f32 / data.len() as f32;
        }
    }
    1.0
}

/// Share of energy in the upper half of the spectrum. Stands in for a
/// zero-crossing rate, which cannot be measured from magnitudes.
pub fn high_energy_ratio(data: &[u8]) -> f32 {
    let total: f32 = data.iter().map(|&m| m as f32).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let upper: f32 = data[data.len() / 2..].iter().map(|&m| m as f32).sum();
    upper / total
}
