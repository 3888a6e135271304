use crate::constants::*;

/// Adaptive-threshold beat detector over a fixed ring of bass energies.
#[derive(Clone, Debug)]
pub struct BeatDetector {
    history: [f32; BEAT_HISTORY_LEN],
    write: usize,
    filled: usize,
    last_beat_sec: Option<f64>,
    bpm: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BeatResult {
    pub is_beat: bool,
    pub intensity: f32,
    pub bpm: f32,
    pub threshold: f32,
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self {
            history: [0.0; BEAT_HISTORY_LEN],
            write: 0,
            filled: 0,
            last_beat_sec: None,
            bpm: BPM_DEFAULT,
        }
    }
}

impl BeatDetector {
    pub fn new() -> Self {
        Self::default()
    }

    fn mean_variance(&self) -> (f32, f32) {
        if self.filled == 0 {
            return (0.0, 0.0);
        }
        let vals = &self.history[..self.filled];
        let n = self.filled as f32;
        let mean = vals.iter().sum::<f32>() / n;
        let var = vals.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
        (mean, var)
    }

    /// Feed this tick's bass energy. Statistics are taken over the history
    /// before the sample is pushed.
    pub fn process(&mut self, bass_energy: f32, sensitivity: f32, now_sec: f64) -> BeatResult {
        let (mean, var) = self.mean_variance();
        let coeff = BEAT_VARIANCE_COEFF / sensitivity.max(0.01);
        let threshold = (mean + coeff * var.sqrt()).max(BEAT_THRESHOLD_FLOOR);

        let cooled = self
            .last_beat_sec
            .map_or(true, |t| now_sec - t >= BEAT_MIN_INTERVAL_SEC);
        let is_beat = bass_energy > threshold && cooled;
        let intensity = if is_beat {
            self.last_beat_sec = Some(now_sec);
            ((bass_energy - threshold) / threshold).min(1.0)
        } else {
            0.0
        };

        self.history[self.write] = bass_energy;
        self.write = (self.write + 1) % BEAT_HISTORY_LEN;
        self.filled = (self.filled + 1).min(BEAT_HISTORY_LEN);
        self.update_bpm();

        BeatResult {
            is_beat,
            intensity,
            bpm: self.bpm,
            threshold,
        }
    }

    // Local maxima above the mean across the ring, extrapolated to a minute.
    fn update_bpm(&mut self) {
        if self.filled < BEAT_HISTORY_LEN {
            return;
        }
        let (mean, _) = self.mean_variance();
        let at = |i: usize| self.history[(self.write + i) % BEAT_HISTORY_LEN];
        let peaks = (1..BEAT_HISTORY_LEN - 1)
            .filter(|&i| {
                let v = at(i);
                v > mean && v > at(i - 1) && v > at(i + 1)
            })
            .count();
        if peaks > 0 {
            let bpm = peaks as f32 * 60.0 / BEAT_HISTORY_SECONDS;
            self.bpm = bpm.clamp(BPM_MIN, BPM_MAX);
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
