use crate::constants::*;

/// Median-threshold onset detector over recent spectral flux.
///
/// The median is computed with an insertion sort into `scratch`, which is
/// owned by the detector so the per-frame path never allocates.
#[derive(Clone, Debug, Default)]
pub struct OnsetDetector {
    history: [f32; ONSET_HISTORY_LEN],
    write: usize,
    filled: usize,
    scratch: [f32; ONSET_HISTORY_LEN],
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OnsetResult {
    pub is_onset: bool,
    pub intensity: f32,
}

impl OnsetDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a flux value, evicting the oldest once the ring is full.
    pub fn push(&mut self, flux: f32) {
        self.history[self.write] = flux;
        self.write = (self.write + 1) % ONSET_HISTORY_LEN;
        self.filled = (self.filled + 1).min(ONSET_HISTORY_LEN);
    }

    /// Median of the stored history, 0 when empty.
    pub fn median(&mut self) -> f32 {
        let n = self.filled;
        if n == 0 {
            return 0.0;
        }
        let start = (self.write + ONSET_HISTORY_LEN - n) % ONSET_HISTORY_LEN;
        for k in 0..n {
            let v = self.history[(start + k) % ONSET_HISTORY_LEN];
            let mut j = k;
            while j > 0 && self.scratch[j - 1] > v {
                self.scratch[j] = self.scratch[j - 1];
                j -= 1;
            }
            self.scratch[j] = v;
        }
        if n % 2 == 1 {
            self.scratch[n / 2]
        } else {
            (self.scratch[n / 2 - 1] + self.scratch[n / 2]) * 0.5
        }
    }

    /// Stored flux values, oldest first.
    pub fn history(&self) -> impl Iterator<Item = f32> + '_ {
        let n = self.filled;
        let start = (self.write + ONSET_HISTORY_LEN - n) % ONSET_HISTORY_LEN;
        (0..n).map(move |k| self.history[(start + k) % ONSET_HISTORY_LEN])
    }

    pub fn process(&mut self, flux: f32, sensitivity: f32) -> OnsetResult {
        let median = self.median();
        let threshold = median * (ONSET_MEDIAN_COEFF / sensitivity.max(0.01)) + ONSET_OFFSET;
        self.push(flux);
        if flux > threshold && flux > ONSET_FLOOR {
            OnsetResult {
                is_onset: true,
                intensity: ((flux - threshold) / threshold).min(1.0),
            }
        } else {
            OnsetResult::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_history_averages_middle_pair() {
        let mut d = OnsetDetector::new();
        for v in [0.4, 0.1, 0.3, 0.2] {
            d.push(v);
        }
        assert!((d.median() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn median_does_not_reorder_history() {
        let mut d = OnsetDetector::new();
        for v in [0.5, 0.1, 0.9] {
            d.push(v);
        }
        assert!((d.median() - 0.5).abs() < 1e-6);
        let h: Vec<f32> = d.history().collect();
        assert_eq!(h, vec![0.5, 0.1, 0.9]);
    }
}
