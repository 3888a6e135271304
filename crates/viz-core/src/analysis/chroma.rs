use crate::constants::*;

/// 12-bin pitch-class histogram normalised against its own maximum.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Chroma {
    pub bins: [f32; 12],
    pub dominant: usize,
}

impl Chroma {
    pub fn dominant_name(&self) -> &'static str {
        NOTE_NAMES[self.dominant % 12]
    }
}

/// Nearest pitch class for `freq_hz` (0 = C, 9 = A).
#[inline]
pub fn pitch_class(freq_hz: f32) -> usize {
    let midi = (12.0 * (freq_hz / 440.0).log2() + 69.0).round() as i32;
    midi.rem_euclid(12) as usize
}

/// Accumulates chroma into a buffer reused across frames.
#[derive(Clone, Debug, Default)]
pub struct ChromaAnalyzer {
    acc: [f32; 12],
}

impl ChromaAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute(&mut self, data: &[u8], hz_per_bin: f32) -> Chroma {
        self.acc = [0.0; 12];
        if hz_per_bin <= 0.0 {
            return Chroma::default();
        }
        let first = (CHROMA_MIN_HZ / hz_per_bin).ceil() as usize;
        let last = ((CHROMA_MAX_HZ / hz_per_bin).floor() as usize).min(data.len().saturating_sub(1));
        for i in first.max(1)..=last {
            let m = data[i];
            if m == 0 {
                continue;
            }
            self.acc[pitch_class(i as f32 * hz_per_bin)] += m as f32 / BYTE_MAX;
        }

        let (dominant, max) = self
            .acc
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0_f32), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        let mut bins = [0.0; 12];
        if max > 0.0 {
            for (b, a) in bins.iter_mut().zip(self.acc.iter()) {
                *b = a / max;
            }
        }
        Chroma { bins, dominant }
    }
}
