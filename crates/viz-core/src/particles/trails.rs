use super::LineVertex;
use crate::constants::*;
use glam::Vec3;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailPoint {
    pub position: Vec3,
    pub alpha: f32,
}

/// Position history for an evenly strided subsample of particles.
#[derive(Clone, Debug)]
pub struct TrailSystem {
    tracked: Vec<usize>,
    histories: Vec<VecDeque<TrailPoint>>,
    max_len: usize,
    frame: u32,
    lines: Vec<LineVertex>,
}

impl TrailSystem {
    pub fn new(particle_count: usize, tracked: usize, max_len: usize) -> Self {
        let k = tracked.min(particle_count);
        let stride = if k == 0 { 1 } else { particle_count / k };
        let tracked: Vec<usize> = (0..k).map(|i| i * stride).collect();
        let max_len = max_len.max(2);
        let segments = tracked.len() * (max_len - 1);
        Self {
            histories: vec![VecDeque::with_capacity(max_len + 1); tracked.len()],
            tracked,
            max_len,
            frame: 0,
            lines: Vec::with_capacity(segments * 2),
        }
    }

    pub fn tracked(&self) -> &[usize] {
        &self.tracked
    }

    /// History for the n-th tracked particle, newest first.
    pub fn history(&self, n: usize) -> Option<&VecDeque<TrailPoint>> {
        self.histories.get(n)
    }

    /// Call once per frame. History is only advanced every
    /// [`TRAIL_UPDATE_INTERVAL`] frames.
    pub fn update(&mut self, positions: &[Vec3], colors: &[[f32; 3]]) {
        self.frame = self.frame.wrapping_add(1);
        if self.frame % TRAIL_UPDATE_INTERVAL != 0 {
            return;
        }
        for (hist, &idx) in self.histories.iter_mut().zip(&self.tracked) {
            let Some(&pos) = positions.get(idx) else {
                continue;
            };
            for p in hist.iter_mut() {
                p.alpha *= TRAIL_ALPHA_DECAY;
            }
            hist.push_front(TrailPoint {
                position: pos,
                alpha: 1.0,
            });
            while hist
                .back()
                .is_some_and(|p| p.alpha < TRAIL_ALPHA_FLOOR)
            {
                hist.pop_back();
            }
            hist.truncate(self.max_len);
        }
        self.rebuild_lines(colors);
    }

    fn rebuild_lines(&mut self, colors: &[[f32; 3]]) {
        self.lines.clear();
        for (hist, &idx) in self.histories.iter().zip(&self.tracked) {
            let c = colors.get(idx).copied().unwrap_or([1.0; 3]);
            for (a, b) in hist.iter().zip(hist.iter().skip(1)) {
                if a.position.distance_squared(b.position) < TRAIL_MIN_SEGMENT * TRAIL_MIN_SEGMENT {
                    continue;
                }
                self.lines.push(LineVertex::new(a.position, c, a.alpha));
                self.lines.push(LineVertex::new(b.position, c, b.alpha));
            }
        }
    }

    /// Line-list vertices (two per segment).
    pub fn lines(&self) -> &[LineVertex] {
        &self.lines
    }

    pub fn segment_count(&self) -> usize {
        self.lines.len() / 2
    }

    pub fn clear(&mut self) {
        self.histories.iter_mut().for_each(VecDeque::clear);
        self.lines.clear();
        self.frame = 0;
    }
}
