use super::LineVertex;
use crate::constants::*;
use glam::Vec3;

/// Proximity lines between a subsample of particles.
///
/// The vertex buffer is allocated once at full capacity; each update writes
/// into it from the start and records how many vertices are live.
#[derive(Clone, Debug)]
pub struct ConnectionSystem {
    sample: Vec<usize>,
    capacity: usize,
    lines: Vec<LineVertex>,
    draw_count: usize,
}

impl ConnectionSystem {
    pub fn new(particle_count: usize, max_connections: usize) -> Self {
        let k = ((max_connections as f32 * 2.0).sqrt() as usize)
            .min(CONNECTION_SAMPLE_CAP)
            .min(particle_count);
        let stride = if k == 0 { 1 } else { particle_count / k };
        Self {
            sample: (0..k).map(|i| i * stride).collect(),
            capacity: max_connections,
            lines: vec![LineVertex::default(); max_connections * 2],
            draw_count: 0,
        }
    }

    pub fn sample(&self) -> &[usize] {
        &self.sample
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn update(&mut self, positions: &[Vec3], colors: &[[f32; 3]], distance: f32, energy: f32) {
        let threshold = distance * (1.0 + energy * CONNECTION_ENERGY_GAIN);
        let mut used = 0usize;
        'outer: for (a, &i) in self.sample.iter().enumerate() {
            for &j in &self.sample[a + 1..] {
                if used == self.capacity {
                    break 'outer;
                }
                let (Some(&pi), Some(&pj)) = (positions.get(i), positions.get(j)) else {
                    continue;
                };
                let d = pi.distance(pj);
                if d < threshold {
                    let alpha = 1.0 - d / threshold;
                    let ci = colors.get(i).copied().unwrap_or([1.0; 3]);
                    let cj = colors.get(j).copied().unwrap_or([1.0; 3]);
                    let c = [
                        (ci[0] + cj[0]) * 0.5,
                        (ci[1] + cj[1]) * 0.5,
                        (ci[2] + cj[2]) * 0.5,
                    ];
                    self.lines[used * 2] = LineVertex::new(pi, c, alpha);
                    self.lines[used * 2 + 1] = LineVertex::new(pj, c, alpha);
                    used += 1;
                }
            }
        }
        self.draw_count = used * 2;
    }

    /// Vertices in the draw range.
    pub fn lines(&self) -> &[LineVertex] {
        &self.lines[..self.draw_count]
    }

    pub fn segment_count(&self) -> usize {
        self.draw_count / 2
    }
}
