//! Audio-reactive particle field.
//!
//! Particles are index-addressed parallel arrays. Positions are recomputed
//! every frame as `base + offset`, where the offset depends on the particle's
//! group and on the overrides listed in [`shapes`]. The field-wide rotation is
//! reported separately through [`ParticleField::rotation`] so the host can
//! apply it to the container transform.

mod connections;
pub mod shapes;
mod trails;

pub use connections::ConnectionSystem;
pub use shapes::{DistributionShape, ParticleMotion};
pub use trails::{TrailPoint, TrailSystem};

use crate::bands::FrequencyBands;
use crate::constants::*;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use shapes::{group_sizes, orbit_point, strand_point};
use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Group {
    Bass,
    Mid,
    High,
}

impl Group {
    pub const ALL: [Group; 3] = [Group::Bass, Group::Mid, Group::High];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn band(self, bands: &FrequencyBands) -> f32 {
        match self {
            Group::Bass => bands.bass,
            Group::Mid => bands.mid,
            Group::High => bands.high,
        }
    }
}

/// Vertex of a line-list buffer handed to the host renderer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl LineVertex {
    #[inline]
    pub fn new(position: Vec3, rgb: [f32; 3], alpha: f32) -> Self {
        Self {
            position: position.to_array(),
            color: [rgb[0], rgb[1], rgb[2], alpha],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrailSettings {
    pub enabled: bool,
    pub length: usize,
    pub tracked: usize,
}

impl Default for TrailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            length: 12,
            tracked: TRAIL_TRACKED_DEFAULT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub enabled: bool,
    pub max_connections: usize,
    pub distance: f32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_connections: 2000,
            distance: 1.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub count: usize,
    pub shape: DistributionShape,
    pub expansion: f32,
    pub animation_speed: f32,
    pub base_size: f32,
    pub reactive_size: bool,
    pub rotation_speed: f32,
    pub dna_turns: f32,
    /// Bass, mid and high colours.
    pub group_colors: [[f32; 3]; 3],
    pub seed: u64,
    pub trails: TrailSettings,
    pub connections: ConnectionSettings,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            count: DEFAULT_PARTICLES,
            shape: DistributionShape::Sphere,
            expansion: 1.0,
            animation_speed: 1.0,
            base_size: 0.05,
            reactive_size: true,
            rotation_speed: 0.1,
            dna_turns: 3.0,
            group_colors: [
                [0.9, 0.3, 0.3], // red-ish
                [0.3, 0.9, 0.4], // green-ish
                [0.3, 0.5, 0.9], // blue-ish
            ],
            seed: 42,
            trails: TrailSettings::default(),
            connections: ConnectionSettings::default(),
        }
    }
}

impl ParticleSettings {
    /// Clamp host-supplied values into the ranges the layouts accept.
    /// `f32::max`/`min` also map NaN onto the bounds.
    fn sanitized(mut self) -> Self {
        self.count = self.count.clamp(MIN_PARTICLES, MAX_PARTICLES);
        self.expansion = self.expansion.max(MIN_EXPANSION).min(MAX_EXPANSION);
        self.dna_turns = self.dna_turns.max(MIN_DNA_TURNS).min(MAX_DNA_TURNS);
        self
    }

    fn layout_differs(&self, other: &ParticleSettings) -> bool {
        self.count != other.count
            || self.shape != other.shape
            || self.expansion != other.expansion
            || self.dna_turns != other.dna_turns
            || self.seed != other.seed
    }
}

pub struct ParticleField {
    settings: ParticleSettings,
    time: f32,
    rotation: f32,
    point_size: f32,

    base: Vec<Vec3>,
    motion: Vec<ParticleMotion>,
    groups: Vec<Group>,
    phases: Vec<f32>,
    positions: Vec<Vec3>,
    colors: Vec<[f32; 3]>,
    group_counts: [usize; 3],

    rng: StdRng,
    trails: Option<TrailSystem>,
    connections: Option<ConnectionSystem>,
}

impl Default for ParticleField {
    fn default() -> Self {
        Self::new(ParticleSettings::default())
    }
}

impl ParticleField {
    pub fn new(settings: ParticleSettings) -> Self {
        let settings = settings.sanitized();
        let mut field = Self {
            rng: StdRng::seed_from_u64(settings.seed ^ 0x9E37_79B9_7F4A_7C15),
            point_size: settings.base_size,
            settings,
            time: 0.0,
            rotation: 0.0,
            base: Vec::new(),
            motion: Vec::new(),
            groups: Vec::new(),
            phases: Vec::new(),
            positions: Vec::new(),
            colors: Vec::new(),
            group_counts: [0; 3],
            trails: None,
            connections: None,
        };
        field.rebuild();
        field
    }

    /// Repopulate base positions for `shape`. All arrays and dependent
    /// systems are replaced; nothing migrates from the previous shape.
    pub fn initialize(&mut self, shape: DistributionShape, expansion: f32) {
        self.settings.shape = shape;
        self.settings.expansion = expansion.max(MIN_EXPANSION).min(MAX_EXPANSION);
        self.rebuild();
    }

    pub fn set_particle_count(&mut self, count: usize) {
        let count = count.clamp(MIN_PARTICLES, MAX_PARTICLES);
        if count != self.settings.count {
            self.settings.count = count;
            self.rebuild();
        }
    }

    pub fn update_settings(&mut self, settings: ParticleSettings) {
        let settings = settings.sanitized();
        let relayout = settings.layout_differs(&self.settings);
        let trails_changed = settings.trails != self.settings.trails;
        let connections_changed = settings.connections != self.settings.connections;
        self.settings = settings;
        if relayout {
            self.rebuild();
        } else {
            if trails_changed {
                self.rebuild_trails();
            }
            if connections_changed {
                self.rebuild_connections();
            }
        }
    }

    fn rebuild(&mut self) {
        let s = &self.settings;
        let sizes = group_sizes(s.count, GROUP_RATIOS);
        let mut layout_rng = StdRng::seed_from_u64(s.seed);
        let layout = shapes::distribute(s.shape, sizes, s.expansion, s.dna_turns, &mut layout_rng);
        self.group_counts = sizes;
        self.positions = layout.base.clone();
        self.colors = layout
            .groups
            .iter()
            .map(|g| self.settings.group_colors[g.index()])
            .collect();
        self.base = layout.base;
        self.motion = layout.motion;
        self.groups = layout.groups;
        self.phases = layout.phases;
        self.time = 0.0;
        self.rebuild_trails();
        self.rebuild_connections();
        log::debug!(
            "particle field rebuilt: shape={} count={} groups={:?}",
            self.settings.shape.name(),
            self.base.len(),
            self.group_counts
        );
    }

    fn rebuild_trails(&mut self) {
        let t = &self.settings.trails;
        self.trails = t
            .enabled
            .then(|| TrailSystem::new(self.base.len(), t.tracked, t.length));
    }

    fn rebuild_connections(&mut self) {
        let c = &self.settings.connections;
        self.connections = c
            .enabled
            .then(|| ConnectionSystem::new(self.base.len(), c.max_connections));
    }

    /// Advance one frame.
    pub fn update(&mut self, bands: &FrequencyBands) {
        let dt = TIME_STEP * self.settings.animation_speed;
        self.time += dt;
        self.rotation += self.settings.rotation_speed * (1.0 + bands.mid * ROTATION_MID_GAIN) * dt;

        let t = self.time;
        for i in 0..self.base.len() {
            let base = self.base[i];
            let phase = self.phases[i];
            let offset = match self.motion[i] {
                ParticleMotion::Orbit {
                    radius,
                    tilt,
                    angle,
                } => orbit_offset(base, radius, tilt, angle, phase, t, bands),
                ParticleMotion::Strand {
                    radius,
                    angle,
                    height,
                    direction,
                } => {
                    let angle = angle + direction * helix_spin(t, bands);
                    strand_offset(base, radius, angle, height, phase, t, bands)
                }
                ParticleMotion::Rung {
                    radius,
                    angle,
                    height,
                    t: along,
                } => rung_offset(base, radius, angle, height, along, phase, t, bands),
                ParticleMotion::Jitter(seed) => match self.groups[i] {
                    Group::Bass => bass_offset(base, phase, t, bands.bass),
                    Group::Mid => mid_offset(base, seed, phase, t, bands.mid),
                    Group::High => {
                        let twinkle = if bands.high > 0.0
                            && self.rng.gen::<f32>() < bands.high * TWINKLE_PROBABILITY
                        {
                            TWINKLE_BOOST
                        } else {
                            1.0
                        };
                        high_offset(seed, phase, t, bands.high) * twinkle
                    }
                },
            };
            self.positions[i] = base + offset;
        }

        let brightness = Group::ALL.map(|g| BRIGHTNESS_BASE + g.band(bands) * BRIGHTNESS_SPAN);
        for (c, g) in self.colors.iter_mut().zip(&self.groups) {
            let base = self.settings.group_colors[g.index()];
            let b = brightness[g.index()];
            *c = base.map(|v| (v * b).min(1.0));
        }

        self.point_size = if self.settings.reactive_size {
            self.settings.base_size * (1.0 + bands.energy() * SIZE_ENERGY_BONUS)
        } else {
            self.settings.base_size
        };

        if let Some(trails) = &mut self.trails {
            trails.update(&self.positions, &self.colors);
        }
        if let Some(conn) = &mut self.connections {
            conn.update(
                &self.positions,
                &self.colors,
                self.settings.connections.distance,
                bands.energy(),
            );
        }
    }

    pub fn settings(&self) -> &ParticleSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Rotation about Y (radians) for the host container.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn base_positions(&self) -> &[Vec3] {
        &self.base
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Positions as a flat `x, y, z` slice for upload.
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    pub fn colors_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn motion(&self) -> &[ParticleMotion] {
        &self.motion
    }

    pub fn group_counts(&self) -> [usize; 3] {
        self.group_counts
    }

    /// Current displacement of particle `i` from its base position.
    pub fn offset(&self, i: usize) -> Option<Vec3> {
        Some(*self.positions.get(i)? - *self.base.get(i)?)
    }

    pub fn trails(&self) -> Option<&TrailSystem> {
        self.trails.as_ref()
    }

    pub fn connections(&self) -> Option<&ConnectionSystem> {
        self.connections.as_ref()
    }

    pub fn trail_lines(&self) -> &[LineVertex] {
        self.trails.as_ref().map_or(&[], |t| t.lines())
    }

    pub fn connection_lines(&self) -> &[LineVertex] {
        self.connections.as_ref().map_or(&[], |c| c.lines())
    }
}

#[inline]
fn radial_and_tangent(base: Vec3) -> (Vec3, Vec3) {
    let dir = base.normalize_or_zero();
    let tangent = Vec3::Y.cross(dir);
    let tangent = if tangent.length_squared() < 1e-6 {
        Vec3::X
    } else {
        tangent.normalize()
    };
    (dir, tangent)
}

fn bass_offset(base: Vec3, phase: f32, t: f32, bass: f32) -> Vec3 {
    let (dir, _) = radial_and_tangent(base);
    let pulse = bass * BASS_PULSE_AMPLITUDE * (t * BASS_PULSE_FREQUENCY + phase).sin();
    let wave = bass
        * BASS_WAVE_AMPLITUDE
        * (base.length() * BASS_WAVE_NUMBER - t * BASS_WAVE_SPEED).sin();
    dir * (pulse + wave)
}

fn mid_offset(base: Vec3, seed: Vec3, phase: f32, t: f32, mid: f32) -> Vec3 {
    let (dir, tangent) = radial_and_tangent(base);
    let swirl = mid
        * MID_SWIRL_AMPLITUDE
        * (0.5 + seed.x.abs())
        * (t * MID_SWIRL_FREQUENCY + phase).sin();
    let breath = mid * MID_BREATH_AMPLITUDE * (t * 0.8 + phase).sin();
    tangent * swirl + dir * breath
}

fn high_offset(seed: Vec3, phase: f32, t: f32, high: f32) -> Vec3 {
    let sparkle = (t * HIGH_SPARKLE_FREQUENCY + phase * 3.0).sin();
    seed * high * HIGH_SPARKLE_AMPLITUDE * sparkle
}

// Orbiting electrons: angle advances faster with mid energy, radius breathes.
fn orbit_offset(
    base: Vec3,
    radius: f32,
    tilt: f32,
    angle: f32,
    phase: f32,
    t: f32,
    bands: &FrequencyBands,
) -> Vec3 {
    let speed = (0.8 + bands.mid * 2.0) * 2.0 / radius.max(0.5);
    let r = radius * (1.0 + bands.mid * 0.15 * (t * 2.0 + phase).sin());
    orbit_point(r, tilt, angle + t * speed) - base
}

fn helix_spin(t: f32, bands: &FrequencyBands) -> f32 {
    t * 0.5 * (1.0 + bands.mid)
}

fn helix_wave(height: f32, t: f32, bands: &FrequencyBands) -> f32 {
    (height * 1.2 + t * 2.0).sin() * 0.2 * (0.2 + bands.bass)
}

fn strand_offset(
    base: Vec3,
    radius: f32,
    angle: f32,
    height: f32,
    phase: f32,
    t: f32,
    bands: &FrequencyBands,
) -> Vec3 {
    let r = radius * (1.0 + bands.bass * 0.3 * (t * 3.0 + phase).sin());
    let y = height + helix_wave(height, t, bands);
    strand_point(r, angle, y) - base
}

#[allow(clippy::too_many_arguments)]
fn rung_offset(
    base: Vec3,
    radius: f32,
    angle: f32,
    height: f32,
    along: f32,
    phase: f32,
    t: f32,
    bands: &FrequencyBands,
) -> Vec3 {
    let spin = helix_spin(t, bands);
    let y = height + helix_wave(height, t, bands);
    let a = strand_point(radius, angle + spin, y);
    let b = strand_point(radius, angle + PI - spin, y);
    let p = a.lerp(b, along);
    let shimmer = Vec3::Y * bands.high * 0.1 * (t * 9.0 + phase).sin();
    p + shimmer - base
}
