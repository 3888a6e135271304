//! Spatial distributions for the particle field.
//!
//! Every distribution fills the same parallel arrays. Which groups get the
//! generic bass/mid/high animation is decided by [`ParticleMotion`]:
//!
//! | shape   | bass            | mid                 | high              |
//! |---------|-----------------|---------------------|-------------------|
//! | sphere  | generic         | generic             | generic           |
//! | spiral  | generic         | generic             | generic           |
//! | quantum | generic         | generic             | generic           |
//! | atom    | generic nucleus | orbit override      | generic cloud     |
//! | dna     | strand override | strand override     | rung override     |
//!
//! The two DNA strands spin in opposite directions; rungs span the two strand
//! angles at their height.

use super::Group;
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_3, FRAC_PI_4, PI, TAU};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionShape {
    #[default]
    Sphere,
    Spiral,
    Atom,
    Quantum,
    Dna,
}

impl DistributionShape {
    pub const ALL: [DistributionShape; 5] = [
        DistributionShape::Sphere,
        DistributionShape::Spiral,
        DistributionShape::Atom,
        DistributionShape::Quantum,
        DistributionShape::Dna,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DistributionShape::Sphere => "sphere",
            DistributionShape::Spiral => "spiral",
            DistributionShape::Atom => "atom",
            DistributionShape::Quantum => "quantum",
            DistributionShape::Dna => "dna",
        }
    }
}

impl FromStr for DistributionShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DistributionShape::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown distribution shape: {s}"))
    }
}

/// Per-particle motion parameters. Generic particles carry a jitter seed;
/// atom orbits and DNA strands carry the parameters their override needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParticleMotion {
    Jitter(Vec3),
    Orbit { radius: f32, tilt: f32, angle: f32 },
    /// `direction` is +1 or -1, the sense the strand spins in.
    Strand {
        radius: f32,
        angle: f32,
        height: f32,
        direction: f32,
    },
    Rung { radius: f32, angle: f32, height: f32, t: f32 },
}

impl ParticleMotion {
    #[inline]
    pub fn seed(&self) -> Vec3 {
        match *self {
            ParticleMotion::Jitter(s) => s,
            _ => Vec3::ZERO,
        }
    }
}

/// Bulk-allocated particle arrays produced by a distribution.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub base: Vec<Vec3>,
    pub motion: Vec<ParticleMotion>,
    pub groups: Vec<Group>,
    pub phases: Vec<f32>,
}

impl Layout {
    fn with_capacity(n: usize) -> Self {
        Self {
            base: Vec::with_capacity(n),
            motion: Vec::with_capacity(n),
            groups: Vec::with_capacity(n),
            phases: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, pos: Vec3, motion: ParticleMotion, group: Group, rng: &mut StdRng) {
        self.base.push(pos);
        self.motion.push(motion);
        self.groups.push(group);
        self.phases.push(rng.gen_range(0.0..TAU));
    }
}

/// Sizes of the bass/mid/high groups for `count` particles.
pub fn group_sizes(count: usize, ratios: [f32; 3]) -> [usize; 3] {
    let bass = ((count as f32 * ratios[0]).round() as usize).min(count);
    let mid = ((count as f32 * ratios[1]).round() as usize).min(count - bass);
    [bass, mid, count - bass - mid]
}

pub fn random_unit(rng: &mut StdRng) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..1.0);
    let t: f32 = rng.gen_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * t.cos(), r * t.sin(), z)
}

fn jitter_seed(rng: &mut StdRng) -> ParticleMotion {
    ParticleMotion::Jitter(Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    ))
}

#[inline]
pub fn orbit_point(radius: f32, tilt: f32, angle: f32) -> Vec3 {
    Quat::from_rotation_x(tilt) * Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
}

#[inline]
pub fn strand_point(radius: f32, angle: f32, height: f32) -> Vec3 {
    Vec3::new(radius * angle.cos(), height, radius * angle.sin())
}

pub fn distribute(
    shape: DistributionShape,
    sizes: [usize; 3],
    expansion: f32,
    dna_turns: f32,
    rng: &mut StdRng,
) -> Layout {
    let total = sizes.iter().sum();
    let mut out = Layout::with_capacity(total);
    match shape {
        DistributionShape::Sphere => sphere(&mut out, sizes, expansion, rng),
        DistributionShape::Spiral => spiral(&mut out, sizes, expansion, rng),
        DistributionShape::Atom => atom(&mut out, sizes, expansion, rng),
        DistributionShape::Quantum => quantum(&mut out, sizes, expansion, rng),
        DistributionShape::Dna => dna(&mut out, sizes, expansion, dna_turns, rng),
    }
    out
}

// Concentric shells; the bass shell is innermost and therefore densest.
const SHELL_RADII: [(f32, f32); 3] = [(1.0, 2.0), (2.6, 3.6), (4.2, 5.5)];

fn sphere(out: &mut Layout, sizes: [usize; 3], exp: f32, rng: &mut StdRng) {
    for (g, &n) in sizes.iter().enumerate() {
        let (r0, r1) = SHELL_RADII[g];
        for _ in 0..n {
            let r = rng.gen_range(r0..r1) * exp;
            let pos = random_unit(rng) * r;
            out.push(pos, jitter_seed(rng), Group::ALL[g], rng);
        }
    }
}

const SPIRAL_ARMS: usize = 4;
const SPIRAL_BANDS: [(f32, f32, f32); 3] = [(0.4, 2.0, 0.15), (2.0, 3.8, 0.3), (3.8, 5.6, 0.5)];

fn spiral(out: &mut Layout, sizes: [usize; 3], exp: f32, rng: &mut StdRng) {
    for (g, &n) in sizes.iter().enumerate() {
        let (r0, r1, thickness) = SPIRAL_BANDS[g];
        for k in 0..n {
            let arm = k % SPIRAL_ARMS;
            let r = rng.gen_range(r0..r1);
            let angle = arm as f32 * TAU / SPIRAL_ARMS as f32
                + (1.0 + r).ln() * 2.5
                + rng.gen_range(-0.25..0.25);
            let y = rng.gen_range(-1.0..1.0) * thickness;
            let pos = Vec3::new(r * angle.cos(), y, r * angle.sin()) * exp;
            out.push(pos, jitter_seed(rng), Group::ALL[g], rng);
        }
    }
}

pub const ATOM_ORBIT_RADII: [f32; 3] = [1.8, 2.6, 3.4];
pub const ATOM_ORBIT_TILTS: [f32; 3] = [0.0, FRAC_PI_3, 2.0 * FRAC_PI_3];

fn atom(out: &mut Layout, sizes: [usize; 3], exp: f32, rng: &mut StdRng) {
    for _ in 0..sizes[0] {
        let r = 0.6 * rng.gen::<f32>().sqrt() * exp;
        out.push(random_unit(rng) * r, jitter_seed(rng), Group::Bass, rng);
    }

    // Regular angular steps on each of the three tilted orbits.
    let per_orbit = sizes[1].div_ceil(3).max(1);
    for k in 0..sizes[1] {
        let orbit = k % 3;
        let step = k / 3;
        let radius = ATOM_ORBIT_RADII[orbit] * exp;
        let tilt = ATOM_ORBIT_TILTS[orbit];
        let angle = step as f32 / per_orbit as f32 * TAU;
        let motion = ParticleMotion::Orbit {
            radius,
            tilt,
            angle,
        };
        out.push(orbit_point(radius, tilt, angle), motion, Group::Mid, rng);
    }

    for _ in 0..sizes[2] {
        let r = rng.gen_range(3.5..5.5) * exp;
        out.push(random_unit(rng) * r, jitter_seed(rng), Group::High, rng);
    }
}

fn quantum(out: &mut Layout, sizes: [usize; 3], exp: f32, rng: &mut StdRng) {
    let mut index = 0usize;
    for (g, &n) in sizes.iter().enumerate() {
        for _ in 0..n {
            let pos = match index % 3 {
                // s: spherical cloud, denser toward the centre
                0 => random_unit(rng) * 1.6 * rng.gen::<f32>().powf(0.75),
                // p: dumbbell along a random cartesian axis
                1 => {
                    let axis = match rng.gen_range(0..3) {
                        0 => Vec3::X,
                        1 => Vec3::Y,
                        _ => Vec3::Z,
                    };
                    let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
                    axis * 1.8 * sign + random_unit(rng) * 0.8 * rng.gen::<f32>().sqrt()
                }
                // d: four lobes in the xz plane
                _ => {
                    let lobe = rng.gen_range(0..4) as f32;
                    let a = FRAC_PI_4 + lobe * PI / 2.0;
                    Vec3::new(a.cos(), 0.0, a.sin()) * 2.4
                        + random_unit(rng) * 0.7 * rng.gen::<f32>().sqrt()
                }
            };
            out.push(pos * exp, jitter_seed(rng), Group::ALL[g], rng);
            index += 1;
        }
    }
}

pub const DNA_RADIUS: f32 = 1.5;
pub const DNA_HALF_HEIGHT: f32 = 4.0;

fn dna(out: &mut Layout, sizes: [usize; 3], exp: f32, turns: f32, rng: &mut StdRng) {
    let radius = DNA_RADIUS * exp;
    let half = DNA_HALF_HEIGHT * exp;
    let turns = turns.max(0.1);
    let angle_at = |h: f32| (h + half) / (2.0 * half) * turns * TAU;

    // Strand A (bass) and strand B (mid), half a turn apart, counter-rotating.
    for (g, offset, direction) in [(0usize, 0.0_f32, 1.0_f32), (1, PI, -1.0)] {
        let n = sizes[g];
        for k in 0..n {
            let h = -half + 2.0 * half * (k as f32 + 0.5) / n.max(1) as f32;
            let angle = angle_at(h) + offset;
            let motion = ParticleMotion::Strand {
                radius,
                angle,
                height: h,
                direction,
            };
            out.push(strand_point(radius, angle, h), motion, Group::ALL[g], rng);
        }
    }

    for _ in 0..sizes[2] {
        let h = rng.gen_range(-half..half);
        let angle = angle_at(h);
        let t: f32 = rng.gen();
        let a = strand_point(radius, angle, h);
        let b = strand_point(radius, angle + PI, h);
        let motion = ParticleMotion::Rung {
            radius,
            angle,
            height: h,
            t,
        };
        out.push(a.lerp(b, t), motion, Group::High, rng);
    }
}
