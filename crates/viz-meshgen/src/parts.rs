//! Anatomical parts of the overlay figure, one builder per layer.
//!
//! The figure is modelled in metres, Y up, facing +Z. Both poses share the
//! same skeleton apart from the shoulder abduction angle, and every part of a
//! pose is shifted by the same offset so the feet rest on `y = 0` with the
//! body centred over the origin.

use crate::branching::{grow_branch, BranchStyle};
use crate::noise::perturb;
use crate::primitives::{capsule, ellipsoid, quadratic_bezier, tube, uv_sphere};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use viz_core::mesh::MeshData;
use viz_core::overlay::{Layer, Pose};

/// Arm abduction from the vertical in the open pose, in degrees.
pub const OPEN_SHOULDER_DEG: f32 = 80.0;
/// Arm abduction from the vertical in the closed pose, in degrees.
pub const CLOSED_SHOULDER_DEG: f32 = 10.0;

/// Branching depth of each vessel tree.
const VEIN_DEPTH: u32 = 4;

/// Detail multipliers tried in order until a part fits its budget.
const DETAIL_LEVELS: [f32; 6] = [1.0, 0.8, 0.6, 0.45, 0.33, 0.25];

/// Triangle budget of a part in one pose file.
pub fn triangle_budget(layer: Layer) -> usize {
    match layer {
        Layer::Body => 20_000,
        Layer::Veins => 30_000,
        Layer::Brain => 15_000,
        Layer::Heart => 10_000,
    }
}

pub fn shoulder_angle(pose: Pose) -> f32 {
    match pose {
        Pose::Open => OPEN_SHOULDER_DEG,
        Pose::Closed => CLOSED_SHOULDER_DEG,
    }
}

/// Display colour of a part's material.
pub fn base_color(layer: Layer) -> [f32; 4] {
    match layer {
        Layer::Body => [0.82, 0.86, 0.92, 1.0],
        Layer::Veins => [0.78, 0.12, 0.18, 1.0],
        Layer::Brain => [0.92, 0.72, 0.76, 1.0],
        Layer::Heart => [0.86, 0.1, 0.12, 1.0],
    }
}

/// Joint positions of one side of the figure.
#[derive(Clone, Copy, Debug)]
struct Limbs {
    shoulder: Vec3,
    elbow: Vec3,
    wrist: Vec3,
    hip: Vec3,
    knee: Vec3,
    ankle: Vec3,
}

#[derive(Clone, Copy, Debug)]
pub struct Skeleton {
    head: Vec3,
    neck_base: Vec3,
    chest: Vec3,
    pelvis: Vec3,
    sides: [Limbs; 2],
}

impl Skeleton {
    pub fn new(pose: Pose) -> Self {
        let angle = shoulder_angle(pose).to_radians();
        let side = |sign: f32| {
            let shoulder = Vec3::new(0.2 * sign, 1.42, 0.0);
            let arm = Vec3::new(angle.sin() * sign, -angle.cos(), 0.0);
            let elbow = shoulder + arm * 0.3;
            let hip = Vec3::new(0.09 * sign, 0.92, 0.0);
            let knee = Vec3::new(0.1 * sign, 0.5, 0.0);
            Limbs {
                shoulder,
                elbow,
                wrist: elbow + arm * 0.26,
                hip,
                knee,
                ankle: Vec3::new(0.1 * sign, 0.08, 0.0),
            }
        };
        Self {
            head: Vec3::new(0.0, 1.63, 0.0),
            neck_base: Vec3::new(0.0, 1.45, 0.0),
            chest: Vec3::new(0.0, 1.25, 0.0),
            pelvis: Vec3::new(0.0, 0.95, 0.0),
            sides: [side(1.0), side(-1.0)],
        }
    }

    pub fn wrist(&self, side: usize) -> Vec3 {
        self.sides[side].wrist
    }
}

#[inline]
fn scaled(n: u32, detail: f32) -> u32 {
    ((n as f32 * detail).round() as u32).max(4)
}

fn body(sk: &Skeleton, detail: f32) -> MeshData {
    let (seg, rings) = (scaled(32, detail), scaled(20, detail));
    let (limb_seg, limb_rings) = (scaled(20, detail), scaled(10, detail));
    let mut parts = vec![
        ellipsoid(sk.head, Vec3::new(0.09, 0.115, 0.1), seg, rings),
        capsule(sk.neck_base, sk.head - Vec3::Y * 0.08, 0.045, limb_seg, limb_rings),
        ellipsoid(sk.chest - Vec3::Y * 0.03, Vec3::new(0.17, 0.27, 0.11), seg, rings),
        ellipsoid(sk.pelvis, Vec3::new(0.16, 0.1, 0.1), seg, rings),
    ];
    for l in &sk.sides {
        parts.push(capsule(l.shoulder, l.elbow, 0.04, limb_seg, limb_rings));
        parts.push(capsule(l.elbow, l.wrist, 0.033, limb_seg, limb_rings));
        let hand = l.wrist + (l.wrist - l.elbow).normalize_or_zero() * 0.07;
        parts.push(uv_sphere(hand, 0.045, limb_seg, limb_rings));
        parts.push(capsule(l.hip, l.knee, 0.065, limb_seg, limb_rings));
        parts.push(capsule(l.knee, l.ankle, 0.05, limb_seg, limb_rings));
        parts.push(ellipsoid(
            l.ankle + Vec3::new(0.0, -0.04, 0.05),
            Vec3::new(0.045, 0.035, 0.11),
            limb_seg,
            limb_rings,
        ));
    }
    MeshData::merged(&parts)
}

fn veins(sk: &Skeleton, detail: f32, seed: u64) -> MeshData {
    let mut rng = StdRng::seed_from_u64(seed);
    let style = BranchStyle {
        segments: scaled(8, detail),
        steps: scaled(8, detail),
        ..BranchStyle::default()
    };
    let mut out = MeshData::default();

    // Central trunk: aortic column from the neck down to the pelvis.
    let trunk = quadratic_bezier(
        sk.neck_base,
        sk.chest + Vec3::new(0.02, 0.0, 0.04),
        sk.pelvis,
        scaled(12, detail),
    );
    out.merge(&tube(&trunk, |t| 0.014 * (1.0 - 0.3 * t), style.segments));

    let thick = BranchStyle {
        radius: 0.01,
        ..style
    };
    grow_branch(sk.neck_base, Vec3::Y, 0.22, VEIN_DEPTH, style, &mut rng, &mut out);
    for l in &sk.sides {
        grow_branch(l.shoulder, l.elbow - l.shoulder, 0.3, VEIN_DEPTH, thick, &mut rng, &mut out);
        grow_branch(l.elbow, l.wrist - l.elbow, 0.26, VEIN_DEPTH, style, &mut rng, &mut out);
        grow_branch(l.hip, l.knee - l.hip, 0.42, VEIN_DEPTH, thick, &mut rng, &mut out);
        grow_branch(l.knee, l.ankle - l.knee, 0.4, VEIN_DEPTH, style, &mut rng, &mut out);
        let flank = Vec3::new(l.shoulder.x.signum(), -0.4, 0.2);
        grow_branch(sk.chest, flank, 0.18, VEIN_DEPTH, style, &mut rng, &mut out);
    }
    out
}

fn brain(sk: &Skeleton, detail: f32, seed: u64) -> MeshData {
    let (seg, rings) = (scaled(48, detail), scaled(32, detail));
    let centre = sk.head + Vec3::new(0.0, 0.03, -0.005);
    let mut parts = Vec::with_capacity(3);
    for sign in [1.0, -1.0] {
        let mut hemi = ellipsoid(
            centre + Vec3::X * (0.034 * sign),
            Vec3::new(0.042, 0.055, 0.078),
            seg,
            rings,
        );
        perturb(&mut hemi, 0.005, 55.0, seed as f32 + sign);
        parts.push(hemi);
    }
    let mut cerebellum = ellipsoid(
        centre + Vec3::new(0.0, -0.05, -0.05),
        Vec3::new(0.05, 0.028, 0.035),
        scaled(32, detail),
        scaled(16, detail),
    );
    perturb(&mut cerebellum, 0.002, 90.0, seed as f32 + 7.0);
    parts.push(cerebellum);
    MeshData::merged(&parts)
}

fn heart(sk: &Skeleton, detail: f32, seed: u64) -> MeshData {
    let (seg, rings) = (scaled(32, detail), scaled(20, detail));
    let centre = sk.chest + Vec3::new(0.025, 0.02, 0.04);
    let mut chambers = MeshData::merged(&[
        ellipsoid(centre + Vec3::new(0.015, -0.02, 0.0), Vec3::new(0.045, 0.06, 0.04), seg, rings),
        ellipsoid(centre + Vec3::new(-0.022, -0.01, 0.006), Vec3::new(0.038, 0.05, 0.034), seg, rings),
        uv_sphere(centre + Vec3::new(0.02, 0.035, -0.01), 0.024, scaled(20, detail), scaled(12, detail)),
        uv_sphere(centre + Vec3::new(-0.02, 0.035, -0.008), 0.022, scaled(20, detail), scaled(12, detail)),
    ]);
    perturb(&mut chambers, 0.0015, 70.0, seed as f32);

    let arch = quadratic_bezier(
        centre + Vec3::new(0.0, 0.04, 0.0),
        centre + Vec3::new(-0.01, 0.13, 0.0),
        centre + Vec3::new(-0.035, 0.05, -0.035),
        scaled(16, detail),
    );
    chambers.merge(&tube(&arch, |_| 0.012, scaled(12, detail)));
    chambers
}

/// Generate a part at a given detail level.
pub fn build(layer: Layer, pose: Pose, detail: f32, seed: u64) -> MeshData {
    let sk = Skeleton::new(pose);
    let seed = seed.wrapping_add(layer.index() as u64 * 1013);
    match layer {
        Layer::Body => body(&sk, detail),
        Layer::Veins => veins(&sk, detail, seed),
        Layer::Brain => brain(&sk, detail, seed),
        Layer::Heart => heart(&sk, detail, seed),
    }
}

/// Simple stand-in used when a part cannot be generated.
pub fn placeholder(layer: Layer) -> MeshData {
    match layer {
        Layer::Body => ellipsoid(Vec3::ZERO, Vec3::new(0.3, 0.8, 0.25), 32, 16),
        Layer::Heart => uv_sphere(Vec3::new(0.0, 0.5, 0.0), 0.1, 16, 8),
        Layer::Brain => uv_sphere(Vec3::new(0.0, 0.9, 0.0), 0.15, 24, 12),
        Layer::Veins => capsule(Vec3::new(0.0, -0.5, 0.0), Vec3::new(0.0, 0.5, 0.0), 0.01, 8, 2),
    }
}

/// Translation that puts the lowest point of `mesh` on `y = 0` and centres it
/// in X and Z.
pub fn floor_offset(mesh: &MeshData) -> Vec3 {
    match mesh.bounds() {
        Some((lo, hi)) => Vec3::new(-(lo.x + hi.x) * 0.5, -lo.y, -(lo.z + hi.z) * 0.5),
        None => Vec3::ZERO,
    }
}

#[derive(Clone, Debug)]
pub struct GeneratedPart {
    pub layer: Layer,
    pub mesh: MeshData,
    pub detail: f32,
    pub placeholder: bool,
}

impl GeneratedPart {
    pub fn budget(&self) -> usize {
        triangle_budget(self.layer)
    }

    pub fn within_budget(&self) -> bool {
        self.mesh.triangle_count() <= self.budget()
    }
}

/// Build `layer` at the highest detail level that fits its budget, falling
/// back to the placeholder when nothing valid comes out.
pub fn generate_part(layer: Layer, pose: Pose, seed: u64) -> GeneratedPart {
    let budget = triangle_budget(layer);
    let mut chosen = None;
    for detail in DETAIL_LEVELS {
        let mesh = build(layer, pose, detail, seed);
        if mesh.is_empty() {
            break;
        }
        let fits = mesh.triangle_count() <= budget;
        log::debug!(
            "[meshgen] {}/{} detail {:.2}: {} triangles",
            pose,
            layer,
            detail,
            mesh.triangle_count()
        );
        chosen = Some((mesh, detail));
        if fits {
            break;
        }
    }

    match chosen {
        Some((mesh, detail)) if mesh.validate().is_ok() => GeneratedPart {
            layer,
            mesh,
            detail,
            placeholder: false,
        },
        _ => {
            log::warn!("[meshgen] {}/{}: using placeholder geometry", pose, layer);
            GeneratedPart {
                layer,
                mesh: placeholder(layer),
                detail: 1.0,
                placeholder: true,
            }
        }
    }
}

/// All requested parts of one pose, shifted onto the floor together.
///
/// The offset always comes from the body so separately generated parts line
/// up.
pub fn generate_pose(pose: Pose, layers: &[Layer], seed: u64) -> Vec<GeneratedPart> {
    let mut parts: Vec<GeneratedPart> = layers
        .iter()
        .map(|&layer| generate_part(layer, pose, seed))
        .collect();
    let reference = match parts.iter().find(|p| p.layer == Layer::Body) {
        Some(p) => floor_offset(&p.mesh),
        None => floor_offset(&generate_part(Layer::Body, pose, seed).mesh),
    };
    for p in &mut parts {
        p.mesh.translate(reference);
    }
    parts
}
