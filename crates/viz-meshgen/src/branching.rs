//! Recursive vessel growth.

use crate::primitives::{quadratic_bezier, tube};
use glam::Vec3;
use rand::Rng;
use smallvec::SmallVec;
use viz_core::mesh::MeshData;

/// Branches shorter than this are not grown.
pub const MIN_BRANCH_LENGTH: f32 = 0.03;

#[derive(Clone, Copy, Debug)]
pub struct BranchStyle {
    /// Radius at the root of the branch.
    pub radius: f32,
    /// Maximum angular deviation of child directions, as a tangent offset.
    pub spread: f32,
    pub segments: u32,
    pub steps: u32,
}

impl Default for BranchStyle {
    fn default() -> Self {
        Self {
            radius: 0.008,
            spread: 0.9,
            segments: 6,
            steps: 6,
        }
    }
}

fn random_perpendicular(dir: Vec3, rng: &mut impl Rng) -> Vec3 {
    let a = dir.any_orthonormal_vector();
    let b = dir.cross(a);
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    a * angle.cos() + b * angle.sin()
}

#[inline]
fn bezier_at(p0: Vec3, p1: Vec3, p2: Vec3, t: f32) -> (Vec3, Vec3) {
    let u = 1.0 - t;
    let point = p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t);
    let tangent = (p1 - p0) * (2.0 * u) + (p2 - p1) * (2.0 * t);
    (point, tangent)
}

/// Grow one curved vessel segment from `origin` and recurse into one or two
/// children. Each child is 55-75% as long as its parent, thinner, and bends
/// less. Growth stops at `depth == 0` or below [`MIN_BRANCH_LENGTH`].
pub fn grow_branch(
    origin: Vec3,
    dir: Vec3,
    length: f32,
    depth: u32,
    style: BranchStyle,
    rng: &mut impl Rng,
    out: &mut MeshData,
) {
    let dir = dir.normalize_or_zero();
    if depth == 0 || length < MIN_BRANCH_LENGTH || dir == Vec3::ZERO {
        return;
    }

    let end = origin + dir * length;
    let bend = random_perpendicular(dir, rng) * length * rng.gen_range(0.05..0.25);
    let control = origin + dir * (length * 0.5) + bend;
    let path = quadratic_bezier(origin, control, end, style.steps);
    let radius = style.radius;
    out.merge(&tube(&path, |t| radius * (1.0 - 0.35 * t), style.segments));

    let count = rng.gen_range(1..=2);
    let mut children: SmallVec<[(Vec3, Vec3); 2]> = SmallVec::new();
    for _ in 0..count {
        let t = rng.gen_range(0.4..1.0);
        let (at, tangent) = bezier_at(origin, control, end, t);
        let tangent = tangent.normalize_or_zero();
        let offset = random_perpendicular(tangent, rng) * rng.gen_range(0.2..1.0) * style.spread;
        children.push((at, tangent + offset));
    }

    let child_style = BranchStyle {
        radius: radius * 0.7,
        spread: style.spread * 0.8,
        ..style
    };
    for (at, child_dir) in children {
        let child_length = length * rng.gen_range(0.55..0.75);
        grow_branch(at, child_dir, child_length, depth - 1, child_style, rng, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn depth_zero_and_short_branches_emit_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = MeshData::default();
        grow_branch(Vec3::ZERO, Vec3::Y, 1.0, 0, BranchStyle::default(), &mut rng, &mut out);
        grow_branch(Vec3::ZERO, Vec3::Y, 0.01, 4, BranchStyle::default(), &mut rng, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn single_level_emits_one_tube() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = MeshData::default();
        let style = BranchStyle::default();
        grow_branch(Vec3::ZERO, Vec3::X, 0.5, 1, style, &mut rng, &mut out);
        assert_eq!(
            out.vertex_count(),
            ((style.steps + 1) * (style.segments + 1)) as usize
        );
    }
}
