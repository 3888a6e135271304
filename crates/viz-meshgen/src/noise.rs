//! Cheap positional noise for organic surface detail.
//!
//! This is the classic `fract(sin(dot) * 43758.5453)` hash, not gradient
//! noise. It is deterministic for a given position and seed, which is all the
//! generators need.

use glam::Vec3;
use viz_core::mesh::MeshData;

/// Hash of a position into \[-1, 1\].
pub fn hash_noise(x: f32, y: f32, z: f32, seed: f32) -> f32 {
    // f64 keeps the large multiplier from eating the fractional part.
    let d = x as f64 * 12.9898 + y as f64 * 78.233 + z as f64 * 37.719 + seed as f64;
    let s = d.sin() * 43758.5453;
    ((s - s.floor()) * 2.0 - 1.0) as f32
}

#[inline]
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Trilinear interpolation of [`hash_noise`] on the integer lattice.
pub fn value_noise(p: Vec3, seed: f32) -> f32 {
    let cell = p.floor();
    let f = p - cell;
    let (u, v, w) = (smoothstep(f.x), smoothstep(f.y), smoothstep(f.z));
    let corner = |dx: f32, dy: f32, dz: f32| hash_noise(cell.x + dx, cell.y + dy, cell.z + dz, seed);

    let x00 = corner(0.0, 0.0, 0.0) + (corner(1.0, 0.0, 0.0) - corner(0.0, 0.0, 0.0)) * u;
    let x10 = corner(0.0, 1.0, 0.0) + (corner(1.0, 1.0, 0.0) - corner(0.0, 1.0, 0.0)) * u;
    let x01 = corner(0.0, 0.0, 1.0) + (corner(1.0, 0.0, 1.0) - corner(0.0, 0.0, 1.0)) * u;
    let x11 = corner(0.0, 1.0, 1.0) + (corner(1.0, 1.0, 1.0) - corner(0.0, 1.0, 1.0)) * u;
    let y0 = x00 + (x10 - x00) * v;
    let y1 = x01 + (x11 - x01) * v;
    y0 + (y1 - y0) * w
}

/// Displace every vertex along its normal by `amplitude * noise(p * frequency)`.
///
/// Normals are computed first when the mesh has none, and recomputed after
/// displacement.
pub fn perturb(mesh: &mut MeshData, amplitude: f32, frequency: f32, seed: f32) {
    if mesh.normals.is_none() {
        mesh.compute_normals();
    }
    let Some(normals) = &mesh.normals else {
        return;
    };
    for (p, n) in mesh
        .positions
        .chunks_exact_mut(3)
        .zip(normals.chunks_exact(3))
    {
        let pos = Vec3::new(p[0], p[1], p[2]);
        let d = amplitude * value_noise(pos * frequency, seed);
        p[0] += n[0] * d;
        p[1] += n[1] * d;
        p[2] += n[2] * d;
    }
    mesh.compute_normals();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_bounded_and_repeatable() {
        for i in 0..200 {
            let x = i as f32 * 0.37;
            let v = hash_noise(x, -x, x * 0.5, 3.0);
            assert!((-1.0..=1.0).contains(&v));
            assert_eq!(v, hash_noise(x, -x, x * 0.5, 3.0));
        }
    }

    #[test]
    fn value_noise_matches_lattice_hash() {
        let p = Vec3::new(2.0, -1.0, 5.0);
        assert!((value_noise(p, 1.0) - hash_noise(2.0, -1.0, 5.0, 1.0)).abs() < 1e-6);
    }
}
