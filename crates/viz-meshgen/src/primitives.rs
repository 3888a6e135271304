//! Closed and tubular primitives with analytic normals.
//!
//! Every primitive is an indexed quad grid wrapped around an axis. Rings that
//! collapse to a pole only emit the triangles that are not degenerate.

use glam::{Quat, Vec3};
use std::f32::consts::{PI, TAU};
use viz_core::mesh::MeshData;

fn grid(
    rows: u32,
    segments: u32,
    pole_top: bool,
    pole_bottom: bool,
    mut vertex: impl FnMut(u32, f32) -> (Vec3, Vec3),
) -> MeshData {
    let cols = segments + 1;
    let mut positions = Vec::with_capacity(((rows + 1) * cols * 3) as usize);
    let mut normals = Vec::with_capacity(positions.capacity());
    for r in 0..=rows {
        for s in 0..=segments {
            let phi = TAU * s as f32 / segments as f32;
            let (p, n) = vertex(r, phi);
            positions.extend_from_slice(&p.to_array());
            normals.extend_from_slice(&n.to_array());
        }
    }

    let mut indices = Vec::with_capacity((rows * segments * 6) as usize);
    for r in 0..rows {
        for s in 0..segments {
            let a = r * cols + s;
            let b = a + cols;
            if !(pole_top && r == 0) {
                indices.extend_from_slice(&[a, a + 1, b]);
            }
            if !(pole_bottom && r == rows - 1) {
                indices.extend_from_slice(&[a + 1, b + 1, b]);
            }
        }
    }
    MeshData::new(positions, Some(normals), Some(indices))
}

/// Axis-aligned ellipsoid with `segments` around Y and `rings` from pole to pole.
pub fn ellipsoid(center: Vec3, radii: Vec3, segments: u32, rings: u32) -> MeshData {
    let (segments, rings) = (segments.max(3), rings.max(2));
    grid(rings, segments, true, true, |r, phi| {
        let theta = PI * r as f32 / rings as f32;
        let unit = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
        let normal = (unit / radii).normalize_or_zero();
        (center + unit * radii, normal)
    })
}

pub fn uv_sphere(center: Vec3, radius: f32, segments: u32, rings: u32) -> MeshData {
    ellipsoid(center, Vec3::splat(radius), segments, rings)
}

/// Cylinder with hemispherical caps between `a` and `b`.
pub fn capsule(a: Vec3, b: Vec3, radius: f32, segments: u32, rings: u32) -> MeshData {
    let segments = segments.max(3);
    let half = (rings.max(2) / 2).max(1);
    let axis = (b - a).normalize_or_zero();
    let rot = if axis == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::Y, axis)
    };
    let mid = (a + b) * 0.5;
    let half_len = (b - a).length() * 0.5;

    // Rows 0..=half walk the top cap down to the equator at +half_len, then
    // the equator repeats at -half_len and the bottom cap follows.
    let rows = half * 2 + 1;
    grid(rows, segments, true, true, |r, phi| {
        let (theta, offset) = if r <= half {
            (PI * 0.5 * r as f32 / half as f32, half_len)
        } else {
            (PI * 0.5 + PI * 0.5 * (r - half - 1) as f32 / half as f32, -half_len)
        };
        let unit = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
        let local = unit * radius + Vec3::Y * offset;
        (mid + rot * local, rot * unit)
    })
}

/// Points on the quadratic Bezier `p0 -> p1 -> p2`, `steps + 1` of them.
pub fn quadratic_bezier(p0: Vec3, p1: Vec3, p2: Vec3, steps: u32) -> Vec<Vec3> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            let u = 1.0 - t;
            p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t)
        })
        .collect()
}

/// Open tube along `path`. `radius` maps the normalized arc position in
/// \[0, 1\] to a ring radius.
///
/// Ring frames are parallel-transported along the path so the tube does not
/// twist at inflection points.
pub fn tube(path: &[Vec3], radius: impl Fn(f32) -> f32, segments: u32) -> MeshData {
    if path.len() < 2 {
        return MeshData::default();
    }
    let segments = segments.max(3);
    let last = path.len() - 1;
    let tangents: Vec<Vec3> = (0..path.len())
        .map(|i| {
            let prev = path[i.saturating_sub(1)];
            let next = path[(i + 1).min(last)];
            (next - prev).normalize_or_zero()
        })
        .collect();

    let mut frames = Vec::with_capacity(path.len());
    let mut normal = tangents[0].any_orthonormal_vector();
    for (i, &t) in tangents.iter().enumerate() {
        if i > 0 {
            let prev = tangents[i - 1];
            if prev != Vec3::ZERO && t != Vec3::ZERO {
                normal = Quat::from_rotation_arc(prev, t) * normal;
            }
            let projected = (normal - t * normal.dot(t)).normalize_or_zero();
            normal = if projected == Vec3::ZERO {
                t.any_orthonormal_vector()
            } else {
                projected
            };
        }
        frames.push((normal, t.cross(normal)));
    }

    grid(last as u32, segments, false, false, |r, phi| {
        let i = r as usize;
        let (n, b) = frames[i];
        let dir = n * phi.cos() + b * phi.sin();
        let rad = radius(i as f32 / last as f32);
        (path[i] + dir * rad, dir)
    })
}
