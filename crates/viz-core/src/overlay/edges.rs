//! Outline extraction: keep the mesh edges whose adjacent faces fold by more
//! than a threshold angle, plus open boundary edges.

use crate::mesh::MeshData;
use fnv::FnvHashMap;
use glam::Vec3;

// Vertex welding precision, in world units.
const WELD_PRECISION: f32 = 1e-4;

#[inline]
fn weld_key(p: Vec3) -> (i64, i64, i64) {
    let q = |v: f32| (v / WELD_PRECISION).round() as i64;
    (q(p.x), q(p.y), q(p.z))
}

/// Returns a line list (two points per edge) as a flat `x, y, z` buffer.
pub fn extract_edges(mesh: &MeshData, threshold_deg: f32) -> Vec<f32> {
    let threshold_dot = threshold_deg.to_radians().cos();

    // Weld coincident vertices so seams between duplicated vertices do not
    // read as boundaries.
    let mut welded: FnvHashMap<(i64, i64, i64), u32> = FnvHashMap::default();
    let mut canonical = Vec::with_capacity(mesh.vertex_count());
    for i in 0..mesh.vertex_count() {
        let next = welded.len() as u32;
        canonical.push(*welded.entry(weld_key(mesh.vertex(i))).or_insert(next));
    }

    struct Open {
        a: u32,
        b: u32,
        normal: Vec3,
    }
    let mut open: FnvHashMap<(u32, u32), Open> = FnvHashMap::default();
    let mut out = Vec::new();
    let mut emit = |pa: Vec3, pb: Vec3| {
        out.extend_from_slice(&pa.to_array());
        out.extend_from_slice(&pb.to_array());
    };

    for tri in mesh.triangles() {
        let p = tri.map(|i| mesh.vertex(i as usize));
        let n = (p[1] - p[0]).cross(p[2] - p[0]);
        if n.length_squared() <= f32::EPSILON * f32::EPSILON {
            continue;
        }
        let n = n.normalize();
        let c = tri.map(|i| canonical[i as usize]);
        for k in 0..3 {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            let (ca, cb) = (c[k], c[(k + 1) % 3]);
            if ca == cb {
                continue;
            }
            let key = (ca.min(cb), ca.max(cb));
            match open.remove(&key) {
                Some(prev) => {
                    if prev.normal.dot(n) <= threshold_dot {
                        emit(mesh.vertex(prev.a as usize), mesh.vertex(prev.b as usize));
                    }
                }
                None => {
                    open.insert(key, Open { a, b, normal: n });
                }
            }
        }
    }

    // Edges seen by a single face are boundaries.
    let mut rest: Vec<_> = open.into_values().collect();
    rest.sort_by_key(|e| (e.a, e.b));
    for e in rest {
        emit(mesh.vertex(e.a as usize), mesh.vertex(e.b as usize));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_triangle_yields_three_boundary_edges() {
        let mesh = MeshData::from_vertices(&[Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
        assert_eq!(extract_edges(&mesh, 20.0).len(), 3 * 6);
    }

    #[test]
    fn flat_quad_hides_its_diagonal() {
        let v = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
        let mesh = MeshData::from_vertices(&v, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(extract_edges(&mesh, 20.0).len(), 4 * 6);
    }
}
