//! Flat triangle-mesh buffers shared by the pose loader and the offline
//! generators.

use crate::error::MeshError;
use glam::{Mat4, Vec3};

/// Positions (stride 3), optional per-vertex normals (same stride) and
/// optional triangle indices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    pub indices: Option<Vec<u32>>,
}

impl MeshData {
    pub fn new(positions: Vec<f32>, normals: Option<Vec<f32>>, indices: Option<Vec<u32>>) -> Self {
        Self {
            positions,
            normals,
            indices,
        }
    }

    pub fn from_vertices(vertices: &[Vec3], indices: Vec<u32>) -> Self {
        Self {
            positions: bytemuck::cast_slice(vertices).to_vec(),
            normals: None,
            indices: Some(indices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(idx) => idx.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn vertex(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[i * 3..i * 3 + 3])
    }

    pub fn vertices(&self) -> &[Vec3] {
        bytemuck::cast_slice(&self.positions[..self.vertex_count() * 3])
    }

    /// Triangle corner indices, synthesised for non-indexed meshes.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let n = self.triangle_count();
        (0..n).map(move |t| match &self.indices {
            Some(idx) => [idx[t * 3], idx[t * 3 + 1], idx[t * 3 + 2]],
            None => {
                let b = (t * 3) as u32;
                [b, b + 1, b + 2]
            }
        })
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if self.positions.len() % 3 != 0 {
            return Err(MeshError::PositionStride(self.positions.len()));
        }
        if let Some(n) = &self.normals {
            if n.len() != self.positions.len() {
                return Err(MeshError::NormalLength {
                    normals: n.len(),
                    positions: self.positions.len(),
                });
            }
        }
        if let Some(idx) = &self.indices {
            if idx.len() % 3 != 0 {
                return Err(MeshError::IndexStride(idx.len()));
            }
            let vc = self.vertex_count();
            if let Some(&bad) = idx.iter().find(|&&i| i as usize >= vc) {
                return Err(MeshError::IndexOutOfRange {
                    index: bad,
                    vertices: vc,
                });
            }
        } else if self.vertex_count() % 3 != 0 {
            return Err(MeshError::IndexStride(self.vertex_count()));
        }
        if self.positions.iter().any(|v| !v.is_finite()) {
            return Err(MeshError::NonFinite);
        }
        Ok(())
    }

    /// Append `other`, offsetting its indices past this mesh's vertices.
    ///
    /// Both meshes are indexed after merging; normals are kept only when both
    /// sides have them.
    pub fn merge(&mut self, other: &MeshData) {
        let offset = self.vertex_count() as u32;
        let own_indices = self
            .indices
            .take()
            .unwrap_or_else(|| (0..offset).collect());
        let mut indices = own_indices;
        match &other.indices {
            Some(idx) => indices.extend(idx.iter().map(|i| i + offset)),
            None => indices.extend((0..other.vertex_count() as u32).map(|i| i + offset)),
        }
        self.normals = match (self.normals.take(), &other.normals) {
            (Some(mut a), Some(b)) => {
                a.extend_from_slice(b);
                Some(a)
            }
            (None, None) if self.positions.is_empty() => None,
            (None, Some(b)) if self.positions.is_empty() => Some(b.clone()),
            _ => None,
        };
        self.positions.extend_from_slice(&other.positions);
        self.indices = Some(indices);
    }

    pub fn merged<'a>(parts: impl IntoIterator<Item = &'a MeshData>) -> MeshData {
        let mut out = MeshData::default();
        for p in parts {
            out.merge(p);
        }
        out
    }

    pub fn transform(&mut self, m: Mat4) {
        for v in self.positions.chunks_exact_mut(3) {
            let p = m.transform_point3(Vec3::new(v[0], v[1], v[2]));
            v.copy_from_slice(&p.to_array());
        }
        if let Some(normals) = &mut self.normals {
            let nm = m.inverse().transpose();
            for n in normals.chunks_exact_mut(3) {
                let d = nm.transform_vector3(Vec3::new(n[0], n[1], n[2])).normalize_or_zero();
                n.copy_from_slice(&d.to_array());
            }
        }
    }

    pub fn translate(&mut self, t: Vec3) {
        for v in self.positions.chunks_exact_mut(3) {
            v[0] += t.x;
            v[1] += t.y;
            v[2] += t.z;
        }
    }

    /// Axis-aligned bounds, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut it = self.positions.chunks_exact(3).map(Vec3::from_slice);
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Area-weighted smooth normals from the triangle list.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.vertex_count()];
        for [a, b, c] in self.triangles() {
            let (pa, pb, pc) = (
                self.vertex(a as usize),
                self.vertex(b as usize),
                self.vertex(c as usize),
            );
            let n = (pb - pa).cross(pc - pa);
            acc[a as usize] += n;
            acc[b as usize] += n;
            acc[c as usize] += n;
        }
        let normals: Vec<Vec3> = acc
            .into_iter()
            .map(|n| {
                let n = n.normalize_or_zero();
                if n == Vec3::ZERO {
                    Vec3::Y
                } else {
                    n
                }
            })
            .collect();
        self.normals = Some(bytemuck::cast_slice(&normals).to_vec());
    }
}
