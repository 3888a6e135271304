//! Inspection of exported pose containers.

use std::path::PathBuf;
use viz_core::glb::{parse_glb, GlbError};
use viz_core::overlay::{Layer, Pose};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_triangles: usize,
    pub max_total: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_triangles: 50_000,
            max_total: 150_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshReport {
    pub name: String,
    pub layer: Option<Layer>,
    pub vertices: usize,
    pub triangles: usize,
}

#[derive(Clone, Debug)]
pub struct PoseReport {
    pub pose: Pose,
    pub path: PathBuf,
    pub meshes: Vec<MeshReport>,
    /// Layers with no matching mesh.
    pub missing: Vec<Layer>,
}

impl PoseReport {
    pub fn total_triangles(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles).sum()
    }

    /// Limit violations, one line each.
    pub fn warnings(&self, limits: &Limits) -> Vec<String> {
        let mut out: Vec<String> = self
            .meshes
            .iter()
            .filter(|m| m.triangles > limits.max_triangles)
            .map(|m| {
                format!(
                    "mesh {} has {} triangles (limit {})",
                    m.name, m.triangles, limits.max_triangles
                )
            })
            .collect();
        let total = self.total_triangles();
        if total > limits.max_total {
            out.push(format!(
                "pose {} has {} triangles in total (limit {})",
                self.pose, total, limits.max_total
            ));
        }
        out
    }
}

/// Parse a pose container and report its meshes and missing layers.
pub fn inspect(bytes: &[u8], pose: Pose, path: PathBuf) -> Result<PoseReport, GlbError> {
    let meshes: Vec<MeshReport> = parse_glb(bytes)?
        .into_iter()
        .map(|(name, mesh)| MeshReport {
            layer: Layer::classify(&name),
            vertices: mesh.vertex_count(),
            triangles: mesh.triangle_count(),
            name,
        })
        .collect();
    let missing = Layer::ALL
        .into_iter()
        .filter(|l| !meshes.iter().any(|m| m.layer == Some(*l)))
        .collect();
    Ok(PoseReport {
        pose,
        path,
        meshes,
        missing,
    })
}
