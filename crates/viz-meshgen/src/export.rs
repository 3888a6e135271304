//! Assembles generated parts into a single binary glTF container.

use fnv::FnvHashMap;
use std::collections::BTreeMap;
use viz_core::error::MeshError;
use viz_core::glb::{
    self, Accessor, Asset, Buffer, BufferView, Document, GlbError, Material, Mesh, Node,
    PbrMetallicRoughness, Primitive, Scene,
};
use viz_core::mesh::MeshData;

/// What the final cleanup passes removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub nodes_pruned: usize,
    pub meshes_pruned: usize,
    pub accessors_merged: usize,
    pub bytes: usize,
}

/// Accumulates meshes into one document and one binary buffer.
pub struct GlbBuilder {
    doc: Document,
    bin: Vec<u8>,
}

fn align4(bin: &mut Vec<u8>) {
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
}

impl GlbBuilder {
    pub fn new(generator: &str) -> Self {
        let doc = Document {
            asset: Asset {
                version: "2.0".into(),
                generator: Some(generator.into()),
            },
            scene: Some(0),
            scenes: vec![Scene {
                name: Some("Scene".into()),
                nodes: Vec::new(),
            }],
            ..Document::default()
        };
        Self {
            doc,
            bin: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn push_view(&mut self, bytes: &[u8], target: u32) -> usize {
        align4(&mut self.bin);
        self.doc.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: self.bin.len(),
            byte_length: bytes.len(),
            byte_stride: None,
            target: Some(target),
        });
        self.bin.extend_from_slice(bytes);
        self.doc.buffer_views.len() - 1
    }

    fn push_accessor(&mut self, accessor: Accessor, bytes: &[u8], target: u32) -> usize {
        let view = self.push_view(bytes, target);
        self.doc.accessors.push(Accessor {
            buffer_view: Some(view),
            ..accessor
        });
        self.doc.accessors.len() - 1
    }

    fn vec3_accessor(&mut self, data: &[f32], with_bounds: bool) -> usize {
        let (min, max) = if with_bounds {
            let mut lo = [f32::INFINITY; 3];
            let mut hi = [f32::NEG_INFINITY; 3];
            for v in data.chunks_exact(3) {
                for k in 0..3 {
                    lo[k] = lo[k].min(v[k]);
                    hi[k] = hi[k].max(v[k]);
                }
            }
            (Some(lo.to_vec()), Some(hi.to_vec()))
        } else {
            (None, None)
        };
        let accessor = Accessor {
            component_type: glb::COMPONENT_F32,
            count: data.len() / 3,
            kind: "VEC3".into(),
            min,
            max,
            ..Accessor::default()
        };
        self.push_accessor(accessor, bytemuck::cast_slice(data), glb::TARGET_ARRAY_BUFFER)
    }

    fn index_accessor(&mut self, indices: &[u32], vertex_count: usize) -> usize {
        let accessor = Accessor {
            count: indices.len(),
            kind: "SCALAR".into(),
            ..Accessor::default()
        };
        if vertex_count <= u16::MAX as usize {
            let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
            self.push_accessor(
                Accessor {
                    component_type: glb::COMPONENT_U16,
                    ..accessor
                },
                bytemuck::cast_slice(&narrow),
                glb::TARGET_ELEMENT_ARRAY_BUFFER,
            )
        } else {
            self.push_accessor(
                Accessor {
                    component_type: glb::COMPONENT_U32,
                    ..accessor
                },
                bytemuck::cast_slice(indices),
                glb::TARGET_ELEMENT_ARRAY_BUFFER,
            )
        }
    }

    /// Add a named mesh with its own material and a scene node of the same
    /// name. Returns the mesh index.
    pub fn add_mesh(
        &mut self,
        name: &str,
        mesh: &MeshData,
        color: [f32; 4],
    ) -> Result<usize, MeshError> {
        mesh.validate()?;
        let position = self.vec3_accessor(&mesh.positions, true);
        let mut attributes = BTreeMap::new();
        attributes.insert("POSITION".to_string(), position);
        if let Some(normals) = &mesh.normals {
            let normal = self.vec3_accessor(normals, false);
            attributes.insert("NORMAL".to_string(), normal);
        }
        let indices = match &mesh.indices {
            Some(idx) => Some(self.index_accessor(idx, mesh.vertex_count())),
            None => None,
        };

        self.doc.materials.push(Material {
            name: Some(name.to_string()),
            pbr_metallic_roughness: Some(PbrMetallicRoughness {
                base_color_factor: color,
                metallic_factor: 0.0,
                roughness_factor: 0.8,
            }),
            double_sided: Some(true),
        });
        self.doc.meshes.push(Mesh {
            name: Some(name.to_string()),
            primitives: vec![Primitive {
                attributes,
                indices,
                material: Some(self.doc.materials.len() - 1),
                mode: Some(4),
            }],
        });
        let mesh_index = self.doc.meshes.len() - 1;
        self.add_node(name, Some(mesh_index), true);
        Ok(mesh_index)
    }

    /// Add a node, optionally listed as a scene root. Returns its index.
    pub fn add_node(&mut self, name: &str, mesh: Option<usize>, in_scene: bool) -> usize {
        self.doc.nodes.push(Node {
            name: Some(name.to_string()),
            mesh,
            children: Vec::new(),
        });
        let index = self.doc.nodes.len() - 1;
        if in_scene {
            if let Some(scene) = self.doc.scenes.first_mut() {
                scene.nodes.push(index);
            }
        }
        index
    }

    pub fn add_child(&mut self, parent: usize, child: usize) {
        if let Some(node) = self.doc.nodes.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Drop nodes that are unreachable from a scene or carry no mesh in their
    /// subtree, then meshes and materials nothing references any more.
    fn prune(&mut self) -> (usize, usize) {
        let nodes = &self.doc.nodes;
        let mut reachable = vec![false; nodes.len()];
        let mut stack: Vec<usize> = self
            .doc
            .scenes
            .iter()
            .flat_map(|s| s.nodes.iter().copied())
            .collect();
        while let Some(n) = stack.pop() {
            if n < nodes.len() && !reachable[n] {
                reachable[n] = true;
                stack.extend(nodes[n].children.iter().copied());
            }
        }

        // A node is kept when it is reachable and it or a descendant has a mesh.
        fn has_mesh(nodes: &[Node], n: usize, seen: &mut Vec<bool>) -> bool {
            if seen[n] {
                return false;
            }
            seen[n] = true;
            nodes[n].mesh.is_some()
                || nodes[n]
                    .children
                    .iter()
                    .any(|&c| c < nodes.len() && has_mesh(nodes, c, seen))
        }
        let keep: Vec<bool> = (0..nodes.len())
            .map(|n| reachable[n] && has_mesh(nodes, n, &mut vec![false; nodes.len()]))
            .collect();

        let node_map = remap(&keep);
        let old_nodes = std::mem::take(&mut self.doc.nodes);
        let before = old_nodes.len();
        for (n, mut node) in old_nodes.into_iter().enumerate() {
            if keep[n] {
                node.children = node
                    .children
                    .iter()
                    .filter_map(|&c| node_map.get(c).copied().flatten())
                    .collect();
                self.doc.nodes.push(node);
            }
        }
        for scene in &mut self.doc.scenes {
            scene.nodes = scene
                .nodes
                .iter()
                .filter_map(|&n| node_map.get(n).copied().flatten())
                .collect();
        }
        let nodes_pruned = before - self.doc.nodes.len();

        let mut used_meshes = vec![false; self.doc.meshes.len()];
        for node in &self.doc.nodes {
            if let Some(m) = node.mesh.filter(|&m| m < used_meshes.len()) {
                used_meshes[m] = true;
            }
        }
        let mesh_map = remap(&used_meshes);
        let meshes_pruned = used_meshes.iter().filter(|u| !**u).count();
        self.doc.meshes = std::mem::take(&mut self.doc.meshes)
            .into_iter()
            .zip(&used_meshes)
            .filter_map(|(m, &used)| used.then_some(m))
            .collect();
        for node in &mut self.doc.nodes {
            node.mesh = node.mesh.and_then(|m| mesh_map.get(m).copied().flatten());
        }

        let mut used_materials = vec![false; self.doc.materials.len()];
        for prim in self.doc.meshes.iter().flat_map(|m| &m.primitives) {
            if let Some(i) = prim.material.filter(|&i| i < used_materials.len()) {
                used_materials[i] = true;
            }
        }
        let material_map = remap(&used_materials);
        self.doc.materials = std::mem::take(&mut self.doc.materials)
            .into_iter()
            .zip(&used_materials)
            .filter_map(|(m, &used)| used.then_some(m))
            .collect();
        for prim in self.doc.meshes.iter_mut().flat_map(|m| &mut m.primitives) {
            prim.material = prim.material.and_then(|i| material_map.get(i).copied().flatten());
        }
        (nodes_pruned, meshes_pruned)
    }

    fn accessor_bytes(&self, index: usize) -> &[u8] {
        let acc = &self.doc.accessors[index];
        match acc.buffer_view.and_then(|v| self.doc.buffer_views.get(v)) {
            Some(view) => &self.bin[view.byte_offset..view.byte_offset + view.byte_length],
            None => &[],
        }
    }

    /// Collapse accessors with identical layout and bytes, drop unreferenced
    /// ones, and rebuild the binary buffer from the survivors.
    fn dedup_accessors(&mut self) -> usize {
        let mut used = vec![false; self.doc.accessors.len()];
        for prim in self.doc.meshes.iter().flat_map(|m| &m.primitives) {
            for &a in prim.attributes.values().chain(prim.indices.iter()) {
                if a < used.len() {
                    used[a] = true;
                }
            }
        }

        let mut canonical: Vec<usize> = (0..self.doc.accessors.len()).collect();
        let mut merged = 0;
        {
            let mut seen: FnvHashMap<(u32, usize, &str, &[u8]), usize> = FnvHashMap::default();
            for (i, acc) in self.doc.accessors.iter().enumerate() {
                if !used[i] {
                    continue;
                }
                let bytes = self.accessor_bytes(i);
                let key = (acc.component_type, acc.count, acc.kind.as_str(), bytes);
                match seen.get(&key) {
                    Some(&first) => {
                        canonical[i] = first;
                        merged += 1;
                    }
                    None => {
                        seen.insert(key, i);
                    }
                }
            }
        }
        let keep: Vec<bool> = (0..canonical.len())
            .map(|i| used[i] && canonical[i] == i)
            .collect();
        let acc_map = remap(&keep);
        let lookup = |a: usize| acc_map.get(canonical[a]).copied().flatten();
        for prim in self.doc.meshes.iter_mut().flat_map(|m| &mut m.primitives) {
            prim.attributes = std::mem::take(&mut prim.attributes)
                .into_iter()
                .filter_map(|(k, a)| lookup(a).map(|a| (k, a)))
                .collect();
            prim.indices = prim.indices.and_then(lookup);
        }

        let mut bin = Vec::with_capacity(self.bin.len());
        let mut views = Vec::new();
        let mut accessors = Vec::new();
        for (i, acc) in self.doc.accessors.iter().enumerate() {
            if !keep[i] {
                continue;
            }
            let bytes = self.accessor_bytes(i);
            let target = acc
                .buffer_view
                .and_then(|v| self.doc.buffer_views.get(v))
                .and_then(|v| v.target);
            align4(&mut bin);
            views.push(BufferView {
                buffer: 0,
                byte_offset: bin.len(),
                byte_length: bytes.len(),
                byte_stride: None,
                target,
            });
            bin.extend_from_slice(bytes);
            accessors.push(Accessor {
                buffer_view: Some(views.len() - 1),
                byte_offset: 0,
                ..acc.clone()
            });
        }
        self.doc.accessors = accessors;
        self.doc.buffer_views = views;
        self.bin = bin;
        merged
    }

    /// Run the cleanup passes and frame the container.
    pub fn finish(mut self) -> Result<(Vec<u8>, ExportStats), GlbError> {
        let (nodes_pruned, meshes_pruned) = self.prune();
        let accessors_merged = self.dedup_accessors();
        align4(&mut self.bin);
        self.doc.buffers = if self.bin.is_empty() {
            Vec::new()
        } else {
            vec![Buffer {
                byte_length: self.bin.len(),
                uri: None,
            }]
        };
        let bytes = glb::write_container(&self.doc, &self.bin)?;
        let stats = ExportStats {
            nodes_pruned,
            meshes_pruned,
            accessors_merged,
            bytes: bytes.len(),
        };
        Ok((bytes, stats))
    }
}

// Old index -> new index for the entries flagged `true`.
fn remap(keep: &[bool]) -> Vec<Option<usize>> {
    let mut next = 0;
    keep.iter()
        .map(|&k| {
            k.then(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}
