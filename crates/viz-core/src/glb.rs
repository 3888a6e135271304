//! Binary glTF 2.0 container: document types, chunk framing and a mesh reader.
//!
//! Only the subset the pose files use is modelled: triangle primitives with
//! float positions, optional float normals and u8/u16/u32 indices, one binary
//! buffer embedded in the `BIN` chunk.

pub use crate::error::GlbError;
use crate::mesh::MeshData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAGIC: u32 = 0x4654_6C67; // "glTF"
pub const VERSION: u32 = 2;
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
pub const CHUNK_BIN: u32 = 0x004E_4942;

pub const COMPONENT_U8: u32 = 5121;
pub const COMPONENT_U16: u32 = 5123;
pub const COMPONENT_U32: u32 = 5125;
pub const COMPONENT_F32: u32 = 5126;

pub const TARGET_ARRAY_BUFFER: u32 = 34962;
pub const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub asset: Asset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<Scene>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: "2.0".into(),
            generator: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub attributes: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_sided: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub byte_offset: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f32>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

fn is_zero(v: &usize) -> bool {
    *v == 0
}

fn component_size(component_type: u32) -> Option<usize> {
    match component_type {
        COMPONENT_U8 => Some(1),
        COMPONENT_U16 => Some(2),
        COMPONENT_U32 | COMPONENT_F32 => Some(4),
        _ => None,
    }
}

fn component_count(kind: &str) -> Option<usize> {
    match kind {
        "SCALAR" => Some(1),
        "VEC2" => Some(2),
        "VEC3" => Some(3),
        "VEC4" => Some(4),
        _ => None,
    }
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Frame a document and binary payload as a GLB container. The JSON chunk is
/// padded with spaces and the binary chunk with zeros to 4-byte boundaries.
pub fn write_container(doc: &Document, bin: &[u8]) -> Result<Vec<u8>, GlbError> {
    let mut json = serde_json::to_vec(doc)?;
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let bin_padded = (bin.len() + 3) & !3;
    let mut total = HEADER_LEN + CHUNK_HEADER_LEN + json.len();
    if !bin.is_empty() {
        total += CHUNK_HEADER_LEN + bin_padded;
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);
    if !bin.is_empty() {
        out.extend_from_slice(&(bin_padded as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(bin);
        out.resize(total, 0);
    }
    Ok(out)
}

/// Split a container into its document and (possibly empty) binary chunk.
pub fn read_container(bytes: &[u8]) -> Result<(Document, &[u8]), GlbError> {
    if bytes.len() < HEADER_LEN + CHUNK_HEADER_LEN {
        return Err(GlbError::Truncated(bytes.len()));
    }
    if read_u32(bytes, 0) != MAGIC {
        return Err(GlbError::BadMagic);
    }
    let version = read_u32(bytes, 4);
    if version != VERSION {
        return Err(GlbError::Version(version));
    }
    let declared = read_u32(bytes, 8) as usize;
    if declared != bytes.len() {
        return Err(GlbError::Length {
            declared,
            actual: bytes.len(),
        });
    }

    let mut json = None;
    let mut bin: &[u8] = &[];
    let mut at = HEADER_LEN;
    while at + CHUNK_HEADER_LEN <= bytes.len() {
        let len = read_u32(bytes, at) as usize;
        let kind = read_u32(bytes, at + 4);
        let start = at + CHUNK_HEADER_LEN;
        let end = start
            .checked_add(len)
            .filter(|&e| e <= bytes.len())
            .ok_or(GlbError::Truncated(bytes.len()))?;
        match kind {
            CHUNK_JSON if json.is_none() => json = Some(&bytes[start..end]),
            CHUNK_BIN if bin.is_empty() => bin = &bytes[start..end],
            _ => log::debug!("[glb] skipping chunk 0x{:08x} ({} bytes)", kind, len),
        }
        at = end;
    }

    let json = json.ok_or(GlbError::MissingChunk("JSON"))?;
    let doc: Document = serde_json::from_slice(json)?;
    Ok((doc, bin))
}

struct AccessorView<'a> {
    bytes: &'a [u8],
    stride: usize,
    elem: usize,
    count: usize,
    comp_size: usize,
    comps: usize,
}

fn view<'a>(doc: &Document, bin: &'a [u8], index: usize) -> Result<AccessorView<'a>, GlbError> {
    let acc = doc
        .accessors
        .get(index)
        .ok_or(GlbError::Accessor(index, "missing"))?;
    let comp_size =
        component_size(acc.component_type).ok_or(GlbError::Accessor(index, "component type"))?;
    let comps = component_count(&acc.kind).ok_or(GlbError::Accessor(index, "element type"))?;
    let bv_index = acc
        .buffer_view
        .ok_or(GlbError::Accessor(index, "sparse or empty accessor"))?;
    let bv = doc
        .buffer_views
        .get(bv_index)
        .ok_or(GlbError::Accessor(index, "buffer view"))?;
    if bv.buffer != 0 {
        return Err(GlbError::Accessor(index, "external buffer"));
    }
    let elem = comp_size * comps;
    let stride = bv.byte_stride.unwrap_or(elem);
    // Sizes come from the file; anything that overflows is out of bounds.
    let out_of_bounds = || GlbError::Accessor(index, "out of bounds");
    let start = bv
        .byte_offset
        .checked_add(acc.byte_offset)
        .ok_or_else(out_of_bounds)?;
    let needed = match acc.count {
        0 => Some(0),
        n => (n - 1).checked_mul(stride).and_then(|b| b.checked_add(elem)),
    }
    .ok_or_else(out_of_bounds)?;
    let end = start
        .checked_add(needed)
        .ok_or_else(out_of_bounds)?;
    let view_end = bv
        .byte_offset
        .checked_add(bv.byte_length)
        .ok_or_else(out_of_bounds)?;
    if stride < elem || end > view_end || view_end > bin.len() {
        return Err(out_of_bounds());
    }
    Ok(AccessorView {
        bytes: &bin[start..end],
        stride,
        elem,
        count: acc.count,
        comp_size,
        comps,
    })
}

fn read_vec3(doc: &Document, bin: &[u8], index: usize) -> Result<Vec<f32>, GlbError> {
    let v = view(doc, bin, index)?;
    if v.comps != 3 || doc.accessors[index].component_type != COMPONENT_F32 {
        return Err(GlbError::Accessor(index, "expected float VEC3"));
    }
    let mut out = Vec::with_capacity(v.count * 3);
    for i in 0..v.count {
        let e = &v.bytes[i * v.stride..i * v.stride + v.elem];
        out.extend(
            e.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])),
        );
    }
    Ok(out)
}

fn read_indices(doc: &Document, bin: &[u8], index: usize) -> Result<Vec<u32>, GlbError> {
    let v = view(doc, bin, index)?;
    if v.comps != 1 || doc.accessors[index].component_type == COMPONENT_F32 {
        return Err(GlbError::Accessor(index, "expected integer SCALAR"));
    }
    Ok((0..v.count)
        .map(|i| {
            let e = &v.bytes[i * v.stride..i * v.stride + v.comp_size];
            match v.comp_size {
                1 => e[0] as u32,
                2 => u16::from_le_bytes([e[0], e[1]]) as u32,
                _ => u32::from_le_bytes([e[0], e[1], e[2], e[3]]),
            }
        })
        .collect())
}

fn read_mesh(doc: &Document, bin: &[u8], mesh: &Mesh) -> Result<MeshData, GlbError> {
    let mut out = MeshData::default();
    for prim in &mesh.primitives {
        // Points, lines and strips are not part of the pose format.
        if prim.mode.is_some_and(|m| m != 4) {
            continue;
        }
        let Some(&pos) = prim.attributes.get("POSITION") else {
            continue;
        };
        let positions = read_vec3(doc, bin, pos)?;
        let normals = match prim.attributes.get("NORMAL") {
            Some(&n) => Some(read_vec3(doc, bin, n)?),
            None => None,
        };
        let indices = match prim.indices {
            Some(i) => Some(read_indices(doc, bin, i)?),
            None => None,
        };
        let part = MeshData::new(positions, normals, indices);
        part.validate()?;
        out.merge(&part);
    }
    Ok(out)
}

/// Named triangle meshes of a GLB container.
///
/// Meshes are reported under their node name, falling back to the mesh name.
/// Node transforms are not applied; pose files are exported in world space.
pub fn parse_glb(bytes: &[u8]) -> Result<Vec<(String, MeshData)>, GlbError> {
    let (doc, bin) = read_container(bytes)?;
    let mut out = Vec::new();

    let named: Vec<(Option<&String>, usize)> = if doc.nodes.is_empty() {
        (0..doc.meshes.len()).map(|m| (None, m)).collect()
    } else {
        doc.nodes
            .iter()
            .filter_map(|n| n.mesh.map(|m| (n.name.as_ref(), m)))
            .collect()
    };

    for (node_name, mesh_index) in named {
        let mesh = doc
            .meshes
            .get(mesh_index)
            .ok_or(GlbError::MissingMesh(mesh_index))?;
        let name = node_name
            .or(mesh.name.as_ref())
            .cloned()
            .unwrap_or_else(|| format!("mesh{mesh_index}"));
        let data = read_mesh(&doc, bin, mesh)?;
        if data.is_empty() {
            log::debug!("[glb] mesh '{}' has no triangle geometry", name);
            continue;
        }
        out.push((name, data));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = vec![0u8; 20];
        bytes[0..4].copy_from_slice(b"nope");
        assert!(matches!(read_container(&bytes), Err(GlbError::BadMagic)));
    }

    #[test]
    fn json_chunk_is_space_padded() {
        let bytes = write_container(&Document::default(), &[]).unwrap();
        assert_eq!(bytes.len() % 4, 0);
        let json_len = read_u32(&bytes, 12) as usize;
        assert_eq!(json_len % 4, 0);
        let (doc, bin) = read_container(&bytes).unwrap();
        assert_eq!(doc.asset.version, "2.0");
        assert!(bin.is_empty());
    }
}
