// Host-side tests for container export and the validation report.

use glam::Vec3;
use std::path::PathBuf;
use viz_core::glb::{parse_glb, read_container, write_container, GlbError};
use viz_core::mesh::MeshData;
use viz_core::overlay::{Layer, Pose};
use viz_meshgen::cli::encode_parts;
use viz_meshgen::parts::generate_pose;
use viz_meshgen::primitives::uv_sphere;
use viz_meshgen::validate::{inspect, Limits};
use viz_meshgen::GlbBuilder;

fn sphere() -> MeshData {
    uv_sphere(Vec3::new(0.0, 1.0, 0.0), 0.5, 12, 6)
}

#[test]
fn written_container_parses_back() {
    let mesh = sphere();
    let mut builder = GlbBuilder::new("test");
    assert!(builder.add_mesh("Heart", &mesh, [1.0, 0.0, 0.0, 1.0]).is_ok());
    let (bytes, stats) = builder.finish().unwrap();
    assert_eq!(bytes.len() % 4, 0);
    assert_eq!(stats.bytes, bytes.len());

    let meshes = parse_glb(&bytes).unwrap();
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].0, "Heart");
    assert_eq!(meshes[0].1.positions, mesh.positions);
    assert_eq!(meshes[0].1.indices, mesh.indices);
    assert_eq!(meshes[0].1.normals, mesh.normals);
}

#[test]
fn position_accessor_carries_bounds() {
    let mut builder = GlbBuilder::new("test");
    assert!(builder.add_mesh("Brain", &sphere(), [1.0; 4]).is_ok());
    let (bytes, _) = builder.finish().unwrap();
    let (doc, _) = read_container(&bytes).unwrap();
    let pos = doc.meshes[0].primitives[0].attributes["POSITION"];
    let acc = &doc.accessors[pos];
    let (min, max) = (acc.min.clone().unwrap(), acc.max.clone().unwrap());
    assert!((min[1] - 0.5).abs() < 1e-5);
    assert!((max[1] - 1.5).abs() < 1e-5);
    assert_eq!(doc.materials.len(), 1);
    assert_eq!(doc.scenes[0].nodes, vec![0]);
    assert_eq!(doc.buffers[0].byte_length % 4, 0);
}

#[test]
fn identical_geometry_shares_accessors() {
    let mesh = sphere();
    let mut builder = GlbBuilder::new("test");
    assert!(builder.add_mesh("Body", &mesh, [1.0; 4]).is_ok());
    assert!(builder.add_mesh("Veins", &mesh, [0.5; 4]).is_ok());
    assert_eq!(builder.document().accessors.len(), 6);
    let (bytes, stats) = builder.finish().unwrap();
    assert_eq!(stats.accessors_merged, 3);

    let (doc, _) = read_container(&bytes).unwrap();
    assert_eq!(doc.accessors.len(), 3);
    assert_eq!(doc.buffer_views.len(), 3);
    assert_eq!(doc.meshes[0].primitives[0], {
        let mut p = doc.meshes[1].primitives[0].clone();
        p.material = doc.meshes[0].primitives[0].material;
        p
    });
    let parsed = parse_glb(&bytes).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].1, parsed[1].1);
}

#[test]
fn stray_and_empty_nodes_are_pruned() {
    let mut builder = GlbBuilder::new("test");
    let mesh = builder.add_mesh("Body", &sphere(), [1.0; 4]).unwrap();
    // Not in the scene.
    builder.add_node("orphan", Some(mesh), false);
    // In the scene but without geometry.
    let empty = builder.add_node("empty", None, true);
    // Grouping node whose child has geometry survives.
    let group = builder.add_node("group", None, true);
    let child = builder.add_node("child", Some(mesh), false);
    builder.add_child(group, child);
    builder.add_child(empty, 99);

    let (bytes, stats) = builder.finish().unwrap();
    assert_eq!(stats.nodes_pruned, 2);
    let (doc, _) = read_container(&bytes).unwrap();
    let names: Vec<_> = doc.nodes.iter().filter_map(|n| n.name.clone()).collect();
    assert_eq!(names, vec!["Body", "group", "child"]);
    assert_eq!(doc.scenes[0].nodes, vec![0, 1]);
    assert_eq!(doc.nodes[1].children, vec![2]);
}

#[test]
fn invalid_mesh_is_rejected() {
    let bad = MeshData::new(vec![0.0; 9], None, Some(vec![0, 1, 5]));
    let mut builder = GlbBuilder::new("test");
    assert!(builder.add_mesh("Body", &bad, [1.0; 4]).is_err());
}

#[test]
fn generated_pose_validates_cleanly() {
    let parts = generate_pose(Pose::Open, &Layer::ALL, 42);
    let bytes = encode_parts(&parts).unwrap();
    let report = inspect(&bytes, Pose::Open, PathBuf::from("pose-open.glb")).unwrap();
    assert!(report.missing.is_empty());
    let names: Vec<_> = report.meshes.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Body", "Veins", "Brain", "Heart"]);
    assert!(report.warnings(&Limits::default()).is_empty());
    for (m, p) in report.meshes.iter().zip(&parts) {
        assert_eq!(m.triangles, p.mesh.triangle_count());
        assert_eq!(m.vertices, p.mesh.vertex_count());
    }
}

#[test]
fn report_flags_missing_meshes_and_limits() {
    let parts = generate_pose(Pose::Closed, &[Layer::Body, Layer::Heart], 42);
    let bytes = encode_parts(&parts).unwrap();
    let report = inspect(&bytes, Pose::Closed, PathBuf::from("pose-closed.glb")).unwrap();
    assert_eq!(report.missing, vec![Layer::Veins, Layer::Brain]);

    let tight = Limits {
        max_triangles: 100,
        max_total: 1000,
    };
    let warnings = report.warnings(&tight);
    assert_eq!(warnings.len(), 3);
    assert!(warnings[2].contains("in total"));
}

#[test]
fn garbage_is_not_a_container() {
    assert!(inspect(b"definitely not glb", Pose::Open, PathBuf::new()).is_err());
}

#[test]
fn oversized_accessors_are_errors_not_panics() {
    let mut builder = GlbBuilder::new("test");
    assert!(builder.add_mesh("Body", &sphere(), [1.0; 4]).is_ok());
    let (bytes, _) = builder.finish().unwrap();
    let (doc, bin) = read_container(&bytes).unwrap();
    let pos = doc.meshes[0].primitives[0].attributes["POSITION"];

    let mut huge_count = doc.clone();
    huge_count.accessors[pos].count = usize::MAX / 4;
    let mut huge_offset = doc.clone();
    huge_offset.accessors[pos].byte_offset = usize::MAX - 2;
    let mut huge_view = doc.clone();
    let view = huge_view.accessors[pos].buffer_view.unwrap();
    huge_view.buffer_views[view].byte_length = usize::MAX;

    for bad in [huge_count, huge_offset, huge_view] {
        let corrupt = write_container(&bad, bin).unwrap();
        assert!(matches!(
            parse_glb(&corrupt),
            Err(GlbError::Accessor(_, "out of bounds"))
        ));
        assert!(inspect(&corrupt, Pose::Open, PathBuf::new()).is_err());
    }
}
