// Host-side tests for the human overlay state machine, presets and outlines.

use glam::Vec3;
use viz_core::mesh::MeshData;
use viz_core::overlay::edges::extract_edges;
use viz_core::overlay::{
    ease_in_out_cubic, HumanOverlay, Layer, LoadOutcome, OverlayConfig, OverlayState, Pose,
    PoseMeshes, PresetId,
};
use viz_core::OverlayError;

fn cube() -> MeshData {
    let v: Vec<Vec3> = (0..8)
        .map(|i| Vec3::new((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32))
        .collect();
    let faces = [
        [0, 2, 6, 4],
        [1, 3, 7, 5],
        [0, 1, 5, 4],
        [2, 3, 7, 6],
        [0, 1, 3, 2],
        [4, 5, 7, 6],
    ];
    let indices = faces
        .iter()
        .flat_map(|&[a, b, c, d]| [a, b, c, a, c, d])
        .collect();
    MeshData::from_vertices(&v, indices)
}

fn full_pose() -> PoseMeshes {
    PoseMeshes::new()
        .with("Body", cube())
        .with("Veins", cube())
        .with("Brain", cube())
        .with("Heart", cube())
}

fn enabled_overlay() -> HumanOverlay {
    let mut overlay = HumanOverlay::default();
    let req = overlay.set_enabled(true).unwrap_or_else(|| panic!("expected a load"));
    assert_eq!(req.pose, Pose::Open);
    assert_eq!(overlay.state(), OverlayState::Loading);
    assert_eq!(overlay.finish_load(req, Ok(full_pose())), Ok(LoadOutcome::Applied));
    overlay
}

#[test]
fn cube_outline_has_twelve_edges() {
    let lines = extract_edges(&cube(), 20.0);
    assert_eq!(lines.len(), 12 * 6);
}

#[test]
fn duplicated_face_vertices_are_welded() {
    // Same cube, but every face owns its own four vertices.
    let src = cube();
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for tri in src.triangles() {
        let base = (positions.len() / 3) as u32;
        for i in tri {
            positions.extend_from_slice(&src.vertex(i as usize).to_array());
        }
        indices.extend([base, base + 1, base + 2]);
    }
    let split = MeshData::new(positions, None, Some(indices));
    assert_eq!(extract_edges(&split, 20.0).len(), 12 * 6);
}

#[test]
fn enabling_loads_then_shows_current_pose() {
    let overlay = enabled_overlay();
    assert_eq!(overlay.state(), OverlayState::Idle);
    assert!(overlay.is_pose_visible(Pose::Open));
    assert!(!overlay.is_pose_visible(Pose::Closed));
    for layer in Layer::ALL {
        assert!(overlay.has_layer(Pose::Open, layer));
        assert!(overlay.layer_opacity(Pose::Open, layer) >= layer.opacity_floor());
        assert_eq!(
            overlay.layer_lines(Pose::Open, layer).map(|l| l.len()),
            Some(12 * 6)
        );
    }
    assert!(overlay.error().is_none());
}

#[test]
fn crossfade_endpoints() {
    let mut overlay = enabled_overlay();
    let req = overlay
        .set_pose("closed")
        .ok()
        .flatten()
        .unwrap_or_else(|| panic!("closed pose should need loading"));
    assert_eq!(overlay.target_pose(), Some(Pose::Closed));
    assert_eq!(overlay.finish_load(req, Ok(full_pose())), Ok(LoadOutcome::Applied));

    assert_eq!(overlay.state(), OverlayState::Crossfading);
    assert_eq!(overlay.blend(), 1.0);
    assert_eq!(overlay.current_pose(), Pose::Open);
    assert!(overlay.is_pose_visible(Pose::Open));
    assert!(overlay.is_pose_visible(Pose::Closed));
    assert_eq!(overlay.layer_opacity(Pose::Closed, Layer::Body), 0.0);
    assert!(overlay.layer_opacity(Pose::Open, Layer::Body) > 0.0);

    let duration = OverlayConfig::default().crossfade_duration;
    overlay.update(duration / 2.0);
    assert!((overlay.blend() - 0.5).abs() < 1e-6);

    overlay.update(duration / 2.0);
    assert_eq!(overlay.blend(), 0.0);
    assert_eq!(overlay.current_pose(), Pose::Closed);
    assert_eq!(overlay.target_pose(), None);
    assert_eq!(overlay.state(), OverlayState::Idle);
    assert!(!overlay.is_pose_visible(Pose::Open));
    assert!(overlay.is_pose_visible(Pose::Closed));
    assert_eq!(overlay.layer_opacity(Pose::Open, Layer::Heart), 0.0);
}

#[test]
fn live_bands_drive_both_poses_during_crossfade() {
    let mut overlay = enabled_overlay();
    let req = overlay
        .set_pose("closed")
        .ok()
        .flatten()
        .unwrap_or_else(|| panic!("closed pose should need loading"));
    assert_eq!(overlay.finish_load(req, Ok(full_pose())), Ok(LoadOutcome::Applied));

    let duration = OverlayConfig::default().crossfade_duration;
    let check = |overlay: &HumanOverlay| {
        let s = overlay.smoothed_bands();
        let out = overlay.preset().evaluate(s.bass, s.mid, s.high);
        let blend = overlay.blend();
        assert!(blend > 0.0 && blend < 1.0);
        for layer in Layer::ALL {
            let open = overlay.layer_opacity(Pose::Open, layer);
            let closed = overlay.layer_opacity(Pose::Closed, layer);
            assert!((open - out.layer_opacity(layer) * blend).abs() < 1e-6);
            assert!((closed - out.layer_opacity(layer) * (1.0 - blend)).abs() < 1e-6);
        }
    };

    overlay.update(duration * 0.3);
    overlay.update_frequency_bands(0.9, 0.2, 0.6);
    assert_eq!(overlay.state(), OverlayState::Crossfading);
    check(&overlay);
    let loud_body = overlay.layer_opacity(Pose::Closed, Layer::Body);

    // Quieter input and more progress: both poses follow in the same frame.
    overlay.update(duration * 0.3);
    overlay.update_frequency_bands(0.0, 0.0, 0.0);
    check(&overlay);
    assert_ne!(overlay.layer_opacity(Pose::Closed, Layer::Body), loud_body);

    // Advancing time alone rescales the latest preset output.
    overlay.update(duration * 0.2);
    check(&overlay);
}

#[test]
fn switching_back_to_a_loaded_pose_needs_no_load() {
    let mut overlay = enabled_overlay();
    let req = overlay.set_pose("closed").ok().flatten();
    if let Some(req) = req {
        let _ = overlay.finish_load(req, Ok(full_pose()));
    }
    overlay.update(1.0);
    assert_eq!(overlay.current_pose(), Pose::Closed);

    assert_eq!(overlay.set_pose("open"), Ok(None));
    assert_eq!(overlay.state(), OverlayState::Crossfading);
    assert_eq!(overlay.blend(), 1.0);
}

#[test]
fn same_pose_is_a_no_op() {
    let mut overlay = enabled_overlay();
    assert_eq!(overlay.set_pose("open"), Ok(None));
    assert_eq!(overlay.state(), OverlayState::Idle);
    assert_eq!(overlay.blend(), 1.0);
}

#[test]
fn unknown_ids_are_rejected_without_change() {
    let mut overlay = enabled_overlay();
    assert_eq!(
        overlay.set_preset("disco"),
        Err(OverlayError::UnknownPreset("disco".into()))
    );
    assert_eq!(overlay.preset(), PresetId::Classic);
    assert_eq!(
        overlay.set_pose("sitting"),
        Err(OverlayError::UnknownPose("sitting".into()))
    );
    assert_eq!(overlay.current_pose(), Pose::Open);
    assert_eq!(overlay.state(), OverlayState::Idle);

    assert!(overlay.set_preset("XRAY").is_ok());
    assert_eq!(overlay.preset(), PresetId::Xray);
}

#[test]
fn load_failure_is_stored_and_overlay_stays_disabled() {
    let mut overlay = HumanOverlay::default();
    let req = overlay.set_enabled(true).unwrap_or_else(|| panic!("expected a load"));
    let res = overlay.finish_load(req, Err("404 Not Found".into()));
    assert!(matches!(res, Err(OverlayError::LoadFailed { pose: "open", .. })));
    assert_eq!(overlay.state(), OverlayState::Disabled);
    assert!(overlay.error().is_some());
    assert!(!overlay.is_pose_visible(Pose::Open));

    // A later attempt clears the stored error.
    let req = overlay.set_enabled(true).unwrap_or_else(|| panic!("expected a load"));
    assert!(overlay.error().is_none());
    assert!(overlay.finish_load(req, Ok(full_pose())).is_ok());
    assert_eq!(overlay.state(), OverlayState::Idle);
}

#[test]
fn load_after_disable_is_ignored() {
    let mut overlay = HumanOverlay::default();
    let req = overlay.set_enabled(true).unwrap_or_else(|| panic!("expected a load"));
    overlay.set_enabled(false);
    assert_eq!(overlay.finish_load(req, Ok(full_pose())), Ok(LoadOutcome::Ignored));
    assert_eq!(overlay.state(), OverlayState::Disabled);
    assert!(!overlay.is_loaded(Pose::Open));
    assert!(!overlay.is_pose_visible(Pose::Open));
}

#[test]
fn superseded_load_is_ignored() {
    let mut overlay = HumanOverlay::default();
    let first = overlay.set_enabled(true).unwrap_or_else(|| panic!("expected a load"));
    let second = overlay
        .set_pose("closed")
        .ok()
        .flatten()
        .unwrap_or_else(|| panic!("expected a new load"));
    assert_ne!(first, second);

    assert_eq!(overlay.finish_load(first, Ok(full_pose())), Ok(LoadOutcome::Ignored));
    assert_eq!(overlay.state(), OverlayState::Loading);
    assert_eq!(overlay.finish_load(second, Ok(full_pose())), Ok(LoadOutcome::Applied));
    assert_eq!(overlay.current_pose(), Pose::Closed);
    assert_eq!(overlay.state(), OverlayState::Idle);
}

#[test]
fn missing_layers_are_omitted() {
    let mut overlay = HumanOverlay::default();
    let req = overlay.set_enabled(true).unwrap_or_else(|| panic!("expected a load"));
    let meshes = PoseMeshes::new()
        .with("skin_mesh", cube())
        .with("Cardiac_Muscle", cube());
    assert_eq!(overlay.finish_load(req, Ok(meshes)), Ok(LoadOutcome::Applied));
    assert!(overlay.has_layer(Pose::Open, Layer::Body));
    assert!(overlay.has_layer(Pose::Open, Layer::Heart));
    assert!(!overlay.has_layer(Pose::Open, Layer::Veins));
    assert_eq!(overlay.layer_opacity(Pose::Open, Layer::Brain), 0.0);
    assert!(overlay.layer_lines(Pose::Open, Layer::Veins).is_none());
}

#[test]
fn pose_without_any_layer_fails() {
    let mut overlay = HumanOverlay::default();
    let req = overlay.set_enabled(true).unwrap_or_else(|| panic!("expected a load"));
    let res = overlay.finish_load(req, Ok(PoseMeshes::new().with("Lamp", cube())));
    assert_eq!(res, Err(OverlayError::NoLayers("open")));
    assert_eq!(overlay.state(), OverlayState::Disabled);
    assert_eq!(overlay.error(), Some(&OverlayError::NoLayers("open")));
}

#[test]
fn layer_names_resolve_exact_then_by_pattern() {
    assert_eq!(Layer::classify("Body"), Some(Layer::Body));
    assert_eq!(Layer::classify("veins"), Some(Layer::Veins));
    assert_eq!(Layer::classify("Peau_Homme"), Some(Layer::Body));
    assert_eq!(Layer::classify("Aorta.001"), Some(Layer::Veins));
    assert_eq!(Layer::classify("Cortex_L"), Some(Layer::Brain));
    assert_eq!(Layer::classify("cardiac_body"), Some(Layer::Heart));
    assert_eq!(Layer::classify("Lamp"), None);
}

#[test]
fn band_updates_are_smoothed_again() {
    let mut overlay = enabled_overlay();
    overlay.update_frequency_bands(1.0, 0.0, 0.0);
    assert!((overlay.smoothed_bands().bass - 0.88).abs() < 1e-6);
    overlay.update_frequency_bands(1.0, 0.0, 0.0);
    assert!((overlay.smoothed_bands().bass - (0.88 * 0.12 + 0.88)).abs() < 1e-6);
}

#[test]
fn band_updates_are_ignored_while_disabled() {
    let mut overlay = HumanOverlay::default();
    overlay.update_frequency_bands(1.0, 1.0, 1.0);
    overlay.update(1.0);
    assert_eq!(overlay.smoothed_bands().bass, 0.0);
    assert_eq!(overlay.veins_flow_phase(), 0.0);
}

#[test]
fn heart_scale_follows_bass() {
    let mut overlay = enabled_overlay();
    assert!(overlay.set_preset("pulse").is_ok());
    assert_eq!(overlay.heart_scale(Pose::Open), 1.0);
    for _ in 0..5 {
        overlay.update_frequency_bands(1.0, 0.0, 0.0);
    }
    assert!(overlay.heart_scale(Pose::Open) > 1.3);
    assert!(overlay.layer_opacity(Pose::Open, Layer::Heart) > 0.9);
}

#[test]
fn veins_phase_advances_with_time() {
    let mut overlay = enabled_overlay();
    overlay.update_frequency_bands(0.0, 1.0, 0.0);
    let speed = overlay.veins_flow_speed();
    assert!(speed > 0.0);
    overlay.update(0.5);
    assert!((overlay.veins_flow_phase() - speed * 0.5).abs() < 1e-5);
}

#[test]
fn disabling_mid_crossfade_hides_everything() {
    let mut overlay = enabled_overlay();
    if let Ok(Some(req)) = overlay.set_pose("closed") {
        let _ = overlay.finish_load(req, Ok(full_pose()));
    }
    overlay.update(0.1);
    overlay.set_enabled(false);
    assert_eq!(overlay.state(), OverlayState::Disabled);
    assert!(!overlay.is_pose_visible(Pose::Open));
    assert!(!overlay.is_pose_visible(Pose::Closed));
    assert_eq!(overlay.layer_opacity(Pose::Open, Layer::Body), 0.0);

    // Geometry is kept, so re-enabling shows the current pose at once.
    assert_eq!(overlay.set_enabled(true), None);
    assert_eq!(overlay.state(), OverlayState::Idle);
    assert!(overlay.is_pose_visible(overlay.current_pose()));
}

#[test]
fn pose_set_while_disabled_is_recorded() {
    let mut overlay = HumanOverlay::default();
    assert_eq!(overlay.set_pose("closed"), Ok(None));
    assert_eq!(overlay.current_pose(), Pose::Closed);
    let req = overlay.set_enabled(true).unwrap_or_else(|| panic!("expected a load"));
    assert_eq!(req.pose, Pose::Closed);
}

#[test]
fn presets_respect_floors_and_clamp_input() {
    for preset in PresetId::ALL {
        let quiet = preset.evaluate(0.0, 0.0, 0.0);
        let loud = preset.evaluate(5.0, 5.0, 5.0);
        for layer in Layer::ALL {
            let q = quiet.layer_opacity(layer);
            let l = loud.layer_opacity(layer);
            assert!(q >= layer.opacity_floor() && q <= 1.0);
            assert!(l >= q && l <= 1.0);
        }
        assert_eq!(loud, preset.evaluate(1.0, 1.0, 1.0));
        assert!(loud.heart_scale >= 1.0);
    }
}

#[test]
fn config_deserializes_from_json() {
    let config: OverlayConfig =
        serde_json::from_str(r#"{"preset": "neural", "pose": "closed"}"#).unwrap_or_default();
    assert_eq!(config.preset, PresetId::Neural);
    assert_eq!(config.pose, Pose::Closed);
    assert_eq!(config.crossfade_duration, 0.5);
}

#[test]
fn ease_curve_endpoints() {
    assert_eq!(ease_in_out_cubic(0.0), 0.0);
    assert_eq!(ease_in_out_cubic(0.5), 0.5);
    assert_eq!(ease_in_out_cubic(1.0), 1.0);
    assert_eq!(ease_in_out_cubic(2.0), 1.0);
}
