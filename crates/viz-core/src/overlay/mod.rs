//! Outlined human figure whose layers follow the frequency bands.
//!
//! State machine:
//!
//! ```text
//! Disabled --enable--> Loading --load ok--> Idle <--> Crossfading
//!     ^                   |                  |             |
//!     +---- disable ------+------------------+-------------+
//! ```
//!
//! Mesh loading is asynchronous and owned by the host. Operations that need
//! geometry hand out a [`LoadRequest`]; the host fetches the pose and passes
//! the result to [`HumanOverlay::finish_load`]. Requests carry a ticket so a
//! result that arrives after the overlay was disabled, or after a newer
//! request, is dropped instead of being applied to unrelated state.

pub mod edges;
mod layers;
mod presets;

pub use layers::{Layer, Pose};
pub use presets::{PresetId, PresetOutput};

use crate::bands::{smooth, FrequencyBands};
use crate::constants::*;
use crate::error::OverlayError;
use crate::mesh::MeshData;
use fnv::FnvHashSet;
use serde::Deserialize;
use smallvec::SmallVec;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub crossfade_duration: f32,
    pub edge_threshold_deg: f32,
    pub band_smoothing: f32,
    pub preset: PresetId,
    pub pose: Pose,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            crossfade_duration: CROSSFADE_DURATION_SEC,
            edge_threshold_deg: EDGE_THRESHOLD_DEG,
            band_smoothing: OVERLAY_BAND_SMOOTHING,
            preset: PresetId::Classic,
            pose: Pose::Open,
        }
    }
}

/// Named sub-meshes of one pose container, as delivered by the mesh loader.
#[derive(Clone, Debug, Default)]
pub struct PoseMeshes {
    pub meshes: Vec<(String, MeshData)>,
}

impl PoseMeshes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, mesh: MeshData) -> Self {
        self.meshes.push((name.into(), mesh));
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayState {
    Disabled,
    Loading,
    Idle,
    Crossfading,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub pose: Pose,
    ticket: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoadPurpose {
    Enable,
    Crossfade,
}

#[derive(Clone, Copy, Debug)]
struct PendingLoad {
    request: LoadRequest,
    purpose: LoadPurpose,
}

#[derive(Clone, Debug)]
struct LayerRig {
    lines: Vec<f32>,
    preset_opacity: f32,
    opacity: f32,
    // Only the heart sub-group is scaled.
    scale: f32,
}

#[derive(Clone, Debug)]
struct PoseRig {
    layers: [Option<LayerRig>; 4],
    visible: bool,
}

#[derive(Clone, Copy, Debug)]
struct Crossfade {
    from: Pose,
    to: Pose,
    elapsed: f32,
}

/// Cubic ease-in-out on \[0, 1\].
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

pub struct HumanOverlay {
    config: OverlayConfig,
    state: OverlayState,
    preset: PresetId,
    current: Pose,
    crossfade: Option<Crossfade>,
    blend: f32,
    rigs: [Option<PoseRig>; 2],
    pending: Option<PendingLoad>,
    next_ticket: u64,
    smoothed: FrequencyBands,
    output: PresetOutput,
    veins_phase: f32,
    error: Option<OverlayError>,
    warned: FnvHashSet<String>,
}

impl Default for HumanOverlay {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

impl HumanOverlay {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            preset: config.preset,
            current: config.pose,
            output: config.preset.evaluate(0.0, 0.0, 0.0),
            config,
            state: OverlayState::Disabled,
            crossfade: None,
            blend: 1.0,
            rigs: [None, None],
            pending: None,
            next_ticket: 0,
            smoothed: FrequencyBands::ZERO,
            veins_phase: 0.0,
            error: None,
            warned: FnvHashSet::default(),
        }
    }

    fn warn_once(&mut self, key: String) {
        if self.warned.insert(key.clone()) {
            log::warn!("[overlay] {}", key);
        }
    }

    fn request(&mut self, pose: Pose, purpose: LoadPurpose) -> LoadRequest {
        self.next_ticket += 1;
        let request = LoadRequest {
            pose,
            ticket: self.next_ticket,
        };
        self.pending = Some(PendingLoad { request, purpose });
        request
    }

    pub fn is_loaded(&self, pose: Pose) -> bool {
        self.rigs[pose.index()].is_some()
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.state, OverlayState::Disabled | OverlayState::Loading)
    }

    /// Enable or disable the overlay. Enabling an unloaded pose returns the
    /// load the host must perform before the figure becomes visible.
    pub fn set_enabled(&mut self, enabled: bool) -> Option<LoadRequest> {
        if !enabled {
            self.state = OverlayState::Disabled;
            self.pending = None;
            self.crossfade = None;
            self.blend = 1.0;
            for rig in self.rigs.iter_mut().flatten() {
                rig.visible = false;
            }
            self.apply_opacities();
            return None;
        }
        if self.state != OverlayState::Disabled {
            return None;
        }
        self.error = None;
        if self.is_loaded(self.current) {
            self.show_current();
            None
        } else {
            self.state = OverlayState::Loading;
            Some(self.request(self.current, LoadPurpose::Enable))
        }
    }

    fn show_current(&mut self) {
        if let Some(rig) = &mut self.rigs[self.current.index()] {
            rig.visible = true;
        }
        self.state = OverlayState::Idle;
        self.apply_opacities();
    }

    /// Apply the result of a host-side load. Results for stale tickets are
    /// ignored. Failures are stored in [`error`](Self::error) and returned.
    pub fn finish_load(
        &mut self,
        request: LoadRequest,
        result: Result<PoseMeshes, String>,
    ) -> Result<LoadOutcome, OverlayError> {
        let pending = match self.pending {
            Some(p) if p.request == request => p,
            _ => {
                log::debug!("[overlay] ignoring stale load for pose {}", request.pose);
                return Ok(LoadOutcome::Ignored);
            }
        };
        self.pending = None;

        let rig = result
            .map_err(|reason| OverlayError::LoadFailed {
                pose: request.pose.name(),
                reason,
            })
            .and_then(|meshes| self.build_rig(request.pose, meshes));

        match rig {
            Ok(rig) => {
                self.rigs[request.pose.index()] = Some(rig);
                match pending.purpose {
                    LoadPurpose::Enable => self.show_current(),
                    LoadPurpose::Crossfade => self.begin_crossfade(request.pose),
                }
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                log::error!("[overlay] {}", e);
                if pending.purpose == LoadPurpose::Enable {
                    self.state = OverlayState::Disabled;
                }
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn build_rig(&mut self, pose: Pose, meshes: PoseMeshes) -> Result<PoseRig, OverlayError> {
        let mut grouped: [Option<MeshData>; 4] = Default::default();
        for (name, mesh) in meshes.meshes {
            let Some(layer) = Layer::classify(&name) else {
                log::debug!("[overlay] {}: skipping unrecognised mesh '{}'", pose, name);
                continue;
            };
            if let Err(e) = mesh.validate() {
                self.warn_once(format!("{pose}: mesh '{name}' rejected: {e}"));
                continue;
            }
            match &mut grouped[layer.index()] {
                Some(acc) => acc.merge(&mesh),
                slot => *slot = Some(mesh),
            }
        }

        let mut missing: SmallVec<[Layer; 4]> = SmallVec::new();
        let mut layers: [Option<LayerRig>; 4] = Default::default();
        for layer in Layer::ALL {
            match &grouped[layer.index()] {
                Some(mesh) => {
                    let lines = edges::extract_edges(mesh, self.config.edge_threshold_deg);
                    log::info!(
                        "[overlay] {}/{}: {} triangles -> {} edges",
                        pose,
                        layer,
                        mesh.triangle_count(),
                        lines.len() / 6
                    );
                    layers[layer.index()] = Some(LayerRig {
                        lines,
                        preset_opacity: self.output.layer_opacity(layer),
                        opacity: 0.0,
                        scale: 1.0,
                    });
                }
                None => missing.push(layer),
            }
        }
        if missing.len() == Layer::ALL.len() {
            return Err(OverlayError::NoLayers(pose.name()));
        }
        for layer in missing {
            self.warn_once(format!("{pose}: layer '{layer}' not found, continuing without it"));
        }
        Ok(PoseRig {
            layers,
            visible: false,
        })
    }

    pub fn set_preset(&mut self, id: &str) -> Result<(), OverlayError> {
        match id.parse::<PresetId>() {
            Ok(p) => {
                self.preset = p;
                let s = self.smoothed;
                self.output = p.evaluate(s.bass, s.mid, s.high);
                self.push_preset_output();
                self.apply_opacities();
                Ok(())
            }
            Err(_) => {
                self.warn_once(format!("unknown preset '{id}'"));
                Err(OverlayError::UnknownPreset(id.to_string()))
            }
        }
    }

    /// Switch pose. When the overlay is showing, the change crossfades; if
    /// the target is not loaded yet the returned request must be fulfilled
    /// first.
    pub fn set_pose(&mut self, id: &str) -> Result<Option<LoadRequest>, OverlayError> {
        let pose = match id.parse::<Pose>() {
            Ok(p) => p,
            Err(_) => {
                self.warn_once(format!("unknown pose '{id}'"));
                return Err(OverlayError::UnknownPose(id.to_string()));
            }
        };

        match self.state {
            OverlayState::Disabled => {
                self.current = pose;
                Ok(None)
            }
            OverlayState::Loading => {
                if pose == self.current {
                    return Ok(None);
                }
                self.current = pose;
                if self.is_loaded(pose) {
                    self.pending = None;
                    self.show_current();
                    Ok(None)
                } else {
                    Ok(Some(self.request(pose, LoadPurpose::Enable)))
                }
            }
            OverlayState::Idle | OverlayState::Crossfading => {
                if let Some(cf) = self.crossfade {
                    if cf.to == pose {
                        return Ok(None);
                    }
                    self.finish_crossfade();
                }
                if pose == self.current {
                    self.pending = None;
                    return Ok(None);
                }
                if self.is_loaded(pose) {
                    self.pending = None;
                    self.begin_crossfade(pose);
                    Ok(None)
                } else {
                    Ok(Some(self.request(pose, LoadPurpose::Crossfade)))
                }
            }
        }
    }

    fn begin_crossfade(&mut self, to: Pose) {
        if to == self.current {
            return;
        }
        self.crossfade = Some(Crossfade {
            from: self.current,
            to,
            elapsed: 0.0,
        });
        self.blend = 1.0;
        if let Some(rig) = &mut self.rigs[to.index()] {
            rig.visible = true;
        }
        self.state = OverlayState::Crossfading;
        self.push_preset_output();
        self.apply_opacities();
    }

    fn finish_crossfade(&mut self) {
        let Some(cf) = self.crossfade.take() else {
            return;
        };
        self.blend = 0.0;
        if let Some(rig) = &mut self.rigs[cf.from.index()] {
            rig.visible = false;
        }
        self.current = cf.to;
        self.state = OverlayState::Idle;
        self.apply_opacities();
    }

    /// Advance crossfade time and the vein flow phase by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if !self.is_enabled() {
            return;
        }
        self.veins_phase = (self.veins_phase + self.output.veins_flow_speed * dt).rem_euclid(1000.0);
        let Some(cf) = &mut self.crossfade else {
            return;
        };
        cf.elapsed += dt.max(0.0);
        let duration = self.config.crossfade_duration;
        let progress = if duration > 0.0 {
            cf.elapsed / duration
        } else {
            1.0
        };
        self.blend = 1.0 - ease_in_out_cubic(progress);
        let done = cf.elapsed >= duration;
        self.apply_opacities();
        if done {
            self.finish_crossfade();
        }
    }

    /// Re-smooth the incoming bands, evaluate the preset and apply it to both
    /// poses before crossfade scaling.
    pub fn update_frequency_bands(&mut self, bass: f32, mid: f32, high: f32) {
        if !self.is_enabled() {
            return;
        }
        let f = self.config.band_smoothing;
        self.smoothed = FrequencyBands {
            bass: smooth(self.smoothed.bass, bass, f),
            mid: smooth(self.smoothed.mid, mid, f),
            high: smooth(self.smoothed.high, high, f),
        };
        let s = self.smoothed;
        self.output = self.preset.evaluate(s.bass, s.mid, s.high);
        self.push_preset_output();
        self.apply_opacities();
    }

    fn push_preset_output(&mut self) {
        let out = self.output;
        for rig in self.rigs.iter_mut().flatten() {
            for layer in Layer::ALL {
                if let Some(l) = &mut rig.layers[layer.index()] {
                    l.preset_opacity = out.layer_opacity(layer);
                    if layer == Layer::Heart {
                        l.scale = out.heart_scale;
                    }
                }
            }
        }
    }

    /// Crossfade weight of `pose` in the current state.
    fn pose_weight(&self, pose: Pose) -> f32 {
        match (self.state, self.crossfade) {
            (OverlayState::Crossfading, Some(cf)) if pose == cf.from => self.blend,
            (OverlayState::Crossfading, Some(cf)) if pose == cf.to => 1.0 - self.blend,
            (OverlayState::Idle, _) if pose == self.current => 1.0,
            _ => 0.0,
        }
    }

    fn apply_opacities(&mut self) {
        let weights = Pose::ALL.map(|p| self.pose_weight(p));
        for (rig, w) in self.rigs.iter_mut().zip(weights) {
            if let Some(rig) = rig {
                for l in rig.layers.iter_mut().flatten() {
                    l.opacity = l.preset_opacity * w;
                }
            }
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn preset(&self) -> PresetId {
        self.preset
    }

    pub fn current_pose(&self) -> Pose {
        self.current
    }

    pub fn target_pose(&self) -> Option<Pose> {
        self.crossfade.map(|cf| cf.to).or_else(|| {
            self.pending
                .filter(|p| p.purpose == LoadPurpose::Crossfade)
                .map(|p| p.request.pose)
        })
    }

    /// Weight of the outgoing pose: 1 when a crossfade starts, 0 once it has
    /// completed.
    pub fn blend(&self) -> f32 {
        self.blend
    }

    pub fn is_pose_visible(&self, pose: Pose) -> bool {
        self.rigs[pose.index()].as_ref().is_some_and(|r| r.visible)
    }

    pub fn has_layer(&self, pose: Pose, layer: Layer) -> bool {
        self.layer(pose, layer).is_some()
    }

    fn layer(&self, pose: Pose, layer: Layer) -> Option<&LayerRig> {
        self.rigs[pose.index()].as_ref()?.layers[layer.index()].as_ref()
    }

    /// Material opacity after preset and crossfade scaling.
    pub fn layer_opacity(&self, pose: Pose, layer: Layer) -> f32 {
        self.layer(pose, layer).map_or(0.0, |l| l.opacity)
    }

    /// Edge line list (`x, y, z` pairs) for a loaded layer.
    pub fn layer_lines(&self, pose: Pose, layer: Layer) -> Option<&[f32]> {
        self.layer(pose, layer).map(|l| l.lines.as_slice())
    }

    pub fn heart_scale(&self, pose: Pose) -> f32 {
        self.layer(pose, Layer::Heart).map_or(1.0, |l| l.scale)
    }

    pub fn veins_flow_speed(&self) -> f32 {
        self.output.veins_flow_speed
    }

    pub fn veins_flow_phase(&self) -> f32 {
        self.veins_phase
    }

    pub fn smoothed_bands(&self) -> FrequencyBands {
        self.smoothed
    }

    pub fn error(&self) -> Option<&OverlayError> {
        self.error.as_ref()
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }
}
