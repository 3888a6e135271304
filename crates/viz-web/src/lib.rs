#![cfg(target_arch = "wasm32")]
//! Browser surface of the visualizer.
//!
//! The host page owns the audio graph and the scene graph. Each animation
//! frame it calls [`Visualizer::frame`] and uploads the buffers exposed here;
//! pose containers for the overlay are fetched from `models_base`.

mod audio;
mod loader;

use instant::Instant;
use js_sys::{Float32Array, Promise};
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::Rc;
use viz_core::overlay::{LoadOutcome, LoadRequest};
use viz_core::particles::LineVertex;
use viz_core::{
    AnalyzerConfig, AudioPipeline, DistributionShape, HumanOverlay, Layer, OverlayConfig,
    ParticleField, ParticleSettings, Pose,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys as web;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("viz-web starting");
    Ok(())
}

#[derive(Deserialize)]
#[serde(default)]
struct VisualizerSettings {
    analysis: AnalyzerConfig,
    particles: ParticleSettings,
    overlay: OverlayConfig,
    stereo: bool,
    advanced: bool,
    models_base: String,
}

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            analysis: AnalyzerConfig::default(),
            particles: ParticleSettings::default(),
            overlay: OverlayConfig::default(),
            stereo: false,
            advanced: true,
            models_base: "models".into(),
        }
    }
}

struct Inner {
    pipeline: AudioPipeline,
    field: ParticleField,
    overlay: HumanOverlay,
    taps: audio::AnalyserTaps,
    fft_size: usize,
    models_base: String,
    clock: Instant,
    last_tick: Option<f64>,
}

impl Inner {
    fn tick(&mut self) {
        let now = self.clock.elapsed().as_secs_f64();
        let dt = self.last_tick.map_or(0.0, |t| (now - t).max(0.0)) as f32;
        self.last_tick = Some(now);

        let data = self.taps.read();
        let frame = *self.pipeline.analyze(data.mono, data.stereo, now);
        self.field.update(&frame.bands);
        self.overlay
            .update_frequency_bands(frame.bands.bass, frame.bands.mid, frame.bands.high);
        self.overlay.update(dt);
    }
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn line_buffer(lines: &[LineVertex]) -> Float32Array {
    Float32Array::from(bytemuck::cast_slice::<LineVertex, f32>(lines))
}

// Perform a pose load and hand the result back to the overlay. Resolves to
// `true` when the geometry was applied and `false` when the request went stale.
fn run_load(inner: Rc<RefCell<Inner>>, request: LoadRequest) -> Promise {
    future_to_promise(async move {
        let base = inner.borrow().models_base.clone();
        let result = loader::fetch_pose(&base, request.pose)
            .await
            .map_err(|e| format!("{e:#}"));
        let outcome = inner.borrow_mut().overlay.finish_load(request, result);
        match outcome {
            Ok(LoadOutcome::Applied) => Ok(JsValue::TRUE),
            Ok(LoadOutcome::Ignored) => Ok(JsValue::FALSE),
            Err(e) => Err(js_err(e)),
        }
    })
}

fn resolved() -> Promise {
    Promise::resolve(&JsValue::TRUE)
}

#[wasm_bindgen]
pub struct Visualizer {
    inner: Rc<RefCell<Inner>>,
}

#[wasm_bindgen]
impl Visualizer {
    /// `settings_json` may be omitted or partial; missing fields take defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>) -> Result<Visualizer, JsValue> {
        let settings: VisualizerSettings = match settings_json.as_deref() {
            Some(s) if !s.trim().is_empty() => serde_json::from_str(s).map_err(js_err)?,
            _ => VisualizerSettings::default(),
        };
        let fft_size = settings.analysis.fft_size;
        let mut pipeline = AudioPipeline::new(settings.analysis);
        pipeline.set_stereo_enabled(settings.stereo);
        pipeline.set_advanced_enabled(settings.advanced);
        let field = ParticleField::new(settings.particles);
        log::info!(
            "[visualizer] {} particles, shape={}",
            field.len(),
            field.settings().shape.name()
        );
        Ok(Visualizer {
            inner: Rc::new(RefCell::new(Inner {
                pipeline,
                field,
                overlay: HumanOverlay::new(settings.overlay),
                taps: audio::AnalyserTaps::default(),
                fft_size,
                models_base: settings.models_base,
                clock: Instant::now(),
                last_tick: None,
            })),
        })
    }

    pub fn attach_analysers(
        &self,
        mono: Option<web::AnalyserNode>,
        left: Option<web::AnalyserNode>,
        right: Option<web::AnalyserNode>,
    ) {
        let mut inner = self.inner.borrow_mut();
        let fft = inner.fft_size;
        inner.taps.attach(mono, left, right, fft);
        let stereo = inner.taps.has_stereo();
        inner.pipeline.set_stereo_enabled(stereo);
    }

    /// One analysis pass, particle update and overlay update.
    pub fn frame(&self) {
        self.inner.borrow_mut().tick();
    }

    pub fn particle_count(&self) -> u32 {
        self.inner.borrow().field.len() as u32
    }

    pub fn positions(&self) -> Float32Array {
        Float32Array::from(self.inner.borrow().field.positions_flat())
    }

    pub fn colors(&self) -> Float32Array {
        Float32Array::from(self.inner.borrow().field.colors_flat())
    }

    pub fn point_size(&self) -> f32 {
        self.inner.borrow().field.point_size()
    }

    pub fn rotation(&self) -> f32 {
        self.inner.borrow().field.rotation()
    }

    /// Interleaved `x, y, z, r, g, b, a` per vertex, two vertices per segment.
    pub fn trail_lines(&self) -> Float32Array {
        line_buffer(self.inner.borrow().field.trail_lines())
    }

    pub fn trail_vertex_count(&self) -> u32 {
        self.inner.borrow().field.trail_lines().len() as u32
    }

    pub fn connection_lines(&self) -> Float32Array {
        line_buffer(self.inner.borrow().field.connection_lines())
    }

    pub fn connection_vertex_count(&self) -> u32 {
        self.inner.borrow().field.connection_lines().len() as u32
    }

    pub fn bands(&self) -> Float32Array {
        let inner = self.inner.borrow();
        Float32Array::from(&inner.pipeline.last().bands.as_array()[..])
    }

    pub fn is_beat(&self) -> bool {
        self.inner.borrow().pipeline.last().metrics.is_beat
    }

    pub fn beat_intensity(&self) -> f32 {
        self.inner.borrow().pipeline.last().metrics.beat_intensity
    }

    pub fn bpm(&self) -> f32 {
        self.inner.borrow().pipeline.last().metrics.bpm
    }

    pub fn is_onset(&self) -> bool {
        self.inner.borrow().pipeline.last().metrics.is_onset
    }

    pub fn dominant_note(&self) -> Option<String> {
        let inner = self.inner.borrow();
        let chroma = inner.pipeline.last().metrics.chroma?;
        Some(chroma.dominant_name().to_string())
    }

    pub fn stereo_width(&self) -> f32 {
        self.inner.borrow().pipeline.last().stereo.stereo_width
    }

    pub fn panning(&self) -> f32 {
        self.inner.borrow().pipeline.last().stereo.panning
    }

    /// Clear all analysis history, e.g. on track change.
    pub fn reset_analysis(&self) {
        self.inner.borrow_mut().pipeline.reset();
    }

    pub fn set_sensitivity(&self, sensitivity: f32) {
        self.inner
            .borrow_mut()
            .pipeline
            .advanced_mut()
            .set_sensitivity(sensitivity);
    }

    pub fn set_chroma_enabled(&self, enabled: bool) {
        self.inner
            .borrow_mut()
            .pipeline
            .advanced_mut()
            .set_chroma_enabled(enabled);
    }

    pub fn set_particle_count(&self, count: u32) {
        self.inner
            .borrow_mut()
            .field
            .set_particle_count(count as usize);
    }

    pub fn set_shape(&self, shape: &str) -> Result<(), JsValue> {
        let shape: DistributionShape = shape.parse().map_err(|e: String| js_err(e))?;
        let mut inner = self.inner.borrow_mut();
        let expansion = inner.field.settings().expansion;
        inner.field.initialize(shape, expansion);
        Ok(())
    }

    /// Replace particle settings from JSON; missing fields take defaults.
    pub fn update_particle_settings(&self, settings_json: &str) -> Result<(), JsValue> {
        let settings: ParticleSettings = serde_json::from_str(settings_json).map_err(js_err)?;
        self.inner.borrow_mut().field.update_settings(settings);
        Ok(())
    }

    /// Resolves once the current pose is loaded and shown (`true`), or
    /// immediately when nothing needs loading.
    pub fn set_overlay_enabled(&self, enabled: bool) -> Promise {
        let request = self.inner.borrow_mut().overlay.set_enabled(enabled);
        match request {
            Some(req) => run_load(self.inner.clone(), req),
            None => resolved(),
        }
    }

    pub fn set_pose(&self, pose: &str) -> Result<Promise, JsValue> {
        let request = self.inner.borrow_mut().overlay.set_pose(pose).map_err(js_err)?;
        Ok(match request {
            Some(req) => run_load(self.inner.clone(), req),
            None => resolved(),
        })
    }

    pub fn set_preset(&self, preset: &str) -> Result<(), JsValue> {
        self.inner
            .borrow_mut()
            .overlay
            .set_preset(preset)
            .map_err(js_err)
    }

    pub fn overlay_state(&self) -> String {
        format!("{:?}", self.inner.borrow().overlay.state()).to_lowercase()
    }

    pub fn overlay_error(&self) -> Option<String> {
        self.inner.borrow().overlay.error().map(|e| e.to_string())
    }

    pub fn current_pose(&self) -> String {
        self.inner.borrow().overlay.current_pose().name().to_string()
    }

    pub fn overlay_blend(&self) -> f32 {
        self.inner.borrow().overlay.blend()
    }

    pub fn pose_visible(&self, pose: &str) -> bool {
        pose.parse::<Pose>()
            .map(|p| self.inner.borrow().overlay.is_pose_visible(p))
            .unwrap_or(false)
    }

    /// Edge lines of one overlay layer as `x, y, z` pairs, or `undefined`
    /// when that layer is not loaded.
    pub fn layer_lines(&self, pose: &str, layer: &str) -> Option<Float32Array> {
        let (pose, layer) = (pose.parse::<Pose>().ok()?, layer.parse::<Layer>().ok()?);
        let inner = self.inner.borrow();
        inner
            .overlay
            .layer_lines(pose, layer)
            .map(Float32Array::from)
    }

    pub fn layer_opacity(&self, pose: &str, layer: &str) -> f32 {
        match (pose.parse::<Pose>(), layer.parse::<Layer>()) {
            (Ok(p), Ok(l)) => self.inner.borrow().overlay.layer_opacity(p, l),
            _ => 0.0,
        }
    }

    pub fn heart_scale(&self, pose: &str) -> f32 {
        pose.parse::<Pose>()
            .map(|p| self.inner.borrow().overlay.heart_scale(p))
            .unwrap_or(1.0)
    }

    pub fn veins_flow_phase(&self) -> f32 {
        self.inner.borrow().overlay.veins_flow_phase()
    }
}
