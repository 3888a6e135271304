//! Platform-free core of the visualizer: audio analysis, the particle field,
//! the anatomical overlay state machine and the mesh/container types shared
//! with the offline generator.

pub mod analysis;
pub mod bands;
pub mod constants;
pub mod error;
pub mod frame;
pub mod glb;
pub mod mesh;
pub mod overlay;
pub mod particles;
pub mod stereo;

pub use analysis::{AdvancedAnalyzer, AdvancedMetrics, AnalyzerConfig};
pub use bands::{BandExtractor, BandSplit, FrequencyBands};
pub use error::{GlbError, MeshError, OverlayError};
pub use frame::{AudioFrame, AudioPipeline};
pub use mesh::MeshData;
pub use overlay::{HumanOverlay, Layer, OverlayConfig, OverlayState, Pose, PresetId};
pub use particles::{DistributionShape, ParticleField, ParticleSettings};
pub use stereo::{StereoAnalyzer, StereoMetrics};
