//! Offline generation and validation of the overlay's pose models.

pub mod branching;
pub mod cli;
pub mod export;
pub mod noise;
pub mod parts;
pub mod primitives;
pub mod validate;

pub use cli::{MeshgenArgs, ValidateArgs};
pub use export::{ExportStats, GlbBuilder};
pub use parts::{generate_part, generate_pose, GeneratedPart};
