use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    #[error("position buffer length {0} is not a multiple of 3")]
    PositionStride(usize),
    #[error("normal buffer length {normals} does not match position length {positions}")]
    NormalLength { normals: usize, positions: usize },
    #[error("triangle list length {0} is not a multiple of 3")]
    IndexStride(usize),
    #[error("index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
    #[error("mesh contains non-finite positions")]
    NonFinite,
}

#[derive(Debug, Error)]
pub enum GlbError {
    #[error("container too short ({0} bytes)")]
    Truncated(usize),
    #[error("bad magic, not a binary glTF container")]
    BadMagic,
    #[error("unsupported glTF version {0}")]
    Version(u32),
    #[error("declared length {declared} does not match actual length {actual}")]
    Length { declared: usize, actual: usize },
    #[error("missing {0} chunk")]
    MissingChunk(&'static str),
    #[error("invalid JSON chunk: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node references missing mesh {0}")]
    MissingMesh(usize),
    #[error("accessor {0}: {1}")]
    Accessor(usize, &'static str),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OverlayError {
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("unknown pose '{0}'")]
    UnknownPose(String),
    #[error("failed to load pose '{pose}': {reason}")]
    LoadFailed { pose: &'static str, reason: String },
    #[error("pose '{0}' contains none of the required layers")]
    NoLayers(&'static str),
}
