use std::io;

use thiserror::Error;

/// Raised when a zero-length vector is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("cannot normalize a zero-length vector")]
pub struct DegenerateVectorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool needs at least one worker")]
    ZeroSize,

    #[error("cannot start a worker pool with an empty queue")]
    EmptyQueue,

    #[error("worker pool dispatcher is no longer running")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render progress requested while no render is running")]
    ProgressQueriedWhileIdle,

    #[error("pixel ({x}, {y}) is outside of the {width}x{height} image")]
    PixelOutOfBounds { x: usize, y: usize, width: usize, height: usize },

    #[error("camera is already rendering a picture")]
    RenderInProgress,

    #[error("image must be at least 1x1 pixels, got {0}x{1}")]
    EmptyImage(usize, usize),

    #[error("unknown shading strategy `{0}`")]
    UnknownStrategy(String),

    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    NoVertices,

    #[error("face {face} refers to vertex {index}, but the mesh has {count}")]
    BadVertexIndex { face: usize, index: usize, count: usize },

    #[error("face {face} refers to normal {index}, but the mesh has {count}")]
    BadNormalIndex { face: usize, index: usize, count: usize },
}

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("line {line}: could not parse `{token}` as a number")]
    BadNumber { line: usize, token: String },

    #[error("line {line}: expected {expected} components")]
    MissingComponents { line: usize, expected: usize },

    #[error("line {line}: index {index} does not refer to a defined {kind}")]
    BadIndex { line: usize, index: usize, kind: &'static str },

    #[error("line {line}: a face needs at least three vertices")]
    TooFewVertices { line: usize },

    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("could not parse scene description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not load mesh `{path}`: {source}")]
    Mesh { path: String, source: ObjError },

    #[error("{0}")]
    Degenerate(#[from] DegenerateVectorError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
