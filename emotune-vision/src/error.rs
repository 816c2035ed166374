use std::path::PathBuf;

use thiserror::Error;

use crate::region::FaceRegion;

/// Failures surfaced by the inference pipeline.
///
/// "No face detected" is not in here: it is reported as
/// [`crate::pipeline::Outcome::NoFace`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("classifier runtime used before it was initialized")]
    ModelNotLoaded,

    #[error("classifier runtime is already initialized")]
    AlreadyInitialized,

    #[error("face region {region} is empty inside a {width}x{height} image")]
    InvalidRegion {
        region: FaceRegion,
        width: u32,
        height: u32,
    },

    #[error("arg-max index {index} has no label ({num_labels} labels loaded)")]
    UnknownIndex { index: usize, num_labels: usize },

    #[error("prediction vector is empty")]
    EmptyPrediction,

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("artifact {}: {reason}", .path.display())]
    Artifact { path: PathBuf, reason: String },

    #[error("camera: {0}")]
    Camera(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Tensor(#[from] ndarray::ShapeError),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

impl Error {
    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Artifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn inference(err: impl ToString) -> Self {
        Error::Inference(err.to_string())
    }

    /// True for conditions caused by the caller's input rather than by the
    /// runtime or its artifacts.
    pub fn is_bad_input(&self) -> bool {
        matches!(self, Error::InvalidRegion { .. } | Error::DecodeFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
