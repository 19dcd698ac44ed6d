use crate::session::ModelSlot;
use std::path::PathBuf;

/// Failures raised by the inference and capture boundaries.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid model metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("failed to download {file} from {repo}: {reason}")]
    Download {
        repo: String,
        file: String,
        reason: String,
    },
    #[error("model file {0} not found and no hub repository configured")]
    MissingModel(PathBuf),
    #[error("model graph missing")]
    MissingGraph,
    #[error("model output {0} missing")]
    MissingOutput(String),
    #[error("unexpected output shape {0:?}")]
    OutputShape(Vec<usize>),
    #[error("expected {expected} class scores, got {got}")]
    ClassCount { expected: usize, got: usize },
    #[error("invalid probability {value} for {label}")]
    Probability { label: String, value: f32 },
    #[error("camera: {0}")]
    Camera(String),
}

/// Errors surfaced by the session controller. Each one is also rendered as
/// an advisory in the view.
#[derive(Debug, thiserror::Error)]
pub enum StyleMateError {
    #[error("failed to load {slot} model: {source}")]
    ModelLoadFailure {
        slot: ModelSlot,
        #[source]
        source: InferenceError,
    },
    #[error("failed to load face detector, face checks are off: {0}")]
    DetectorLoadFailure(#[source] InferenceError),
    #[error("failed to acquire webcam: {0}")]
    FrameSourceAcquisitionFailure(#[source] InferenceError),
    #[error("no model selected")]
    NoModelSelected,
    #[error("no frame available")]
    NoFrameAvailable,
    #[error("failed to decode {path}: {source}")]
    UploadDecodeFailure {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("inference failed: {0}")]
    InferenceFailure(#[from] InferenceError),
    #[error("inference worker is not running")]
    WorkerUnavailable,
}

pub type Result<T, E = StyleMateError> = std::result::Result<T, E>;
