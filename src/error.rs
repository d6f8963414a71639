use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised by a single segmentation worker while turning one encoded
/// frame into its background-removed counterpart.
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// Input bytes are not a decodable image
    #[error("failed to decode frame: {0}")]
    Decode(#[source] image::ImageError),

    /// Model session failed or returned something unusable
    #[error("model error: {0}")]
    Model(String),

    /// The ONNX file for the requested model is not on disk
    #[error("model file not found at {}", .0.display())]
    ModelMissing(PathBuf),

    /// Result could not be encoded back to PNG
    #[error("failed to encode frame: {0}")]
    Encode(#[source] image::ImageError),
}

impl From<ndarray::ShapeError> for SegmentationError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Model(format!("unexpected tensor shape: {err}"))
    }
}

/// Pipeline-level failures. Any of these aborts the whole prediction.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to prepare working directory {}: {source}", path.display())]
    DirectorySetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("frame extraction failed: {0}")]
    Extraction(#[source] ToolError),

    #[error("segmentation failed for frame {frame}: {source}")]
    Segmentation {
        frame: String,
        #[source]
        source: SegmentationError,
    },

    #[error("could not list frames: {0}")]
    FrameListing(#[source] std::io::Error),

    #[error("i/o error on frame {frame}: {source}")]
    FrameIo {
        frame: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {worker} could not open a model session: {source}")]
    SessionInit {
        worker: usize,
        #[source]
        source: SegmentationError,
    },

    #[error("worker panicked on frame {frame}: {message}")]
    FramePanicked { frame: String, message: String },

    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("run was cancelled")]
    Cancelled,

    #[error("{missing} of {total} frames have no output, first missing is {first}")]
    IncompleteOutput {
        missing: usize,
        total: usize,
        first: String,
    },

    #[error("muxing failed: {0}")]
    Mux(#[source] ToolError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Name of the pipeline stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            Self::DirectorySetup { .. } => "directory setup",
            Self::Extraction(_) => "extraction",
            Self::Segmentation { .. }
            | Self::FrameListing(_)
            | Self::FrameIo { .. }
            | Self::SessionInit { .. }
            | Self::FramePanicked { .. }
            | Self::WorkerPanicked { .. }
            | Self::Cancelled
            | Self::IncompleteOutput { .. } => "segmentation",
            Self::Mux(_) => "mux",
            Self::InvalidConfig(_) => "configuration",
        }
    }

    /// Frame identifier carried by frame-level failures
    pub fn frame(&self) -> Option<&str> {
        match self {
            Self::Segmentation { frame, .. }
            | Self::FrameIo { frame, .. }
            | Self::FramePanicked { frame, .. } => Some(frame),
            _ => None,
        }
    }
}

/// Failure of an external codec tool invocation
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
