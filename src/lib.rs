//! Remove the background from every frame of a video and re-encode the
//! result with an alpha channel.
//!
//! The work is split into an ffmpeg frame extractor, a frame-parallel
//! scheduler driving one ONNX segmentation session per worker, and an ffmpeg
//! muxer, sequenced by [`Pipeline`].

pub mod config;
pub mod error;
pub mod extract;
mod ffmpeg;
pub mod frames;
pub mod mux;
pub mod pipeline;
pub mod scheduler;
pub mod segmentation;

pub use config::{CodecParams, FramePattern, PipelineConfig};
pub use error::{PipelineError, SegmentationError, ToolError};
pub use frames::{DirFrameStore, FrameId, FrameStore};
pub use pipeline::Pipeline;
pub use scheduler::{CancelToken, RunSummary, Scheduler, Strategy};
pub use segmentation::{FillPolicy, ModelKind};
