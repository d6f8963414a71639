mod ffmpeg_mux;

pub use ffmpeg_mux::FfmpegMuxer;

use crate::config::{CodecParams, FramePattern};
use crate::error::Result;
use std::path::Path;

/// Trait for encoders that reassemble numbered frames into a video
pub trait FrameMuxer {
    /// Encode the frames in `input_dir`, in ascending index order, into
    /// `output_video`, overwriting it if present
    fn mux(
        &self,
        input_dir: &Path,
        frame_rate: u32,
        pattern: &FramePattern,
        output_video: &Path,
        codec: &CodecParams,
    ) -> Result<()>;
}
