mod ffmpeg_extract;

pub use ffmpeg_extract::FfmpegExtractor;

use crate::config::FramePattern;
use crate::error::Result;
use std::path::Path;

/// Trait for decoders that split a video into numbered still frames
pub trait FrameExtractor {
    /// Decode `input_video` at `frame_rate` into `output_dir`, one file per
    /// frame named by `pattern`, overwriting existing files
    fn extract(
        &self,
        input_video: &Path,
        frame_rate: u32,
        output_dir: &Path,
        pattern: &FramePattern,
    ) -> Result<()>;
}
