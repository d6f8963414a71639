use super::FrameMuxer;
use crate::config::{CodecParams, FramePattern};
use crate::error::{PipelineError, Result};
use crate::ffmpeg::run_tool;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Encodes frames with the ffmpeg command line tool
pub struct FfmpegMuxer {
    binary: PathBuf,
}

impl FfmpegMuxer {
    pub fn new<P: AsRef<Path>>(binary: P) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    pub(crate) fn command(
        &self,
        input_dir: &Path,
        frame_rate: u32,
        pattern: &FramePattern,
        output_video: &Path,
        codec: &CodecParams,
    ) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("-y")
            .arg("-framerate")
            .arg(frame_rate.to_string())
            .arg("-i")
            .arg(input_dir.join(pattern.ffmpeg_pattern()))
            .args(codec.to_args())
            .arg(output_video);
        command
    }
}

impl FrameMuxer for FfmpegMuxer {
    fn mux(
        &self,
        input_dir: &Path,
        frame_rate: u32,
        pattern: &FramePattern,
        output_video: &Path,
        codec: &CodecParams,
    ) -> Result<()> {
        tracing::info!(
            "Reassembling video from frames into {} ({})",
            output_video.display(),
            codec.codec
        );
        run_tool(self.command(input_dir, frame_rate, pattern, output_video, codec))
            .map_err(PipelineError::Mux)
    }
}
