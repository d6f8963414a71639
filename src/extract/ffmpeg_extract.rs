use super::FrameExtractor;
use crate::config::FramePattern;
use crate::error::{PipelineError, Result};
use crate::ffmpeg::run_tool;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Extracts RGB frames with the ffmpeg command line tool
pub struct FfmpegExtractor {
    binary: PathBuf,
}

impl FfmpegExtractor {
    pub fn new<P: AsRef<Path>>(binary: P) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    pub(crate) fn command(
        &self,
        input_video: &Path,
        frame_rate: u32,
        output_dir: &Path,
        pattern: &FramePattern,
    ) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("-y")
            .arg("-i")
            .arg(input_video)
            .arg("-vf")
            .arg(format!("fps={frame_rate}"))
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg(output_dir.join(pattern.ffmpeg_pattern()));
        command
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn extract(
        &self,
        input_video: &Path,
        frame_rate: u32,
        output_dir: &Path,
        pattern: &FramePattern,
    ) -> Result<()> {
        tracing::info!(
            "Splitting {} into frames at {} fps",
            input_video.display(),
            frame_rate
        );
        run_tool(self.command(input_video, frame_rate, output_dir, pattern))
            .map_err(PipelineError::Extraction)
    }
}
