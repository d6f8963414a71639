use crate::error::{PipelineError, Result};
use crate::scheduler::Strategy;
use crate::segmentation::{FillPolicy, ModelKind};
use std::path::PathBuf;

/// Environment variable naming the model weight directory
pub const MODEL_HOME_ENV: &str = "U2NET_HOME";

/// Zero-padded numbered frame file names shared by the extractor, the
/// scheduler and the muxer (`frame_0001.png`, `frame_0002.png`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePattern {
    pub prefix: String,
    pub digits: usize,
    pub extension: String,
}

impl Default for FramePattern {
    fn default() -> Self {
        Self {
            prefix: "frame_".to_string(),
            digits: 4,
            extension: "png".to_string(),
        }
    }
}

impl FramePattern {
    /// printf-style pattern understood by ffmpeg's image2 muxer/demuxer
    pub fn ffmpeg_pattern(&self) -> String {
        format!("{}%0{}d.{}", self.prefix, self.digits, self.extension)
    }

    /// File name for a 1-based frame index
    pub fn file_name(&self, index: u32) -> String {
        format!(
            "{}{:0width$}.{}",
            self.prefix,
            index,
            self.extension,
            width = self.digits
        )
    }

    /// Parse the frame index back out of a file name, rejecting anything
    /// that does not follow the pattern.
    pub fn parse_index(&self, name: &str) -> Option<u32> {
        let digits = name
            .strip_prefix(&self.prefix)?
            .strip_suffix(&self.extension)?
            .strip_suffix('.')?;

        if digits.len() < self.digits || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// Encoder settings for the muxer. Defaults produce lossless VP9 with an
/// alpha plane in a WebM container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecParams {
    pub codec: String,
    pub pixel_format: String,
    pub lossless: bool,
    pub quality: String,
    pub cpu_used: u8,
    pub bitrate: String,
}

impl Default for CodecParams {
    fn default() -> Self {
        Self {
            codec: "libvpx-vp9".to_string(),
            pixel_format: "yuva420p".to_string(),
            lossless: true,
            quality: "good".to_string(),
            cpu_used: 0,
            bitrate: "2M".to_string(),
        }
    }
}

impl CodecParams {
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-lossless".to_string(),
            if self.lossless { "1" } else { "0" }.to_string(),
            "-quality".to_string(),
            self.quality.clone(),
            "-cpu-used".to_string(),
            self.cpu_used.to_string(),
            "-b:v".to_string(),
            self.bitrate.clone(),
        ]
    }
}

/// Everything one pipeline run needs, passed in at construction time.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub frame_rate: u32,
    pub input_frames_dir: PathBuf,
    pub output_frames_dir: PathBuf,
    pub output_path: PathBuf,
    pub pattern: FramePattern,
    pub strategy: Strategy,
    pub workers: usize,
    pub fill_policy: FillPolicy,
    pub model: ModelKind,
    pub model_home: PathBuf,
    /// Intra-op threads per ONNX session
    pub session_threads: usize,
    pub codec: CodecParams,
    pub ffmpeg: PathBuf,
    /// Log scheduler progress every this many frames
    pub progress_interval: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            input_frames_dir: PathBuf::from("./input_frames"),
            output_frames_dir: PathBuf::from("./output_frames"),
            output_path: PathBuf::from("output.webm"),
            pattern: FramePattern::default(),
            strategy: Strategy::Pool,
            workers: num_cpus::get(),
            fill_policy: FillPolicy::Transparent,
            model: ModelKind::U2netHumanSeg,
            model_home: default_model_home(),
            session_threads: 1,
            codec: CodecParams::default(),
            ffmpeg: PathBuf::from("ffmpeg"),
            progress_interval: 10,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "worker count must be at least 1".into(),
            ));
        }
        if self.frame_rate == 0 {
            return Err(PipelineError::InvalidConfig(
                "frame rate must be positive".into(),
            ));
        }
        if self.input_frames_dir == self.output_frames_dir {
            return Err(PipelineError::InvalidConfig(
                "input and output frame directories must differ".into(),
            ));
        }
        if self.pattern.digits == 0 || self.pattern.extension.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "frame pattern needs digits and an extension".into(),
            ));
        }
        Ok(())
    }

    /// Full path of the ONNX file for the configured model
    pub fn model_path(&self) -> PathBuf {
        self.model_home.join(self.model.file_name())
    }
}

/// `$U2NET_HOME` if set, otherwise `~/.u2net`
pub fn default_model_home() -> PathBuf {
    if let Some(dir) = std::env::var_os(MODEL_HOME_ENV) {
        return PathBuf::from(dir);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".u2net")
}
