use anyhow::{Context, Result};
use bgstrip::config::{default_model_home, CodecParams, FramePattern, MODEL_HOME_ENV};
use bgstrip::{FillPolicy, ModelKind, Pipeline, PipelineConfig, Strategy};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Remove the background from every frame of a video", long_about = None)]
struct Args {
    /// Input video to process
    input_video: PathBuf,

    /// Output video path
    #[arg(short, long, default_value = "output.webm")]
    output: PathBuf,

    /// Frames per second to extract and re-encode at
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Parallelization strategy
    #[arg(long, value_enum, default_value_t = Strategy::Pool)]
    strategy: Strategy,

    /// Worker count (defaults to the number of CPUs)
    #[arg(short, long, env = "BGSTRIP_WORKERS")]
    workers: Option<usize>,

    /// Background fill: transparent, white, black or #rrggbb
    #[arg(long, default_value = "transparent")]
    fill: FillPolicy,

    /// Segmentation model variant
    #[arg(long, value_enum, default_value_t = ModelKind::U2netHumanSeg)]
    model: ModelKind,

    /// Directory holding <model>.onnx
    #[arg(long, env = MODEL_HOME_ENV)]
    model_home: Option<PathBuf>,

    /// ONNX Runtime intra-op threads per worker session
    #[arg(long, default_value_t = 1)]
    session_threads: usize,

    /// Working directory for extracted frames
    #[arg(long, default_value = "./input_frames")]
    input_frames_dir: PathBuf,

    /// Working directory for processed frames
    #[arg(long, default_value = "./output_frames")]
    output_frames_dir: PathBuf,

    /// ffmpeg binary to run
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Target video bitrate
    #[arg(long, default_value = "2M")]
    bitrate: String,

    /// Log progress every N frames
    #[arg(long, default_value_t = 10)]
    progress_every: usize,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            frame_rate: self.fps,
            input_frames_dir: self.input_frames_dir,
            output_frames_dir: self.output_frames_dir,
            output_path: self.output,
            pattern: FramePattern::default(),
            strategy: self.strategy,
            workers: self.workers.unwrap_or(defaults.workers),
            fill_policy: self.fill,
            model: self.model,
            model_home: self.model_home.unwrap_or_else(default_model_home),
            session_threads: self.session_threads,
            codec: CodecParams {
                bitrate: self.bitrate,
                ..CodecParams::default()
            },
            ffmpeg: self.ffmpeg,
            progress_interval: self.progress_every,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let input_video = args.input_video.clone();
    let config = args.into_config();

    tracing::info!("bgstrip starting");
    tracing::info!("Input: {}", input_video.display());
    tracing::info!("Model: {} ({})", config.model, config.model_path().display());
    tracing::info!("Fill: {}", config.fill_policy);
    tracing::info!(
        "Strategy: {} with {} workers",
        config.strategy,
        config.workers
    );

    let mut pipeline = Pipeline::new(config).context("Invalid configuration")?;
    pipeline.setup();

    let output = pipeline
        .predict(&input_video)
        .map_err(|err| {
            tracing::error!("{} stage failed", err.stage());
            err
        })
        .with_context(|| format!("Failed to process {}", input_video.display()))?;

    println!("{}", output.display());
    Ok(())
}
