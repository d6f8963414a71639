use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::extract::{FfmpegExtractor, FrameExtractor};
use crate::frames::{reset_dir, DirFrameStore, FrameStore};
use crate::mux::{FfmpegMuxer, FrameMuxer};
use crate::scheduler::{CancelToken, RunSummary, Scheduler, WorkerFactory};
use crate::segmentation::RemoverFactory;
use std::fs;
use std::path::{Path, PathBuf};

/// What `setup` found in the model weight directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHomeReport {
    pub path: PathBuf,
    pub exists: bool,
    /// (file name, size in bytes), sorted by name
    pub files: Vec<(String, u64)>,
}

/// Look at the model directory without loading anything
pub fn inspect_model_home(path: &Path) -> ModelHomeReport {
    let mut files = Vec::new();
    let exists = path.is_dir();

    if exists {
        match fs::read_dir(path) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                    files.push((entry.file_name().to_string_lossy().into_owned(), size));
                }
            }
            Err(err) => tracing::warn!("Could not read {}: {}", path.display(), err),
        }
        files.sort();
    }

    ModelHomeReport {
        path: path.to_path_buf(),
        exists,
        files,
    }
}

/// Extract, segment and remux one video per `predict` call.
///
/// Owns both working directories for the duration of a call; concurrent
/// calls against the same directories must be serialized by the caller.
pub struct Pipeline {
    config: PipelineConfig,
    extractor: Box<dyn FrameExtractor>,
    muxer: Box<dyn FrameMuxer>,
    factory: Box<dyn WorkerFactory>,
    cancel: CancelToken,
    model_report: Option<ModelHomeReport>,
}

impl Pipeline {
    /// Pipeline using ffmpeg for both codec steps and ONNX sessions for
    /// segmentation
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let factory = RemoverFactory {
            kind: config.model,
            model_path: config.model_path(),
            intra_threads: config.session_threads,
            fill: config.fill_policy,
        };
        let extractor = FfmpegExtractor::new(&config.ffmpeg);
        let muxer = FfmpegMuxer::new(&config.ffmpeg);
        Self::with_components(
            config,
            Box::new(extractor),
            Box::new(muxer),
            Box::new(factory),
        )
    }

    pub fn with_components(
        config: PipelineConfig,
        extractor: Box<dyn FrameExtractor>,
        muxer: Box<dyn FrameMuxer>,
        factory: Box<dyn WorkerFactory>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            extractor,
            muxer,
            factory,
            cancel: CancelToken::new(),
            model_report: None,
        })
    }

    /// Token that aborts the frame batch of a running `predict`
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Log where model weights are expected and what is there. Runs once;
    /// later calls return the first report.
    pub fn setup(&mut self) -> &ModelHomeReport {
        let config = &self.config;
        self.model_report.get_or_insert_with(|| {
            tracing::info!("Setting up session");
            let home = &config.model_home;
            tracing::info!("Checking model exists at {}", home.display());

            let report = inspect_model_home(home);
            if report.exists {
                for (name, size) in &report.files {
                    tracing::info!("{} - {}b", name, size);
                }
            } else {
                tracing::warn!("Directory {} does not exist", home.display());
            }

            let model_path = config.model_path();
            if !model_path.is_file() {
                tracing::warn!(
                    "Model {} not found at {}",
                    config.model,
                    model_path.display()
                );
            }
            report
        })
    }

    /// Remove the background from every frame of `input_video` and return the
    /// path of the re-encoded video. Any failure aborts the whole call.
    pub fn predict(&mut self, input_video: &Path) -> Result<PathBuf> {
        self.setup();
        let config = &self.config;

        tracing::info!("Creating directories");
        reset_dir(&config.input_frames_dir)?;
        reset_dir(&config.output_frames_dir)?;
        remove_stale_output(&config.output_path)?;

        self.extractor.extract(
            input_video,
            config.frame_rate,
            &config.input_frames_dir,
            &config.pattern,
        )?;

        let summary = self.remove_backgrounds()?;
        if summary.frames_total == 0 {
            tracing::warn!("No frames were extracted from {}", input_video.display());
        }

        self.muxer.mux(
            &config.output_frames_dir,
            config.frame_rate,
            &config.pattern,
            &config.output_path,
            &config.codec,
        )?;

        tracing::info!("Remove background process finished successfully");
        Ok(config.output_path.clone())
    }

    fn remove_backgrounds(&self) -> Result<RunSummary> {
        let config = &self.config;
        let store = DirFrameStore::new(
            &config.input_frames_dir,
            &config.output_frames_dir,
            config.pattern.clone(),
        );
        let frames = store.list().map_err(PipelineError::FrameListing)?;

        let summary = Scheduler::new(config.strategy, config.workers)
            .with_progress_interval(config.progress_interval)
            .run_frames(&frames, &store, self.factory.as_ref(), &self.cancel)?;

        let missing = store.missing_outputs(&frames);
        if let Some(first) = missing.first() {
            return Err(PipelineError::IncompleteOutput {
                missing: missing.len(),
                total: frames.len(),
                first: first.name.clone(),
            });
        }
        Ok(summary)
    }
}

fn remove_stale_output(path: &Path) -> Result<()> {
    if path.exists() {
        tracing::info!("Removing previous output {}", path.display());
        fs::remove_file(path).map_err(|source| PipelineError::DirectorySetup {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
