//! Frame-parallel background removal.
//!
//! Every frame of a frame set is read from a [`FrameStore`], handed to a
//! [`FrameProcessor`] and written back under the same name. Three strategies
//! spread that work over OS threads:
//!
//! * [`Strategy::Pool`]: `min(W, N)` workers pull frames from a shared queue.
//! * [`Strategy::Static`]: `W` workers each own one contiguous chunk.
//! * [`Strategy::Sequential`]: one worker in the calling thread.
//!
//! Each worker creates its processor once through a [`WorkerFactory`] and
//! reuses it for all of its frames. The first failure stops every worker from
//! taking new frames; in-flight frames finish before the error is returned.

mod partition;
mod pool;
mod sequential;

pub use partition::partition;

use crate::error::{PipelineError, Result, SegmentationError};
use crate::frames::{FrameId, FrameStore};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Turns one encoded frame into its processed counterpart
pub trait FrameProcessor {
    fn process(&mut self, frame_bytes: &[u8]) -> Result<Vec<u8>, SegmentationError>;
}

impl<F> FrameProcessor for F
where
    F: FnMut(&[u8]) -> Result<Vec<u8>, SegmentationError>,
{
    fn process(&mut self, frame_bytes: &[u8]) -> Result<Vec<u8>, SegmentationError> {
        self(frame_bytes)
    }
}

/// Builds the processor a worker keeps for its whole lifetime.
///
/// Called from inside the worker's thread, at most once per worker id.
pub trait WorkerFactory: Sync {
    fn create_worker(&self, worker_id: usize)
        -> Result<Box<dyn FrameProcessor>, SegmentationError>;
}

impl<F> WorkerFactory for F
where
    F: Fn(usize) -> Result<Box<dyn FrameProcessor>, SegmentationError> + Sync,
{
    fn create_worker(
        &self,
        worker_id: usize,
    ) -> Result<Box<dyn FrameProcessor>, SegmentationError> {
        self(worker_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// Long-lived workers pulling from a shared queue
    Pool,
    /// One contiguous chunk per worker
    Static,
    /// Everything in the calling thread
    Sequential,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pool => "pool",
            Self::Static => "static",
            Self::Sequential => "sequential",
        })
    }
}

/// Cooperative cancellation shared between a caller and a running batch.
///
/// Workers check it before starting each frame. Frames already being
/// processed still complete, so no half-written output is left behind.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_total: usize,
    pub frames_processed: usize,
    pub elapsed: Duration,
}

pub struct Scheduler {
    strategy: Strategy,
    workers: usize,
    progress_interval: usize,
}

impl Scheduler {
    pub fn new(strategy: Strategy, workers: usize) -> Self {
        Self {
            strategy,
            workers,
            progress_interval: 10,
        }
    }

    pub fn with_progress_interval(mut self, frames: usize) -> Self {
        self.progress_interval = frames.max(1);
        self
    }

    /// List the store's frames and process all of them
    pub fn run(
        &self,
        store: &dyn FrameStore,
        factory: &dyn WorkerFactory,
        cancel: &CancelToken,
    ) -> Result<RunSummary> {
        let frames = store.list().map_err(PipelineError::FrameListing)?;
        self.run_frames(&frames, store, factory, cancel)
    }

    /// Process exactly `frames`, each once, blocking until all workers exit
    pub fn run_frames(
        &self,
        frames: &[FrameId],
        store: &dyn FrameStore,
        factory: &dyn WorkerFactory,
        cancel: &CancelToken,
    ) -> Result<RunSummary> {
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "scheduler needs at least one worker".into(),
            ));
        }

        let start = Instant::now();
        if frames.is_empty() {
            tracing::info!("No frames to process");
            return Ok(RunSummary {
                frames_total: 0,
                frames_processed: 0,
                elapsed: start.elapsed(),
            });
        }

        tracing::info!(
            "Processing {} frames with {} workers ({} strategy)",
            frames.len(),
            self.workers,
            self.strategy
        );

        let run = RunState::new(store, cancel, frames.len(), self.progress_interval);
        match self.strategy {
            Strategy::Pool => pool::run(&run, frames, factory, self.workers),
            Strategy::Static => partition::run(&run, frames, factory, self.workers),
            Strategy::Sequential => sequential::run(&run, frames, factory),
        }
        run.finish(start.elapsed())
    }
}

/// State shared by every worker of one batch
pub(crate) struct RunState<'a> {
    store: &'a dyn FrameStore,
    cancel: &'a CancelToken,
    failed: AtomicBool,
    first_error: Mutex<Option<PipelineError>>,
    processed: AtomicUsize,
    total: usize,
    progress_interval: usize,
}

impl<'a> RunState<'a> {
    fn new(
        store: &'a dyn FrameStore,
        cancel: &'a CancelToken,
        total: usize,
        progress_interval: usize,
    ) -> Self {
        Self {
            store,
            cancel,
            failed: AtomicBool::new(false),
            first_error: Mutex::new(None),
            processed: AtomicUsize::new(0),
            total,
            progress_interval: progress_interval.max(1),
        }
    }

    fn should_stop(&self) -> bool {
        self.failed.load(Ordering::SeqCst) || self.cancel.is_cancelled()
    }

    /// Keep the first error only; later ones are logged and dropped
    pub(crate) fn record_error(&self, err: PipelineError) {
        self.failed.store(true, Ordering::SeqCst);
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        } else {
            tracing::debug!("Dropping later error: {}", err);
        }
    }

    /// Run one worker over `frames` until they run out or the batch stops.
    ///
    /// The processor is only created once there is a frame to give it.
    pub(crate) fn drive<'f, I>(&self, worker_id: usize, factory: &dyn WorkerFactory, frames: I)
    where
        I: IntoIterator<Item = &'f FrameId>,
    {
        let mut frames = frames.into_iter().peekable();
        if frames.peek().is_none() || self.should_stop() {
            return;
        }

        let created = panic::catch_unwind(AssertUnwindSafe(|| factory.create_worker(worker_id)));
        let mut worker = match created {
            Ok(Ok(worker)) => worker,
            Err(payload) => {
                tracing::error!(
                    "Worker {} panicked while starting: {}",
                    worker_id,
                    panic_message(payload.as_ref())
                );
                self.record_error(PipelineError::WorkerPanicked { worker: worker_id });
                return;
            }
            Ok(Err(source)) => {
                tracing::error!("Worker {} failed to start: {}", worker_id, source);
                self.record_error(PipelineError::SessionInit {
                    worker: worker_id,
                    source,
                });
                return;
            }
        };

        let mut handled = 0usize;
        for frame in frames {
            if self.should_stop() {
                break;
            }
            if let Err(err) = self.process_frame(worker.as_mut(), frame) {
                tracing::error!("Worker {}: {}", worker_id, err);
                self.record_error(err);
                break;
            }
            handled += 1;
        }

        tracing::debug!("Worker {} finished after {} frames", worker_id, handled);
    }

    fn process_frame(&self, worker: &mut dyn FrameProcessor, frame: &FrameId) -> Result<()> {
        let io_err = |source| PipelineError::FrameIo {
            frame: frame.name.clone(),
            source,
        };

        let input = self.store.read(frame).map_err(io_err)?;
        tracing::debug!("Removing background from {}", frame);
        let output = match panic::catch_unwind(AssertUnwindSafe(|| worker.process(&input))) {
            Ok(result) => result.map_err(|source| PipelineError::Segmentation {
                frame: frame.name.clone(),
                source,
            })?,
            Err(payload) => {
                return Err(PipelineError::FramePanicked {
                    frame: frame.name.clone(),
                    message: panic_message(payload.as_ref()),
                })
            }
        };
        self.store.write(frame, &output).map_err(io_err)?;

        let done = self.processed.fetch_add(1, Ordering::SeqCst) + 1;
        if done % self.progress_interval == 0 || done == self.total {
            tracing::info!("Processed {}/{} frames", done, self.total);
        }
        Ok(())
    }

    fn finish(self, elapsed: Duration) -> Result<RunSummary> {
        let first_error = self
            .first_error
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(err) = first_error {
            return Err(err);
        }

        let processed = self.processed.into_inner();
        if processed < self.total && self.cancel.is_cancelled() {
            tracing::warn!(
                "Cancelled after {}/{} frames",
                processed,
                self.total
            );
            return Err(PipelineError::Cancelled);
        }

        tracing::info!(
            "Processed {} frames in {:.1}s",
            processed,
            elapsed.as_secs_f64()
        );
        Ok(RunSummary {
            frames_total: self.total,
            frames_processed: processed,
            elapsed,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Join a scoped worker, turning a panic that escaped `drive` into a
/// recorded error
pub(crate) fn join_worker(
    run: &RunState<'_>,
    worker_id: usize,
    handle: std::thread::ScopedJoinHandle<'_, ()>,
) {
    if handle.join().is_err() {
        tracing::error!("Worker {} panicked", worker_id);
        run.record_error(PipelineError::WorkerPanicked { worker: worker_id });
    }
}
