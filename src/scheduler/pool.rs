use super::{join_worker, RunState, WorkerFactory};
use crate::frames::FrameId;
use crossbeam::channel;

/// Pool strategy: up to `workers` threads pull frame ids from a shared
/// queue, so a slow frame never holds up frames queued behind it.
pub(crate) fn run(
    run: &RunState<'_>,
    frames: &[FrameId],
    factory: &dyn WorkerFactory,
    workers: usize,
) {
    let (tx, rx) = channel::unbounded::<&FrameId>();
    for frame in frames {
        let _ = tx.send(frame);
    }
    drop(tx);

    let pool_size = workers.min(frames.len());
    tracing::debug!("Starting {} pool workers", pool_size);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..pool_size)
            .map(|worker_id| {
                let rx = rx.clone();
                (
                    worker_id,
                    scope.spawn(move || run.drive(worker_id, factory, rx.iter())),
                )
            })
            .collect();

        for (worker_id, handle) in handles {
            join_worker(run, worker_id, handle);
        }
    });
}
