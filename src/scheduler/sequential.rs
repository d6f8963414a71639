use super::{RunState, WorkerFactory};
use crate::frames::FrameId;

/// Sequential strategy: a single worker in the calling thread, in listing
/// order.
pub(crate) fn run(run: &RunState<'_>, frames: &[FrameId], factory: &dyn WorkerFactory) {
    run.drive(0, factory, frames);
}
