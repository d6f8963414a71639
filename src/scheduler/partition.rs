use super::{join_worker, RunState, WorkerFactory};
use crate::frames::FrameId;
use std::ops::Range;

/// Split `n` frames into exactly `workers` contiguous ranges of
/// `ceil(n / workers)` frames. Trailing ranges may be short or empty; no
/// range ever reaches past `n`.
pub fn partition(n: usize, workers: usize) -> Vec<Range<usize>> {
    if workers == 0 {
        return Vec::new();
    }

    let chunk_size = n.div_ceil(workers);
    (0..workers)
        .map(|i| {
            let start = (i * chunk_size).min(n);
            let end = ((i + 1) * chunk_size).min(n);
            start..end
        })
        .collect()
}

/// Static-partition strategy: one thread per chunk, each walking its chunk
/// strictly in order.
pub(crate) fn run(
    run: &RunState<'_>,
    frames: &[FrameId],
    factory: &dyn WorkerFactory,
    workers: usize,
) {
    let chunks = partition(frames.len(), workers);
    for (worker_id, chunk) in chunks.iter().enumerate() {
        tracing::debug!(
            "Worker {} takes frames {}..{}",
            worker_id,
            chunk.start,
            chunk.end
        );
    }

    std::thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .into_iter()
            .enumerate()
            .map(|(worker_id, chunk)| {
                let slice = &frames[chunk];
                (
                    worker_id,
                    scope.spawn(move || run.drive(worker_id, factory, slice)),
                )
            })
            .collect();

        for (worker_id, handle) in handles {
            join_worker(run, worker_id, handle);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(n: usize, w: usize) -> Vec<usize> {
        partition(n, w).iter().map(|r| r.len()).collect()
    }

    #[test]
    fn three_frames_two_workers() {
        assert_eq!(partition(3, 2), vec![0..2, 2..3]);
    }

    #[test]
    fn even_split() {
        assert_eq!(sizes(8, 4), [2, 2, 2, 2]);
        assert_eq!(sizes(10, 1), [10]);
    }

    #[test]
    fn fewer_frames_than_workers_leaves_empty_chunks() {
        assert_eq!(partition(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
        assert_eq!(partition(0, 3), vec![0..0, 0..0, 0..0]);
    }

    #[test]
    fn chunks_cover_every_frame_once_and_stay_in_bounds() {
        for n in 0..40 {
            for w in 1..10 {
                let ranges = partition(n, w);
                assert_eq!(ranges.len(), w);

                let chunk_size = n.div_ceil(w);
                let mut next = 0;
                for range in &ranges {
                    assert_eq!(range.start, next, "n={n} w={w}");
                    assert!(range.end <= n);
                    assert!(range.len() <= chunk_size);
                    next = range.end;
                }
                assert_eq!(next, n);

                // Only trailing chunks can fall short
                let full = ranges.iter().take_while(|r| r.len() == chunk_size).count();
                assert!(ranges[full..].iter().skip(1).all(|r| r.is_empty()), "n={n} w={w}");
            }
        }
    }

    #[test]
    fn zero_workers_yields_no_chunks() {
        assert!(partition(5, 0).is_empty());
    }
}
