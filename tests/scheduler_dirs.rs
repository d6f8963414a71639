use bgstrip::scheduler::{partition, FrameProcessor};
use bgstrip::{
    CancelToken, DirFrameStore, FramePattern, FrameStore, PipelineError, Scheduler,
    SegmentationError, Strategy,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Input frames whose bytes are their own file names
fn seed(root: &Path, n: u32) -> DirFrameStore {
    let pattern = FramePattern::default();
    let input = root.join("input_frames");
    let output = root.join("output_frames");
    fs::create_dir_all(&input).unwrap();
    fs::create_dir_all(&output).unwrap();
    for i in 1..=n {
        let name = pattern.file_name(i);
        fs::write(input.join(&name), &name).unwrap();
    }
    DirFrameStore::new(input, output, pattern)
}

fn output_names(store: &DirFrameStore) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(store.output_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn static_two_workers_split_three_frames_in_order() {
    let root = tempdir().unwrap();
    let store = seed(root.path(), 3);
    let seen: Arc<Mutex<BTreeMap<usize, Vec<String>>>> = Arc::default();

    let factory = |worker: usize| -> Result<Box<dyn FrameProcessor>, SegmentationError> {
        let seen = Arc::clone(&seen);
        Ok(Box::new(
            move |bytes: &[u8]| -> Result<Vec<u8>, SegmentationError> {
                let name = String::from_utf8(bytes.to_vec()).unwrap();
                seen.lock().unwrap().entry(worker).or_default().push(name);
                Ok(bytes.repeat(2))
            },
        ))
    };

    let summary = Scheduler::new(Strategy::Static, 2)
        .run(&store, &factory, &CancelToken::new())
        .unwrap();

    assert_eq!(summary.frames_processed, 3);
    let seen = seen.lock().unwrap();
    assert_eq!(seen[&0], ["frame_0001.png", "frame_0002.png"]);
    assert_eq!(seen[&1], ["frame_0003.png"]);

    assert_eq!(
        output_names(&store),
        ["frame_0001.png", "frame_0002.png", "frame_0003.png"]
    );
    let written = fs::read(store.output_dir().join("frame_0003.png")).unwrap();
    assert_eq!(written, b"frame_0003.pngframe_0003.png");
}

#[test]
fn chunk_sizes_match_ceiling_division() {
    let sizes: Vec<usize> = partition(10, 4).iter().map(|r| r.len()).collect();
    assert_eq!(sizes, [3, 3, 3, 1]);
}

#[test]
fn pool_writes_every_frame_to_disk() {
    let root = tempdir().unwrap();
    let store = seed(root.path(), 25);
    let factory = |_worker: usize| -> Result<Box<dyn FrameProcessor>, SegmentationError> {
        Ok(Box::new(
            |bytes: &[u8]| -> Result<Vec<u8>, SegmentationError> { Ok(bytes.to_vec()) },
        ))
    };

    Scheduler::new(Strategy::Pool, 4)
        .with_progress_interval(5)
        .run(&store, &factory, &CancelToken::new())
        .unwrap();

    let inputs: Vec<String> = store.list().unwrap().into_iter().map(|f| f.name).collect();
    assert_eq!(output_names(&store), inputs);
    for name in inputs {
        assert_eq!(
            fs::read(store.output_dir().join(&name)).unwrap(),
            name.as_bytes()
        );
    }
}

#[test]
fn failing_frame_is_never_written_under_its_name() {
    let root = tempdir().unwrap();
    let store = seed(root.path(), 4);
    let factory = |_worker: usize| -> Result<Box<dyn FrameProcessor>, SegmentationError> {
        Ok(Box::new(
            |bytes: &[u8]| -> Result<Vec<u8>, SegmentationError> {
                if bytes == b"frame_0002.png" {
                    Err(SegmentationError::Model("inference failed".into()))
                } else {
                    Ok(bytes.to_vec())
                }
            },
        ))
    };

    let err = Scheduler::new(Strategy::Sequential, 1)
        .run(&store, &factory, &CancelToken::new())
        .unwrap_err();

    assert!(matches!(err, PipelineError::Segmentation { .. }));
    assert_eq!(err.frame(), Some("frame_0002.png"));
    assert_eq!(output_names(&store), ["frame_0001.png"]);
}

#[test]
fn missing_input_directory_is_a_listing_error() {
    let root = tempdir().unwrap();
    let store = DirFrameStore::new(
        root.path().join("absent"),
        root.path().join("out"),
        FramePattern::default(),
    );
    let factory = |_worker: usize| -> Result<Box<dyn FrameProcessor>, SegmentationError> {
        unreachable!("no frames to process")
    };
    let err = Scheduler::new(Strategy::Pool, 2)
        .run(&store, &factory, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::FrameListing(_)));
}
