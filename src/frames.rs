use crate::config::FramePattern;
use crate::error::{PipelineError, Result};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Identity of one extracted frame: its 1-based sequence index and the file
/// name it lives under in both working directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId {
    pub index: u32,
    pub name: String,
}

impl FrameId {
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Read/write access to a frame set, keyed by frame identity.
///
/// Implementations must make `write` atomic per frame: a reader never sees a
/// partially written output under the final name.
pub trait FrameStore: Sync {
    /// All input frames, in the order the scheduler should consider them
    fn list(&self) -> io::Result<Vec<FrameId>>;

    fn read(&self, frame: &FrameId) -> io::Result<Vec<u8>>;

    fn write(&self, frame: &FrameId, bytes: &[u8]) -> io::Result<()>;
}

/// Frame store backed by the two working directories. Input and output
/// frames share file names.
pub struct DirFrameStore {
    input_dir: PathBuf,
    output_dir: PathBuf,
    pattern: FramePattern,
}

impl DirFrameStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        input_dir: P,
        output_dir: Q,
        pattern: FramePattern,
    ) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            pattern,
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Frames from `frames` with no non-empty output file yet
    pub fn missing_outputs<'a>(&self, frames: &'a [FrameId]) -> Vec<&'a FrameId> {
        frames
            .iter()
            .filter(|frame| {
                fs::metadata(self.output_dir.join(&frame.name))
                    .map(|meta| !meta.is_file() || meta.len() == 0)
                    .unwrap_or(true)
            })
            .collect()
    }
}

impl FrameStore for DirFrameStore {
    fn list(&self) -> io::Result<Vec<FrameId>> {
        let mut frames = Vec::new();
        for entry in fs::read_dir(&self.input_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(index) = self.pattern.parse_index(name) {
                frames.push(FrameId::new(index, name));
            } else {
                tracing::debug!("Ignoring non-frame file {}", name);
            }
        }
        frames.sort();
        Ok(frames)
    }

    fn read(&self, frame: &FrameId) -> io::Result<Vec<u8>> {
        let path = self.input_dir.join(&frame.name);
        tracing::debug!("Reading input file {}", path.display());
        fs::read(path)
    }

    fn write(&self, frame: &FrameId, bytes: &[u8]) -> io::Result<()> {
        let path = self.output_dir.join(&frame.name);
        tracing::debug!("Writing output file {}", path.display());

        // Temp file lives in the output dir so the rename stays on one filesystem
        let mut tmp = NamedTempFile::new_in(&self.output_dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Remove `dir` with everything in it and create it again empty.
pub fn reset_dir(dir: &Path) -> Result<()> {
    let setup_err = |source| PipelineError::DirectorySetup {
        path: dir.to_path_buf(),
        source,
    };

    if dir.exists() {
        tracing::info!("Removing existing directory {}", dir.display());
        fs::remove_dir_all(dir).map_err(setup_err)?;
    }
    fs::create_dir_all(dir).map_err(setup_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(root: &Path) -> DirFrameStore {
        let input = root.join("in");
        let output = root.join("out");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();
        DirFrameStore::new(input, output, FramePattern::default())
    }

    #[test]
    fn list_sorts_by_index_and_skips_strays() {
        let root = tempdir().unwrap();
        let store = store_in(root.path());
        for name in ["frame_0003.png", "frame_0001.png", "frame_0002.png", "notes.txt"] {
            fs::write(store.input_dir().join(name), b"x").unwrap();
        }
        fs::create_dir(store.input_dir().join("frame_0004.png")).unwrap();

        let names: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["frame_0001.png", "frame_0002.png", "frame_0003.png"]);
    }

    #[test]
    fn write_replaces_atomically_and_leaves_no_temp_files() {
        let root = tempdir().unwrap();
        let store = store_in(root.path());
        let frame = FrameId::new(1, "frame_0001.png");

        store.write(&frame, b"first").unwrap();
        store.write(&frame, b"second").unwrap();

        let entries: Vec<_> = fs::read_dir(store.output_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, ["frame_0001.png"]);
        assert_eq!(
            fs::read(store.output_dir().join("frame_0001.png")).unwrap(),
            b"second"
        );
    }

    #[test]
    fn missing_outputs_flags_absent_and_empty_files() {
        let root = tempdir().unwrap();
        let store = store_in(root.path());
        let frames = vec![
            FrameId::new(1, "frame_0001.png"),
            FrameId::new(2, "frame_0002.png"),
            FrameId::new(3, "frame_0003.png"),
        ];
        store.write(&frames[0], b"ok").unwrap();
        fs::write(store.output_dir().join("frame_0002.png"), b"").unwrap();

        let missing: Vec<_> = store
            .missing_outputs(&frames)
            .into_iter()
            .map(|f| f.index)
            .collect();
        assert_eq!(missing, [2, 3]);
    }

    #[test]
    fn reset_dir_clears_previous_contents() {
        let root = tempdir().unwrap();
        let dir = root.path().join("frames");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("frame_0001.png"), b"old").unwrap();

        reset_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }
}
