//! Per-request scratch directories

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// An exclusively owned temporary directory for one pipeline call.
///
/// The directory and everything in it is removed when the value is dropped,
/// whichever way the owning call exits.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    pub fn create_in(base: &Path) -> Result<Self, ConvertError> {
        std::fs::create_dir_all(base)?;
        let dir = tempfile::Builder::new().prefix("vidaudio-").tempdir_in(base)?;
        debug!("Scratch workspace: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Whether `path` is an existing file directly inside this workspace.
    pub fn contains_file(&self, path: &Path) -> bool {
        path.parent() == Some(self.path()) && path.is_file()
    }

    /// Locate the single file with `extension` (case-insensitive).
    ///
    /// Zero or several matches are both extraction failures: a workspace is
    /// single-use, so more than one candidate means the output is ambiguous.
    pub fn find_single_with_extension(&self, extension: &str) -> Result<PathBuf, ConvertError> {
        let mut matches = Vec::new();
        for entry in std::fs::read_dir(self.path())? {
            let path = entry?.path();
            let matches_ext = path
                .extension()
                .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false);
            if matches_ext && path.is_file() {
                matches.push(path);
            }
        }

        match matches.len() {
            0 => Err(ConvertError::Extraction(format!(
                "no {} file was produced",
                extension
            ))),
            1 => Ok(matches.remove(0)),
            n => Err(ConvertError::Extraction(format!(
                "{} {} files were produced; expected exactly one",
                n, extension
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let workspace = ScratchWorkspace::create_in(base.path()).unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(workspace.join("partial.webm"), b"data").unwrap();
        assert!(path.exists());

        drop(workspace);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_workspaces_are_unique() {
        let base = tempfile::tempdir().unwrap();
        let a = ScratchWorkspace::create_in(base.path()).unwrap();
        let b = ScratchWorkspace::create_in(base.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_find_single_with_extension() {
        let base = tempfile::tempdir().unwrap();
        let workspace = ScratchWorkspace::create_in(base.path()).unwrap();

        let err = workspace.find_single_with_extension("mp3").unwrap_err();
        assert!(matches!(err, ConvertError::Extraction(ref m) if m.contains("no mp3")));

        std::fs::write(workspace.join("Song.webm"), b"video").unwrap();
        std::fs::write(workspace.join("Song.MP3"), b"audio").unwrap();
        let found = workspace.find_single_with_extension("mp3").unwrap();
        assert_eq!(found, workspace.join("Song.MP3"));
        assert!(workspace.contains_file(&found));

        std::fs::write(workspace.join("Other.mp3"), b"audio").unwrap();
        let err = workspace.find_single_with_extension("mp3").unwrap_err();
        assert!(matches!(err, ConvertError::Extraction(ref m) if m.contains("2 mp3 files")));
    }

    #[test]
    fn test_contains_file_rejects_outside_paths() {
        let base = tempfile::tempdir().unwrap();
        let workspace = ScratchWorkspace::create_in(base.path()).unwrap();
        let outside = base.path().join("elsewhere.mp3");
        std::fs::write(&outside, b"x").unwrap();
        assert!(!workspace.contains_file(&outside));
        assert!(!workspace.contains_file(&workspace.join("missing.mp3")));
    }
}
