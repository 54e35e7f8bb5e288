//! Scoped storage for converted files.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::quality::Container;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Directory converted files are written to.
///
/// A workspace either owns a fresh temporary directory (removed on drop),
/// or points at an existing directory such as the system temp dir.
///
/// # Example
///
/// ```no_run
/// use clipforge_av::{Container, Workspace};
///
/// let workspace = Workspace::temporary()?;
/// let output = workspace.output_path("/videos/IMG_0001.MOV", Container::Mp4)?;
/// assert!(output.ends_with("IMG_0001.mp4"));
/// # Ok::<(), clipforge_av::Error>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    _temp_dir: Option<TempDir>,
}

impl Workspace {
    /// Create a workspace in a new temporary directory.
    pub fn temporary() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("clipforge-")
            .tempdir()
            .map_err(|e| Error::Workspace(e.to_string()))?;

        Ok(Self {
            dir: temp_dir.path().to_path_buf(),
            _temp_dir: Some(temp_dir),
        })
    }

    /// Use `dir` as the workspace, creating it if needed.
    pub fn at<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::Workspace(format!("Failed to create output directory {:?}: {}", dir, e))
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            _temp_dir: None,
        })
    }

    /// Use the process temp directory.
    pub fn system_temp() -> Self {
        Self {
            dir: std::env::temp_dir(),
            _temp_dir: None,
        }
    }

    /// Get the workspace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a file with the given name.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Output path for `source` converted to `container`.
    pub fn output_path<P: AsRef<Path>>(&self, source: P, container: Container) -> Result<PathBuf> {
        Ok(self.file(&output_filename(source.as_ref(), container)?))
    }
}

/// Source file stem with the container's extension.
pub fn output_filename(source: &Path, container: Container) -> Result<String> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("Invalid source file path: {:?}", source)))?;

    Ok(format!("{}.{}", stem, container.extension()))
}

/// Remove `path` if it exists.
///
/// A missing file is not an error. Any other failure is reported to `sink`
/// and otherwise ignored. Returns whether a file was removed.
pub async fn remove_if_exists(path: &Path, sink: &dyn DiagnosticSink) -> bool {
    report_removal(path, tokio::fs::remove_file(path).await, sink)
}

/// Blocking form of [`remove_if_exists`], for completion jobs.
pub fn remove_if_exists_blocking(path: &Path, sink: &dyn DiagnosticSink) -> bool {
    report_removal(path, std::fs::remove_file(path), sink)
}

fn report_removal(path: &Path, result: std::io::Result<()>, sink: &dyn DiagnosticSink) -> bool {
    match result {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            sink.record(Diagnostic::CleanupFailed {
                path: path.to_path_buf(),
                error: e.to_string(),
            });
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;

    #[test]
    fn test_output_filename_replaces_extension() {
        let name = output_filename(Path::new("/a/b/IMG_0001.MOV"), Container::Mp4).unwrap();
        assert_eq!(name, "IMG_0001.mp4");

        let name = output_filename(Path::new("memo.caf"), Container::M4a).unwrap();
        assert_eq!(name, "memo.m4a");

        let name = output_filename(Path::new("clip"), Container::Mp4).unwrap();
        assert_eq!(name, "clip.mp4");
    }

    #[test]
    fn test_output_filename_rejects_empty() {
        assert!(output_filename(Path::new("/"), Container::Mp4).is_err());
    }

    #[test]
    fn test_temporary_workspace_is_removed_on_drop() {
        let workspace = Workspace::temporary().unwrap();
        let dir = workspace.dir().to_path_buf();
        assert!(dir.exists());
        drop(workspace);
        assert!(!dir.exists());
    }

    #[test]
    fn test_at_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("converted/videos");
        let workspace = Workspace::at(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(
            workspace.output_path("x.mov", Container::Mp4).unwrap(),
            nested.join("x.mp4")
        );
    }

    #[tokio::test]
    async fn test_remove_if_exists_is_idempotent() {
        let workspace = Workspace::temporary().unwrap();
        let path = workspace.file("leftover.mp4");
        std::fs::write(&path, b"old").unwrap();
        let sink = MemorySink::new();

        assert!(remove_if_exists(&path, &sink).await);
        assert!(!path.exists());
        assert!(!remove_if_exists(&path, &sink).await);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_remove_failure_is_reported() {
        let workspace = Workspace::temporary().unwrap();
        // Removing a directory with remove_file fails without NotFound.
        let path = workspace.file("subdir");
        std::fs::create_dir(&path).unwrap();
        let sink = MemorySink::new();

        assert!(!remove_if_exists(&path, &sink).await);
        assert!(matches!(
            sink.events().as_slice(),
            [Diagnostic::CleanupFailed { .. }]
        ));
    }
}
