//! Per-request temporary working area

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const OUTPUT_DIR: &str = "output";
const ARCHIVE_NAME: &str = "result.zip";

/// A private temporary directory holding one job's uploads, generated
/// documents and archive.
///
/// The directory is removed when the work area is released or dropped,
/// whichever comes first. Removal failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct WorkArea {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl WorkArea {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("docfill-").tempdir()?;
        let path = dir.path().to_path_buf();
        log::debug!("created work area {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory receiving one document per row, created on first use
    pub fn output_dir(&self) -> io::Result<PathBuf> {
        let dir = self.path.join(OUTPUT_DIR);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.path.join(ARCHIVE_NAME)
    }

    /// Remove the directory now
    pub fn release(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => log::debug!("removed work area {}", self.path.display()),
            Err(e) => log::warn!("failed to remove work area {}: {e}", self.path.display()),
        }
    }
}

impl Drop for WorkArea {
    fn drop(&mut self) {
        self.cleanup();
    }
}
