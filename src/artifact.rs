//! Scoped ownership of a decompiled output folder.

use log::{info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Owns the decompiled output folder of one job and removes it when dropped.
///
/// The folder may not exist yet when the guard is created; it is removed only if it exists by
/// the time the guard goes out of scope, whatever the way the job ended.
#[derive(Debug)]
pub struct ArtifactGuard {
    path: PathBuf,
}

impl ArtifactGuard {
    /// Takes ownership of the folder at the given path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Gets the guarded path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes a folder left at the guarded path by an earlier run, before the decompiler
    /// writes into it.
    pub fn clear_leftover(&self) {
        if self.path.is_dir() {
            warn!(
                "The decompression folder {} already exists, removing it",
                self.path.display()
            );
            self.remove();
        }
    }

    fn remove(&self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(
                "there was an error when removing the decompression folder {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if self.path.is_dir() {
            info!("Deleting uncompressed directory {}", self.path.display());
            self.remove();
        }
    }
}
