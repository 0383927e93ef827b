//! Snapshots read from a file written by an external feed poller.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{DelaySnapshot, RealtimeError, RealtimeSource};

/// Reads a JSON [`DelaySnapshot`] from disk on every request.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RealtimeSource for FileSource {
    fn snapshot(&self) -> Result<Arc<DelaySnapshot>, RealtimeError> {
        let json = fs::read_to_string(&self.path).map_err(|e| {
            RealtimeError::Unavailable(format!("{}: {e}", self.path.display()))
        })?;
        let snapshot = DelaySnapshot::from_json(&json)?;
        debug!(
            path = %self.path.display(),
            version = snapshot.version,
            trips = snapshot.len(),
            "Read realtime snapshot"
        );
        Ok(Arc::new(snapshot))
    }
}
