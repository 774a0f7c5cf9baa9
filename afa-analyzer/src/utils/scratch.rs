//! Request-scoped scratch storage
//!
//! Every request owns one `ScratchArena`: a directory under the scratch root
//! holding the normalized audio copies written during the request. Release
//! is explicit at request end and repeated from `Drop`, so panics and
//! cancelled requests still clean up.
//!
//! **Deletion fallback:** each file gets a bounded number of removal attempts
//! with a fixed backoff. A file that still cannot be removed is renamed into
//! `<root>/stale/` with an `.old` suffix. Cleanup failures are logged and
//! never reach the caller.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use afa_common::config::ScratchConfig;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::AnalysisError;

/// Directory under the scratch root receiving files that could not be deleted
pub const STALE_DIR: &str = "stale";

/// Counts reported by `ScratchArena::release`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    /// Files deleted
    pub removed: usize,
    /// Files renamed into the stale directory
    pub quarantined: usize,
    /// Files neither deleted nor renamed
    pub leaked: usize,
}

/// Per-request scratch directory
#[derive(Debug)]
pub struct ScratchArena {
    id: Uuid,
    root: PathBuf,
    dir: PathBuf,
    delete_attempts: u32,
    delete_backoff: Duration,
    released: bool,
}

impl ScratchArena {
    /// Create a fresh arena directory under `config.root`
    pub fn create(config: &ScratchConfig) -> Result<Self, AnalysisError> {
        let id = Uuid::new_v4();
        let dir = config.root.join(id.to_string());
        fs::create_dir_all(&dir)?;

        debug!(arena = %id, dir = %dir.display(), "Scratch arena created");

        Ok(Self {
            id,
            root: config.root.clone(),
            dir,
            delete_attempts: config.delete_attempts.max(1),
            delete_backoff: Duration::from_millis(config.delete_backoff_ms),
            released: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a file owned by this arena
    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, AnalysisError> {
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| AnalysisError::Internal(format!("Invalid scratch file name: {}", name)))?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Remove every file of the arena and the arena directory
    ///
    /// Blocking (sleeps between attempts); call from `spawn_blocking` in
    /// async contexts.
    pub fn release(mut self) -> ReleaseSummary {
        self.release_inner()
    }

    fn release_inner(&mut self) -> ReleaseSummary {
        if self.released {
            return ReleaseSummary::default();
        }
        self.released = true;

        let mut summary = ReleaseSummary::default();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return summary,
            Err(e) => {
                warn!(arena = %self.id, error = %e, "Failed to list scratch arena");
                return summary;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            match self.safe_remove(&path) {
                Disposal::Removed => summary.removed += 1,
                Disposal::Quarantined => summary.quarantined += 1,
                Disposal::Leaked => summary.leaked += 1,
            }
        }

        if let Err(e) = fs::remove_dir(&self.dir) {
            warn!(arena = %self.id, error = %e, "Scratch arena directory not removed");
        }

        debug!(
            arena = %self.id,
            removed = summary.removed,
            quarantined = summary.quarantined,
            leaked = summary.leaked,
            "Scratch arena released"
        );

        summary
    }

    fn safe_remove(&self, path: &Path) -> Disposal {
        for attempt in 1..=self.delete_attempts {
            match fs::remove_file(path) {
                Ok(()) => return Disposal::Removed,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Disposal::Removed,
                Err(e) => {
                    debug!(
                        path = %path.display(),
                        attempt,
                        error = %e,
                        "Scratch file deletion failed"
                    );
                    if attempt < self.delete_attempts {
                        std::thread::sleep(self.delete_backoff);
                    }
                }
            }
        }

        let stale_dir = self.root.join(STALE_DIR);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let target = stale_dir.join(format!("{}_{}.old", self.id, file_name));

        let renamed = fs::create_dir_all(&stale_dir).and_then(|_| fs::rename(path, &target));
        match renamed {
            Ok(()) => {
                warn!(
                    path = %path.display(),
                    moved_to = %target.display(),
                    "Scratch file could not be deleted, moved to stale directory"
                );
                Disposal::Quarantined
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Scratch file leaked");
                Disposal::Leaked
            }
        }
    }
}

impl Drop for ScratchArena {
    fn drop(&mut self) {
        if !self.released {
            self.release_inner();
        }
    }
}

enum Disposal {
    Removed,
    Quarantined,
    Leaked,
}
