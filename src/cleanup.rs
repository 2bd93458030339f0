use crate::error::{ReportError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// An entry that could not be removed, with the reason reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<CleanupFailure>,
}

impl CleanupOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every entry of `dir` as a file.
///
/// Entries are visited in name order and a failure on one entry does not
/// stop the others. A directory that does not exist has nothing to clean.
pub fn clean_directory(dir: &Path) -> Result<CleanupOutcome> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CleanupOutcome::default()),
        Err(source) => {
            return Err(ReportError::FileRead {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => paths.push(entry.path()),
            Err(e) => warn!("Skipping unreadable entry in {}: {}", dir.display(), e),
        }
    }
    paths.sort();

    let mut outcome = CleanupOutcome::default();
    for path in paths {
        match fs::remove_file(&path) {
            Ok(()) => outcome.removed.push(path),
            Err(e) => {
                warn!("Could not remove {}: {}", path.display(), e);
                outcome.failed.push(CleanupFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(outcome)
}
