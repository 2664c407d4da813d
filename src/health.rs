//! Health flag persistence for external monitors.
//!
//! A single file holds the literal sentinel `OK` or `FAILED`, rewritten in
//! place only when the state changes between cycles. Watchers poll the
//! file, so avoiding writes on unchanged state keeps its mtime meaningful.

use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Health tracker error types.
#[derive(Error, Debug)]
pub enum HealthError {
    #[error("failed to write health file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// The two persisted liveness states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthFlag {
    Ok,
    Failed,
}

impl HealthFlag {
    /// Literal sentinel written to the health file.
    pub fn as_str(self) -> &'static str {
        match self {
            HealthFlag::Ok => "OK",
            HealthFlag::Failed => "FAILED",
        }
    }
}

/// Flag to persist after a cycle, if the state changed.
///
/// Only the OK to FAILED and FAILED to OK edges produce a write.
pub fn transition(previously_failed: bool, cycle_failed: bool) -> Option<HealthFlag> {
    match (previously_failed, cycle_failed) {
        (false, true) => Some(HealthFlag::Failed),
        (true, false) => Some(HealthFlag::Ok),
        _ => None,
    }
}

/// Tracks the persisted health flag across cycles.
pub struct HealthTracker {
    path: PathBuf,
    last_failed: bool,
}

impl HealthTracker {
    /// Create a tracker and persist the initial `OK` state.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, HealthError> {
        let tracker = Self {
            path: path.into(),
            last_failed: false,
        };
        tracker.write_flag(HealthFlag::Ok)?;
        Ok(tracker)
    }

    /// Record a cycle outcome, persisting the flag on a state change.
    pub fn observe_cycle(&mut self, cycle_failed: bool) -> Result<(), HealthError> {
        if let Some(flag) = transition(self.last_failed, cycle_failed) {
            self.write_flag(flag)?;
            // Only updated after a successful write, so a failed write is
            // retried on the next transition-worthy cycle.
            self.last_failed = cycle_failed;
        }
        Ok(())
    }

    fn write_flag(&self, flag: HealthFlag) -> Result<(), HealthError> {
        fs::write(&self.path, flag.as_str()).map_err(|source| HealthError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_transition_edges() {
        assert_eq!(transition(false, true), Some(HealthFlag::Failed));
        assert_eq!(transition(true, false), Some(HealthFlag::Ok));
        assert_eq!(transition(false, false), None);
        assert_eq!(transition(true, true), None);
    }

    #[test]
    fn test_hysteresis_writes_only_on_transitions() {
        // Cycle outcomes ok, ok, fail, fail, ok must yield exactly two
        // writes: FAILED after the first failure, OK after the recovery.
        let outcomes = [false, false, true, true, false];
        let mut last_failed = false;
        let mut writes = Vec::new();

        for failed in outcomes {
            if let Some(flag) = transition(last_failed, failed) {
                writes.push(flag);
            }
            last_failed = failed;
        }

        assert_eq!(writes, vec![HealthFlag::Failed, HealthFlag::Ok]);
    }

    #[test]
    fn test_tracker_persists_sentinel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("healthcheck");

        let mut tracker = HealthTracker::new(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "OK");

        tracker.observe_cycle(true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "FAILED");

        // Unchanged state leaves the file untouched.
        fs::write(&path, "sentinel-untouched").unwrap();
        tracker.observe_cycle(true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "sentinel-untouched");

        tracker.observe_cycle(false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "OK");
    }
}
