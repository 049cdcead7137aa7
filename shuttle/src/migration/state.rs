//! Persisted migration state (spec §4.6 "Start", "State-file robustness").
//!
//! Grounded on the teacher's `SqliteSaver`/`sqlite_store.rs` pattern of mapping
//! fallible I/O to a narrow error type; the atomic-rename write here plays the
//! role that an explicit transaction plays for the teacher's sqlite-backed saver.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::MigrationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FailedRecord {
    pub id: String,
    pub error: String,
    pub timestamp: i64,
}

/// On-disk shape of `migration-state.json` (spec §4.6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationState {
    pub status: MigrationStatus,
    pub target_model: String,
    pub migrated_count: u64,
    pub migrated_until: Option<i64>,
    pub batch_size: usize,
    pub failed_records: Vec<FailedRecord>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl MigrationState {
    pub fn idle(target_model: &str, batch_size: usize) -> Self {
        Self {
            status: MigrationStatus::Idle,
            target_model: target_model.to_string(),
            migrated_count: 0,
            migrated_until: None,
            batch_size,
            failed_records: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Loads state from `path`. On any I/O, parse, or shape error the file (if
    /// present) is copied to a timestamped backup and an idle state is returned
    /// instead — "never delete a corrupt state file without backup" (spec §4.6).
    pub fn load(path: &Path, target_model: &str, default_batch_size: usize) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(_) => return Self::idle(target_model, default_batch_size),
        };
        match serde_json::from_slice::<MigrationState>(&bytes) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "migration: state file corrupt, backing up and resetting to idle");
                let backup = path.with_extension(format!("json.corrupt.{}", Utc::now().timestamp_millis()));
                if let Err(copy_err) = std::fs::copy(path, &backup) {
                    tracing::warn!(error = %copy_err, "migration: failed to back up corrupt state file");
                }
                Self::idle(target_model, default_batch_size)
            }
        }
    }

    /// Writes state via a temp file + atomic rename, `fsync`'d before the rename
    /// so a crash mid-write never leaves a half-written `migration-state.json`.
    pub fn save(&self, path: &Path) -> Result<(), MigrationError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(self)?;
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            std::io::Write::write_all(&mut file, &bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
