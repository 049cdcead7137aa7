//! Migration Engine (spec §4.6) — resumable background re-embedding of memory
//! entries into a newly configured embedding model's vector column.
//!
//! A `tokio::spawn`'d worker loop owned by [`MigrationEngine`], grounded on the
//! teacher's `SqliteSaver`/`sqlite_store.rs` pattern of "open connection in
//! `spawn_blocking`, map errors to a narrow error type" — here applied to the
//! state file instead of a sqlite connection.

mod pacer;
mod state;

pub use pacer::AdaptivePacer;
pub use state::{now_ms, FailedRecord, MigrationState, MigrationStatus};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::MigrationError;
use crate::memory::{decode_column_name, MemoryEntry, MemoryStore};

/// How many not-yet-migrated rows [`MigrationEngine::retry_failed`] scans in one
/// pass looking for the ids it was asked to retry.
const RETRY_SCAN_LIMIT: usize = 10_000;

/// Owns the background worker re-embedding rows into `target_model`'s vector
/// column (spec §4.6). One engine per [`MemoryStore`] per target model; the
/// store's own `active_model_key` is left untouched here — callers flip it once
/// the migration completes.
pub struct MigrationEngine {
    store: Arc<MemoryStore>,
    target_model: String,
    state_path: PathBuf,
    state: Mutex<MigrationState>,
    pacer: Mutex<AdaptivePacer>,
    notify: Notify,
}

impl MigrationEngine {
    /// Loads (or initializes) state from `<state_dir>/migration-state.json`; does
    /// not start the worker — call [`MigrationEngine::start`] for that.
    pub fn new(store: Arc<MemoryStore>, target_model: impl Into<String>, state_dir: PathBuf, batch_size: usize) -> Self {
        let target_model = target_model.into();
        let state_path = state_dir.join("migration-state.json");
        let state = MigrationState::load(&state_path, &target_model, batch_size);
        Self {
            store,
            target_model,
            state_path,
            state: Mutex::new(state),
            pacer: Mutex::new(AdaptivePacer::new()),
            notify: Notify::new(),
        }
    }

    pub fn snapshot(&self) -> MigrationState {
        self.state.lock().unwrap().clone()
    }

    /// Spawns the background worker (spec §4.6 "Start"). `AlreadyRunning` if this
    /// handle's in-memory status is already `running`.
    pub fn start(self: &Arc<Self>) -> Result<(), MigrationError> {
        {
            let mut guard = self.state.lock().unwrap();
            if guard.status == MigrationStatus::Running {
                return Err(MigrationError::AlreadyRunning);
            }
            guard.status = MigrationStatus::Running;
            if guard.started_at.is_none() {
                guard.started_at = Some(now_ms());
            }
            guard.save(&self.state_path)?;
        }
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run().await });
        Ok(())
    }

    /// Flips status to `paused`; the worker finishes its current batch, notices
    /// the flip at the top of the loop, and parks until [`MigrationEngine::resume`].
    pub fn pause(&self) {
        let mut guard = self.state.lock().unwrap();
        if guard.status == MigrationStatus::Running {
            guard.status = MigrationStatus::Paused;
            let _ = guard.save(&self.state_path);
        }
    }

    pub fn resume(&self) {
        {
            let mut guard = self.state.lock().unwrap();
            if guard.status == MigrationStatus::Paused {
                guard.status = MigrationStatus::Running;
                let _ = guard.save(&self.state_path);
            }
        }
        self.notify.notify_waiters();
    }

    /// Re-attempts `ids` (or every failed record if `None`); successes are
    /// removed from `failedRecords` and bump `migratedCount` (spec §4.6 "Control").
    pub async fn retry_failed(&self, ids: Option<&[String]>) -> Result<(), MigrationError> {
        let wanted: Vec<String> = {
            let guard = self.state.lock().unwrap();
            guard
                .failed_records
                .iter()
                .map(|f| f.id.clone())
                .filter(|id| ids.map(|want| want.contains(id)).unwrap_or(true))
                .collect()
        };
        if wanted.is_empty() {
            return Ok(());
        }

        let candidates = self.store.fetch_migration_batch(&self.target_model, None, RETRY_SCAN_LIMIT).await?;
        for entry in candidates.into_iter().filter(|e| wanted.contains(&e.id)) {
            match self.migrate_one(&entry).await {
                Ok(()) => {
                    let mut guard = self.state.lock().unwrap();
                    guard.failed_records.retain(|f| f.id != entry.id);
                    guard.migrated_count += 1;
                    let _ = guard.save(&self.state_path);
                }
                Err(err) => {
                    tracing::warn!(id = %entry.id, error = %err, "migration: retry failed again");
                    let mut guard = self.state.lock().unwrap();
                    if let Some(record) = guard.failed_records.iter_mut().find(|f| f.id == entry.id) {
                        record.error = err;
                        record.timestamp = now_ms();
                    }
                    let _ = guard.save(&self.state_path);
                }
            }
        }
        Ok(())
    }

    async fn run(self: Arc<Self>) {
        loop {
            let status = self.state.lock().unwrap().status;
            match status {
                MigrationStatus::Completed => return,
                MigrationStatus::Running => {}
                MigrationStatus::Idle | MigrationStatus::Paused => {
                    self.notify.notified().await;
                    continue;
                }
            }

            // `migrated_until` is the oldest-first low-water mark: every row with
            // createdAt <= migrated_until is migrated or failed, so the next fetch
            // can safely skip them without stranding anything newer.
            let (cursor, batch_size) = {
                let guard = self.state.lock().unwrap();
                (guard.migrated_until, guard.batch_size)
            };

            let batch = match self.store.fetch_migration_batch(&self.target_model, cursor, batch_size).await {
                Ok(batch) => batch,
                Err(err) => {
                    tracing::warn!(error = %err, "migration: batch fetch failed, retrying shortly");
                    tokio::time::sleep(std::time::Duration::from_millis(1000)).await;
                    continue;
                }
            };

            if batch.is_empty() {
                let mut guard = self.state.lock().unwrap();
                guard.status = MigrationStatus::Completed;
                guard.completed_at = Some(now_ms());
                let _ = guard.save(&self.state_path);
                tracing::info!(target_model = %self.target_model, migrated = guard.migrated_count, "migration: complete");
                return;
            }

            let batch_len = batch.len();
            let started = std::time::Instant::now();
            let mut success_count = 0usize;
            let mut fail_count = 0usize;

            for entry in &batch {
                match self.migrate_one(entry).await {
                    Ok(()) => {
                        success_count += 1;
                        let mut guard = self.state.lock().unwrap();
                        guard.migrated_count += 1;
                        let created_ms = crate::memory::entry::datetime_to_epoch_ms(entry.created_at);
                        guard.migrated_until = Some(guard.migrated_until.map_or(created_ms, |until| until.max(created_ms)));
                        guard.failed_records.retain(|f| f.id != entry.id);
                    }
                    Err(err) => {
                        fail_count += 1;
                        let mut guard = self.state.lock().unwrap();
                        guard.failed_records.push(FailedRecord {
                            id: entry.id.clone(),
                            error: err,
                            timestamp: now_ms(),
                        });
                    }
                }
            }

            let elapsed_ms = started.elapsed().as_millis() as f64;
            let avg_per_record_ms = elapsed_ms / batch_len as f64;
            let interval = {
                let mut pacer = self.pacer.lock().unwrap();
                if fail_count == 0 {
                    pacer.on_batch_success(avg_per_record_ms);
                } else {
                    pacer.on_failure();
                }
                pacer.next_interval()
            };

            {
                let guard = self.state.lock().unwrap();
                let _ = guard.save(&self.state_path);
                tracing::info!(
                    migrated_count = guard.migrated_count,
                    batch_size = guard.batch_size,
                    success_count,
                    fail_count,
                    "migration: batch progress"
                );
            }

            tokio::time::sleep(interval).await;
        }
    }

    async fn migrate_one(&self, entry: &MemoryEntry) -> Result<(), String> {
        let vector = self.store.embed_text(&entry.content).await.map_err(|e| e.to_string())?;
        let Some(vector) = vector else {
            return Err("embedding service unavailable".to_string());
        };
        self.store
            .update_vector(&entry.id, &self.target_model, vector)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Whether a migration toward `target_model` should be triggered: the observed
/// `active_embed` on a row differs from `target_model` (spec §4.6 "Triggered
/// when the configured embedding model differs from `active_embed`").
pub fn needs_migration(observed_active_embed: Option<&str>, target_model: &str) -> bool {
    match observed_active_embed.and_then(decode_column_name_passthrough) {
        Some(active) => active != target_model,
        None => observed_active_embed.map(|a| a != target_model).unwrap_or(true),
    }
}

fn decode_column_name_passthrough(value: &str) -> Option<String> {
    decode_column_name(value).or_else(|| Some(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MockEmbedder, StoreInput};

    async fn new_store() -> (Arc<MemoryStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::open(
            dir.path().to_path_buf(),
            Some(Arc::new(MockEmbedder::new(8))),
            Some("mock/old-embed".to_string()),
            3,
        )
        .await
        .unwrap();
        (Arc::new(store), dir)
    }

    #[tokio::test]
    async fn migrates_every_row_then_completes() {
        let (store, dir) = new_store().await;
        for i in 0..5 {
            store
                .store(StoreInput {
                    content: format!("entry {i}"),
                    metadata: serde_json::json!({}),
                    session_id: None,
                    entry_type: "conversation".to_string(),
                    precomputed_vector: Some(vec![0.0; 8]),
                })
                .await
                .unwrap();
        }

        let engine = Arc::new(MigrationEngine::new(store.clone(), "mock/new-embed", dir.path().to_path_buf(), 2));
        engine.start().unwrap();

        for _ in 0..200 {
            if engine.snapshot().status == MigrationStatus::Completed {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.status, MigrationStatus::Completed);
        assert_eq!(snapshot.migrated_count, 5);
    }

    #[tokio::test]
    async fn second_start_on_a_running_handle_errors() {
        let (store, dir) = new_store().await;
        let engine = Arc::new(MigrationEngine::new(store, "mock/new-embed", dir.path().to_path_buf(), 50));
        engine.start().unwrap();
        let err = engine.start().unwrap_err();
        assert!(matches!(err, MigrationError::AlreadyRunning));
    }

    #[test]
    fn needs_migration_detects_a_mismatched_active_embed() {
        assert!(needs_migration(Some("mock/old-embed"), "mock/new-embed"));
        assert!(!needs_migration(Some("mock/new-embed"), "mock/new-embed"));
        assert!(needs_migration(None, "mock/new-embed"));
    }
}
