//! `MemoryStore` (spec §4.5) — one `rusqlite` connection, a `vec0` virtual table
//! per embedding model (grounded directly on the teacher's `memory/sqlite_vec_store.rs`,
//! generalized from its single fixed `store_vec_embeddings` table to one virtual
//! table per dynamically-registered embedding model, named via the filesystem-safe
//! token scheme in [`crate::memory::entry`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, Once};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::StoreError;
use crate::memory::entry::{
    datetime_to_epoch_ms, encode_column_name, epoch_ms_to_datetime, MemoryEntry, ENTRY_TYPE_ENTITY,
    ENTRY_TYPE_SUMMARY,
};
use crate::memory::keyword::{extract_keywords, score_content};
use crate::memory::markdown;
use crate::memory::uuid6::uuid6;
use crate::memory::Embedder;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 200;

static VEC_EXTENSION_INIT: Once = Once::new();

fn ensure_vec_extension_registered() {
    VEC_EXTENSION_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    });
}

/// Search mode (spec §4.5, §9 "closed enumeration with a canonical text form").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    Fulltext,
    Vector,
    Hybrid,
    Auto,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fulltext" => Ok(SearchMode::Fulltext),
            "vector" => Ok(SearchMode::Vector),
            "hybrid" => Ok(SearchMode::Hybrid),
            "auto" => Ok(SearchMode::Auto),
            other => Err(format!("unknown search mode: {other}")),
        }
    }
}

pub struct SearchOptions {
    pub mode: SearchMode,
    pub limit: usize,
    pub session_id: Option<String>,
    pub entry_type: Option<String>,
    /// Embedding model targeted by a vector/hybrid/auto search; defaults to the
    /// store's active model when `None`.
    pub model_key: Option<String>,
    /// Set by the migration engine to select migration-aware hybrid search
    /// (spec §4.5 "Auto" mode) instead of plain vector-then-fulltext fallback.
    pub migration_in_progress_until_ms: Option<i64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::Auto,
            limit: DEFAULT_SEARCH_LIMIT,
            session_id: None,
            entry_type: None,
            model_key: None,
            migration_in_progress_until_ms: None,
        }
    }
}

pub struct StoreInput {
    pub content: String,
    pub metadata: Value,
    pub session_id: Option<String>,
    pub entry_type: String,
    /// Caller-supplied vector, bypassing the embedder (spec §4.5 step 1).
    pub precomputed_vector: Option<Vec<f32>>,
}

struct VectorColumn {
    column_token: String,
    dimension: usize,
}

/// Owns the single sqlite connection; all access is serialized through the
/// `Mutex` and run inside `spawn_blocking` (teacher's `sqlite_store.rs` pattern).
pub struct MemoryStore {
    conn: Arc<Mutex<Connection>>,
    sessions_dir: PathBuf,
    embedder: Option<Arc<dyn Embedder>>,
    active_model_key: Mutex<Option<String>>,
    max_models: usize,
}

impl MemoryStore {
    /// Opens (creating if absent) the sqlite file at `storage_path/memory.sqlite3`
    /// and the `sessions/` markdown mirror directory alongside it.
    pub async fn open(
        storage_path: PathBuf,
        embedder: Option<Arc<dyn Embedder>>,
        active_model_key: Option<String>,
        max_models: usize,
    ) -> Result<Self, StoreError> {
        ensure_vec_extension_registered();
        let sessions_dir = storage_path.join("sessions");
        let db_path = storage_path.join("memory.sqlite3");

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            std::fs::create_dir_all(&storage_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let conn = Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            Self::ensure_schema(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            sessions_dir,
            embedder,
            active_model_key: Mutex::new(active_model_key),
            max_models: max_models.max(1),
        })
    }

    fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS memory_entries (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT UNIQUE NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                session_id TEXT,
                entry_type TEXT NOT NULL,
                active_embed TEXT,
                embed_versions TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_memory_entries_session ON memory_entries(session_id);
            CREATE INDEX IF NOT EXISTS idx_memory_entries_created ON memory_entries(created_at);
            CREATE INDEX IF NOT EXISTS idx_memory_entries_type ON memory_entries(entry_type);

            CREATE TABLE IF NOT EXISTS vector_columns (
                model_key TEXT PRIMARY KEY,
                column_token TEXT NOT NULL UNIQUE,
                dimension INTEGER NOT NULL,
                last_used_at INTEGER NOT NULL
            );",
        )
        .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn vector_columns(conn: &Connection) -> Result<HashMap<String, VectorColumn>, StoreError> {
        let mut stmt = conn
            .prepare("SELECT model_key, column_token, dimension FROM vector_columns")
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut out = HashMap::new();
        for row in rows {
            let (model_key, column_token, dimension) = row.map_err(|e| StoreError::Storage(e.to_string()))?;
            out.insert(
                model_key,
                VectorColumn {
                    column_token,
                    dimension: dimension as usize,
                },
            );
        }
        Ok(out)
    }

    /// Lazily creates the `vec0` virtual table for `model_key` if it does not
    /// already exist (spec §4.5 "Columns are added lazily when a new model is
    /// first used"). Returns the column token used to name `vec_<token>`.
    fn ensure_vector_table(
        conn: &Connection,
        model_key: &str,
        dimension: usize,
        max_models: usize,
    ) -> Result<String, StoreError> {
        let existing = Self::vector_columns(conn)?;
        if let Some(col) = existing.get(model_key) {
            if col.dimension != dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: col.dimension,
                    actual: dimension,
                });
            }
            conn.execute(
                "UPDATE vector_columns SET last_used_at = ?1 WHERE model_key = ?2",
                params![Utc::now().timestamp_millis(), model_key],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            return Ok(col.column_token.clone());
        }

        let token = encode_column_name(model_key);
        conn.execute(
            &format!("CREATE VIRTUAL TABLE IF NOT EXISTS vec_{token} USING vec0(embedding float[{dimension}])"),
            [],
        )
        .map_err(|e| StoreError::Storage(e.to_string()))?;
        conn.execute(
            "INSERT INTO vector_columns (model_key, column_token, dimension, last_used_at) VALUES (?1, ?2, ?3, ?4)",
            params![model_key, token, dimension as i64, Utc::now().timestamp_millis()],
        )
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        if existing.len() + 1 > max_models {
            // See DESIGN.md: `multiEmbed.cleanupOldVectors` is a logged intent only,
            // matching the source's unresolved behavior (spec §9 Open Questions).
            tracing::warn!(
                model_count = existing.len() + 1,
                max_models,
                "memory store: vector column count exceeds configured maximum; cleanup of old columns is not implemented"
            );
        }
        Ok(token)
    }

    fn vector_to_json(vector: &[f32]) -> String {
        let parts: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
        format!("[{}]", parts.join(","))
    }

    async fn embed_if_possible(&self, content: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(&[content]).await {
            Ok(mut vectors) => vectors.pop(),
            Err(e) => {
                tracing::warn!(error = %e, "memory store: embedding failed, writing fulltext-only");
                None
            }
        }
    }

    /// Write path (spec §4.5 "store"): embeds `content` (unless a vector is
    /// supplied or no embedder is configured), upserts the row, and appends a
    /// markdown mirror entry.
    pub async fn store(&self, input: StoreInput) -> Result<MemoryEntry, StoreError> {
        let active_model = self.active_model_key.lock().unwrap().clone();
        let vector = match input.precomputed_vector {
            Some(v) => Some(v),
            None => {
                if active_model.is_some() {
                    self.embed_if_possible(&input.content).await
                } else {
                    None
                }
            }
        };

        let id = uuid6().to_string();
        let now = Utc::now();
        let now_ms = datetime_to_epoch_ms(now);
        let metadata_json = serde_json::to_string(&input.metadata)?;

        let mut embed_versions: HashMap<String, i64> = HashMap::new();
        let active_embed = if vector.is_some() { active_model.clone() } else { None };
        if let Some(model) = &active_embed {
            embed_versions.insert(model.clone(), now_ms);
        }
        let embed_versions_json = serde_json::to_string(&embed_versions)?;

        let conn = self.conn.clone();
        let content = input.content.clone();
        let session_id = input.session_id.clone();
        let entry_type = input.entry_type.clone();
        let id_for_insert = id.clone();
        let vector_for_insert = vector.clone();
        let active_embed_for_insert = active_embed.clone();
        let max_models = self.max_models;

        let seq = tokio::task::spawn_blocking(move || -> Result<i64, StoreError> {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO memory_entries (id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    id_for_insert,
                    content,
                    metadata_json,
                    session_id,
                    entry_type,
                    active_embed_for_insert,
                    embed_versions_json,
                    now_ms,
                ],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            let seq = conn.last_insert_rowid();

            if let (Some(vector), Some(model)) = (&vector_for_insert, &active_embed_for_insert) {
                let token = Self::ensure_vector_table(&conn, model, vector.len(), max_models)?;
                conn.execute(
                    &format!("INSERT INTO vec_{token} (rowid, embedding) VALUES (?1, ?2)"),
                    params![seq, Self::vector_to_json(vector)],
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            }
            Ok(seq)
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))??;
        let _ = seq;

        let sessions_dir = self.sessions_dir.clone();
        let tags = input
            .metadata
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect::<Vec<_>>())
            .unwrap_or_default();
        let md_id = id.clone();
        let md_session = input.session_id.clone();
        let md_type = input.entry_type.clone();
        let md_content = input.content.clone();
        tokio::task::spawn_blocking(move || {
            markdown::append_entry(
                &sessions_dir,
                &md_id,
                md_session.as_deref(),
                &md_type,
                &tags,
                &md_content,
                now,
            )
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))??;

        Ok(MemoryEntry {
            id,
            content: input.content,
            metadata: input.metadata,
            session_id: input.session_id,
            entry_type: input.entry_type,
            active_embed,
            embed_versions,
            created_at: now,
            updated_at: now,
            vector,
        })
    }

    fn row_to_entry(
        id: String,
        content: String,
        metadata_json: String,
        session_id: Option<String>,
        entry_type: String,
        active_embed: Option<String>,
        embed_versions_json: String,
        created_at: i64,
        updated_at: i64,
    ) -> Result<MemoryEntry, StoreError> {
        Ok(MemoryEntry {
            id,
            content,
            metadata: serde_json::from_str(&metadata_json)?,
            session_id,
            entry_type,
            active_embed,
            embed_versions: serde_json::from_str(&embed_versions_json)?,
            created_at: epoch_ms_to_datetime(created_at),
            updated_at: epoch_ms_to_datetime(updated_at),
            vector: None,
        })
    }

    /// `updateVector(id, column, vector, modelId)` (spec §4.5): non-atomic —
    /// reads and snapshots the row, deletes it, inserts the updated row; on
    /// insert failure, re-inserts the snapshot and re-raises.
    pub async fn update_vector(&self, id: &str, model_key: &str, vector: Vec<f32>) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let id = id.to_string();
        let model_key = model_key.to_string();
        let max_models = self.max_models;

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.lock().unwrap();

            let snapshot = conn
                .query_row(
                    "SELECT content, metadata, session_id, entry_type, embed_versions, created_at
                     FROM memory_entries WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, i64>(5)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| StoreError::Storage(e.to_string()))?
                .ok_or_else(|| StoreError::Storage(format!("no such memory entry: {id}")))?;

            let (content, metadata_json, session_id, entry_type, embed_versions_json, created_at) = snapshot;
            let mut embed_versions: HashMap<String, i64> =
                serde_json::from_str(&embed_versions_json).unwrap_or_default();
            let now_ms = Utc::now().timestamp_millis();
            embed_versions.insert(model_key.clone(), now_ms);
            let embed_versions_json = serde_json::to_string(&embed_versions)?;

            conn.execute("DELETE FROM memory_entries WHERE id = ?1", params![id])
                .map_err(|e| StoreError::Storage(e.to_string()))?;

            let insert_result = (|| -> Result<i64, StoreError> {
                conn.execute(
                    "INSERT INTO memory_entries (id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![id, content, metadata_json, session_id, entry_type, model_key, embed_versions_json, created_at, now_ms],
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
                let seq = conn.last_insert_rowid();
                let token = Self::ensure_vector_table(&conn, &model_key, vector.len(), max_models)?;
                conn.execute(
                    &format!("INSERT INTO vec_{token} (rowid, embedding) VALUES (?1, ?2)"),
                    params![seq, Self::vector_to_json(&vector)],
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
                Ok(seq)
            })();

            if let Err(e) = insert_result {
                // Roll back: re-insert the original snapshot verbatim.
                conn.execute(
                    "INSERT INTO memory_entries (id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?7)",
                    params![id, content, metadata_json, session_id, entry_type, embed_versions_json, created_at],
                )
                .ok();
                return Err(e);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    /// Read path (spec §4.5 "search"). Dispatches to fulltext/vector/hybrid, or
    /// (in `auto` mode) migration-aware hybrid when `migration_in_progress_until_ms`
    /// is set, else vector-with-fulltext-fallback.
    pub async fn search(&self, query: &str, opts: SearchOptions) -> Result<Vec<MemoryEntry>, StoreError> {
        let limit = opts.limit.min(MAX_SEARCH_LIMIT).max(1);
        match opts.mode {
            SearchMode::Fulltext => self.search_fulltext(query, &opts, limit, None).await,
            SearchMode::Vector => self.search_vector(query, &opts, limit).await,
            SearchMode::Hybrid => self.search_hybrid(query, &opts, limit).await,
            SearchMode::Auto => {
                if let Some(until) = opts.migration_in_progress_until_ms {
                    self.search_migration_aware_hybrid(query, &opts, limit, until).await
                } else {
                    let vector_results = self.search_vector(query, &opts, limit).await?;
                    if vector_results.is_empty() {
                        self.search_fulltext(query, &opts, limit, None).await
                    } else {
                        Ok(vector_results)
                    }
                }
            }
        }
    }

    async fn search_fulltext(
        &self,
        query: &str,
        opts: &SearchOptions,
        limit: usize,
        created_after_ms: Option<i64>,
    ) -> Result<Vec<MemoryEntry>, StoreError> {
        let keywords = extract_keywords(query);
        let conn = self.conn.clone();
        let session_id = opts.session_id.clone();
        let entry_type = opts.entry_type.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<MemoryEntry>, StoreError> {
            let conn = conn.lock().unwrap();
            let mut sql = "SELECT id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at FROM memory_entries WHERE 1=1".to_string();
            let mut sql_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            if let Some(session_id) = &session_id {
                sql.push_str(" AND session_id = ?");
                sql_params.push(Box::new(session_id.clone()));
            }
            if let Some(entry_type) = &entry_type {
                sql.push_str(" AND entry_type = ?");
                sql_params.push(Box::new(entry_type.clone()));
            }
            if let Some(after) = created_after_ms {
                sql.push_str(" AND created_at > ?");
                sql_params.push(Box::new(after));
            }

            let mut stmt = conn.prepare(&sql).map_err(|e| StoreError::Storage(e.to_string()))?;
            let param_refs: Vec<&dyn rusqlite::ToSql> = sql_params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt
                .query_map(param_refs.as_slice(), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, i64>(7)?,
                        row.get::<_, i64>(8)?,
                    ))
                })
                .map_err(|e| StoreError::Storage(e.to_string()))?;

            let mut scored: Vec<(u32, MemoryEntry)> = Vec::new();
            for row in rows {
                let (id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at) =
                    row.map_err(|e| StoreError::Storage(e.to_string()))?;
                let score = score_content(&content, &keywords);
                if score == 0 {
                    continue;
                }
                let entry = Self::row_to_entry(
                    id,
                    content,
                    metadata,
                    session_id,
                    entry_type,
                    active_embed,
                    embed_versions,
                    created_at,
                    updated_at,
                )?;
                scored.push((score, entry));
            }
            scored.sort_by(|a, b| b.0.cmp(&a.0));
            scored.truncate(limit);
            Ok(scored.into_iter().map(|(_, e)| e).collect())
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn search_vector(&self, query: &str, opts: &SearchOptions, limit: usize) -> Result<Vec<MemoryEntry>, StoreError> {
        let model_key = match opts.model_key.clone().or_else(|| self.active_model_key.lock().unwrap().clone()) {
            Some(m) => m,
            None => return Ok(Vec::new()),
        };
        let Some(embedder) = &self.embedder else {
            return Ok(Vec::new());
        };
        let Some(query_vector) = embedder.embed(&[query]).await.ok().and_then(|mut v| v.pop()) else {
            return Ok(Vec::new());
        };

        let conn = self.conn.clone();
        let session_id = opts.session_id.clone();
        let entry_type = opts.entry_type.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<MemoryEntry>, StoreError> {
            let conn = conn.lock().unwrap();
            let columns = Self::vector_columns(&conn)?;
            let Some(col) = columns.get(&model_key) else {
                return Ok(Vec::new());
            };
            if col.dimension != query_vector.len() {
                tracing::warn!(
                    model_key = %model_key,
                    expected = col.dimension,
                    actual = query_vector.len(),
                    "memory: vector dimension mismatch, skipping vector search"
                );
                return Ok(Vec::new());
            }

            let token = &col.column_token;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT rowid, distance FROM vec_{token} WHERE embedding MATCH ?1 AND k = ?2 ORDER BY distance"
                ))
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let hits: Vec<(i64, f64)> = stmt
                .query_map(params![Self::vector_to_json(&query_vector), limit as i64], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
                })
                .map_err(|e| StoreError::Storage(e.to_string()))?
                .collect::<Result<_, _>>()
                .map_err(|e| StoreError::Storage(e.to_string()))?;

            let mut entries = Vec::new();
            for (rowid, _distance) in hits {
                let row = conn
                    .query_row(
                        "SELECT id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at
                         FROM memory_entries WHERE seq = ?1",
                        params![rowid],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, Option<String>>(3)?,
                                row.get::<_, String>(4)?,
                                row.get::<_, Option<String>>(5)?,
                                row.get::<_, String>(6)?,
                                row.get::<_, i64>(7)?,
                                row.get::<_, i64>(8)?,
                            ))
                        },
                    )
                    .optional()
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                let Some((id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at)) = row else {
                    continue;
                };
                entries.push(Self::row_to_entry(
                    id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at,
                )?);
            }

            let entries: Vec<MemoryEntry> = entries
                .into_iter()
                .filter(|e| session_id.as_ref().map(|s| e.session_id.as_deref() == Some(s.as_str())).unwrap_or(true))
                .filter(|e| entry_type.as_ref().map(|t| e.entry_type == *t).unwrap_or(true))
                .collect();

            Ok(entries)
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn search_hybrid(&self, query: &str, opts: &SearchOptions, limit: usize) -> Result<Vec<MemoryEntry>, StoreError> {
        let (vector_results, fulltext_results) =
            tokio::join!(self.search_vector(query, opts, limit), self.search_fulltext(query, opts, limit, None));
        Self::merge_dedup(vector_results?, fulltext_results?, limit)
    }

    async fn search_migration_aware_hybrid(
        &self,
        query: &str,
        opts: &SearchOptions,
        limit: usize,
        migrated_until_ms: i64,
    ) -> Result<Vec<MemoryEntry>, StoreError> {
        let (vector_results, fulltext_results) = tokio::join!(
            self.search_vector(query, opts, limit),
            self.search_fulltext(query, opts, limit, Some(migrated_until_ms))
        );
        Self::merge_dedup(vector_results?, fulltext_results?, limit)
    }

    fn merge_dedup(a: Vec<MemoryEntry>, b: Vec<MemoryEntry>, limit: usize) -> Result<Vec<MemoryEntry>, StoreError> {
        let mut seen = std::collections::HashSet::new();
        let mut merged = Vec::new();
        for entry in a.into_iter().chain(b) {
            if seen.insert(entry.id.clone()) {
                merged.push(entry);
            }
            if merged.len() >= limit {
                break;
            }
        }
        Ok(merged)
    }

    /// Deletes `conversation`-type entries older than `retention_days`. Per
    /// DESIGN.md's resolution of the `shortTermRetentionDays` open question,
    /// `summary` and `entity` entries are never expired by this path.
    pub async fn prune_expired_conversations(&self, retention_days: i64) -> Result<usize, StoreError> {
        let cutoff_ms = Utc::now().timestamp_millis() - retention_days * 24 * 60 * 60 * 1000;
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<usize, StoreError> {
            let conn = conn.lock().unwrap();
            let deleted = conn
                .execute(
                    "DELETE FROM memory_entries WHERE created_at < ?1 AND entry_type NOT IN (?2, ?3)",
                    params![cutoff_ms, ENTRY_TYPE_SUMMARY, ENTRY_TYPE_ENTITY],
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(deleted)
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    /// Rows whose target vector column is null/absent, oldest first, bounded by
    /// `batch_size`, optionally restricted to `createdAt > cursor` (spec §4.6
    /// "Worker loop" step 1). Oldest-first keeps the cursor a contiguous
    /// low-water mark: every row with `createdAt <= cursor` is guaranteed
    /// already migrated or failed, so resuming from it never strands a row.
    pub async fn fetch_migration_batch(
        &self,
        target_model: &str,
        cursor_ms: Option<i64>,
        batch_size: usize,
    ) -> Result<Vec<MemoryEntry>, StoreError> {
        let conn = self.conn.clone();
        let target_model = target_model.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<MemoryEntry>, StoreError> {
            let conn = conn.lock().unwrap();
            let columns = Self::vector_columns(&conn)?;
            let migrated_ids: std::collections::HashSet<i64> = if let Some(col) = columns.get(&target_model) {
                let mut stmt = conn
                    .prepare(&format!("SELECT rowid FROM vec_{}", col.column_token))
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                stmt.query_map([], |row| row.get::<_, i64>(0))
                    .map_err(|e| StoreError::Storage(e.to_string()))?
                    .collect::<Result<_, _>>()
                    .map_err(|e| StoreError::Storage(e.to_string()))?
            } else {
                std::collections::HashSet::new()
            };

            let mut sql = "SELECT seq, id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at
                           FROM memory_entries WHERE 1=1"
                .to_string();
            let mut sql_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            if let Some(cursor) = cursor_ms {
                sql.push_str(" AND created_at > ?");
                sql_params.push(Box::new(cursor));
            }
            sql.push_str(" ORDER BY created_at ASC");

            let mut stmt = conn.prepare(&sql).map_err(|e| StoreError::Storage(e.to_string()))?;
            let param_refs: Vec<&dyn rusqlite::ToSql> = sql_params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt
                .query_map(param_refs.as_slice(), |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, i64>(8)?,
                        row.get::<_, i64>(9)?,
                    ))
                })
                .map_err(|e| StoreError::Storage(e.to_string()))?;

            let mut out = Vec::new();
            for row in rows {
                let (seq, id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at) =
                    row.map_err(|e| StoreError::Storage(e.to_string()))?;
                if migrated_ids.contains(&seq) {
                    continue;
                }
                out.push(Self::row_to_entry(
                    id, content, metadata, session_id, entry_type, active_embed, embed_versions, created_at, updated_at,
                )?);
                if out.len() >= batch_size {
                    break;
                }
            }
            Ok(out)
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    pub async fn embed_text(&self, text: &str) -> Result<Option<Vec<f32>>, StoreError> {
        let Some(embedder) = &self.embedder else {
            return Ok(None);
        };
        Ok(embedder.embed(&[text]).await?.pop())
    }

    pub fn active_model_key(&self) -> Option<String> {
        self.active_model_key.lock().unwrap().clone()
    }

    pub fn set_active_model_key(&self, model_key: Option<String>) {
        *self.active_model_key.lock().unwrap() = model_key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock_embedder::MockEmbedder;

    async fn new_store() -> (MemoryStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::open(
            dir.path().to_path_buf(),
            Some(Arc::new(MockEmbedder::new(8))),
            Some("mock/test-embed".to_string()),
            4,
        )
        .await
        .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn store_then_fulltext_search_finds_the_entry() {
        let (store, _dir) = new_store().await;
        store
            .store(StoreInput {
                content: "the quick brown fox jumps".to_string(),
                metadata: serde_json::json!({}),
                session_id: Some("c:1".to_string()),
                entry_type: "conversation".to_string(),
                precomputed_vector: None,
            })
            .await
            .unwrap();

        let results = store
            .search(
                "QUICK fox",
                SearchOptions {
                    mode: SearchMode::Fulltext,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("quick"));
    }

    #[tokio::test]
    async fn vector_column_is_created_lazily_and_dimension_matches() {
        let (store, _dir) = new_store().await;
        let entry = store
            .store(StoreInput {
                content: "hello vector world".to_string(),
                metadata: serde_json::json!({}),
                session_id: None,
                entry_type: "conversation".to_string(),
                precomputed_vector: None,
            })
            .await
            .unwrap();
        assert_eq!(entry.vector.as_ref().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn update_vector_changes_active_embed_and_bumps_updated_at() {
        let (store, _dir) = new_store().await;
        let entry = store
            .store(StoreInput {
                content: "entry to migrate".to_string(),
                metadata: serde_json::json!({}),
                session_id: None,
                entry_type: "conversation".to_string(),
                precomputed_vector: Some(vec![0.0; 8]),
            })
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store
            .update_vector(&entry.id, "mock/other-embed", vec![1.0; 8])
            .await
            .unwrap();

        let results = store
            .search(
                "entry to migrate",
                SearchOptions {
                    mode: SearchMode::Fulltext,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].active_embed.as_deref(), Some("mock/other-embed"));
        assert!(results[0].updated_at >= entry.updated_at);
    }

    #[tokio::test]
    async fn fulltext_search_is_case_insensitive() {
        let (store, _dir) = new_store().await;
        store
            .store(StoreInput {
                content: "CamelCase Keyword".to_string(),
                metadata: serde_json::json!({}),
                session_id: None,
                entry_type: "conversation".to_string(),
                precomputed_vector: None,
            })
            .await
            .unwrap();
        let lower = store
            .search(
                "camelcase",
                SearchOptions {
                    mode: SearchMode::Fulltext,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(lower.len(), 1);
    }

    #[tokio::test]
    async fn prune_expired_conversations_keeps_summary_and_entity() {
        let (store, _dir) = new_store().await;
        store
            .store(StoreInput {
                content: "old summary".to_string(),
                metadata: serde_json::json!({}),
                session_id: None,
                entry_type: ENTRY_TYPE_SUMMARY.to_string(),
                precomputed_vector: Some(vec![0.0; 8]),
            })
            .await
            .unwrap();
        store
            .store(StoreInput {
                content: "old convo".to_string(),
                metadata: serde_json::json!({}),
                session_id: None,
                entry_type: "conversation".to_string(),
                precomputed_vector: Some(vec![0.0; 8]),
            })
            .await
            .unwrap();

        let deleted = store.prune_expired_conversations(-1).await.unwrap();
        assert_eq!(deleted, 1);
        let remaining = store
            .search(
                "summary",
                SearchOptions {
                    mode: SearchMode::Fulltext,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
