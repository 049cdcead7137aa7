//! `MemoryEntry` and the filesystem-safe vector-column naming scheme (spec §4.5,
//! §6 "model ids may contain `/`, `:`, `.`, `-` — these are re-escaped when
//! projected into column names").

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// One row of the memory store, as handed back from `search`/`get` (spec §4.5
/// "Record-to-entry conversion"). `vector` is present only when the caller asked
/// for a specific column and that column holds a non-empty vector for this row.
#[derive(Clone, Debug)]
pub struct MemoryEntry {
    pub id: String,
    pub content: String,
    pub metadata: Value,
    pub session_id: Option<String>,
    pub entry_type: String,
    pub active_embed: Option<String>,
    pub embed_versions: HashMap<String, i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub vector: Option<Vec<f32>>,
}

pub const ENTRY_TYPE_CONVERSATION: &str = "conversation";
pub const ENTRY_TYPE_SUMMARY: &str = "summary";
pub const ENTRY_TYPE_ENTITY: &str = "entity";

pub fn epoch_ms_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

pub fn datetime_to_epoch_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// Encodes a fully-qualified model key (e.g. `"openai/text-embedding-3-small"`)
/// into a filesystem/SQL-identifier-safe column name (spec §4.5 dynamic schema).
///
/// Substitutions, applied left to right so the prefix itself never collides with
/// an escaped separator: `/ -> _s_`, `: -> _c_`, `. -> _d_`, `- -> _h_`.
pub fn encode_column_name(model_key: &str) -> String {
    let escaped = model_key
        .replace('/', "_s_")
        .replace(':', "_c_")
        .replace('.', "_d_")
        .replace('-', "_h_");
    format!("vector_{escaped}")
}

/// Inverse of [`encode_column_name`]. Returns `None` if `column` does not carry
/// the `vector_` prefix.
pub fn decode_column_name(column: &str) -> Option<String> {
    let escaped = column.strip_prefix("vector_")?;
    Some(
        escaped
            .replace("_s_", "/")
            .replace("_c_", ":")
            .replace("_d_", ".")
            .replace("_h_", "-"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        let key = "openai/text-embedding-3-small";
        let column = encode_column_name(key);
        assert_eq!(column, "vector_openai_s_text_h_embedding_h_3_h_small");
        assert_eq!(decode_column_name(&column).as_deref(), Some(key));
    }

    #[test]
    fn encode_decode_round_trips_with_colons_and_dots() {
        let key = "ollama/nomic-embed-text:v1.5";
        let column = encode_column_name(key);
        assert_eq!(decode_column_name(&column).as_deref(), Some(key));
    }

    #[test]
    fn non_vector_column_decodes_to_none() {
        assert_eq!(decode_column_name("content"), None);
    }

    #[test]
    fn epoch_round_trips_through_datetime() {
        let ms = 1_700_000_000_123;
        let dt = epoch_ms_to_datetime(ms);
        assert_eq!(datetime_to_epoch_ms(dt), ms);
    }
}
