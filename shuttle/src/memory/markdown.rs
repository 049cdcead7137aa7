//! Append-only markdown mirror of the memory store (spec §6 storage layout):
//! one `sessions/YYYY-MM-DD.md` file per UTC day, never read back for retrieval.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::memory::entry::{ENTRY_TYPE_ENTITY, ENTRY_TYPE_SUMMARY};

fn heading_for(entry_type: &str) -> &'static str {
    match entry_type {
        ENTRY_TYPE_SUMMARY => "## 📝 摘要",
        ENTRY_TYPE_ENTITY => "## 🏷️ 实体",
        _ => "## 💬 对话",
    }
}

fn day_file_path(sessions_dir: &Path, at: DateTime<Utc>) -> PathBuf {
    sessions_dir.join(format!("{}.md", at.format("%Y-%m-%d")))
}

/// Appends one entry to today's markdown file, creating `sessions/` and the day
/// file as needed. Blocking; callers run this inside `spawn_blocking`.
pub fn append_entry(
    sessions_dir: &Path,
    id: &str,
    session_id: Option<&str>,
    entry_type: &str,
    tags: &[String],
    content: &str,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    std::fs::create_dir_all(sessions_dir).map_err(|e| StoreError::Storage(e.to_string()))?;
    let path = day_file_path(sessions_dir, at);

    let mut block = String::new();
    block.push_str(heading_for(entry_type));
    block.push('\n');
    block.push_str(&format!("id: {id}\n"));
    if let Some(session) = session_id {
        block.push_str(&format!("session: {session}\n"));
    }
    block.push_str(&format!("timestamp: {}\n", at.to_rfc3339()));
    if !tags.is_empty() {
        block.push_str(&format!("tags: {}\n", tags.join(", ")));
    }
    block.push_str("---\n");
    block.push_str(content.trim_end());
    block.push_str("\n\n");

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| StoreError::Storage(e.to_string()))?;
    file.write_all(block.as_bytes())
        .map_err(|e| StoreError::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn appends_to_dated_file_with_heading() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        append_entry(dir.path(), "id-1", Some("c:1"), "conversation", &[], "hello world", at).unwrap();
        let path = day_file_path(dir.path(), at);
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("## 💬 对话"));
        assert!(contents.contains("hello world"));
    }

    #[test]
    fn second_append_is_appended_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        append_entry(dir.path(), "id-1", None, "summary", &[], "first", at).unwrap();
        append_entry(dir.path(), "id-2", None, "summary", &[], "second", at).unwrap();
        let contents = std::fs::read_to_string(day_file_path(dir.path(), at)).unwrap();
        assert!(contents.contains("first"));
        assert!(contents.contains("second"));
        assert!(contents.contains("## 📝 摘要"));
    }
}
