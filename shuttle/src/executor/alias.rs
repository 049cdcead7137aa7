//! Canonical alias table for ReAct `action` resolution (spec §4.2 step 7).
//!
//! `finish` is not a tool; callers check for it before consulting the registry.

use crate::tools::ToolRegistry;

const ALIASES: &[(&str, &str)] = &[
    ("exec", "shell_exec"),
    ("run", "shell_exec"),
    ("bash", "shell_exec"),
    ("shell_exec", "shell_exec"),
    ("done", "finish"),
    ("answer", "finish"),
    ("finish", "finish"),
    ("ls", "list_dir"),
    ("list_dir", "list_dir"),
    ("cat", "read_file"),
    ("read_file", "read_file"),
    ("write_file", "write_file"),
    ("fetch", "web_fetch"),
    ("web_fetch", "web_fetch"),
];

/// Resolves a raw ReAct `action` string to a concrete tool name, or `"finish"`.
///
/// First consults the alias table, case-insensitively; if `action` doesn't match
/// any alias, falls back to a case-insensitive direct match against the tools
/// already registered in `registry`. Returns `None` when neither matches.
pub fn resolve_action(action: &str, registry: &ToolRegistry) -> Option<String> {
    let lower = action.to_ascii_lowercase();
    if let Some((_, target)) = ALIASES.iter().find(|(alias, _)| *alias == lower) {
        return Some((*target).to_string());
    }
    registry
        .list()
        .into_iter()
        .map(|spec| spec.name)
        .find(|name| name.to_ascii_lowercase() == lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::tools::file::{ReadFileTool, TOOL_READ_FILE};

    fn registry_with_read_file() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ReadFileTool::new(Arc::new(std::env::temp_dir()))));
        registry
    }

    #[test]
    fn resolves_known_aliases_case_insensitively() {
        let registry = registry_with_read_file();
        assert_eq!(resolve_action("EXEC", &registry).as_deref(), Some("shell_exec"));
        assert_eq!(resolve_action("Bash", &registry).as_deref(), Some("shell_exec"));
        assert_eq!(resolve_action("done", &registry).as_deref(), Some("finish"));
        assert_eq!(resolve_action("CAT", &registry).as_deref(), Some(TOOL_READ_FILE));
    }

    #[test]
    fn falls_back_to_direct_registry_match() {
        let registry = registry_with_read_file();
        assert_eq!(resolve_action("read_file", &registry).as_deref(), Some(TOOL_READ_FILE));
    }

    #[test]
    fn unknown_action_resolves_to_none() {
        let registry = registry_with_read_file();
        assert!(resolve_action("teleport", &registry).is_none());
    }
}
