//! Strips sensitive substrings from text before it reaches a channel (spec §4.2
//! "Failure behavior", §7): absolute filesystem paths and long bearer-like tokens.

use std::sync::OnceLock;

use regex::Regex;

fn path_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/[^\s]*").unwrap())
}

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_\-.]{20,}").unwrap())
}

/// Replaces absolute-path-looking runs and 20+ char bearer-like tokens with a
/// fixed placeholder. Order matters: paths are redacted first since a path can
/// itself be 20+ characters and would otherwise also match the token pattern.
pub fn redact(text: &str) -> String {
    let no_paths = path_pattern().replace_all(text, "[redacted-path]");
    token_pattern().replace_all(&no_paths, "[redacted]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_absolute_paths() {
        let out = redact("failed to read /home/bot/.config/secrets/keys.json: not found");
        assert!(!out.contains("/home/bot"));
        assert!(out.contains("[redacted-path]"));
    }

    #[test]
    fn redacts_long_bearer_like_tokens() {
        let out = redact("auth failed for token sk-abcdefghijklmnopqrstuvwxyz0123456789");
        assert!(!out.contains("sk-abcdefghijklmnopqrstuvwxyz0123456789"));
        assert!(out.contains("[redacted]"));
    }

    #[test]
    fn leaves_short_tokens_and_relative_text_alone() {
        let out = redact("short-id abc123 is fine");
        assert_eq!(out, "short-id abc123 is fine");
    }
}
