//! Extracts the first top-level `{...}` JSON object out of free-form LLM text.
//!
//! Shared by the intent pre-pass (spec §4.3, expects `{model, reason}`) and the
//! ReAct action parser (spec §4.2 step 5, expects `{thought, action, action_input}`)
//! so both honor the same round-trip property from spec §8: parsing the object out
//! of a ```` ```json\n{...}\n``` ```` fence yields the same result as parsing the
//! inner object directly.

/// Scans `text` for the first balanced `{...}` span (ignoring braces inside string
/// literals) and parses it as JSON. Returns `None` if no balanced span parses.
pub fn extract_first_json_object(text: &str) -> Option<serde_json::Value> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        let c = b as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + offset + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let end = end?;
    serde_json::from_str(&text[start..end]).ok()
}
