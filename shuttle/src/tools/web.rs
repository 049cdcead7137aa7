//! `web_fetch` tool: fetches a URL over HTTP(S) and returns its body as text
//! (spec §9 tool table, grounded in spirit on the teacher's now-retired
//! `WebFetcherTool`/`web_tools_source.rs`).

use async_trait::async_trait;
use serde_json::json;

use crate::error::ToolSourceError;
use crate::tools::{Tool, ToolCallContent, ToolCallContext, ToolSpec};

pub const TOOL_WEB_FETCH: &str = "web_fetch";

/// Body is capped to keep a single observation from blowing the context window.
const MAX_BODY_BYTES: usize = 20_000;

pub struct WebFetchTool {
    client: reqwest::Client,
}

impl Default for WebFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebFetchTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn truncate(mut s: String) -> String {
        if s.len() > MAX_BODY_BYTES {
            s.truncate(MAX_BODY_BYTES);
            s.push_str("\n...(truncated)");
        }
        s
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        TOOL_WEB_FETCH
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_WEB_FETCH.to_string(),
            description: Some(
                "Fetch a URL over HTTP(S) and return the response body as text, truncated if large."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Absolute http(s):// URL to fetch."
                    }
                },
                "required": ["url"]
            }),
        }
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let url = args
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing url".to_string()))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ToolSourceError::InvalidInput(format!(
                "url must start with http:// or https://: {url}"
            )));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("failed to read body: {e}")))?;

        let mut text = Self::truncate(body);
        if !status.is_success() {
            text = format!("(HTTP {status})\n{text}");
        }
        Ok(ToolCallContent { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_scheme() {
        let tool = WebFetchTool::new();
        let err = tool
            .call(json!({"url": "file:///etc/passwd"}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_url_is_invalid_input() {
        let tool = WebFetchTool::new();
        let err = tool.call(json!({}), None).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
    }
}
