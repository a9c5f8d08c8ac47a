//! Gemini `generateContent` wire format and HTTP transport.

use super::remote::GenerativeClient;
use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
}

/// Pulls the answer out of a `generateContent` response.
///
/// Walks `candidates[].content.parts[].text`, skipping anything missing or of
/// the wrong shape, and joins the non-blank texts with a blank line. `None`
/// when nothing usable is found.
pub fn extract_text(body: &Value) -> Option<String> {
    let chunks: Vec<&str> = body
        .get("candidates")?
        .as_array()?
        .iter()
        .filter_map(|candidate| candidate.get("content")?.get("parts")?.as_array())
        .flatten()
        .filter_map(|part| part.get("text")?.as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect();

    (!chunks.is_empty()).then(|| chunks.join("\n\n"))
}

/// [`GenerativeClient`] backed by the Gemini REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    /// Creates a client for the given models endpoint, e.g. [`DEFAULT_API_BASE`].
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<Value, TransportError> {
        let url = self.endpoint(model);
        debug!(%url, "Sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_joins_all_text_parts() {
        let body = json!({
            "candidates": [
                {"content": {"parts": [{"text": "  First. "}, {"text": "Second."}]}},
                {"content": {"parts": [{"text": "Third."}]}}
            ]
        });
        assert_eq!(
            extract_text(&body).as_deref(),
            Some("First.\n\nSecond.\n\nThird.")
        );
    }

    #[test]
    fn test_extract_tolerates_malformed_shapes() {
        let body = json!({
            "candidates": [
                null,
                "oops",
                {"content": null},
                {"content": {"parts": "not a list"}},
                {"content": {"parts": [null, {"text": 7}, {"text": "   "}, {"inlineData": {}}]}},
                {"content": {"parts": [{"text": "Usable"}]}}
            ]
        });
        assert_eq!(extract_text(&body).as_deref(), Some("Usable"));
    }

    #[test]
    fn test_extract_none_when_nothing_usable() {
        for body in [
            json!(null),
            json!([]),
            json!({}),
            json!({"candidates": {}}),
            json!({"candidates": []}),
            json!({"candidates": [{"content": {"parts": []}}]}),
            json!({"promptFeedback": {"blockReason": "SAFETY"}}),
        ] {
            assert_eq!(extract_text(&body), None, "body: {body}");
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let request = GenerateContentRequest {
            system_instruction: Content::text(None, "persona"),
            contents: vec![Content::text(Some("user"), "question")],
            generation_config: GenerationConfig {
                max_output_tokens: 350,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "system_instruction": {"parts": [{"text": "persona"}]},
                "contents": [{"role": "user", "parts": [{"text": "question"}]}],
                "generationConfig": {"maxOutputTokens": 350}
            })
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new("http://localhost:9999/models/");
        assert_eq!(
            client.endpoint("gemini-2.0-flash"),
            "http://localhost:9999/models/gemini-2.0-flash:generateContent"
        );
    }
}
