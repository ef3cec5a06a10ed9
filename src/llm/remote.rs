//! Gemini generateContent client for the remote tier.

use reqwest::blocking::Client;
use serde_json::json;

use crate::error::{AppError, ErrorKind};
use crate::llm::RemoteModel;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, AppError> {
        let client = Client::new();
        let model =
            std::env::var("XFORM_REMOTE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(GeminiClient {
            client,
            api_key,
            model,
        })
    }
}

impl RemoteModel for GeminiClient {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, AppError> {
        let url = format!("{BASE_URL}/{}:generateContent", self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "maxOutputTokens": max_tokens,
                "temperature": 0.2,
            },
        });

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| {
                AppError::new(
                    ErrorKind::RemoteGenerationFailed,
                    format!("Remote model request failed: {e}"),
                )
            })?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                ErrorKind::RemoteGenerationFailed,
                format!("Remote model request failed with status {}.", resp.status()),
            ));
        }

        let body: serde_json::Value = resp.json().map_err(|e| {
            AppError::new(
                ErrorKind::RemoteGenerationFailed,
                format!("Failed to parse remote model response: {e}"),
            )
        })?;

        let text = extract_text(&body).ok_or_else(|| {
            AppError::new(
                ErrorKind::RemoteGenerationFailed,
                "Remote model response contained no candidate text.",
            )
        })?;
        Ok(text)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &serde_json::Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let mut out = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
            out.push_str(text);
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_candidate_text_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "hello " }, { "text": "world" }] }
            }]
        });
        assert_eq!(extract_text(&body).as_deref(), Some("hello world"));
    }

    #[test]
    fn empty_candidates_yield_none() {
        assert!(extract_text(&json!({ "candidates": [] })).is_none());
        assert!(extract_text(&json!({})).is_none());
    }
}
