//! Ollama-compatible local completion client.

use reqwest::blocking::Client;
use serde_json::json;

use crate::error::{AppError, ErrorKind};
use crate::llm::LocalModel;

pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Result<Self, AppError> {
        // No request timeout here: the backend enforces its own
        // deadline and abandons the thread.
        let client = Client::builder().timeout(None).build().map_err(|e| {
            AppError::new(
                ErrorKind::LocalGenerationFailed,
                format!("Failed to build local HTTP client: {e}"),
            )
        })?;
        Ok(OllamaClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

impl LocalModel for OllamaClient {
    fn complete(&self, prompt: &str, max_new_tokens: u32) -> Result<String, AppError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": max_new_tokens,
                "temperature": 0.2,
            },
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                AppError::new(
                    ErrorKind::LocalGenerationFailed,
                    format!("Local model request failed: {e}"),
                )
            })?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                ErrorKind::LocalGenerationFailed,
                format!("Local model request failed with status {}.", resp.status()),
            ));
        }

        let body: serde_json::Value = resp.json().map_err(|e| {
            AppError::new(
                ErrorKind::LocalGenerationFailed,
                format!("Failed to parse local model response: {e}"),
            )
        })?;

        body.get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::new(
                    ErrorKind::LocalGenerationFailed,
                    "Local model response had no 'response' field.",
                )
            })
    }
}
