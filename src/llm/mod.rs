//! Two-tier text generation backend.
//!
//! Requests go to a local model first and fall back to the remote API
//! when the local tier is missing, fails, or exceeds its deadline. A
//! timed-out local request is abandoned, not cancelled: the worker
//! thread keeps running to completion and its answer is dropped.

pub mod local;
pub mod remote;

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::{AppError, ErrorKind};

pub use local::OllamaClient;
pub use remote::GeminiClient;

const DEFAULT_LOCAL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LOCAL_URL: &str = "http://localhost:11434";
const DEFAULT_LOCAL_MODEL: &str = "qwen2.5-coder:7b";

/// A locally hosted completion model.
pub trait LocalModel: Send + Sync {
    fn complete(&self, prompt: &str, max_new_tokens: u32) -> Result<String, AppError>;
}

/// A remote completion API.
pub trait RemoteModel: Send + Sync {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, AppError>;
}

/// Remote availability is decided once, at construction, and carried
/// as state rather than rediscovered per request.
pub enum RemoteState {
    Ready(Box<dyn RemoteModel>),
    Unavailable { reason: String },
}

pub struct GenerativeBackend {
    local: Option<Arc<dyn LocalModel>>,
    remote: RemoteState,
    local_timeout: Duration,
}

impl GenerativeBackend {
    pub fn new(
        local: Option<Arc<dyn LocalModel>>,
        remote: RemoteState,
        local_timeout: Duration,
    ) -> Self {
        GenerativeBackend {
            local,
            remote,
            local_timeout,
        }
    }

    /// Build the backend from environment variables (and `.env`).
    ///
    /// A missing `GEMINI_API_KEY` does not fail construction; it marks
    /// the remote tier unavailable so callers that never need it still
    /// work.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let base_url =
            std::env::var("XFORM_LOCAL_URL").unwrap_or_else(|_| DEFAULT_LOCAL_URL.to_string());
        let model =
            std::env::var("XFORM_LOCAL_MODEL").unwrap_or_else(|_| DEFAULT_LOCAL_MODEL.to_string());
        let local: Arc<dyn LocalModel> = Arc::new(OllamaClient::new(base_url, model)?);

        let remote = match std::env::var("GEMINI_API_KEY") {
            Ok(api_key) if !api_key.trim().is_empty() => {
                RemoteState::Ready(Box::new(GeminiClient::new(api_key)?))
            }
            _ => RemoteState::Unavailable {
                reason: "Missing GEMINI_API_KEY in environment (.env).".to_string(),
            },
        };

        let local_timeout = std::env::var("XFORM_LOCAL_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_LOCAL_TIMEOUT_SECS));

        Ok(GenerativeBackend {
            local: Some(local),
            remote,
            local_timeout,
        })
    }

    /// Generate a completion, trying the local tier first unless
    /// `force_remote` is set.
    pub fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        force_remote: bool,
    ) -> Result<String, AppError> {
        if !force_remote {
            if let Some(local) = &self.local {
                match self.generate_local(local, prompt, max_tokens) {
                    Ok(text) => return Ok(text),
                    Err(err) => {
                        log::warn!("local generation failed ({err}); falling back to remote");
                    }
                }
            }
        }
        self.generate_remote(prompt, max_tokens)
    }

    pub fn remote_available(&self) -> bool {
        matches!(self.remote, RemoteState::Ready(_))
    }

    fn generate_local(
        &self,
        local: &Arc<dyn LocalModel>,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, AppError> {
        let (tx, rx) = mpsc::channel();
        let model = Arc::clone(local);
        let prompt = prompt.to_string();

        thread::Builder::new()
            .name("local-generate".to_string())
            .spawn(move || {
                let _ = tx.send(model.complete(&prompt, max_tokens));
            })
            .map_err(|e| {
                AppError::new(
                    ErrorKind::LocalGenerationFailed,
                    format!("Failed to spawn local generation thread: {e}"),
                )
            })?;

        match rx.recv_timeout(self.local_timeout) {
            Ok(result) => result,
            // The worker thread is left running; its eventual answer
            // lands in a closed channel.
            Err(_) => Err(AppError::new(
                ErrorKind::LocalTimeout,
                format!(
                    "Local model did not answer within {}s; request abandoned.",
                    self.local_timeout.as_secs()
                ),
            )),
        }
    }

    fn generate_remote(&self, prompt: &str, max_tokens: u32) -> Result<String, AppError> {
        match &self.remote {
            RemoteState::Ready(model) => model.complete(prompt, max_tokens),
            RemoteState::Unavailable { reason } => {
                Err(AppError::new(ErrorKind::RemoteUnavailable, reason.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLocal {
        reply: Result<&'static str, &'static str>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl LocalModel for FixedLocal {
        fn complete(&self, _prompt: &str, _max_new_tokens: u32) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.reply
                .map(str::to_string)
                .map_err(|msg| AppError::new(ErrorKind::LocalGenerationFailed, msg))
        }
    }

    struct FixedRemote {
        reply: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl RemoteModel for FixedRemote {
        fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    fn local(reply: Result<&'static str, &'static str>, delay: Duration) -> Arc<dyn LocalModel> {
        Arc::new(FixedLocal {
            reply,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn local_answer_wins_without_touching_remote() {
        let remote_calls = Arc::new(AtomicUsize::new(0));
        let backend = GenerativeBackend::new(
            Some(local(Ok("local answer"), Duration::ZERO)),
            RemoteState::Ready(Box::new(FixedRemote {
                reply: "remote answer",
                calls: Arc::clone(&remote_calls),
            })),
            Duration::from_secs(5),
        );
        let out = backend.generate("p", 64, false).unwrap();
        assert_eq!(out, "local answer");
        assert_eq!(remote_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn local_failure_falls_back_to_remote() {
        let remote_calls = Arc::new(AtomicUsize::new(0));
        let backend = GenerativeBackend::new(
            Some(local(Err("boom"), Duration::ZERO)),
            RemoteState::Ready(Box::new(FixedRemote {
                reply: "remote answer",
                calls: Arc::clone(&remote_calls),
            })),
            Duration::from_secs(5),
        );
        let out = backend.generate("p", 64, false).unwrap();
        assert_eq!(out, "remote answer");
        assert_eq!(remote_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn slow_local_is_abandoned_for_remote() {
        let remote_calls = Arc::new(AtomicUsize::new(0));
        let backend = GenerativeBackend::new(
            Some(local(Ok("too late"), Duration::from_millis(200))),
            RemoteState::Ready(Box::new(FixedRemote {
                reply: "remote answer",
                calls: Arc::clone(&remote_calls),
            })),
            Duration::from_millis(10),
        );
        let out = backend.generate("p", 64, false).unwrap();
        assert_eq!(out, "remote answer");
    }

    #[test]
    fn force_remote_skips_a_working_local_tier() {
        let remote_calls = Arc::new(AtomicUsize::new(0));
        let backend = GenerativeBackend::new(
            Some(local(Ok("local answer"), Duration::ZERO)),
            RemoteState::Ready(Box::new(FixedRemote {
                reply: "remote answer",
                calls: Arc::clone(&remote_calls),
            })),
            Duration::from_secs(5),
        );
        let out = backend.generate("p", 64, true).unwrap();
        assert_eq!(out, "remote answer");
    }

    #[test]
    fn unavailable_remote_is_a_typed_error() {
        let backend = GenerativeBackend::new(
            None,
            RemoteState::Unavailable {
                reason: "Missing GEMINI_API_KEY in environment (.env).".to_string(),
            },
            Duration::from_secs(5),
        );
        let err = backend.generate("p", 64, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
        assert_eq!(err.exit_code(), 2);
        assert!(!backend.remote_available());
    }
}
