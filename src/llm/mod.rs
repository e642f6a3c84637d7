pub mod http;
pub mod stub;

use async_trait::async_trait;

use crate::error::{AppError, Result};

/// A single chat message in a completion request.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: "system", content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: "user", content: content.into() }
    }
}

/// Chat-completion backend, implemented once against a real provider
/// (`http::HttpChatProvider`) and once as a deterministic stand-in
/// (`stub::StubChatProvider`) for tests and offline runs. Every call site
/// in this crate goes through this trait rather than talking to an HTTP
/// client directly, so the orchestrator, synthesizer, and graph builder
/// never need to know which provider is behind it.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], temperature: f64) -> Result<String>;
}

/// Embedding backend, mirroring `ChatProvider`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Parse a chat completion's content as JSON, tolerating a fenced code block
/// (some providers wrap JSON replies in ```json ... ```), which is the
/// defensive-parsing behavior called for wherever a prompt asks for
/// JSON-only output.
pub fn parse_json_response<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    let trimmed = raw.trim();
    let candidate = if let Some(stripped) = trimmed.strip_prefix("```json") {
        stripped.trim_end_matches("```").trim()
    } else if let Some(stripped) = trimmed.strip_prefix("```") {
        stripped.trim_end_matches("```").trim()
    } else {
        trimmed
    };
    serde_json::from_str(candidate).map_err(|e| {
        AppError::ExtractionFailed(format!("could not parse JSON response: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical_vectors() {
        let v = vec![1.0f32, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn test_parse_json_response_strips_fence() {
        #[derive(serde::Deserialize)]
        struct Foo {
            x: i32,
        }
        let raw = "```json\n{\"x\": 5}\n```";
        let parsed: Foo = parse_json_response(raw).unwrap();
        assert_eq!(parsed.x, 5);
    }
}
