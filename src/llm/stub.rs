use async_trait::async_trait;

use super::{ChatMessage, ChatProvider, EmbeddingProvider};
use crate::error::Result;

/// Deterministic chat provider used in tests and whenever no provider is
/// configured. Always compiled (not gated behind a test feature) so a host
/// application can run this engine offline without an API key.
pub struct StubChatProvider {
    fixed_response: Option<String>,
}

impl StubChatProvider {
    pub fn new() -> Self {
        StubChatProvider { fixed_response: None }
    }

    /// Always return `response`, regardless of the prompt. Lets tests pin
    /// down exactly what the orchestrator/synthesizer receive back.
    pub fn with_fixed_response(response: impl Into<String>) -> Self {
        StubChatProvider { fixed_response: Some(response.into()) }
    }
}

impl Default for StubChatProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for StubChatProvider {
    async fn complete(&self, messages: &[ChatMessage], _temperature: f64) -> Result<String> {
        if let Some(fixed) = &self.fixed_response {
            return Ok(fixed.clone());
        }
        let prompt_len: usize = messages.iter().map(|m| m.content.len()).sum();
        Ok(format!(
            "This is a reasonable, measured response reflecting the prompt of length {prompt_len}."
        ))
    }
}

/// Deterministic embedding provider: a bag-of-characters hash folded into a
/// fixed-length vector. Not semantically meaningful, but stable across calls
/// for the same text, which is all the Context Retriever's tests need.
pub struct StubEmbeddingProvider {
    dims: usize,
}

impl StubEmbeddingProvider {
    pub fn new() -> Self {
        StubEmbeddingProvider { dims: 32 }
    }
}

impl Default for StubEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dims];
        for (i, byte) in text.bytes().enumerate() {
            let idx = i % self.dims;
            v[idx] += (byte as f32) / 255.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_embedding_is_deterministic_and_unit_norm() {
        let provider = StubEmbeddingProvider::new();
        let a = provider.embed("hello world").await.unwrap();
        let b = provider.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_stub_chat_fixed_response() {
        let provider = StubChatProvider::with_fixed_response("{\"ok\":true}");
        let out = provider.complete(&[ChatMessage::user("hi")], 0.5).await.unwrap();
        assert_eq!(out, "{\"ok\":true}");
    }
}
