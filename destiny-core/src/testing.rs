//! Testing utilities for the game master engine.
//!
//! This module provides deterministic collaborators for integration
//! testing without API calls:
//! - [`MockModel`] returns scripted responses in order
//! - [`MockEmbedder`] produces deterministic hash-seeded unit vectors
//! - [`FailingModel`] / [`FailingEmbedder`] simulate collaborator outages

use crate::model::{Embedder, ModelError, StoryModel};
use async_trait::async_trait;
use std::sync::Mutex;

/// A mock model that returns scripted responses.
///
/// Each `generate` call consumes the next scripted response; when the
/// script runs out, a fixed fallback line is returned. Note that a full
/// turn makes two model calls: the game-master response and the summary.
pub struct MockModel {
    responses: Mutex<Vec<String>>,
    next: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    /// Create a mock with scripted responses.
    pub fn new(responses: Vec<impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            next: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Append a response to the script.
    pub fn queue_response(&self, response: impl Into<String>) {
        self.responses.lock().unwrap().push(response.into());
    }

    /// Every prompt the mock has been asked to complete, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoryModel for MockModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let responses = self.responses.lock().unwrap();
        let mut next = self.next.lock().unwrap();
        let response = responses
            .get(*next)
            .cloned()
            .unwrap_or_else(|| "The story continues.".to_string());
        *next += 1;
        Ok(response)
    }
}

/// A model that always fails, for exercising failed-turn semantics.
pub struct FailingModel;

#[async_trait]
impl StoryModel for FailingModel {
    async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::Generation("model unreachable".to_string()))
    }
}

/// A deterministic embedder: the same text always embeds to the same
/// unit-length vector, and different texts almost surely differ.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a mock embedder with the given output dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Synchronous embedding, for building fixtures in tests.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut state = hash(text);
        let mut embedding = vec![0.0f32; self.dimensions];
        for value in embedding.iter_mut() {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            *value = ((state >> 16) as f32 / 32768.0) - 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in embedding.iter_mut() {
                *value /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        Ok(self.embed_sync(text))
    }
}

/// An embedder that always fails.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ModelError> {
        Err(ModelError::Embedding("embedder unreachable".to_string()))
    }
}

fn hash(s: &str) -> u64 {
    let mut hash: u64 = 5381;
    for byte in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_model_scripted_order() {
        let model = MockModel::new(vec!["first", "second"]);
        assert_eq!(model.generate("a").await.unwrap(), "first");
        assert_eq!(model.generate("b").await.unwrap(), "second");
        assert_eq!(model.generate("c").await.unwrap(), "The story continues.");
        assert_eq!(model.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic_unit_vectors() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed("hello").await.unwrap();
        let b = embedder.embed("hello").await.unwrap();
        let c = embedder.embed("world").await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_failing_collaborators() {
        assert!(FailingModel.generate("x").await.is_err());
        assert!(FailingEmbedder.embed("x").await.is_err());
    }
}
