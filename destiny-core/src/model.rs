//! Collaborator contracts for the external model and embedder.
//!
//! The engine never talks to a model API directly; it goes through these
//! object-safe traits so the session can be driven by the real Gemini
//! client or by the deterministic mocks in [`crate::testing`].

use async_trait::async_trait;
use gemini::Gemini;
use std::sync::Arc;
use thiserror::Error;

/// Errors from model and embedding collaborators.
///
/// Collaborator failures are fatal to the turn that triggered them: the
/// orchestrator commits no memory or quest mutation, so resubmitting the
/// same input is safe.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("embedding failed: {0}")]
    Embedding(String),
}

/// A generative model: prompt text in, free text out.
#[async_trait]
pub trait StoryModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// A text embedder. The output dimension must be stable for the process
/// lifetime; stores pin it from the first vector they see.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;
}

/// A shared model handle usable across stores and sessions.
pub type SharedModel = Arc<dyn StoryModel>;

/// A shared embedder handle usable across stores and sessions.
pub type SharedEmbedder = Arc<dyn Embedder>;

#[async_trait]
impl StoryModel for gemini::Gemini {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        Gemini::generate(self, prompt)
            .await
            .map_err(|e| ModelError::Generation(e.to_string()))
    }
}

#[async_trait]
impl Embedder for gemini::Gemini {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        Gemini::embed(self, text)
            .await
            .map_err(|e| ModelError::Embedding(e.to_string()))
    }
}
