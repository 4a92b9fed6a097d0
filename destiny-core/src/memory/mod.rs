//! Durable narrative memory stores.
//!
//! Episodic memory holds the summarized story log; character memory holds
//! per-NPC interaction history. Both pair a durable append-only log with a
//! bounded in-memory vector index for semantic retrieval.

pub mod character;
pub mod episodic;

pub use character::{CharacterInteraction, CharacterMemory};
pub use episodic::{EpisodicMemory, MemoryEntry};

use crate::index::IndexError;
use crate::model::ModelError;
use thiserror::Error;

/// Errors from memory store operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("embedding dimension mismatch: store holds {expected}-dim vectors, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
}
