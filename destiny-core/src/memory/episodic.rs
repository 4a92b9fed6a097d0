//! Episodic memory: the durable, summarized story log.
//!
//! Each turn's narrative summary is appended as a `(summary, embedding)`
//! pair. The durable layout is a JSON array loaded wholesale at startup
//! and rewritten wholesale on every append, so a write is durable before
//! `add_memory` returns. Semantic retrieval runs over a bounded recency
//! window through a flat vector index that is rebuilt from the window when
//! an entry falls out of it.

use crate::index::{normalize, VectorIndex};
use crate::model::SharedEmbedder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::MemoryError;

/// Default number of entries the semantic index retains.
pub const DEFAULT_INDEX_WINDOW: usize = 100;

/// A single episodic memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Summarized narrative for one turn.
    pub summary: String,
    /// Unit-length embedding of the summary (zero vector if the summary
    /// embedded to zero).
    pub embedding: Vec<f32>,
}

/// The episodic memory store.
pub struct EpisodicMemory {
    entries: Vec<MemoryEntry>,
    index: VectorIndex,
    /// Log position of index id 0.
    index_base: usize,
    window: usize,
    path: Option<PathBuf>,
    embedder: SharedEmbedder,
    dimension: Option<usize>,
}

impl EpisodicMemory {
    /// Open a file-backed store, loading any existing log.
    pub async fn open(
        path: impl AsRef<Path>,
        embedder: SharedEmbedder,
    ) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        let entries: Vec<MemoryEntry> = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut store = Self {
            entries,
            index: VectorIndex::new(),
            index_base: 0,
            window: DEFAULT_INDEX_WINDOW,
            path: Some(path),
            embedder,
            dimension: None,
        };
        store.dimension = store.entries.first().map(|e| e.embedding.len());
        store.rebuild_index();
        Ok(store)
    }

    /// Create an ephemeral in-memory store (no durable file).
    pub fn in_memory(embedder: SharedEmbedder) -> Self {
        Self {
            entries: Vec::new(),
            index: VectorIndex::new(),
            index_base: 0,
            window: DEFAULT_INDEX_WINDOW,
            path: None,
            embedder,
            dimension: None,
        }
    }

    /// Set the semantic-index window size.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self.rebuild_index();
        self
    }

    /// Number of stored memories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no memories.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a memory. The embedding is normalized to unit length (a zero
    /// vector is kept unchanged) and the durable write completes before
    /// this returns.
    pub async fn add_memory(
        &mut self,
        summary: impl Into<String>,
        mut embedding: Vec<f32>,
    ) -> Result<(), MemoryError> {
        if let Some(expected) = self.dimension {
            if embedding.len() != expected {
                return Err(MemoryError::DimensionMismatch {
                    expected,
                    found: embedding.len(),
                });
            }
        } else {
            self.dimension = Some(embedding.len());
        }

        normalize(&mut embedding);
        self.entries.push(MemoryEntry {
            summary: summary.into(),
            embedding,
        });
        self.save().await?;

        if self.entries.len() - self.index_base > self.window {
            self.rebuild_index();
        } else {
            let entry = self.entries.last().expect("just pushed");
            self.index.add(entry.embedding.clone())?;
        }

        debug!(total = self.entries.len(), "episodic memory appended");
        Ok(())
    }

    /// The last `n` summaries in chronological order (oldest of the window
    /// first). Served from the durable log; the vector index is not
    /// involved.
    pub fn get_recent(&self, n: usize) -> Vec<String> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..]
            .iter()
            .map(|e| e.summary.clone())
            .collect()
    }

    /// Semantic retrieval: embed the query, rank the indexed window by
    /// cosine similarity, return up to `top_k` summaries in descending
    /// similarity order. An empty store yields an empty result without
    /// calling the embedder; an embedder failure propagates.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, MemoryError> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_embedding = self.embedder.embed(query).await?;
        normalize(&mut query_embedding);

        let results = self.index.search(&query_embedding, top_k);
        Ok(results
            .into_iter()
            .map(|(id, _)| self.entries[self.index_base + id].summary.clone())
            .collect())
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        self.index_base = self.entries.len().saturating_sub(self.window);
        for entry in &self.entries[self.index_base..] {
            // Window entries share the log's dimension, pinned above.
            let _ = self.index.add(entry.embedding.clone());
        }
    }

    async fn save(&self) -> Result<(), MemoryError> {
        if let Some(ref path) = self.path {
            let content = serde_json::to_string_pretty(&self.entries)?;
            fs::write(path, content).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEmbedder;
    use std::sync::Arc;

    fn store() -> EpisodicMemory {
        EpisodicMemory::in_memory(Arc::new(MockEmbedder::new(8)))
    }

    async fn add(store: &mut EpisodicMemory, summary: &str) {
        let embedding = MockEmbedder::new(8).embed_sync(summary);
        store.add_memory(summary, embedding).await.unwrap();
    }

    #[tokio::test]
    async fn test_recency_ordering() {
        let mut mem = store();
        add(&mut mem, "A").await;
        add(&mut mem, "B").await;
        add(&mut mem, "C").await;

        assert_eq!(mem.get_recent(2), vec!["B", "C"]);
        assert_eq!(mem.get_recent(10).len(), 3);
    }

    #[tokio::test]
    async fn test_retrieve_exact_match_ranks_first() {
        let mut mem = store();
        for summary in ["goblin ambush", "tavern gossip", "dragon lair", "market day"] {
            add(&mut mem, summary).await;
        }

        let results = mem.retrieve("dragon lair", 1).await.unwrap();
        assert_eq!(results, vec!["dragon lair"]);
    }

    #[tokio::test]
    async fn test_retrieve_empty_store() {
        let mem = store();
        assert!(mem.retrieve("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_top_k_exceeds_len() {
        let mut mem = store();
        add(&mut mem, "only one").await;
        let results = mem.retrieve("only one", 100).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let mut mem = store();
        mem.add_memory("first", vec![1.0; 8]).await.unwrap();
        let err = mem.add_memory("second", vec![1.0; 4]).await.unwrap_err();
        assert!(matches!(
            err,
            MemoryError::DimensionMismatch {
                expected: 8,
                found: 4
            }
        ));
        assert_eq!(mem.len(), 1);
    }

    #[tokio::test]
    async fn test_window_eviction_keeps_recent_searchable() {
        let mut mem = store().with_window(3);
        for summary in ["one", "two", "three", "four", "five"] {
            add(&mut mem, summary).await;
        }

        // Full log retained durably, index covers the last three.
        assert_eq!(mem.len(), 5);
        let results = mem.retrieve("five", 10).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], "five");
        assert!(!results.contains(&"one".to_string()));
    }

    #[tokio::test]
    async fn test_file_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world_state.json");
        let embedder: SharedEmbedder = Arc::new(MockEmbedder::new(8));

        {
            let mut mem = EpisodicMemory::open(&path, embedder.clone()).await.unwrap();
            let embedding = MockEmbedder::new(8).embed_sync("the crown shattered");
            mem.add_memory("the crown shattered", embedding)
                .await
                .unwrap();
        }

        let mem = EpisodicMemory::open(&path, embedder).await.unwrap();
        assert_eq!(mem.len(), 1);
        assert_eq!(mem.get_recent(1), vec!["the crown shattered"]);
        let results = mem.retrieve("the crown shattered", 1).await.unwrap();
        assert_eq!(results, vec!["the crown shattered"]);
    }
}
