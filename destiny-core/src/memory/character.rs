//! Character memory: per-NPC interaction history.
//!
//! Interactions are appended to a durable log covering every NPC, while
//! retrieval runs against a per-NPC partition: a bounded recency window
//! with its own vector index, created lazily the first time an NPC is
//! seen. The full durable history of an NPC stays queryable even after
//! entries fall out of the retained window.

use crate::index::{dot, normalize, VectorIndex};
use crate::model::SharedEmbedder;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::MemoryError;

/// Default per-NPC retention window.
pub const DEFAULT_RETENTION: usize = 50;

/// One recorded interaction with an NPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterInteraction {
    /// The NPC this interaction belongs to.
    pub npc_name: String,
    /// What happened, as the model described it.
    pub text: String,
    /// Unit-length embedding of the text.
    pub embedding: Vec<f32>,
}

/// Retained window and index for one NPC.
#[derive(Debug, Default)]
struct NpcPartition {
    retained: Vec<(String, Vec<f32>)>,
    index: VectorIndex,
}

impl NpcPartition {
    fn push(&mut self, text: String, embedding: Vec<f32>, retention: usize) {
        self.retained.push((text, embedding));
        if self.retained.len() > retention {
            self.trim(retention);
        } else {
            let (_, embedding) = self.retained.last().expect("just pushed");
            let _ = self.index.add(embedding.clone());
        }
    }

    /// Evict oldest entries beyond `retention` and rebuild the index from
    /// the retained window.
    fn trim(&mut self, retention: usize) {
        if self.retained.len() <= retention {
            return;
        }
        self.retained.drain(..self.retained.len() - retention);
        self.index.clear();
        for (_, embedding) in &self.retained {
            let _ = self.index.add(embedding.clone());
        }
    }
}

/// The character memory store.
pub struct CharacterMemory {
    partitions: HashMap<String, NpcPartition>,
    log: Vec<CharacterInteraction>,
    retention: usize,
    path: Option<PathBuf>,
    embedder: SharedEmbedder,
    dimension: Option<usize>,
}

impl CharacterMemory {
    /// Open a file-backed store, replaying any existing log into per-NPC
    /// partitions.
    pub async fn open(
        path: impl AsRef<Path>,
        embedder: SharedEmbedder,
    ) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        let log: Vec<CharacterInteraction> = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut store = Self {
            partitions: HashMap::new(),
            log: Vec::new(),
            retention: DEFAULT_RETENTION,
            path: Some(path),
            embedder,
            dimension: None,
        };
        for interaction in log {
            store.dimension.get_or_insert(interaction.embedding.len());
            store
                .partitions
                .entry(interaction.npc_name.clone())
                .or_default()
                .push(
                    interaction.text.clone(),
                    interaction.embedding.clone(),
                    store.retention,
                );
            store.log.push(interaction);
        }
        Ok(store)
    }

    /// Create an ephemeral in-memory store.
    pub fn in_memory(embedder: SharedEmbedder) -> Self {
        Self {
            partitions: HashMap::new(),
            log: Vec::new(),
            retention: DEFAULT_RETENTION,
            path: None,
            embedder,
            dimension: None,
        }
    }

    /// Set the per-NPC retention window. Partitions are rebuilt from the
    /// full durable log, so a store replayed from disk honors a retention
    /// both narrower and wider than the one it was opened with.
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self.partitions.clear();
        for interaction in &self.log {
            self.partitions
                .entry(interaction.npc_name.clone())
                .or_default()
                .push(
                    interaction.text.clone(),
                    interaction.embedding.clone(),
                    self.retention,
                );
        }
        self
    }

    /// NPCs with at least one recorded interaction.
    pub fn known_npcs(&self) -> Vec<&str> {
        self.partitions.keys().map(String::as_str).collect()
    }

    /// Total interactions across all NPCs.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether no interaction has been recorded.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Record an interaction, embedding the text through the store's
    /// embedder. The NPC's partition is created lazily on first use.
    pub async fn add_interaction(
        &mut self,
        npc_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), MemoryError> {
        let text = text.into();
        let embedding = self.embedder.embed(&text).await?;
        self.add_embedded(npc_name, text, embedding).await
    }

    /// Record an interaction with a pre-computed embedding. Used by the
    /// turn orchestrator, which embeds all of a turn's updates before
    /// committing any of them.
    pub async fn add_embedded(
        &mut self,
        npc_name: impl Into<String>,
        text: impl Into<String>,
        mut embedding: Vec<f32>,
    ) -> Result<(), MemoryError> {
        let npc_name = npc_name.into();
        let text = text.into();

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
        self.log.push(CharacterInteraction {
            npc_name: npc_name.clone(),
            text: text.clone(),
            embedding: embedding.clone(),
        });
        self.save().await?;

        self.partitions
            .entry(npc_name.clone())
            .or_default()
            .push(text, embedding, self.retention);

        debug!(npc = %npc_name, "character interaction recorded");
        Ok(())
    }

    /// Retrieve an NPC's memory. With no query, returns the most recent
    /// `top_k` retained interactions in chronological order without any
    /// embedding call; with a query, runs semantic search over the NPC's
    /// retained window. An unknown NPC yields an empty result.
    pub async fn get_memory(
        &self,
        npc_name: &str,
        query: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<String>, MemoryError> {
        let Some(partition) = self.partitions.get(npc_name) else {
            return Ok(Vec::new());
        };

        match query {
            None => {
                let start = partition.retained.len().saturating_sub(top_k);
                Ok(partition.retained[start..]
                    .iter()
                    .map(|(text, _)| text.clone())
                    .collect())
            }
            Some(query) => {
                let mut query_embedding = self.embedder.embed(query).await?;
                normalize(&mut query_embedding);
                let results = partition.index.search(&query_embedding, top_k);
                Ok(results
                    .into_iter()
                    .map(|(id, _)| partition.retained[id].0.clone())
                    .collect())
            }
        }
    }

    /// The full durable history for an NPC, oldest first, ignoring the
    /// retention window.
    pub fn full_history(&self, npc_name: &str) -> Vec<&str> {
        self.log
            .iter()
            .filter(|i| i.npc_name == npc_name)
            .map(|i| i.text.as_str())
            .collect()
    }

    /// Semantic search over an NPC's full durable history rather than the
    /// retained window. Linear scan; the window index does not cover
    /// evicted entries.
    pub async fn search_full_history(
        &self,
        npc_name: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<String>, MemoryError> {
        let mut query_embedding = self.embedder.embed(query).await?;
        normalize(&mut query_embedding);

        let mut scored: Vec<(&CharacterInteraction, f32)> = self
            .log
            .iter()
            .filter(|i| i.npc_name == npc_name && i.embedding.len() == query_embedding.len())
            .map(|i| (i, dot(&query_embedding, &i.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(i, _)| i.text.clone()).collect())
    }

    async fn save(&self) -> Result<(), MemoryError> {
        if let Some(ref path) = self.path {
            let content = serde_json::to_string_pretty(&self.log)?;
            fs::write(path, content).await?;
        }
        Ok(())
    }
}
