//! Narrative memory and state engine for an AI game master.
//!
//! This crate provides:
//! - Episodic memory with semantic retrieval over turn summaries
//! - Per-NPC interaction memory
//! - A quest ledger with progress, completion, and reward tracking
//! - A tolerant parser for structured updates embedded in model output
//! - A turn orchestrator tying the stores to a language model
//!
//! # Quick Start
//!
//! ```ignore
//! use destiny_core::{GameSession, SessionConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = gemini::Gemini::from_env()?;
//!     let config = SessionConfig::new().with_storage_dir("campaign");
//!
//!     let mut session =
//!         GameSession::new(config, Arc::new(client.clone()), Arc::new(client)).await?;
//!
//!     let outcome = session.player_action("I look around the tavern").await?;
//!     println!("{}", outcome.narrative);
//!     Ok(())
//! }
//! ```

pub mod index;
pub mod intent;
pub mod memory;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod quests;
pub mod session;
pub mod testing;

// Primary public API
pub use intent::{IntentDetector, KeywordIntentDetector, PlayerIntent};
pub use memory::{CharacterMemory, EpisodicMemory, MemoryError};
pub use model::{Embedder, ModelError, SharedEmbedder, SharedModel, StoryModel};
pub use parser::{parse_llm_output, NpcRecord, QuestRecord};
pub use quests::{Quest, QuestError, QuestLog, Reward};
pub use session::{
    GameSession, QuestEvent, QuestProposal, SessionConfig, SessionError, TurnOutcome,
};
