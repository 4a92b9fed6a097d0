//! GameSession - the turn orchestrator and primary public API.
//!
//! A session owns the three stores and the collaborator handles, and
//! resolves one player input at a time: assemble context, invoke the
//! model, parse the extraction, commit memory and quest updates, persist
//! the turn's summary. All fallible collaborator calls complete before any
//! store mutation, so a failed turn commits nothing and the same input can
//! be retried safely. Turns are strictly sequential per session; `&mut
//! self` enforces it.

use crate::intent::{IntentDetector, KeywordIntentDetector};
use crate::memory::{CharacterMemory, EpisodicMemory, MemoryError};
use crate::model::{ModelError, SharedEmbedder, SharedModel};
use crate::parser::parse_llm_output;
use crate::prompt::{build_prompt, build_summary_prompt, clean_summary};
use crate::quests::{Quest, QuestError, QuestLog};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("quest ledger error: {0}")]
    Quest(#[from] QuestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for creating a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Episodic summaries included as working context each turn.
    pub working_memory_turns: usize,

    /// Semantic matches retrieved from episodic memory each turn.
    pub retrieval_top_k: usize,

    /// Interactions pulled from an addressed NPC's memory.
    pub npc_top_k: usize,

    /// Episodic semantic-index window.
    pub episodic_window: usize,

    /// Per-NPC retention window.
    pub npc_retention: usize,

    /// Directory for the durable stores; `None` keeps everything in
    /// memory (tests, throwaway sessions).
    pub storage_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            working_memory_turns: 5,
            retrieval_top_k: 100,
            npc_top_k: 10,
            episodic_window: 100,
            npc_retention: 50,
            storage_dir: None,
        }
    }
}

impl SessionConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store state durably under this directory.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Set the number of working-memory turns.
    pub fn with_working_memory_turns(mut self, turns: usize) -> Self {
        self.working_memory_turns = turns;
        self
    }

    /// Set the episodic retrieval depth.
    pub fn with_retrieval_top_k(mut self, top_k: usize) -> Self {
        self.retrieval_top_k = top_k;
        self
    }

    /// Set the per-NPC retention window.
    pub fn with_npc_retention(mut self, retention: usize) -> Self {
        self.npc_retention = retention;
        self
    }
}

/// An optional quest awaiting player consent.
///
/// Optional quests are not written to the ledger until the front end
/// confirms acceptance via [`GameSession::accept_quest`]; mandatory quests
/// skip this step entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestProposal {
    pub quest_name: String,
    pub description: String,
    pub reward: String,
}

/// A quest-side effect of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestEvent {
    /// A new quest was accepted into the ledger.
    Accepted { name: String },
    /// An active quest advanced.
    Progressed { name: String, progress_status: u8 },
    /// A quest reached full progress; its reward was issued.
    Completed { name: String, reward: String },
    /// The player abandoned their active quests.
    Abandoned { count: usize },
}

/// The result of one resolved turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Narrative text for the player.
    pub narrative: String,

    /// NPCs whose memory was extended this turn.
    pub npc_updates: Vec<String>,

    /// Quest side effects committed this turn.
    pub quest_events: Vec<QuestEvent>,

    /// Optional quests proposed this turn, awaiting consent.
    pub proposed_quests: Vec<QuestProposal>,
}

/// A narrative game session.
pub struct GameSession {
    model: SharedModel,
    embedder: SharedEmbedder,
    episodic: EpisodicMemory,
    characters: CharacterMemory,
    quests: QuestLog,
    intents: Box<dyn IntentDetector>,
    config: SessionConfig,
}

impl GameSession {
    /// Create a session, opening durable stores if a storage directory is
    /// configured.
    pub async fn new(
        config: SessionConfig,
        model: SharedModel,
        embedder: SharedEmbedder,
    ) -> Result<Self, SessionError> {
        let (episodic, characters, quests) = match config.storage_dir {
            Some(ref dir) => {
                fs::create_dir_all(dir).await?;
                (
                    EpisodicMemory::open(dir.join("world_state.json"), embedder.clone()).await?,
                    CharacterMemory::open(dir.join("character_memory.json"), embedder.clone())
                        .await?,
                    QuestLog::open(dir.join("quest_log.json")).await?,
                )
            }
            None => (
                EpisodicMemory::in_memory(embedder.clone()),
                CharacterMemory::in_memory(embedder.clone()),
                QuestLog::in_memory(),
            ),
        };

        Ok(Self {
            model,
            embedder,
            episodic: episodic.with_window(config.episodic_window),
            characters: characters.with_retention(config.npc_retention),
            quests,
            intents: Box::new(KeywordIntentDetector),
            config,
        })
    }

    /// Replace the intent detector.
    pub fn with_intent_detector(mut self, detector: Box<dyn IntentDetector>) -> Self {
        self.intents = detector;
        self
    }

    /// The episodic memory store.
    pub fn episodic(&self) -> &EpisodicMemory {
        &self.episodic
    }

    /// The character memory store.
    pub fn characters(&self) -> &CharacterMemory {
        &self.characters
    }

    /// The quest ledger.
    pub fn quests(&self) -> &QuestLog {
        &self.quests
    }

    /// Resolve one player input end to end.
    pub async fn player_action(&mut self, input: &str) -> Result<TurnOutcome, SessionError> {
        let intent = self.intents.detect(input);

        // Context assembly (reads only).
        let working_context = self.build_working_context();
        let retrieved_context = self.build_retrieved_context(input, &intent).await?;
        let reward_context = self.quests.get_rewards_context();

        // Model invocation and extraction.
        let prompt = build_prompt(&working_context, &retrieved_context, input, &reward_context);
        let raw = self.model.generate(&prompt).await?;
        let (narrative, npcs, quest_records) = parse_llm_output(&raw);

        // Remaining collaborator calls, still before any mutation: the
        // summary, its embedding, and the NPC interaction embeddings. A
        // failure here leaves every store untouched.
        let summary_prompt = build_summary_prompt(&narrative);
        let summary = clean_summary(&self.model.generate(&summary_prompt).await?);
        let summary_embedding = self.embedder.embed(&summary).await?;

        let mut npc_writes = Vec::new();
        for npc in &npcs {
            let name = npc.npc_name.trim();
            let text = if npc.context.trim().is_empty() {
                npc.interaction.trim()
            } else {
                npc.context.trim()
            };
            if name.is_empty() || text.is_empty() {
                debug!("dropping NPC record with missing name or text");
                continue;
            }
            let embedding = self.embedder.embed(text).await?;
            npc_writes.push((name.to_string(), text.to_string(), embedding));
        }

        // Commit phase.
        let mut npc_updates = Vec::new();
        for (name, text, embedding) in npc_writes {
            self.characters
                .add_embedded(name.clone(), text, embedding)
                .await?;
            npc_updates.push(name);
        }

        let mut quest_events = Vec::new();
        let mut proposed_quests = Vec::new();
        for record in quest_records {
            let is_active = self
                .quests
                .get_active_quest_by_name(&record.quest_name)
                .is_some();

            if is_active {
                // An omitted description means "no new summary", not "blank
                // out the old one".
                let new_summary =
                    (!record.description.is_empty()).then_some(record.description.as_str());
                if let Some(quest) = self
                    .quests
                    .update_progress(&record.quest_name, 1, new_summary)
                    .await?
                {
                    quest_events.push(quest_event_for(&quest));
                }
            } else if record.mandatory {
                if let Some(quest) = self
                    .quests
                    .add_quest(&record.quest_name, &record.description, &record.reward, true)
                    .await?
                {
                    quest_events.push(QuestEvent::Accepted {
                        name: quest.quest_name,
                    });
                }
            } else {
                proposed_quests.push(QuestProposal {
                    quest_name: record.quest_name,
                    description: record.description,
                    reward: record.reward,
                });
            }
        }

        self.episodic.add_memory(summary, summary_embedding).await?;

        if intent.abandon_quests {
            let count = self.quests.abandon_all_quests().await?;
            if count > 0 {
                quest_events.push(QuestEvent::Abandoned { count });
            }
        }

        Ok(TurnOutcome {
            narrative,
            npc_updates,
            quest_events,
            proposed_quests,
        })
    }

    /// Commit a previously proposed optional quest after the player
    /// accepted it. Returns `None` if a quest with this name became active
    /// in the meantime.
    pub async fn accept_quest(
        &mut self,
        proposal: &QuestProposal,
    ) -> Result<Option<Quest>, SessionError> {
        Ok(self
            .quests
            .add_quest(
                &proposal.quest_name,
                &proposal.description,
                &proposal.reward,
                false,
            )
            .await?)
    }

    fn build_working_context(&self) -> String {
        let recent = self
            .episodic
            .get_recent(self.config.working_memory_turns)
            .join("\n");

        let quest_block = self
            .quests
            .get_active_quests()
            .iter()
            .map(|q| {
                format!(
                    "- {} (Progress: {}/10)\n  Summary: {}",
                    q.quest_name, q.progress_status, q.progress_summary
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!("{recent}\nActive Quests:\n{quest_block}")
    }

    async fn build_retrieved_context(
        &self,
        input: &str,
        intent: &crate::intent::PlayerIntent,
    ) -> Result<String, SessionError> {
        let mut retrieved = self
            .episodic
            .retrieve(input, self.config.retrieval_top_k)
            .await?
            .join("\n");

        if let Some(ref npc) = intent.npc_addressed {
            let history = self
                .characters
                .get_memory(npc, Some(input), self.config.npc_top_k)
                .await?;
            if !history.is_empty() {
                retrieved.push_str(&format!(
                    "\nPrevious {npc} Interactions:\n{}",
                    history.join("\n")
                ));
            }
        }

        Ok(retrieved)
    }
}

fn quest_event_for(quest: &Quest) -> QuestEvent {
    if quest.completed {
        QuestEvent::Completed {
            name: quest.quest_name.clone(),
            reward: quest.reward.clone(),
        }
    } else {
        QuestEvent::Progressed {
            name: quest.quest_name.clone(),
            progress_status: quest.progress_status,
        }
    }
}
