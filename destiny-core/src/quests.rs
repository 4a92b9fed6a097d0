//! Quest ledger: durable quest records and reward issuance.
//!
//! The ledger is the consistency gate between the model's noisy structured
//! extraction and the persisted world state. It enforces:
//! - at most one active quest per name (re-proposals update, never duplicate)
//! - monotonic progress, clamped at 10, with completion at 10
//! - exactly-once reward issuance at the moment of completion
//! - abandonment as a terminal state
//!
//! Violation attempts are expected noise, not errors: they return `None`
//! and leave the ledger untouched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Progress value at which a quest is complete.
pub const COMPLETED_STATUS: u8 = 10;

/// Sentinel reward text for quests the model never named a reward for.
pub const UNKNOWN_REWARD: &str = "unknown reward";

/// Default reward description template; `{name}` is replaced with the
/// quest name.
pub const DEFAULT_REWARD_TEMPLATE: &str = "Reward from quest '{name}'";

/// Errors from quest ledger persistence.
#[derive(Debug, Error)]
pub enum QuestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A quest record.
///
/// Lifecycle invariants: `completed` exactly when `progress_status >= 10`;
/// `active` exactly when neither completed nor abandoned; `abandoned` is
/// terminal. Quests are never deleted, only soft-terminated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub id: Uuid,
    pub quest_name: String,
    pub summary: String,
    /// Bounded progress, 1..=10.
    pub progress_status: u8,
    pub progress_summary: String,
    pub reward: String,
    pub mandatory: bool,
    pub active: bool,
    pub completed: bool,
    pub abandoned: bool,
    pub reward_collected: bool,
}

/// A reward issued on quest completion. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub quest_name: String,
    pub reward: String,
    pub description: String,
}

/// Durable layout: one JSON document holding both collections.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    quests: Vec<Quest>,
    rewards: Vec<Reward>,
}

/// The quest ledger.
pub struct QuestLog {
    quests: Vec<Quest>,
    rewards: Vec<Reward>,
    reward_template: String,
    path: Option<PathBuf>,
}

impl QuestLog {
    /// Open a file-backed ledger, loading any existing document.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, QuestError> {
        let path = path.as_ref().to_path_buf();
        let file: LedgerFile = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerFile::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            quests: file.quests,
            rewards: file.rewards,
            reward_template: DEFAULT_REWARD_TEMPLATE.to_string(),
            path: Some(path),
        })
    }

    /// Create an ephemeral in-memory ledger.
    pub fn in_memory() -> Self {
        Self {
            quests: Vec::new(),
            rewards: Vec::new(),
            reward_template: DEFAULT_REWARD_TEMPLATE.to_string(),
            path: None,
        }
    }

    /// Set the reward description template. `{name}` is replaced with the
    /// quest name at issuance.
    pub fn with_reward_template(mut self, template: impl Into<String>) -> Self {
        self.reward_template = template.into();
        self
    }

    /// All quests ever recorded, including completed and abandoned ones.
    pub fn all_quests(&self) -> &[Quest] {
        &self.quests
    }

    /// All rewards ever issued, in issuance order.
    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    /// Every quest currently active.
    pub fn get_active_quests(&self) -> Vec<&Quest> {
        self.quests.iter().filter(|q| q.active).collect()
    }

    /// The single active quest with this exact name, if any.
    pub fn get_active_quest_by_name(&self, name: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.active && q.quest_name == name)
    }

    /// Accept a new quest. Returns `None` without touching the ledger if
    /// an active quest with this exact name already exists — the name is
    /// the dedup key against the model re-proposing a quest it already
    /// narrated.
    pub async fn add_quest(
        &mut self,
        name: impl Into<String>,
        summary: impl Into<String>,
        reward: impl Into<String>,
        mandatory: bool,
    ) -> Result<Option<Quest>, QuestError> {
        let name = name.into();
        if self.get_active_quest_by_name(&name).is_some() {
            debug!(quest = %name, "duplicate active quest ignored");
            return Ok(None);
        }

        let quest = Quest {
            id: Uuid::new_v4(),
            quest_name: name.clone(),
            summary: summary.into(),
            progress_status: 1,
            progress_summary: "Quest accepted.".to_string(),
            reward: reward.into(),
            mandatory,
            active: true,
            completed: false,
            abandoned: false,
            reward_collected: false,
        };
        self.quests.push(quest.clone());
        self.save().await?;

        info!(quest = %name, mandatory, "quest accepted");
        Ok(Some(quest))
    }

    /// Advance the active quest with this name. Returns `None` without
    /// touching the ledger if no active, non-abandoned quest matches.
    /// Progress is monotonic and clamps at 10; reaching 10 flips
    /// `completed`/`active` and issues the reward in the same commit.
    pub async fn update_progress(
        &mut self,
        name: &str,
        increment: u8,
        new_summary: Option<&str>,
    ) -> Result<Option<Quest>, QuestError> {
        let Some(idx) = self
            .quests
            .iter()
            .position(|q| q.active && !q.abandoned && q.quest_name == name)
        else {
            debug!(quest = %name, "progress update for unknown or inactive quest ignored");
            return Ok(None);
        };

        {
            let quest = &mut self.quests[idx];
            quest.progress_status = quest
                .progress_status
                .saturating_add(increment)
                .min(COMPLETED_STATUS);
            if let Some(summary) = new_summary {
                quest.progress_summary = summary.to_string();
            }

            if quest.progress_status >= COMPLETED_STATUS {
                quest.completed = true;
                quest.active = false;
            }
        }

        if self.quests[idx].completed {
            self.issue_reward(idx);
            info!(quest = %name, "quest completed");
        }
        self.save().await?;

        Ok(Some(self.quests[idx].clone()))
    }

    /// Abandon every active quest. Terminal and idempotent; no reward is
    /// issued. Returns how many quests were abandoned.
    pub async fn abandon_all_quests(&mut self) -> Result<usize, QuestError> {
        let mut abandoned = 0;
        for quest in self.quests.iter_mut().filter(|q| q.active) {
            quest.active = false;
            quest.abandoned = true;
            abandoned += 1;
        }
        if abandoned > 0 {
            self.save().await?;
            info!(count = abandoned, "active quests abandoned");
        }
        Ok(abandoned)
    }

    /// Deterministic textual rendering of every reward ever issued, in
    /// issuance order. Regenerated from the ledger on every call.
    pub fn get_rewards_context(&self) -> String {
        self.rewards
            .iter()
            .map(|r| format!("- {} ({})", r.reward, r.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Issue the reward for a completed quest exactly once. An empty
    /// reward string still flips `reward_collected` and records the
    /// sentinel text, so completion can never be probed into issuing
    /// twice.
    fn issue_reward(&mut self, idx: usize) {
        let quest = &mut self.quests[idx];
        if quest.reward_collected {
            return;
        }

        let reward = if quest.reward.trim().is_empty() {
            UNKNOWN_REWARD.to_string()
        } else {
            quest.reward.clone()
        };
        self.rewards.push(Reward {
            quest_name: quest.quest_name.clone(),
            reward,
            description: self.reward_template.replace("{name}", &quest.quest_name),
        });
        quest.reward_collected = true;
    }

    async fn save(&self) -> Result<(), QuestError> {
        if let Some(ref path) = self.path {
            let file = LedgerFile {
                quests: self.quests.clone(),
                rewards: self.rewards.clone(),
            };
            let content = serde_json::to_string_pretty(&file)?;
            fs::write(path, content).await?;
        }
        Ok(())
    }
}
