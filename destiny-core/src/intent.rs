//! Player intent detection at the orchestrator boundary.
//!
//! The turn orchestrator needs two signals from raw player input: which
//! NPC, if any, the player is addressing, and whether the player wants to
//! abandon their quests. Detection sits behind a trait so the keyword
//! heuristic can be swapped for a real classifier without touching the
//! memory or ledger contracts.

/// Signals extracted from one player input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerIntent {
    /// NPC the player is addressing, title-cased.
    pub npc_addressed: Option<String>,
    /// The player wants to abandon all active quests.
    pub abandon_quests: bool,
}

/// Detects player intent from raw input.
pub trait IntentDetector: Send + Sync {
    fn detect(&self, input: &str) -> PlayerIntent;
}

/// Keyword-based detector: "talk to <name>" addresses an NPC, any mention
/// of "abandon quest" abandons.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntentDetector;

impl IntentDetector for KeywordIntentDetector {
    fn detect(&self, input: &str) -> PlayerIntent {
        let lower = input.to_lowercase();

        // Slice the lowercased copy: offsets into `input` are not byte-safe
        // after case folding, and the name gets title-cased anyway.
        let npc_addressed = lower.rfind("talk to").and_then(|pos| {
            let name = lower[pos + "talk to".len()..].trim();
            if name.is_empty() {
                None
            } else {
                Some(title_case(name))
            }
        });

        PlayerIntent {
            npc_addressed,
            abandon_quests: lower.contains("abandon quest"),
        }
    }
}

/// Title-case each whitespace-separated word.
fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
