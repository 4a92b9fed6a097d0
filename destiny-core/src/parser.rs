//! Extraction parser for raw model output.
//!
//! The model is asked to end its narration with a single JSON object
//! carrying NPC interactions and quest updates, either embedded directly
//! at the end of the text or inside a fenced code block. The payload is
//! untrusted: this parser is total, never fails a turn, and degrades to
//! "narrative only, no updates" on anything malformed.

use serde::Deserialize;

/// An NPC interaction extracted from model output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NpcRecord {
    #[serde(default)]
    pub npc_name: String,
    #[serde(default)]
    pub interaction: String,
    #[serde(default)]
    pub context: String,
}

/// A quest update extracted from model output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestRecord {
    #[serde(default = "default_quest_name")]
    pub quest_name: String,
    #[serde(default = "default_progress")]
    pub progress: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_reward")]
    pub reward: String,
    #[serde(default)]
    pub mandatory: bool,
}

fn default_quest_name() -> String {
    "Unnamed Quest".to_string()
}

fn default_progress() -> String {
    "Started".to_string()
}

fn default_reward() -> String {
    crate::quests::UNKNOWN_REWARD.to_string()
}

#[derive(Debug, Default, Deserialize)]
struct Extraction {
    #[serde(default)]
    npcs: Vec<NpcRecord>,
    #[serde(default)]
    quests: Vec<QuestRecord>,
}

/// Parse raw model output into narrative text, NPC interaction records,
/// and quest update records.
///
/// A fenced JSON code block is preferred; otherwise the trailing
/// brace-delimited substring is used. Everything before the located
/// payload is the narrative. Any parse failure yields the narrative with
/// empty update lists. Quest entries survive only if they are mandatory or
/// carry meaningful progress (started / in progress / completed), which
/// drops unintelligible entries without rejecting the whole payload.
pub fn parse_llm_output(raw: &str) -> (String, Vec<NpcRecord>, Vec<QuestRecord>) {
    let Some((narrative, payload)) = locate_payload(raw) else {
        return (raw.trim().to_string(), Vec::new(), Vec::new());
    };

    let narrative = narrative.trim().to_string();
    let Ok(extraction) = serde_json::from_str::<Extraction>(payload) else {
        return (narrative, Vec::new(), Vec::new());
    };

    let quests = extraction
        .quests
        .into_iter()
        .filter(|q| {
            q.mandatory
                || matches!(
                    q.progress.to_lowercase().as_str(),
                    "started" | "in progress" | "completed"
                )
        })
        .collect();

    (narrative, extraction.npcs, quests)
}

/// Split raw output into (narrative, JSON payload), or `None` if no
/// candidate payload is present.
fn locate_payload(raw: &str) -> Option<(&str, &str)> {
    if let Some(result) = fenced_payload(raw) {
        return Some(result);
    }
    trailing_payload(raw)
}

/// A ```json fenced block (or a bare fenced block whose content opens with
/// a brace). The narrative is everything before the fence.
fn fenced_payload(raw: &str) -> Option<(&str, &str)> {
    for marker in ["```json", "```"] {
        if let Some(start) = raw.find(marker) {
            let content_start = start + marker.len();
            if let Some(end) = raw[content_start..].find("```") {
                let content = raw[content_start..content_start + end].trim();
                if content.starts_with('{') {
                    return Some((&raw[..start], content));
                }
            }
        }
    }
    None
}

/// The substring from the first `{` through the last `}`, provided only
/// whitespace follows — the payload must sit at the string's end to count.
fn trailing_payload(raw: &str) -> Option<(&str, &str)> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start || !raw[end + 1..].trim().is_empty() {
        return None;
    }
    Some((&raw[..start], &raw[start..=end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_json_returns_full_narrative() {
        let (narrative, npcs, quests) = parse_llm_output("Just a story, no JSON.");
        assert_eq!(narrative, "Just a story, no JSON.");
        assert!(npcs.is_empty());
        assert!(quests.is_empty());
    }

    #[test]
    fn test_trailing_json_extracted() {
        let raw = r#"The innkeeper leans closer.
{"npcs": [{"npc_name": "Mira", "interaction": "greeting", "context": "Mira welcomed the player"}], "quests": []}"#;

        let (narrative, npcs, quests) = parse_llm_output(raw);
        assert_eq!(narrative, "The innkeeper leans closer.");
        assert_eq!(npcs.len(), 1);
        assert_eq!(npcs[0].npc_name, "Mira");
        assert_eq!(npcs[0].context, "Mira welcomed the player");
        assert!(quests.is_empty());
    }

    #[test]
    fn test_fenced_json_preferred() {
        let raw = "A quest begins.\n```json\n{\"quests\": [{\"quest_name\": \"Find the Crown\", \"progress\": \"Started\"}]}\n```";

        let (narrative, _, quests) = parse_llm_output(raw);
        assert_eq!(narrative, "A quest begins.");
        assert_eq!(quests.len(), 1);
        assert_eq!(quests[0].quest_name, "Find the Crown");
    }

    #[test]
    fn test_malformed_json_drops_updates_keeps_narrative() {
        let raw = "The door creaks open. {\"npcs\": [unclosed";
        let (narrative, npcs, quests) = parse_llm_output(raw);
        assert_eq!(narrative, "The door creaks open. {\"npcs\": [unclosed");
        assert!(npcs.is_empty());
        assert!(quests.is_empty());
    }

    #[test]
    fn test_unparseable_trailing_object() {
        let raw = "Story text. {not json at all}";
        let (narrative, npcs, quests) = parse_llm_output(raw);
        assert_eq!(narrative, "Story text.");
        assert!(npcs.is_empty());
        assert!(quests.is_empty());
    }

    #[test]
    fn test_quest_field_defaults() {
        let raw = r#"Text. {"quests": [{"progress": "Started"}]}"#;
        let (_, _, quests) = parse_llm_output(raw);
        assert_eq!(quests.len(), 1);
        assert_eq!(quests[0].quest_name, "Unnamed Quest");
        assert_eq!(quests[0].description, "");
        assert_eq!(quests[0].reward, "unknown reward");
        assert!(!quests[0].mandatory);
    }

    #[test]
    fn test_garbage_progress_dropped_unless_mandatory() {
        let raw = r#"Text. {"quests": [
            {"quest_name": "Rumor", "progress": "Rumored", "mandatory": false},
            {"quest_name": "Main Thread", "progress": "Rumored", "mandatory": true}
        ]}"#;

        let (_, _, quests) = parse_llm_output(raw);
        assert_eq!(quests.len(), 1);
        assert_eq!(quests[0].quest_name, "Main Thread");
    }

    #[test]
    fn test_progress_filter_case_insensitive() {
        let raw = r#"Text. {"quests": [
            {"quest_name": "A", "progress": "STARTED"},
            {"quest_name": "B", "progress": "In Progress"},
            {"quest_name": "C", "progress": "completed"}
        ]}"#;

        let (_, _, quests) = parse_llm_output(raw);
        assert_eq!(quests.len(), 3);
    }

    #[test]
    fn test_json_mid_text_not_treated_as_payload() {
        let raw = "He said {something odd} and walked away into the night.";
        let (narrative, npcs, quests) = parse_llm_output(raw);
        assert_eq!(narrative, raw);
        assert!(npcs.is_empty());
        assert!(quests.is_empty());
    }

    #[test]
    fn test_missing_npcs_key_defaults_empty() {
        let raw = r#"Text. {"quests": []}"#;
        let (_, npcs, quests) = parse_llm_output(raw);
        assert!(npcs.is_empty());
        assert!(quests.is_empty());
    }
}
