//! Prompt assembly for the game master and the summarizer.
//!
//! Purely textual: no store access, no side effects. The orchestrator
//! supplies the four context blocks and sends the result to the model.

/// Build the game-master prompt from the assembled context blocks.
pub fn build_prompt(
    working_context: &str,
    retrieved_context: &str,
    player_input: &str,
    reward_context: &str,
) -> String {
    let mut prompt = String::from(
        "You are a Dungeon Master for a text-based tabletop game. Keep continuity, \
         stay concise (3-6 sentences), and treat the facts below as authoritative.\n",
    );

    prompt.push_str("\n### Persistent World Knowledge:\n");
    prompt.push_str(retrieved_context);
    prompt.push('\n');

    prompt.push_str("\n### Recent Conversation:\n");
    prompt.push_str(working_context);
    prompt.push('\n');

    if !reward_context.is_empty() {
        prompt.push_str("\n### Collected Rewards:\n");
        prompt.push_str(reward_context);
        prompt.push('\n');
    }

    prompt.push_str("\n### Player Input:\nPlayer: ");
    prompt.push_str(player_input);
    prompt.push('\n');

    prompt.push_str(
        "\nNow respond as the Dungeon Master, describing what happens next vividly and \
         consistently. If the player's input has no relation to the given context or is \
         inappropriate, repeat the question.\n\
         End your response with a single JSON object of the form \
         {\"npcs\": [{\"npc_name\", \"interaction\", \"context\"}], \
         \"quests\": [{\"quest_name\", \"progress\", \"description\", \"reward\", \"mandatory\"}]} \
         describing any NPC interactions and quest developments, or {\"npcs\": [], \"quests\": []} \
         if there are none.\n",
    );

    prompt
}

/// Build the prompt that condenses one turn's narrative for episodic
/// memory.
pub fn build_summary_prompt(narrative: &str) -> String {
    format!(
        "You are an AI assistant tasked with summarizing game events.\n\
         Summarize the following text into 1-2 sentences, preserving key characters, \
         events, and locations:\n\nText:\n{narrative}\n\nSummary:"
    )
}

/// Clean a model-produced summary: trim and collapse newlines to spaces.
pub fn clean_summary(raw: &str) -> String {
    raw.trim().replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_all_sections() {
        let prompt = build_prompt("recent events", "old lore", "I open the door", "- 50 gold");
        assert!(prompt.contains("### Persistent World Knowledge:\nold lore"));
        assert!(prompt.contains("### Recent Conversation:\nrecent events"));
        assert!(prompt.contains("### Collected Rewards:\n- 50 gold"));
        assert!(prompt.contains("Player: I open the door"));
    }

    #[test]
    fn test_rewards_section_omitted_when_empty() {
        let prompt = build_prompt("w", "r", "input", "");
        assert!(!prompt.contains("Collected Rewards"));
    }

    #[test]
    fn test_clean_summary() {
        assert_eq!(
            clean_summary("  The party\nentered the keep.\n"),
            "The party entered the keep."
        );
    }
}
