//! Prompt Composer
//!
//! Renders a character's structured fields into the system instruction
//! for the role-play call, and a separate system prompt for suggestion
//! generation. Pure string composition: no I/O, deterministic for a
//! given character snapshot.
//!
//! The character's `intro` and `example_situation` fields hold loosely
//! structured JSON authored by users. Fragments that do not match the
//! expected shape are skipped rather than failing the render.

use serde_json::Value;

use crate::database::models::CharacterRecord;

/// Closing behavioral directives, constant across all characters.
const CONVERSATION_GUIDELINES: &str = "Conversation guidelines:
- Stay consistent with the character's personality and traits described above
- Keep the conversation natural and immersive
- Be warm with the user, but never lose the character's distinct voice
- Treat text wrapped in ** as stage or situation description, not dialogue";

/// Build the role-play system prompt from a character snapshot.
pub fn compose_system_prompt(character: &CharacterRecord) -> String {
    let mut prompt = format!("You are '{}'.\n", character.name);
    prompt.push_str(&format!("Title: {}\n", character.title));

    let intro_text = intro_messages(character.intro.as_deref()).join(" ");
    if !intro_text.is_empty() {
        prompt.push_str(&format!("Introduction: {}\n\n", intro_text));
    }

    if let Some(description) = non_empty(character.description.as_deref()) {
        prompt.push_str(&format!("Detailed description: {}\n\n", description));
    }

    if let Some(info) = non_empty(character.character_info.as_deref()) {
        prompt.push_str(&format!("Character info: {}\n\n", info));
    }

    let example_lines = example_situation_lines(character.example_situation.as_deref());
    if !example_lines.is_empty() {
        prompt.push_str(&format!("Example situations:\n{}\n\n", example_lines.join("\n")));
    }

    if let Some(presentation) = non_empty(character.presentation.as_deref()) {
        prompt.push_str(&format!("Tone/style: {}\n\n", presentation));
    }

    prompt.push_str(CONVERSATION_GUIDELINES);
    prompt
}

/// Build the system prompt for the reply-suggestion generator. A
/// distinct persona: it writes on behalf of the *user*, not the
/// character.
pub fn compose_suggestion_prompt(character: &CharacterRecord) -> String {
    let mut prompt = format!(
        "You are a reply suggester for a user chatting with the character '{}'.\n\n",
        character.name
    );
    prompt.push_str("Character information:\n");
    prompt.push_str(&format!("- Name: {}\n", character.name));
    prompt.push_str(&format!("- Title: {}", character.title));

    if let Some(description) = non_empty(character.description.as_deref()) {
        prompt.push_str(&format!("\n- Description: {}", description));
    }

    if let Some(info) = non_empty(character.character_info.as_deref()) {
        prompt.push_str(&format!("\n- Character info: {}", info));
    }

    prompt.push_str(
        "\n\nGuidelines:
1. Suggest a user reply that follows naturally from the conversation so far
2. Vary the form: a question, an empathetic reaction, or a new topic
3. Keep it to a single concise sentence

Based on the conversation, generate one natural reply the user could send next.",
    );
    prompt
}

/// Fixed human turn appended to the suggestion call.
pub const SUGGESTION_INPUT: &str =
    "Based on the conversation above, generate one natural reply the user could send next:";

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Extract the `message` field from each intro fragment, ignoring the
/// fragment's `role`/`id`. Malformed fragments are skipped.
fn intro_messages(intro: Option<&str>) -> Vec<String> {
    let Some(raw) = non_empty(intro) else {
        return Vec::new();
    };

    let Ok(Value::Array(fragments)) = serde_json::from_str::<Value>(raw) else {
        return Vec::new();
    };

    fragments
        .iter()
        .filter_map(|fragment| fragment.get("message").and_then(Value::as_str))
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .collect()
}

/// Flatten the nested example-situation structure into `role: message`
/// lines. Only fragments with a non-empty role and message survive.
fn example_situation_lines(example_situation: Option<&str>) -> Vec<String> {
    let Some(raw) = non_empty(example_situation) else {
        return Vec::new();
    };

    let Ok(Value::Array(inner_lists)) = serde_json::from_str::<Value>(raw) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for inner in &inner_lists {
        let Value::Array(fragments) = inner else {
            continue;
        };
        for fragment in fragments {
            let Value::Object(map) = fragment else {
                continue;
            };
            let role = map.get("role").and_then(Value::as_str).unwrap_or("");
            let message = map.get("message").and_then(Value::as_str).unwrap_or("");
            if !role.is_empty() && !message.is_empty() {
                lines.push(format!("{}: {}", role, message));
            }
        }
    }
    lines
}
