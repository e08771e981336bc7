//! Property-based tests for the prompt composer and date labels
//!
//! Invariants:
//! - Composition never panics, for any character field contents
//! - Composition is deterministic
//! - The character's name and title always appear in the prompt
//! - Hostile (non-JSON) intro/example fields never leak section headers
//! - saved_date_label always yields exactly one bucket

use chrono::{Duration, Utc};
use proptest::prelude::*;

use crate::core::conversation::saved_date_label;
use crate::core::prompt::{compose_suggestion_prompt, compose_system_prompt};
use crate::database::models::CharacterRecord;

// ============================================================================
// Strategies
// ============================================================================

/// A character with arbitrary free-text fields, including hostile
/// non-JSON content in the structured slots.
fn arb_character() -> impl Strategy<Value = CharacterRecord> {
    (
        "[A-Za-z '\\-]{1,40}",
        "[A-Za-z0-9 .,!'\\-]{1,80}",
        prop::option::of(".{0,200}"),
        prop::option::of(".{0,200}"),
        prop::option::of(".{0,200}"),
        prop::option::of(".{0,200}"),
        prop::option::of(".{0,200}"),
    )
        .prop_map(|(name, title, intro, description, info, example, presentation)| {
            let mut character = CharacterRecord::new("user-1", &name, title);
            character.intro = intro;
            character.description = description;
            character.character_info = info;
            character.example_situation = example;
            character.presentation = presentation;
            character
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_compose_never_panics_and_is_deterministic(character in arb_character()) {
        let first = compose_system_prompt(&character);
        let second = compose_system_prompt(&character);
        prop_assert_eq!(first, second);

        let first = compose_suggestion_prompt(&character);
        let second = compose_suggestion_prompt(&character);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_prompt_always_names_the_character(character in arb_character()) {
        let prompt = compose_system_prompt(&character);
        prop_assert!(prompt.contains(&character.name));
        prop_assert!(prompt.contains(&character.title));
    }

    #[test]
    fn prop_unparseable_fragments_leave_no_empty_sections(
        intro in "[^\\[\\{]{1,100}",
        example in "[^\\[\\{]{1,100}",
    ) {
        // Free text that cannot be a JSON array must not produce the
        // section it would have fed.
        let mut character = CharacterRecord::new("user-1", "Mina", "Barista");
        character.intro = Some(intro);
        character.example_situation = Some(example);

        let prompt = compose_system_prompt(&character);
        prop_assert!(!prompt.contains("Introduction:"));
        prop_assert!(!prompt.contains("Example situations:"));
    }

    #[test]
    fn prop_saved_date_label_has_exactly_one_shape(elapsed_secs in 0i64..(90 * 24 * 3600)) {
        let now = Utc::now();
        let label = saved_date_label(now - Duration::seconds(elapsed_secs), now);

        let shapes = [
            label == "just now",
            label.ends_with(" minutes ago"),
            label.ends_with(" hours ago"),
            label.len() == 10 && label.as_bytes()[4] == b'-',
        ];
        prop_assert_eq!(shapes.iter().filter(|&&s| s).count(), 1, "label: {}", label);
    }
}
