use crate::models::{KeyPhrase, TransformationResult};

/// Canned transformation selected by keyword
#[derive(Debug, Clone, Copy)]
pub struct FallbackEntry {
    pub trigger_keyword: &'static str,
    pub transformed_text: &'static str,
    pub key_phrases: [(&'static str, &'static str); 3],
}

impl FallbackEntry {
    pub fn to_result(&self) -> TransformationResult {
        TransformationResult::new(
            self.transformed_text,
            self.key_phrases
                .iter()
                .map(|(phrase, explanation)| KeyPhrase::new(*phrase, *explanation))
                .collect(),
        )
    }
}

/// Ordered table, first match wins. More specific subjects precede general moods.
pub const FALLBACK_TABLE: [FallbackEntry; 3] = [
    FallbackEntry {
        trigger_keyword: "boss",
        transformed_text: "I'm finding it challenging to adapt to the frequently changing requirements and would appreciate more consistency in our planning.",
        key_phrases: [
            ("finding it challenging", "Professional way to express difficulty"),
            ("frequently changing", "Neutral description of the problem"),
            ("would appreciate", "Respectful way to make a request"),
        ],
    },
    FallbackEntry {
        trigger_keyword: "annoyed",
        transformed_text: "I'm experiencing some frustration with this situation and would like to find a solution.",
        key_phrases: [
            ("experiencing frustration", "Honest but measured way to express annoyance"),
            ("with this situation", "Focuses on the problem, not people"),
            ("find a solution", "Shows constructive intent"),
        ],
    },
    FallbackEntry {
        trigger_keyword: "frustrated",
        transformed_text: "I'm finding this situation challenging and would appreciate some support.",
        key_phrases: [
            ("finding this challenging", "Acknowledges difficulty without sounding overwhelmed"),
            ("would appreciate", "Polite way to ask for help"),
            ("some support", "Specific but not demanding request"),
        ],
    },
];

/// Index into `FALLBACK_TABLE` used when nothing matches
pub const DEFAULT_ENTRY: usize = 2;

/// The entry that would answer `text`
pub fn select_entry(text: &str) -> &'static FallbackEntry {
    let lower = text.to_lowercase();
    FALLBACK_TABLE
        .iter()
        .find(|entry| lower.contains(entry.trigger_keyword))
        .unwrap_or(&FALLBACK_TABLE[DEFAULT_ENTRY])
}

/// Deterministic substitute for a model transformation
pub fn fallback(text: &str) -> TransformationResult {
    select_entry(text).to_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KEY_PHRASE_COUNT;

    #[test]
    fn test_boss_wins_over_annoyed() {
        let result = fallback("I'm so annoyed by my boss");
        assert_eq!(result, FALLBACK_TABLE[0].to_result());
        assert!(result.transformed_text.contains("frequently changing requirements"));
    }

    #[test]
    fn test_no_keyword_returns_default() {
        let result = fallback("xyz no keyword here");
        assert_eq!(result, FALLBACK_TABLE[DEFAULT_ENTRY].to_result());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(select_entry("SO ANNOYED right now").trigger_keyword, "annoyed");
    }

    #[test]
    fn test_matching_is_substring() {
        // "bossy" still contains the keyword
        assert_eq!(select_entry("stop being bossy").trigger_keyword, "boss");
    }

    #[test]
    fn test_empty_text_returns_default() {
        assert_eq!(select_entry("").trigger_keyword, "frustrated");
    }

    #[test]
    fn test_every_entry_has_three_filled_phrases() {
        for entry in FALLBACK_TABLE.iter() {
            let result = entry.to_result();
            assert!(!result.transformed_text.is_empty());
            assert_eq!(result.present_phrases().count(), KEY_PHRASE_COUNT);
        }
    }

    #[test]
    fn test_keywords_are_unique_and_lowercase() {
        for (i, a) in FALLBACK_TABLE.iter().enumerate() {
            assert_eq!(a.trigger_keyword, a.trigger_keyword.to_lowercase());
            for b in FALLBACK_TABLE.iter().skip(i + 1) {
                assert_ne!(a.trigger_keyword, b.trigger_keyword);
            }
        }
    }
}
