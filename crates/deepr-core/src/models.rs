//! The fixed catalog of models a research run may be pointed at.

use serde::Serialize;

/// A catalog entry mapping a display name to the identifier sent to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    pub name: &'static str,
    pub id: &'static str,
}

pub const DEFAULT_MODEL: ModelEntry = ModelEntry {
    name: "Claude 3.5 Haiku",
    id: "anthropic/claude-3.5-haiku",
};

pub const CATALOG: &[ModelEntry] = &[
    DEFAULT_MODEL,
    ModelEntry {
        name: "Claude 3.5 Sonnet",
        id: "anthropic/claude-3.5-sonnet",
    },
    ModelEntry {
        name: "GPT-4o",
        id: "openai/gpt-4o",
    },
    ModelEntry {
        name: "GPT-4o mini",
        id: "openai/gpt-4o-mini",
    },
    ModelEntry {
        name: "Gemini 2.0 Flash",
        id: "google/gemini-2.0-flash-001",
    },
    ModelEntry {
        name: "DeepSeek R1",
        id: "deepseek/deepseek-r1",
    },
    ModelEntry {
        name: "Llama 3.3 70B",
        id: "meta-llama/llama-3.3-70b-instruct",
    },
];

/// Look up a catalog entry by display name or model id (case-insensitive).
pub fn find_model(name: &str) -> Option<ModelEntry> {
    let needle = name.trim();
    CATALOG
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(needle) || m.id.eq_ignore_ascii_case(needle))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_haiku() {
        assert_eq!(DEFAULT_MODEL.id, "anthropic/claude-3.5-haiku");
    }

    #[test]
    fn test_find_by_name_or_id() {
        assert_eq!(find_model("gpt-4o mini").map(|m| m.id), Some("openai/gpt-4o-mini"));
        assert_eq!(
            find_model("deepseek/deepseek-r1").map(|m| m.name),
            Some("DeepSeek R1")
        );
        assert_eq!(find_model("  Claude 3.5 Sonnet ").map(|m| m.id), Some("anthropic/claude-3.5-sonnet"));
        assert!(find_model("gpt-5-ultra").is_none());
    }

    #[test]
    fn test_catalog_entries_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.id, b.id);
            }
        }
    }
}
