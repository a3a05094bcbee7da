//! Provider resolution.
//!
//! Maps a model id to its API provider name through the configured
//! provider-name map: a prefix pass first, then a substring pass. Used only
//! for the diagnostic session record.

use std::collections::HashMap;

/// Resolve the provider name for a model id, or `"unknown"`.
pub fn resolve_provider(providers_map: &HashMap<String, String>, model_id: &str) -> String {
    if model_id.is_empty() {
        return "unknown".to_string();
    }
    let model_id = model_id.to_lowercase();

    // Keys iterated in sorted order so overlapping entries resolve
    // deterministically.
    let mut keys: Vec<&String> = providers_map.keys().collect();
    keys.sort();

    for key in &keys {
        if model_id.starts_with(key.as_str()) {
            return providers_map[*key].clone();
        }
    }
    for key in &keys {
        if model_id.contains(key.as_str()) {
            return providers_map[*key].clone();
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> HashMap<String, String> {
        [
            ("deepseek", "deepseek"),
            ("google", "google"),
            ("llama", "ollama"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn prefix_match_wins() {
        assert_eq!(resolve_provider(&map(), "deepseek.vision"), "deepseek");
        assert_eq!(resolve_provider(&map(), "Google.gemini-2.0-flash"), "google");
    }

    #[test]
    fn substring_match_is_the_fallback() {
        assert_eq!(resolve_provider(&map(), "meta/llama-3-70b"), "ollama");
    }

    #[test]
    fn unknown_when_nothing_matches() {
        assert_eq!(resolve_provider(&map(), "mystery-model"), "unknown");
        assert_eq!(resolve_provider(&map(), ""), "unknown");
    }
}
