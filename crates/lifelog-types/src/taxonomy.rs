use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One taxonomy category: a canonical tag with its matching vocabulary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sub_tags: Vec<String>,
}

/// The canonical set of category tags the tagger may emit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub taxonomy: BTreeMap<String, Category>,
}

impl Taxonomy {
    /// Category names in canonical (sorted) order
    pub fn tag_names(&self) -> Vec<String> {
        self.taxonomy.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.taxonomy.contains_key(name)
    }

    /// Resolve a case-insensitive name to the canonical category name
    pub fn canonical(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.taxonomy
            .keys()
            .find(|k| k.to_lowercase() == lower)
            .map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.taxonomy.is_empty()
    }
}

/// Lexical synonyms and personal shortcuts mapped to categories
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynonymMap {
    /// category -> alternate terms
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
    /// shortcut -> categories it expands to
    #[serde(default)]
    pub personal_shortcuts: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Taxonomy {
        let mut taxonomy = BTreeMap::new();
        taxonomy.insert(
            "work".to_string(),
            Category {
                description: "Work-related activities".to_string(),
                keywords: vec!["meeting".to_string(), "standup".to_string()],
                sub_tags: vec!["code-review".to_string()],
            },
        );
        Taxonomy { taxonomy }
    }

    #[test]
    fn canonical_is_case_insensitive() {
        let tax = sample();
        assert_eq!(tax.canonical("Work"), Some("work"));
        assert_eq!(tax.canonical("WORK"), Some("work"));
        assert_eq!(tax.canonical("play"), None);
    }

    #[test]
    fn parses_generated_shape() {
        let json = r#"{
            "taxonomy": {
                "health": {"description": "", "keywords": ["gym"], "sub_tags": []}
            }
        }"#;
        let tax: Taxonomy = serde_json::from_str(json).unwrap();
        assert!(tax.contains("health"));
        assert_eq!(tax.taxonomy["health"].keywords, vec!["gym"]);
    }
}
