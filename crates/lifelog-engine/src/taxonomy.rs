//! Personalized taxonomy and synonym generation, plus the resource files
//! the active taxonomy lives in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lifelog_providers::{ChatModel, ChatRequest};
use lifelog_types::{Category, SynonymMap, Taxonomy};
use serde_json::Value;

use crate::prompts;
use crate::text::content_words;
use crate::{Error, Result};

const TAXONOMY_FILE: &str = "hierarchical_taxonomy_generated.json";
const SYNONYMS_FILE: &str = "synonyms_generated.json";
const MAX_CATEGORIES: usize = 20;
const SAMPLE_LIMIT: usize = 100;

/// The resource namespace the active taxonomy artifacts live in.
/// Artifacts carry a generated_at stamp so regeneration is visible.
pub struct TaxonomyResources {
    dir: PathBuf,
}

impl TaxonomyResources {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn taxonomy_path(&self) -> PathBuf {
        self.dir.join(TAXONOMY_FILE)
    }

    pub fn synonyms_path(&self) -> PathBuf {
        self.dir.join(SYNONYMS_FILE)
    }

    /// Load the active taxonomy and synonyms; built-in defaults stand in
    /// until a generation run has produced artifacts.
    pub fn load(&self) -> (Taxonomy, SynonymMap) {
        let taxonomy = read_json(&self.taxonomy_path())
            .and_then(|v| parse_taxonomy(&v))
            .unwrap_or_else(default_taxonomy);
        let synonyms = read_json(&self.synonyms_path())
            .and_then(|v| parse_synonyms(&v))
            .unwrap_or_else(default_synonyms);
        (taxonomy, synonyms)
    }

    pub fn save(&self, taxonomy: &Taxonomy, synonyms: &SynonymMap) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Resources(format!("cannot create {}: {}", self.dir.display(), e)))?;

        let stamp = chrono::Utc::now().to_rfc3339();
        let mut taxonomy_doc = serde_json::to_value(taxonomy)
            .map_err(|e| Error::Resources(e.to_string()))?;
        taxonomy_doc["generated_at"] = Value::String(stamp.clone());
        write_json(&self.taxonomy_path(), &taxonomy_doc)?;

        let mut synonyms_doc =
            serde_json::to_value(synonyms).map_err(|e| Error::Resources(e.to_string()))?;
        synonyms_doc["generated_at"] = Value::String(stamp);
        write_json(&self.synonyms_path(), &synonyms_doc)?;
        Ok(())
    }
}

fn read_json(path: &Path) -> Option<Value> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let pretty =
        serde_json::to_string_pretty(value).map_err(|e| Error::Resources(e.to_string()))?;
    std::fs::write(path, pretty)
        .map_err(|e| Error::Resources(format!("cannot write {}: {}", path.display(), e)))
}

/// Builds a personalized taxonomy from the user's recent corpus
pub struct TaxonomyBuilder<'a> {
    chat: &'a dyn ChatModel,
}

impl<'a> TaxonomyBuilder<'a> {
    pub fn new(chat: &'a dyn ChatModel) -> Self {
        Self { chat }
    }

    /// Build from sampled calendar event texts and note abstracts. The
    /// LLM path is tried first; failure or unparseable output falls back
    /// to a deterministic frequency sketch.
    pub async fn build(
        &self,
        event_texts: &[String],
        note_texts: &[String],
    ) -> (Taxonomy, SynonymMap) {
        let mut examples: Vec<String> = Vec::new();
        for text in event_texts.iter().take(SAMPLE_LIMIT) {
            examples.push(format!("[calendar] {}", text));
        }
        for text in note_texts.iter().take(SAMPLE_LIMIT) {
            examples.push(format!("[notes] {}", text));
        }

        if !examples.is_empty() {
            let request = ChatRequest::new(prompts::taxonomy_user_prompt(&examples))
                .with_system(prompts::taxonomy_system_prompt(MAX_CATEGORIES))
                .with_temperature(0.3)
                .with_max_tokens(1200);
            match self.chat.complete(request).await {
                Ok(reply) => {
                    if let Some((taxonomy, synonyms)) = parse_generated(&reply) {
                        return (taxonomy, synonyms);
                    }
                    tracing::warn!("taxonomy reply was unparseable, using frequency fallback");
                }
                Err(e) => {
                    tracing::warn!("taxonomy generation failed ({}), using frequency fallback", e);
                }
            }
        }

        frequency_fallback(event_texts, note_texts)
    }
}

/// Strip markdown code fences some models wrap JSON replies in
pub fn strip_code_fences(reply: &str) -> &str {
    let mut s = reply.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

fn parse_generated(reply: &str) -> Option<(Taxonomy, SynonymMap)> {
    let value: Value = serde_json::from_str(strip_code_fences(reply)).ok()?;
    let taxonomy = parse_taxonomy(&value)?;
    if taxonomy.is_empty() {
        return None;
    }
    let synonyms = parse_synonyms(&value).unwrap_or_default();
    Some((taxonomy, synonyms))
}

/// Accept both shapes a generator may produce: category -> Category object
/// or category -> bare keyword list
fn parse_taxonomy(value: &Value) -> Option<Taxonomy> {
    let entries = value.get("taxonomy")?.as_object()?;
    let mut taxonomy = BTreeMap::new();
    for (name, body) in entries {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        let category = match body {
            Value::Array(words) => Category {
                description: String::new(),
                keywords: words
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                sub_tags: Vec::new(),
            },
            Value::Object(_) => serde_json::from_value(body.clone()).ok()?,
            _ => continue,
        };
        taxonomy.insert(name, category);
    }
    Some(Taxonomy { taxonomy })
}

fn parse_synonyms(value: &Value) -> Option<SynonymMap> {
    let mut map = SynonymMap::default();
    // Either nested under "synonyms" next to the taxonomy, or the whole
    // document when loading the synonyms artifact
    let synonyms = value
        .get("synonyms")
        .and_then(Value::as_object)
        .or_else(|| value.as_object())?;
    for (category, terms) in synonyms {
        if matches!(category.as_str(), "personal_shortcuts" | "generated_at" | "taxonomy") {
            continue;
        }
        if let Some(list) = terms.as_array() {
            map.synonyms.insert(
                category.to_lowercase(),
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            );
        }
    }
    if let Some(shortcuts) = value.get("personal_shortcuts").and_then(Value::as_object) {
        for (shortcut, categories) in shortcuts {
            if let Some(list) = categories.as_array() {
                map.personal_shortcuts.insert(
                    shortcut.to_lowercase(),
                    list.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                );
            }
        }
    }
    Some(map)
}

/// Deterministic fallback: partition the corpus's frequent content words
/// into fixed category buckets by keyword heuristics. An empty corpus
/// still yields the non-empty built-in defaults.
pub fn frequency_fallback(
    event_texts: &[String],
    note_texts: &[String],
) -> (Taxonomy, SynonymMap) {
    let corpus = event_texts
        .iter()
        .chain(note_texts)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let words = content_words(&corpus);
    if words.is_empty() {
        return (default_taxonomy(), default_synonyms());
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for word in &words {
        *counts.entry(word.as_str()).or_default() += 1;
    }
    let mut top: Vec<(&str, usize)> = counts.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let top: Vec<&str> = top.into_iter().take(200).map(|(w, _)| w).collect();

    let buckets: &[(&str, &str, &[&str])] = &[
        ("work", "Work and project activity", &["meeting", "project", "code", "review", "planning", "standup", "sync"]),
        ("health", "Health, food, and movement", &["gym", "exercise", "run", "walk", "meal", "lunch", "dinner", "breakfast"]),
        ("personal", "Personal growth and leisure", &["write", "read", "learn", "study", "practice"]),
        ("social", "Social time and events", &["call", "chat", "visit", "party", "event"]),
        ("maintenance", "Chores and upkeep", &["clean", "shop", "cook", "laundry", "grocery"]),
    ];

    let mut taxonomy = BTreeMap::new();
    for (name, description, hints) in buckets {
        let keywords: Vec<String> = top
            .iter()
            .filter(|w| hints.iter().any(|h| w.contains(h)))
            .take(6)
            .map(|w| w.to_string())
            .collect();
        if !keywords.is_empty() {
            taxonomy.insert(
                name.to_string(),
                Category {
                    description: description.to_string(),
                    keywords,
                    sub_tags: Vec::new(),
                },
            );
        }
    }
    if taxonomy.is_empty() {
        return (default_taxonomy(), default_synonyms());
    }

    (Taxonomy { taxonomy }, default_synonyms())
}

/// Built-in starter taxonomy used before the first generation run
pub fn default_taxonomy() -> Taxonomy {
    let mut taxonomy = BTreeMap::new();
    let entries: &[(&str, &str, &[&str])] = &[
        ("work", "Work-related activities", &["meeting", "standup", "project", "review", "code"]),
        ("study", "Learning activities", &["study", "learn", "read", "course"]),
        ("exercise", "Physical activity", &["exercise", "gym", "run", "workout"]),
        ("meals", "Food and drink", &["meal", "lunch", "dinner", "breakfast", "eat"]),
        ("social", "Social time", &["call", "chat", "visit", "party"]),
        ("personal", "Personal activities", &["rest", "sleep", "errand", "journal"]),
    ];
    for (name, description, keywords) in entries {
        taxonomy.insert(
            name.to_string(),
            Category {
                description: description.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
                sub_tags: Vec::new(),
            },
        );
    }
    Taxonomy { taxonomy }
}

pub fn default_synonyms() -> SynonymMap {
    let mut map = SynonymMap::default();
    for (category, terms) in [
        ("work", vec!["standup", "sync", "conference", "retro", "one-on-one"]),
        ("exercise", vec!["workout", "training", "fitness", "jog"]),
        ("meals", vec!["snack", "food", "brunch"]),
        ("study", vec!["course", "lecture", "tutorial"]),
    ] {
        map.synonyms
            .insert(category.to_string(), terms.into_iter().map(String::from).collect());
    }
    map
}
