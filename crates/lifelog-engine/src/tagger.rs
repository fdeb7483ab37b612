//! Taxonomy-first tag assignment: a lexical pass over synonyms and
//! keywords, a constrained LLM pass, and deterministic heuristics at the
//! bottom. Every activity gets 1-3 tags with confidence.

use lifelog_providers::{ChatModel, ChatRequest};
use lifelog_types::{RawActivity, SynonymMap, TagAssignment, TagContext, Taxonomy};
use serde_json::Value;

use crate::prompts;
use crate::taxonomy::strip_code_fences;
use crate::text::similarity_ratio;

/// Confidence below which an activity is flagged for human review.
/// Metadata only; persistence proceeds regardless.
pub const REVIEW_THRESHOLD: f64 = 0.5;

/// Lexical candidates at or above this confidence skip the LLM entirely
const LEXICAL_ACCEPT_THRESHOLD: f64 = 0.7;

const FUZZY_THRESHOLD: f64 = 0.8;
const MAX_TAGS: usize = 3;

/// Which stage of the cascade produced the final tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStage {
    Lexical,
    Llm,
    FuzzyFallback,
    Heuristic,
}

impl CascadeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeStage::Lexical => "lexical",
            CascadeStage::Llm => "llm",
            CascadeStage::FuzzyFallback => "fuzzy_fallback",
            CascadeStage::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaggerOutcome {
    pub tags: Vec<TagAssignment>,
    pub stage: CascadeStage,
    /// True when the best confidence is under the review threshold
    pub needs_review: bool,
}

pub struct Tagger<'a> {
    chat: &'a dyn ChatModel,
    taxonomy: Taxonomy,
    synonyms: SynonymMap,
}

impl<'a> Tagger<'a> {
    pub fn new(chat: &'a dyn ChatModel, taxonomy: Taxonomy, synonyms: SynonymMap) -> Self {
        Self {
            chat,
            taxonomy,
            synonyms,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Assign tags to one raw activity via the cascade
    pub async fn tag_activity(&self, activity: &RawActivity) -> TaggerOutcome {
        let context = TagContext {
            activity_text: activity.details.clone(),
            source: activity.source.to_string(),
            duration_minutes: activity.duration_minutes,
            time_of_day: activity.time.clone(),
            taxonomy_tags: self.taxonomy.tag_names(),
        };

        let lexical = self.lexical_matches(&context.activity_text);
        if lexical
            .first()
            .is_some_and(|best| best.confidence >= LEXICAL_ACCEPT_THRESHOLD)
        {
            return outcome(clamp(lexical), CascadeStage::Lexical);
        }

        match self.llm_tags(&context).await {
            Ok((tags, stage)) if !tags.is_empty() => outcome(clamp(tags), stage),
            Ok(_) | Err(_) => {
                let tags = self.heuristic_tags(&context, lexical);
                outcome(clamp(tags), CascadeStage::Heuristic)
            }
        }
    }

    /// Synonym, keyword, and sub-tag matching against the activity text.
    /// Deduplicated per tag keeping the highest confidence, sorted
    /// strongest first.
    pub fn lexical_matches(&self, activity_text: &str) -> Vec<TagAssignment> {
        let text = activity_text.to_lowercase();
        let mut candidates: Vec<TagAssignment> = Vec::new();

        // Personal shortcuts carry near-certain confidence
        for (shortcut, categories) in &self.synonyms.personal_shortcuts {
            if text.contains(&shortcut.to_lowercase()) {
                for category in categories {
                    if self.taxonomy.contains(category) {
                        candidates.push(TagAssignment::new(category.clone(), 0.95));
                    }
                }
            }
        }

        // General synonyms: longer matches earn more confidence
        for (category, terms) in &self.synonyms.synonyms {
            if !self.taxonomy.contains(category) {
                continue;
            }
            for term in terms {
                if text.contains(&term.to_lowercase()) {
                    let confidence = (term.len() as f64 / 20.0).min(0.9);
                    candidates.push(TagAssignment::new(category.clone(), confidence));
                }
            }
        }

        // Category keywords: confidence scales with match ratio
        for (category, info) in &self.taxonomy.taxonomy {
            if info.keywords.is_empty() {
                continue;
            }
            let matches = info
                .keywords
                .iter()
                .filter(|k| text.contains(&k.to_lowercase()))
                .count();
            if matches > 0 {
                let confidence =
                    (matches as f64 / info.keywords.len() as f64 * 2.0).min(0.8);
                candidates.push(TagAssignment::new(category.clone(), confidence));
            }

            // Sub-tags found verbatim in the text ride along at keyword
            // confidence
            for sub_tag in &info.sub_tags {
                let needle = sub_tag.replace(['-', '_'], " ").to_lowercase();
                if !needle.is_empty()
                    && (text.contains(&needle) || text.contains(&sub_tag.to_lowercase()))
                {
                    let confidence = (sub_tag.len() as f64 / 20.0).min(0.8);
                    candidates.push(TagAssignment::new(sub_tag.clone(), confidence));
                }
            }
        }

        dedupe_by_max(candidates)
    }

    /// Map a freeform tag onto the taxonomy by similarity ratio
    pub fn fuzzy_map(&self, freeform: &str, threshold: f64) -> Option<TagAssignment> {
        let lower = freeform.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        if let Some(canonical) = self.taxonomy.canonical(&lower) {
            return Some(TagAssignment::new(canonical.to_string(), 1.0));
        }
        let mut best: Option<TagAssignment> = None;
        for name in self.taxonomy.tag_names() {
            let ratio = similarity_ratio(&lower, &name.to_lowercase());
            if ratio >= threshold && best.as_ref().is_none_or(|b| ratio > b.confidence) {
                best = Some(TagAssignment::new(name, ratio));
            }
        }
        best
    }

    /// Constrained LLM pass. Strict JSON parse first; then a forgiving
    /// parse that strips code fences; then comma-split fuzzy mapping.
    /// Provider errors propagate so the caller can fall through.
    async fn llm_tags(
        &self,
        context: &TagContext,
    ) -> lifelog_providers::Result<(Vec<TagAssignment>, CascadeStage)> {
        let request = ChatRequest::new(prompts::tag_user_prompt(context))
            .with_system(prompts::tag_system_prompt())
            .with_temperature(0.2)
            .with_max_tokens(300);
        let reply = self.chat.complete(request).await?;

        if let Some(tags) = self.parse_tag_json(&reply) {
            return Ok((tags, CascadeStage::Llm));
        }

        // Comma-separated fallback: fuzzy-map each token onto the taxonomy
        let tags: Vec<TagAssignment> = reply
            .split(',')
            .filter_map(|token| self.fuzzy_map(token, FUZZY_THRESHOLD))
            .collect();
        Ok((dedupe_by_max(tags), CascadeStage::FuzzyFallback))
    }

    fn parse_tag_json(&self, reply: &str) -> Option<Vec<TagAssignment>> {
        let value: Value = serde_json::from_str(reply)
            .or_else(|_| serde_json::from_str(strip_code_fences(reply)))
            .ok()?;
        let items = value.get("tags")?.as_array()?;
        let mut tags = Vec::new();
        for item in items {
            let name = item.get("name").and_then(Value::as_str)?.to_lowercase();
            let confidence = item
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.5);
            // Reject anything outside the taxonomy; normalize case
            if let Some(canonical) = self.taxonomy.canonical(&name) {
                tags.push(TagAssignment::new(canonical.to_string(), confidence));
            }
        }
        Some(dedupe_by_max(tags))
    }

    /// Deterministic bottom of the cascade: lexical matches below the
    /// accept threshold, then multilingual content cues, then a
    /// source-based guess, then the generic low-confidence tag.
    pub fn heuristic_tags(
        &self,
        context: &TagContext,
        lexical: Vec<TagAssignment>,
    ) -> Vec<TagAssignment> {
        if !lexical.is_empty() {
            return lexical;
        }

        let text = context.activity_text.to_lowercase();
        let mut tags = Vec::new();

        let cues: &[(&[&str], &str, f64)] = &[
            (&["meeting", "会议", "call", "conference"], "work", 0.7),
            (&["eat", "meal", "吃", "用餐"], "meals", 0.8),
            (&["rest", "sleep", "休息", "睡觉"], "personal", 0.8),
            (&["study", "learn", "学习", "read"], "study", 0.7),
            (&["exercise", "gym", "健身", "运动"], "exercise", 0.8),
        ];
        for (needles, tag, confidence) in cues {
            if needles.iter().any(|n| text.contains(n)) {
                tags.push(TagAssignment::new(tag.to_string(), *confidence));
                break;
            }
        }

        if tags.is_empty() {
            match context.source.as_str() {
                "calendar" => tags.push(TagAssignment::new("work", 0.5)),
                "notes" => tags.push(TagAssignment::new("personal", 0.5)),
                _ => {}
            }
        }

        if tags.is_empty() {
            tags.push(TagAssignment::new("personal", 0.3));
        }
        tags
    }
}

fn outcome(tags: Vec<TagAssignment>, stage: CascadeStage) -> TaggerOutcome {
    let needs_review = tags
        .first()
        .is_none_or(|best| best.confidence < REVIEW_THRESHOLD);
    TaggerOutcome {
        tags,
        stage,
        needs_review,
    }
}

fn clamp(mut tags: Vec<TagAssignment>) -> Vec<TagAssignment> {
    tags.truncate(MAX_TAGS);
    tags
}

fn dedupe_by_max(candidates: Vec<TagAssignment>) -> Vec<TagAssignment> {
    let mut best: Vec<TagAssignment> = Vec::new();
    for candidate in candidates {
        match best.iter_mut().find(|t| t.name == candidate.name) {
            Some(existing) => {
                if candidate.confidence > existing.confidence {
                    existing.confidence = candidate.confidence;
                }
            }
            None => best.push(candidate),
        }
    }
    best.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{default_synonyms, default_taxonomy};
    use lifelog_testing::FakeChatModel;
    use lifelog_types::ActivitySource;

    fn activity(details: &str) -> RawActivity {
        RawActivity {
            id: 1,
            date: "2025-08-01".to_string(),
            time: Some("09:00".to_string()),
            duration_minutes: 30,
            details: details.to_string(),
            source: ActivitySource::Calendar,
            source_link: None,
            source_payload: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn keyword_match_skips_the_llm() {
        let chat = FakeChatModel::failing("should not be called");
        let tagger = Tagger::new(&chat, default_taxonomy(), default_synonyms());

        let outcome = tagger.tag_activity(&activity("Team standup meeting")).await;
        assert_eq!(outcome.stage, CascadeStage::Lexical);
        assert_eq!(outcome.tags[0].name, "work");
        assert!(outcome.tags[0].confidence >= 0.7);
        assert!(!outcome.needs_review);
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn llm_json_reply_is_validated_against_taxonomy() {
        let chat = FakeChatModel::replying(
            r#"{"tags": [{"name": "Work", "confidence": 0.85}, {"name": "made_up_tag", "confidence": 0.9}]}"#,
        );
        let tagger = Tagger::new(&chat, default_taxonomy(), default_synonyms());

        let outcome = tagger.tag_activity(&activity("quarterly budget planning")).await;
        assert_eq!(outcome.stage, CascadeStage::Llm);
        assert_eq!(outcome.tags.len(), 1);
        assert_eq!(outcome.tags[0].name, "work");
    }

    #[tokio::test]
    async fn malformed_llm_reply_falls_back_to_fuzzy_mapping() {
        let chat = FakeChatModel::replying("worke, studdy, nonsense");
        let tagger = Tagger::new(&chat, default_taxonomy(), default_synonyms());

        let outcome = tagger.tag_activity(&activity("quarterly budget planning")).await;
        assert_eq!(outcome.stage, CascadeStage::FuzzyFallback);
        let names: Vec<_> = outcome.tags.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"work"));
        assert!(names.contains(&"study"));
        assert!(!names.contains(&"nonsense"));
    }

    #[tokio::test]
    async fn provider_failure_lands_on_heuristics() {
        let chat = FakeChatModel::failing("offline");
        let tagger = Tagger::new(&chat, default_taxonomy(), default_synonyms());

        let outcome = tagger.tag_activity(&activity("吃午饭")).await;
        assert_eq!(outcome.stage, CascadeStage::Heuristic);
        assert_eq!(outcome.tags[0].name, "meals");
        assert_eq!(outcome.tags[0].confidence, 0.8);
    }

    #[tokio::test]
    async fn unmatchable_text_gets_the_generic_tag() {
        let chat = FakeChatModel::failing("offline");
        let mut activity = activity("zzz qqq");
        activity.source = ActivitySource::Notes;
        let tagger = Tagger::new(&chat, default_taxonomy(), default_synonyms());

        let outcome = tagger.tag_activity(&activity).await;
        assert_eq!(outcome.tags[0].name, "personal");
        assert_eq!(outcome.tags[0].confidence, 0.5);
    }

    #[test]
    fn fuzzy_map_honors_threshold() {
        let chat = FakeChatModel::replying("");
        let tagger = Tagger::new(&chat, default_taxonomy(), default_synonyms());
        assert_eq!(tagger.fuzzy_map("worke", 0.8).unwrap().name, "work");
        assert!(tagger.fuzzy_map("xyzzy", 0.8).is_none());
        // Exact (case-insensitive) match maps at full confidence
        let exact = tagger.fuzzy_map("WORK", 0.8).unwrap();
        assert_eq!(exact.confidence, 1.0);
    }

    #[test]
    fn shortcuts_outrank_plain_keywords() {
        let chat = FakeChatModel::replying("");
        let mut synonyms = default_synonyms();
        synonyms
            .personal_shortcuts
            .insert("sidegig".to_string(), vec!["work".to_string()]);
        let tagger = Tagger::new(&chat, default_taxonomy(), synonyms);

        let matches = tagger.lexical_matches("late night sidegig session");
        assert_eq!(matches[0].name, "work");
        assert_eq!(matches[0].confidence, 0.95);
    }
}
