//! Two-phase tag cleanup: Phase A removes meaningless tags, Phase B
//! merges redundant survivors. Phase B never merges into a tag Phase A
//! removed; that ordering is a hard contract.

use lifelog_providers::{ChatModel, ChatRequest};
use lifelog_store::queries::tags as tag_queries;
use lifelog_store::{Store, TagUsageContext};
use serde::Serialize;
use serde_json::Value;

use crate::prompts;
use crate::taxonomy::strip_code_fences;
use crate::Result;

const ANALYSIS_BATCH_SIZE: usize = 30;
const SAMPLES_PER_TAG: usize = 5;

/// Patterns the deterministic fallback treats as meaningless
const MEANINGLESS_PATTERNS: &[(&str, &[&str])] = &[
    ("system_artifacts", &["scheduled_activity", "activities", "tasks", "events"]),
    ("generic_processes", &[
        "effective_time_management",
        "time_management",
        "productivity",
        "planning",
        "organization",
        "management",
    ]),
    ("redundant_plurals", &["meetings", "writings", "codings"]),
    ("meta_tags", &["working", "things", "stuff", "general", "misc", "other"]),
    ("empty_concepts", &["activity", "item", "entry"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupAction {
    Keep,
    Remove,
    Merge,
}

/// Classification of one tag
#[derive(Debug, Clone)]
pub struct TagAnalysis {
    pub tag_name: String,
    pub action: CleanupAction,
    pub reason: String,
    pub confidence: f64,
    pub merge_target: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CleanupOptions {
    pub dry_run: bool,
    pub removal_threshold: f64,
    pub merge_threshold: f64,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            removal_threshold: 0.7,
            merge_threshold: 0.8,
            date_start: None,
            date_end: None,
        }
    }
}

impl CleanupOptions {
    fn is_scoped(&self) -> bool {
        self.date_start.is_some() || self.date_end.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovalPlan {
    pub name: String,
    pub reason: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergePlan {
    pub source: String,
    pub target: String,
    pub reason: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupSummary {
    pub total_analyzed: usize,
    pub marked_for_removal: usize,
    pub marked_for_merge: usize,
    pub removed: usize,
    pub merged: usize,
    pub dry_run: bool,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub tags_to_remove: Vec<RemovalPlan>,
    pub tags_to_merge: Vec<MergePlan>,
}

pub struct TagCleaner<'a> {
    chat: &'a dyn ChatModel,
}

impl<'a> TagCleaner<'a> {
    pub fn new(chat: &'a dyn ChatModel) -> Self {
        Self { chat }
    }

    /// Analyze all tags in scope and, unless dry_run, execute the
    /// two-phase cleanup.
    pub async fn clean(&self, store: &Store, options: &CleanupOptions) -> Result<CleanupSummary> {
        let contexts = {
            let conn = store.conn()?;
            tag_queries::usage_contexts(
                &conn,
                options.date_start.as_deref(),
                options.date_end.as_deref(),
                SAMPLES_PER_TAG,
            )?
        };

        let analyses = self.analyze(&contexts).await;

        // Phase A: removal candidates at or above the removal threshold
        let mut to_remove: Vec<TagAnalysis> = Vec::new();
        let mut survivors: Vec<TagAnalysis> = Vec::new();
        for analysis in analyses {
            if analysis.action == CleanupAction::Remove
                && analysis.confidence >= options.removal_threshold
            {
                to_remove.push(analysis);
            } else {
                survivors.push(analysis);
            }
        }

        // Phase B: merges among survivors only, into surviving targets only
        let surviving_names: std::collections::HashSet<&str> =
            survivors.iter().map(|a| a.tag_name.as_str()).collect();
        let to_merge: Vec<TagAnalysis> = survivors
            .iter()
            .filter(|a| {
                a.action == CleanupAction::Merge
                    && a.confidence >= options.merge_threshold
                    && a.merge_target
                        .as_deref()
                        .is_some_and(|t| surviving_names.contains(t))
            })
            .cloned()
            .collect();

        tracing::info!(
            removals = to_remove.len(),
            merges = to_merge.len(),
            survivors = survivors.len(),
            scoped = options.is_scoped(),
            "cleanup analysis complete"
        );

        let mut removed = 0;
        let mut merged = 0;
        if !options.dry_run {
            removed = self.execute_removals(store, &to_remove, options)?;
            merged = self.execute_merges(store, &to_merge, options)?;
        }

        Ok(CleanupSummary {
            total_analyzed: to_remove.len() + survivors.len(),
            marked_for_removal: to_remove.len(),
            marked_for_merge: to_merge.len(),
            removed,
            merged,
            dry_run: options.dry_run,
            date_start: options.date_start.clone(),
            date_end: options.date_end.clone(),
            tags_to_remove: to_remove
                .iter()
                .map(|a| RemovalPlan {
                    name: a.tag_name.clone(),
                    reason: a.reason.clone(),
                    confidence: a.confidence,
                })
                .collect(),
            tags_to_merge: to_merge
                .iter()
                .map(|a| MergePlan {
                    source: a.tag_name.clone(),
                    target: a.merge_target.clone().unwrap_or_default(),
                    reason: a.reason.clone(),
                    confidence: a.confidence,
                })
                .collect(),
        })
    }

    fn execute_removals(
        &self,
        store: &Store,
        to_remove: &[TagAnalysis],
        options: &CleanupOptions,
    ) -> Result<usize> {
        let mut removed = 0;
        if options.is_scoped() {
            // Scoped: only links inside the window go; tags stay
            for analysis in to_remove {
                let result = store.transaction(|tx| {
                    Ok(tag_queries::remove_links_in_range(
                        tx,
                        &[analysis.tag_name.clone()],
                        options.date_start.as_deref(),
                        options.date_end.as_deref(),
                    )?)
                });
                match result {
                    Ok(n) if n > 0 => removed += 1,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("failed to remove links for '{}': {}", analysis.tag_name, e)
                    }
                }
            }
        } else {
            for analysis in to_remove {
                let name = analysis.tag_name.clone();
                let result = store.transaction(|tx| {
                    let Some(tag) = tag_queries::get_by_name(tx, &name)? else {
                        return Ok(false);
                    };
                    tag_queries::delete_links_for_tag(tx, tag.id)?;
                    tag_queries::delete(tx, tag.id)?;
                    Ok(true)
                });
                match result {
                    Ok(true) => {
                        tracing::info!("removed meaningless tag: {}", name);
                        removed += 1;
                    }
                    Ok(false) => {}
                    Err(e) => tracing::error!("failed to remove tag '{}': {}", name, e),
                }
            }
        }
        Ok(removed)
    }

    fn execute_merges(
        &self,
        store: &Store,
        to_merge: &[TagAnalysis],
        options: &CleanupOptions,
    ) -> Result<usize> {
        let mut merged = 0;
        for analysis in to_merge {
            let Some(target_name) = analysis.merge_target.clone() else {
                continue;
            };
            let source_name = analysis.tag_name.clone();
            let scoped = options.is_scoped();
            let date_start = options.date_start.clone();
            let date_end = options.date_end.clone();

            let result = store.transaction(|tx| {
                let Some(source) = tag_queries::get_by_name(tx, &source_name)? else {
                    return Ok(false);
                };
                let Some(target) = tag_queries::get_by_name(tx, &target_name)? else {
                    return Ok(false);
                };
                tag_queries::merge_links(
                    tx,
                    source.id,
                    target.id,
                    date_start.as_deref(),
                    date_end.as_deref(),
                )?;
                if !scoped {
                    // Global merge retires the source tag entirely
                    tag_queries::delete_links_for_tag(tx, source.id)?;
                    tag_queries::delete(tx, source.id)?;
                }
                // The in-place tag_id rewrite bypasses the link triggers
                tag_queries::recompute_usage(tx, target.id)?;
                if scoped {
                    tag_queries::recompute_usage(tx, source.id)?;
                }
                Ok(true)
            });
            match result {
                Ok(true) => {
                    tracing::info!("merged '{}' into '{}'", source_name, target_name);
                    merged += 1;
                }
                Ok(false) => {
                    tracing::warn!("cannot merge '{}' into '{}': tag missing", source_name, target_name)
                }
                Err(e) => tracing::error!("failed to merge '{}': {}", source_name, e),
            }
        }
        Ok(merged)
    }

    /// Classify tags in batches via the LLM; each failed batch falls back
    /// to pattern analysis so the run always completes.
    pub async fn analyze(&self, contexts: &[TagUsageContext]) -> Vec<TagAnalysis> {
        let mut analyses = Vec::with_capacity(contexts.len());
        for batch in contexts.chunks(ANALYSIS_BATCH_SIZE) {
            let request = ChatRequest::new(prompts::cleanup_user_prompt(
                &prompts::format_tags_for_analysis(batch),
            ))
            .with_system(prompts::cleanup_system_prompt())
            .with_temperature(0.3)
            .with_max_tokens(1500);

            match self.chat.complete(request).await {
                Ok(reply) => match parse_analysis_reply(&reply, batch) {
                    Some(batch_analyses) => analyses.extend(batch_analyses),
                    None => {
                        tracing::warn!("unparseable cleanup reply, falling back for batch");
                        analyses.extend(fallback_analysis(batch));
                    }
                },
                Err(e) => {
                    tracing::warn!("cleanup analysis failed ({}), falling back for batch", e);
                    analyses.extend(fallback_analysis(batch));
                }
            }
        }
        analyses
    }
}

fn parse_analysis_reply(reply: &str, batch: &[TagUsageContext]) -> Option<Vec<TagAnalysis>> {
    let value: Value = serde_json::from_str(strip_code_fences(reply)).ok()?;
    let actions = value.get("actions")?.as_array()?;
    let known: std::collections::HashSet<&str> =
        batch.iter().map(|t| t.name.as_str()).collect();

    let mut analyses = Vec::new();
    for item in actions {
        let Some(tag) = item.get("tag").and_then(Value::as_str) else {
            continue;
        };
        if !known.contains(tag) {
            continue;
        }
        let action = match item.get("action").and_then(Value::as_str) {
            Some("remove") => CleanupAction::Remove,
            Some("merge") => CleanupAction::Merge,
            _ => CleanupAction::Keep,
        };
        analyses.push(TagAnalysis {
            tag_name: tag.to_string(),
            action,
            reason: item
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("no reason provided")
                .to_string(),
            confidence: item.get("confidence").and_then(Value::as_f64).unwrap_or(0.5),
            merge_target: item
                .get("merge_into")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }
    Some(analyses)
}

/// Deterministic classification: meaningless-pattern matching, a
/// singular/plural merge heuristic, and a too-short rule.
pub fn fallback_analysis(contexts: &[TagUsageContext]) -> Vec<TagAnalysis> {
    let mut analyses = Vec::with_capacity(contexts.len());
    for context in contexts {
        let lower = context.name.to_lowercase();
        let mut action = CleanupAction::Keep;
        let mut reason = "appears meaningful".to_string();
        let mut confidence = 0.7;
        let mut merge_target = None;

        // A variant with a live counterpart merges; removal patterns only
        // apply when there is nothing to merge into
        if let Some(target) = find_merge_target(&context.name, contexts) {
            action = CleanupAction::Merge;
            reason = format!("redundant variant of '{}'", target);
            confidence = 0.8;
            merge_target = Some(target);
        } else {
            for (pattern_kind, patterns) in MEANINGLESS_PATTERNS {
                if patterns.iter().any(|p| lower.contains(p)) {
                    action = CleanupAction::Remove;
                    reason = format!("matches {} pattern", pattern_kind);
                    confidence = 0.9;
                    break;
                }
            }
        }

        if lower.len() < 3 {
            action = CleanupAction::Remove;
            reason = "too short to be meaningful".to_string();
            confidence = 0.8;
            merge_target = None;
        }

        analyses.push(TagAnalysis {
            tag_name: context.name.clone(),
            action,
            reason,
            confidence,
            merge_target,
        });
    }
    analyses
}

/// Singular/plural variant detection. The singular form is canonical:
/// a plural always merges into its existing singular, never the other
/// way around (keeps the relation acyclic).
fn find_merge_target(name: &str, contexts: &[TagUsageContext]) -> Option<String> {
    let lower = name.to_lowercase();
    if !lower.ends_with('s') || lower.len() <= 3 {
        return None;
    }
    let singular = &lower[..lower.len() - 1];
    contexts
        .iter()
        .find(|c| c.name.to_lowercase() == singular)
        .map(|c| c.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(name: &str, usage_count: i64) -> TagUsageContext {
        TagUsageContext {
            name: name.to_string(),
            usage_count,
            sample_activities: vec!["sample".to_string()],
        }
    }

    #[test]
    fn fallback_flags_system_artifacts_for_removal() {
        let analyses = fallback_analysis(&[context("scheduled_activity", 12)]);
        assert_eq!(analyses[0].action, CleanupAction::Remove);
        assert_eq!(analyses[0].confidence, 0.9);
    }

    #[test]
    fn fallback_merges_plural_into_existing_singular() {
        let contexts = vec![context("meeting", 10), context("meetings", 3)];
        let analyses = fallback_analysis(&contexts);
        let plural = analyses.iter().find(|a| a.tag_name == "meetings").unwrap();
        assert_eq!(plural.action, CleanupAction::Merge);
        assert_eq!(plural.merge_target.as_deref(), Some("meeting"));

        let singular = analyses.iter().find(|a| a.tag_name == "meeting").unwrap();
        assert_eq!(singular.action, CleanupAction::Keep);
    }

    #[test]
    fn fallback_removes_too_short_names() {
        let analyses = fallback_analysis(&[context("ab", 1)]);
        assert_eq!(analyses[0].action, CleanupAction::Remove);
    }

    #[test]
    fn parse_reply_drops_unknown_tags() {
        let batch = vec![context("meeting", 5)];
        let reply = r#"{"actions": [
            {"tag": "meeting", "action": "keep", "confidence": 0.9},
            {"tag": "hallucinated", "action": "remove", "confidence": 0.99}
        ]}"#;
        let analyses = parse_analysis_reply(reply, &batch).unwrap();
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].tag_name, "meeting");
    }
}
