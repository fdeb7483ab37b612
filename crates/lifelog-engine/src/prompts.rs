//! Prompt construction for the chat collaborator. Prompts are plain
//! strings; every caller parses the reply defensively and has a
//! deterministic fallback.

use lifelog_store::TagUsageContext;
use lifelog_types::TagContext;

/// System prompt for per-activity tagging. The reply vocabulary is
/// restricted to the supplied taxonomy; free-form tags are rejected on
/// parse anyway.
pub fn tag_system_prompt() -> String {
    "You are an activity categorization system for personal time tracking.\n\
     Assign 1-3 tags to the activity you are given.\n\n\
     RULES:\n\
     1. Only use tags from the ALLOWED TAGS list. Never invent new tags.\n\
     2. Use lowercase tag names exactly as listed.\n\
     3. Attach a confidence between 0.0 and 1.0 to every tag.\n\n\
     Respond with JSON only:\n\
     {\"tags\": [{\"name\": \"tag_name\", \"confidence\": 0.0}]}"
        .to_string()
}

pub fn tag_user_prompt(context: &TagContext) -> String {
    format!(
        "Activity: \"{}\"\nSource: {}\nDuration: {} minutes\nTime of day: {}\n\nALLOWED TAGS: {}\n\nReturn the JSON object only.",
        context.activity_text,
        context.source,
        context.duration_minutes,
        context.time_of_day.as_deref().unwrap_or("not specified"),
        context.taxonomy_tags.join(", "),
    )
}

/// System prompt asking for a personalized taxonomy plus synonym map in
/// one reply
pub fn taxonomy_system_prompt(max_categories: usize) -> String {
    format!(
        "You are analyzing personal activity data to build a customized activity taxonomy.\n\n\
         TASK: Create up to {} main activity categories from the user's actual data, plus a synonym map.\n\n\
         REQUIREMENTS:\n\
         1. Categories reflect the user's real lifestyle and work patterns.\n\
         2. Capture personal shortcuts and project names that recur in the data.\n\
         3. Balance work, personal, and routine activities.\n\
         4. Every category carries a description, keywords, and sub_tags.\n\n\
         RESPONSE FORMAT (JSON only):\n\
         {{\"taxonomy\": {{\"category_name\": {{\"description\": \"...\", \"keywords\": [\"...\"], \"sub_tags\": [\"...\"]}}}},\n\
          \"synonyms\": {{\"category_name\": [\"term\", ...]}},\n\
          \"personal_shortcuts\": {{\"shortcut\": [\"category_name\", ...]}}}}",
        max_categories
    )
}

pub fn taxonomy_user_prompt(examples: &[String]) -> String {
    let listing = examples
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}. {}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "ACTIVITY DATA TO ANALYZE:\n{}\n\nGenerate the personalized taxonomy and synonyms for these activities. Focus on this user's actual patterns, not generic categories.",
        listing
    )
}

/// System prompt for tag cleanup classification
pub fn cleanup_system_prompt() -> String {
    "You are an expert at analyzing activity tracking tags for quality and consistency.\n\n\
     Classify every tag as keep, remove, or merge.\n\n\
     MEANINGFUL TAGS capture specific, actionable information: concrete activities,\n\
     tools or methods, contexts that matter.\n\n\
     REMOVE:\n\
     - system artifacts that describe no real activity (scheduled_activity, activities, tasks, events)\n\
     - generic process descriptors (time_management, productivity, planning, organization)\n\
     - meta-concepts with no insight (working, general, misc, other, stuff)\n\
     - malformed or accidental tags\n\n\
     MERGE:\n\
     - singular/plural variants (meeting/meetings)\n\
     - synonymous terms and slight spelling variants of the same concept\n\n\
     Be aggressive about removing generic tags; preserve genuinely useful specificity.\n\n\
     Respond with JSON only:\n\
     {\"actions\": [{\"tag\": \"name\", \"action\": \"keep|remove|merge\", \"reason\": \"...\", \"confidence\": 0.0, \"merge_into\": \"target (merge only)\"}]}"
        .to_string()
}

pub fn cleanup_user_prompt(tags_block: &str) -> String {
    format!(
        "Analyze these activity tracking tags and identify cleanup actions:\n\n{}\n\nReturn the JSON object only.",
        tags_block
    )
}

/// One line per tag: name, usage count, a few sample activities
pub fn format_tags_for_analysis(tags: &[TagUsageContext]) -> String {
    tags.iter()
        .map(|t| {
            format!(
                "- {} (used {}x): {}",
                t.name,
                t.usage_count,
                t.sample_activities.join("; ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
