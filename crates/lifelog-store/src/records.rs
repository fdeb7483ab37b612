//! Insert-side record types. Read models live in lifelog-types; these
//! carry the fields a writer provides, with ids and timestamps assigned
//! by the database.

use lifelog_types::ActivitySource;

#[derive(Debug, Clone)]
pub struct NewRawActivity {
    pub date: String,
    pub time: Option<String>,
    pub duration_minutes: i64,
    pub details: String,
    pub source: ActivitySource,
    pub source_link: Option<String>,
    pub source_payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewProcessedActivity {
    pub date: String,
    pub time: Option<String>,
    pub total_duration_minutes: i64,
    pub combined_details: String,
    pub raw_activity_ids: Vec<i64>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewNotePage {
    pub page_id: String,
    pub title: String,
    pub url: Option<String>,
    pub last_edited_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewNoteBlock {
    pub block_id: String,
    pub page_id: String,
    pub parent_block_id: Option<String>,
    pub block_type: String,
    pub is_leaf: bool,
    pub text: String,
    pub last_edited_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// Filter for raw activity listings
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub source: Option<ActivitySource>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

/// Filter for processed activity listings
#[derive(Debug, Clone, Default)]
pub struct ProcessedFilter {
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub tags: Vec<String>,
    pub limit: usize,
    pub offset: usize,
}

/// Sort order for tag listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSort {
    Name,
    #[default]
    UsageCount,
    CreatedAt,
}

impl TagSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(TagSort::Name),
            "usage_count" => Some(TagSort::UsageCount),
            "created_at" => Some(TagSort::CreatedAt),
            _ => None,
        }
    }
}

/// A tag plus usage context fed to cleanup analysis
#[derive(Debug, Clone)]
pub struct TagUsageContext {
    pub name: String,
    pub usage_count: i64,
    pub sample_activities: Vec<String>,
}
