//! Request and response shapes plus the validation contract (violations
//! return 422).

use lifelog_types::{validate, ProcessedActivity, Tag};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;

#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page_info: PageInfo,
}

pub fn paginated<T>(items: Vec<T>, total_count: usize, limit: usize, offset: usize) -> Paginated<T> {
    Paginated {
        items,
        total_count,
        page_info: PageInfo {
            limit,
            offset,
            has_more: (offset + limit) < total_count,
        },
    }
}

/// limit in [1, 1000] (default 100), offset >= 0
pub fn validate_pagination(
    limit: Option<usize>,
    offset: Option<usize>,
) -> Result<(usize, usize), ApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 || limit > MAX_LIMIT {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok((limit, offset.unwrap_or(0)))
}

pub fn validate_date_param(name: &str, value: Option<&str>) -> Result<(), ApiError> {
    match value {
        Some(v) if !validate::is_valid_date(v) => Err(ApiError::Validation(format!(
            "{} must match YYYY-MM-DD",
            name
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub struct RawActivitiesQuery {
    pub source: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessedActivitiesQuery {
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    /// Comma-separated tag names
    pub tags: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TagsQuery {
    pub sort_by: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct InsightsQuery {
    pub date_start: Option<String>,
    pub date_end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimeDistributionQuery {
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub group_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default = "default_true")]
    pub use_database: bool,
    #[serde(default)]
    pub regenerate_system_tags: bool,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    #[serde(default)]
    pub enable_matching: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default = "default_removal_threshold")]
    pub removal_threshold: f64,
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: f64,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
}

fn default_removal_threshold() -> f64 {
    0.7
}

fn default_merge_threshold() -> f64 {
    0.8
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default = "default_import_hours")]
    pub hours_since_last_update: i64,
}

fn default_import_hours() -> i64 {
    24
}

impl ImportRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.hours_since_last_update < 1 || self.hours_since_last_update > 8760 {
            return Err(ApiError::Validation(
                "hours_since_last_update must be between 1 and 8760".to_string(),
            ));
        }
        Ok(())
    }
}

/// A tag embedded in an activity response, carrying its link confidence
#[derive(Debug, Serialize)]
pub struct TagWithConfidence {
    #[serde(flatten)]
    pub tag: Tag,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct ProcessedActivityResponse {
    #[serde(flatten)]
    pub activity: ProcessedActivity,
    pub tags: Vec<TagWithConfidence>,
}

/// Validated and normalized tag fields shared by create and update
pub struct TagFields {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

pub fn validate_tag_fields(
    name: &str,
    description: Option<String>,
    color: Option<String>,
) -> Result<TagFields, ApiError> {
    let name = validate::normalize_tag_name(name);
    if !validate::is_valid_tag_name(&name) {
        return Err(ApiError::Validation(
            "tag name must be alphanumeric with dashes, underscores, or spaces (max 100 chars)"
                .to_string(),
        ));
    }
    if let Some(color) = &color
        && !validate::is_valid_color(color)
    {
        return Err(ApiError::Validation(
            "color must match #rrggbb".to_string(),
        ));
    }
    Ok(TagFields {
        name,
        description,
        color,
    })
}
