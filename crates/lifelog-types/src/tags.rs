use serde::{Deserialize, Serialize};

/// A curated tag. Names are lowercase, unique, at most 100 chars.
/// usage_count is derived: it always equals the number of activity_tags
/// rows referencing this tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Optional display color, "#rrggbb"
    pub color: Option<String>,
    pub usage_count: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Link between a processed activity and a tag, with per-link confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTag {
    pub processed_activity_id: i64,
    pub tag_id: i64,
    pub confidence: f64,
    pub created_at: Option<String>,
}

/// A tag chosen for an activity before persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAssignment {
    pub name: String,
    pub confidence: f64,
}

impl TagAssignment {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Everything the tagger needs to know about one activity
#[derive(Debug, Clone)]
pub struct TagContext {
    pub activity_text: String,
    pub source: String,
    pub duration_minutes: i64,
    /// HH:MM if the activity has a start time
    pub time_of_day: Option<String>,
    /// The constrained vocabulary the tagger may draw from
    pub taxonomy_tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_clamps_confidence() {
        assert_eq!(TagAssignment::new("work", 1.7).confidence, 1.0);
        assert_eq!(TagAssignment::new("work", -0.2).confidence, 0.0);
        assert_eq!(TagAssignment::new("work", 0.55).confidence, 0.55);
    }
}
