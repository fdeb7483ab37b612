use serde::{Deserialize, Serialize};

/// Origin of a raw activity (provider-agnostic identifier)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    Calendar,
    Notes,
}

impl ActivitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivitySource::Calendar => "calendar",
            ActivitySource::Notes => "notes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "calendar" => Some(ActivitySource::Calendar),
            "notes" => Some(ActivitySource::Notes),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An atomic observation from a source, preserved verbatim for traceability.
/// Never mutated by the tagger; deleted only by explicit administrative action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawActivity {
    pub id: i64,
    /// Activity date, YYYY-MM-DD
    pub date: String,
    /// Start time, HH:MM; None for date-only events
    pub time: Option<String>,
    pub duration_minutes: i64,
    pub details: String,
    pub source: ActivitySource,
    /// Link back to the source object (event URL, block URL)
    pub source_link: Option<String>,
    /// Opaque provider payload, kept as JSON to avoid schema coupling
    pub source_payload: Option<serde_json::Value>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl RawActivity {
    /// Provider-native event id carried inside the opaque payload, if any
    pub fn source_event_id(&self) -> Option<&str> {
        self.source_payload
            .as_ref()
            .and_then(|v| v.get("id"))
            .and_then(|v| v.as_str())
    }
}

/// A post-aggregation unit carrying tags and presentation-ready fields.
/// Today a thin wrapper over one RawActivity; the model admits grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedActivity {
    pub id: i64,
    pub date: String,
    pub time: Option<String>,
    pub total_duration_minutes: i64,
    pub combined_details: String,
    /// Non-empty list of RawActivity ids this unit was built from
    pub raw_activity_ids: Vec<i64>,
    /// Set of source labels of the referenced raw activities
    pub sources: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_round_trips_through_labels() {
        assert_eq!(ActivitySource::parse("calendar"), Some(ActivitySource::Calendar));
        assert_eq!(ActivitySource::parse("notes"), Some(ActivitySource::Notes));
        assert_eq!(ActivitySource::parse("email"), None);
        assert_eq!(ActivitySource::Calendar.as_str(), "calendar");
    }

    #[test]
    fn source_event_id_reads_payload() {
        let activity = RawActivity {
            id: 1,
            date: "2025-08-01".to_string(),
            time: Some("09:00".to_string()),
            duration_minutes: 60,
            details: "Standup".to_string(),
            source: ActivitySource::Calendar,
            source_link: None,
            source_payload: Some(serde_json::json!({"id": "ev-123"})),
            created_at: None,
            updated_at: None,
        };
        assert_eq!(activity.source_event_id(), Some("ev-123"));
    }
}
