use serde::Deserialize;

/// Start or end of a calendar event: either a date-only value or a
/// timezone-qualified instant, never both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventTime {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "dateTime")]
    pub date_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "htmlLink")]
    pub html_link: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
}

impl CalendarEvent {
    /// Display text for the event: summary, else description, else empty
    pub fn details(&self) -> &str {
        self.summary
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or_default()
    }
}

/// One page of the provider's event listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPage {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
    #[serde(default, rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}
