pub mod models;
pub mod parser;

pub use self::models::{CalendarEvent, EventPage, EventTime};
pub use self::parser::{parse_event_times, window_instants, EventTimes};

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::traits::CalendarSource;
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Google-Calendar-shaped events API client. Reads an already-issued
/// access token from a file maintained by the external auth collaborator;
/// no credentials are persisted here.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GoogleCalendarClient {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: access_token.into(),
        })
    }

    /// Read the access token from the path the auth collaborator writes
    pub fn from_token_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Auth(format!("cannot read {}: {}", path.display(), e)))?;
        // Token files are either the bare token or {"access_token": "..."}
        let token = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => value
                .get("access_token")
                .and_then(|t| t.as_str())
                .map(str::to_string)
                .ok_or_else(|| Error::Auth("token file has no access_token field".to_string()))?,
            Err(_) => raw.trim().to_string(),
        };
        Self::new(token)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
        page_token: Option<&str>,
    ) -> Result<EventPage> {
        let url = format!("{}/calendars/{}/events", self.base_url, calendar_id);
        let mut query: Vec<(&str, &str)> = vec![
            ("timeMin", time_min),
            ("timeMax", time_max),
            ("singleEvents", "true"),
            ("orderBy", "startTime"),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("calendar provider rejected the token".to_string()));
        }
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let page = response
            .json::<EventPage>()
            .await
            .map_err(|e| Error::Decode(format!("event page: {}", e)))?;
        Ok(page)
    }
}
