//! Pulls calendar events in a date window and upserts them as raw
//! activities with source=calendar.

use lifelog_providers::calendar::{parse_event_times, window_instants};
use lifelog_providers::CalendarSource;
use lifelog_store::queries::activities;
use lifelog_store::{NewRawActivity, Store};
use lifelog_types::ActivitySource;

use crate::{Error, Result};

const DETAILS_CLIP_CHARS: usize = 1000;

#[derive(Debug, Clone)]
pub enum CalendarProgress {
    CalendarStarted { calendar_id: String },
    PageFetched { calendar_id: String, events: usize },
    CalendarFailed { calendar_id: String, error: String },
    Completed { inserted: usize, updated: usize },
}

#[derive(Debug, Clone, Default)]
pub struct CalendarIngestOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub calendars_failed: usize,
}

pub struct CalendarIngestService<'a> {
    store: &'a Store,
    source: &'a dyn CalendarSource,
}

impl<'a> CalendarIngestService<'a> {
    pub fn new(store: &'a Store, source: &'a dyn CalendarSource) -> Self {
        Self { store, source }
    }

    /// Ingest events for the inclusive [start_date, end_date] window.
    /// Per-event failures are logged and skipped; an HTTP failure aborts
    /// only the current calendar. Re-running the same window updates
    /// rather than duplicates.
    pub async fn ingest_window<F>(
        &self,
        start_date: &str,
        end_date: &str,
        calendar_ids: &[String],
        mut on_progress: F,
    ) -> Result<CalendarIngestOutcome>
    where
        F: FnMut(CalendarProgress),
    {
        let (time_min, time_max) = window_instants(start_date, end_date).ok_or_else(|| {
            Error::InvalidOperation(format!("bad date window {}..{}", start_date, end_date))
        })?;

        let default_ids = vec!["primary".to_string()];
        let calendar_ids: &[String] = if calendar_ids.is_empty() {
            &default_ids
        } else {
            calendar_ids
        };

        let mut outcome = CalendarIngestOutcome::default();

        for calendar_id in calendar_ids {
            on_progress(CalendarProgress::CalendarStarted {
                calendar_id: calendar_id.clone(),
            });

            let mut page_token: Option<String> = None;
            loop {
                let page = match self
                    .source
                    .list_events(calendar_id, &time_min, &time_max, page_token.as_deref())
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        // Abort this calendar, move to the next
                        tracing::error!("calendar '{}' listing failed: {}", calendar_id, e);
                        on_progress(CalendarProgress::CalendarFailed {
                            calendar_id: calendar_id.clone(),
                            error: e.to_string(),
                        });
                        outcome.calendars_failed += 1;
                        break;
                    }
                };

                on_progress(CalendarProgress::PageFetched {
                    calendar_id: calendar_id.clone(),
                    events: page.items.len(),
                });

                for event in &page.items {
                    match self.upsert_event(event) {
                        Ok(true) => outcome.inserted += 1,
                        Ok(false) => outcome.updated += 1,
                        Err(e) => {
                            tracing::warn!("failed to upsert event '{}': {}", event.id, e);
                            outcome.skipped += 1;
                        }
                    }
                }

                page_token = page.next_page_token;
                if page_token.is_none() {
                    break;
                }
            }
        }

        on_progress(CalendarProgress::Completed {
            inserted: outcome.inserted,
            updated: outcome.updated,
        });
        tracing::info!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            skipped = outcome.skipped,
            "calendar ingestion finished"
        );
        Ok(outcome)
    }

    /// Returns Ok(true) when a new row was inserted, Ok(false) on update
    fn upsert_event(
        &self,
        event: &lifelog_providers::calendar::CalendarEvent,
    ) -> Result<bool> {
        let Some(times) = parse_event_times(&event.start, &event.end) else {
            return Err(Error::InvalidOperation(format!(
                "event '{}' has no usable start",
                event.id
            )));
        };

        let payload = serde_json::json!({
            "id": event.id,
            "summary": event.summary,
            "description": event.description,
            "htmlLink": event.html_link,
        });
        let record = NewRawActivity {
            date: times.date.clone(),
            time: times.time.clone(),
            duration_minutes: times.duration_minutes,
            details: lifelog_types::truncate(event.details(), DETAILS_CLIP_CHARS),
            source: ActivitySource::Calendar,
            source_link: event.html_link.clone(),
            source_payload: Some(payload),
        };

        let conn = self.store.conn()?;
        let existing = activities::find_by_source_identity(
            &conn,
            ActivitySource::Calendar,
            Some(&event.id),
            record.source_link.as_deref(),
            &times.date,
            times.time.as_deref(),
        )?;

        match existing {
            Some(id) => {
                activities::update_mutable(&conn, id, &record)?;
                Ok(false)
            }
            None => {
                activities::insert(&conn, &record)?;
                Ok(true)
            }
        }
    }
}
