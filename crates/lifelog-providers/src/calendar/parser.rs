//! Event time parsing: date-only events collapse to (date, no time, zero
//! duration); timed events keep HH:MM and a floor-of-minutes duration.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::calendar::models::EventTime;

/// Parsed (date, time, duration_minutes) triple for one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTimes {
    pub date: String,
    pub time: Option<String>,
    pub duration_minutes: i64,
}

/// Convert an inclusive [start_date, end_date] day window into half-open
/// RFC 3339 instants at UTC midnight and end-of-day.
pub fn window_instants(start_date: &str, end_date: &str) -> Option<(String, String)> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(end_date, "%Y-%m-%d").ok()?;
    let time_min = Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0)?);
    let time_max = Utc.from_utc_datetime(&end.and_hms_opt(23, 59, 59)?);
    Some((
        time_min.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        time_max.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    ))
}

/// Parse a provider event's start/end pair. Returns None when the start is
/// absent or unparseable; the caller skips such events.
pub fn parse_event_times(start: &EventTime, end: &EventTime) -> Option<EventTimes> {
    if let Some(date) = &start.date {
        // Date-only event: no start time; the duration covers the spanned
        // days (the end date is exclusive, so a one-day event ends on the
        // following date)
        let start_day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let duration_minutes = end
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|end_day| (end_day - start_day).num_days().max(0) * 24 * 60)
            .unwrap_or(0);
        return Some(EventTimes {
            date: date.clone(),
            time: None,
            duration_minutes,
        });
    }

    let start_raw = start.date_time.as_deref()?;
    let start_dt = parse_instant(start_raw)?;
    let end_dt = end
        .date_time
        .as_deref()
        .and_then(parse_instant)
        .unwrap_or(start_dt);

    let duration = (end_dt - start_dt).max(Duration::zero());
    Some(EventTimes {
        date: start_dt.format("%Y-%m-%d").to_string(),
        time: Some(start_dt.format("%H:%M").to_string()),
        duration_minutes: duration.num_minutes(),
    })
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(raw: &str) -> EventTime {
        EventTime {
            date: None,
            date_time: Some(raw.to_string()),
        }
    }

    fn date_only(raw: &str) -> EventTime {
        EventTime {
            date: Some(raw.to_string()),
            date_time: None,
        }
    }

    #[test]
    fn timed_event_gets_floor_minutes() {
        let times = parse_event_times(
            &timed("2025-08-01T09:00:00Z"),
            &timed("2025-08-01T10:00:30Z"),
        )
        .unwrap();
        assert_eq!(times.date, "2025-08-01");
        assert_eq!(times.time.as_deref(), Some("09:00"));
        assert_eq!(times.duration_minutes, 60);
    }

    #[test]
    fn date_only_event_spans_whole_days_without_a_time() {
        let times = parse_event_times(&date_only("2025-08-02"), &date_only("2025-08-03")).unwrap();
        assert_eq!(times.date, "2025-08-02");
        assert_eq!(times.time, None);
        assert_eq!(times.duration_minutes, 1440);
    }

    #[test]
    fn date_only_event_without_end_has_zero_duration() {
        let times = parse_event_times(&date_only("2025-08-02"), &EventTime::default()).unwrap();
        assert_eq!(times.duration_minutes, 0);
    }

    #[test]
    fn end_before_start_clamps_to_zero() {
        let times = parse_event_times(
            &timed("2025-08-01T10:00:00Z"),
            &timed("2025-08-01T09:00:00Z"),
        )
        .unwrap();
        assert_eq!(times.duration_minutes, 0);
    }

    #[test]
    fn offset_instants_convert_to_utc() {
        let times = parse_event_times(
            &timed("2025-08-01T09:00:00+02:00"),
            &timed("2025-08-01T10:30:00+02:00"),
        )
        .unwrap();
        assert_eq!(times.time.as_deref(), Some("07:00"));
        assert_eq!(times.duration_minutes, 90);
    }

    #[test]
    fn missing_start_is_skipped() {
        assert!(parse_event_times(&EventTime::default(), &EventTime::default()).is_none());
    }

    #[test]
    fn window_spans_full_days() {
        let (min, max) = window_instants("2025-08-01", "2025-08-02").unwrap();
        assert_eq!(min, "2025-08-01T00:00:00Z");
        assert_eq!(max, "2025-08-02T23:59:59Z");
    }
}
