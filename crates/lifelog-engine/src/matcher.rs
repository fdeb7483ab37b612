//! Optional notes/calendar correlation: merge a note-sourced activity into
//! the calendar event it most plausibly describes. Disabled by default;
//! the processor then emits one processed activity per raw activity.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use lifelog_types::{ActivitySource, RawActivity};

const MATCH_THRESHOLD: f64 = 0.3;

/// A group of raw activities treated as one unit downstream
#[derive(Debug, Clone)]
pub struct MatchedActivity {
    pub primary: RawActivity,
    /// Activities folded into the primary (empty when unmatched)
    pub merged: Vec<RawActivity>,
}

impl MatchedActivity {
    pub fn single(primary: RawActivity) -> Self {
        Self {
            primary,
            merged: Vec::new(),
        }
    }

    pub fn raw_ids(&self) -> Vec<i64> {
        let mut ids = vec![self.primary.id];
        ids.extend(self.merged.iter().map(|a| a.id));
        ids
    }

    pub fn sources(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        for activity in std::iter::once(&self.primary).chain(&self.merged) {
            if seen.insert(activity.source) {
                sources.push(activity.source.to_string());
            }
        }
        sources
    }

    pub fn combined_details(&self) -> String {
        let mut details = self.primary.details.clone();
        for activity in &self.merged {
            if !activity.details.is_empty() {
                details.push_str(" | ");
                details.push_str(&activity.details);
            }
        }
        details
    }

    pub fn total_duration_minutes(&self) -> i64 {
        // The calendar event's duration wins; note edits carry none
        self.primary.duration_minutes
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchingStats {
    pub merged_activities: usize,
    pub unmatched_notes: usize,
    pub unmatched_calendar: usize,
}

pub struct ActivityMatcher {
    time_window_minutes: i64,
}

impl Default for ActivityMatcher {
    fn default() -> Self {
        Self {
            time_window_minutes: 120,
        }
    }
}

impl ActivityMatcher {
    pub fn new(time_window_minutes: i64) -> Self {
        Self {
            time_window_minutes,
        }
    }

    /// Pair note activities with their best calendar match by time
    /// proximity and content overlap; everything else passes through
    /// unmerged.
    pub fn match_activities(
        &self,
        activities: Vec<RawActivity>,
    ) -> (Vec<MatchedActivity>, MatchingStats) {
        let (notes, calendar): (Vec<_>, Vec<_>) = activities
            .into_iter()
            .partition(|a| a.source == ActivitySource::Notes);

        if notes.is_empty() || calendar.is_empty() {
            let stats = MatchingStats {
                merged_activities: 0,
                unmatched_notes: notes.len(),
                unmatched_calendar: calendar.len(),
            };
            let all = calendar
                .into_iter()
                .chain(notes)
                .map(MatchedActivity::single)
                .collect();
            return (all, stats);
        }

        let mut matched: Vec<MatchedActivity> = Vec::new();
        let mut unmatched_notes: Vec<RawActivity> = Vec::new();
        let mut remaining_calendar: Vec<RawActivity> = calendar;

        for note in notes {
            let best = remaining_calendar
                .iter()
                .enumerate()
                .filter_map(|(i, event)| {
                    self.match_confidence(&note, event).map(|c| (i, c))
                })
                .max_by(|a, b| a.1.total_cmp(&b.1));

            match best {
                Some((index, confidence)) if confidence > MATCH_THRESHOLD => {
                    let event = remaining_calendar.remove(index);
                    matched.push(MatchedActivity {
                        primary: event,
                        merged: vec![note],
                    });
                }
                _ => unmatched_notes.push(note),
            }
        }

        let stats = MatchingStats {
            merged_activities: matched.len(),
            unmatched_notes: unmatched_notes.len(),
            unmatched_calendar: remaining_calendar.len(),
        };

        let mut result = matched;
        result.extend(remaining_calendar.into_iter().map(MatchedActivity::single));
        result.extend(unmatched_notes.into_iter().map(MatchedActivity::single));
        (result, stats)
    }

    /// Combined confidence: 40% temporal proximity, 60% content overlap.
    /// None when the pair is out of range entirely.
    fn match_confidence(&self, note: &RawActivity, event: &RawActivity) -> Option<f64> {
        if event.time.is_none() || !dates_adjacent(&note.date, &event.date) {
            return None;
        }
        let time_confidence = self.time_confidence(note, event);
        let content_confidence = content_similarity(&note.details, &event.details);
        Some(time_confidence * 0.4 + content_confidence * 0.6)
    }

    fn time_confidence(&self, note: &RawActivity, event: &RawActivity) -> f64 {
        let Some(note_time) = &note.time else {
            // Same-day note without a time gets moderate credit
            return if note.date == event.date { 0.5 } else { 0.0 };
        };
        let Some(event_time) = &event.time else {
            return 0.0;
        };
        let parse = |date: &str, time: &str| {
            NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M").ok()
        };
        let (Some(note_dt), Some(event_dt)) =
            (parse(&note.date, note_time), parse(&event.date, event_time))
        else {
            return 0.0;
        };
        let diff = (note_dt - event_dt).num_minutes().abs();
        match diff {
            0..=15 => 1.0,
            16..=60 => 0.8,
            61..=90 => 0.6,
            d if d <= self.time_window_minutes => 0.4,
            _ => 0.1,
        }
    }
}

fn dates_adjacent(a: &str, b: &str) -> bool {
    let parse = |s: &str| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => (a - b).num_days().abs() <= 1,
        _ => false,
    }
}

/// Jaccard overlap of content words, boosted by partial containment
fn content_similarity(a: &str, b: &str) -> f64 {
    let words = |s: &str| -> HashSet<String> {
        s.to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .map(str::to_string)
            .collect()
    };
    let a_words = words(a);
    let b_words = words(b);
    if a_words.is_empty() || b_words.is_empty() {
        return 0.3;
    }

    let intersection = a_words.intersection(&b_words).count();
    let union = a_words.union(&b_words).count();
    let jaccard = intersection as f64 / union as f64;

    let partial = a_words
        .iter()
        .filter(|aw| b_words.iter().any(|bw| aw.contains(bw.as_str()) || bw.contains(aw.as_str())))
        .count() as f64
        / a_words.len().max(b_words.len()) as f64;

    jaccard.max(partial * 0.7).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: i64, source: ActivitySource, date: &str, time: Option<&str>, details: &str) -> RawActivity {
        RawActivity {
            id,
            date: date.to_string(),
            time: time.map(String::from),
            duration_minutes: if source == ActivitySource::Calendar { 60 } else { 0 },
            details: details.to_string(),
            source,
            source_link: None,
            source_payload: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn close_note_merges_into_calendar_event() {
        let matcher = ActivityMatcher::default();
        let activities = vec![
            raw(1, ActivitySource::Calendar, "2025-08-01", Some("09:00"), "Standup meeting notes review"),
            raw(2, ActivitySource::Notes, "2025-08-01", Some("09:10"), "standup meeting follow-ups"),
        ];
        let (matched, stats) = matcher.match_activities(activities);
        assert_eq!(stats.merged_activities, 1);

        let group = &matched[0];
        assert_eq!(group.primary.id, 1);
        assert_eq!(group.raw_ids(), vec![1, 2]);
        assert_eq!(group.sources(), vec!["calendar", "notes"]);
        assert!(group.combined_details().contains(" | "));
    }

    #[test]
    fn distant_note_stays_unmatched() {
        let matcher = ActivityMatcher::default();
        let activities = vec![
            raw(1, ActivitySource::Calendar, "2025-08-01", Some("09:00"), "Quarterly planning"),
            raw(2, ActivitySource::Notes, "2025-08-05", Some("21:00"), "grocery list"),
        ];
        let (matched, stats) = matcher.match_activities(activities);
        assert_eq!(stats.merged_activities, 0);
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|m| m.merged.is_empty()));
    }

    #[test]
    fn single_source_passes_through() {
        let matcher = ActivityMatcher::default();
        let activities = vec![raw(1, ActivitySource::Calendar, "2025-08-01", Some("09:00"), "x")];
        let (matched, stats) = matcher.match_activities(activities);
        assert_eq!(matched.len(), 1);
        assert_eq!(stats.unmatched_calendar, 1);
    }
}
