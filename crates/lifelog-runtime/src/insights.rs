//! Read models behind the insights and system endpoints. The store does
//! the aggregation in SQL; this layer only reshapes rows.

use std::collections::BTreeMap;

use lifelog_store::queries::{activities, embeddings, insights, notes, processed, tags};
use lifelog_store::Store;
use lifelog_types::ActivitySource;
use serde::Serialize;

pub use lifelog_store::queries::insights::GroupBy;

use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct TopActivity {
    pub tag: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewInsights {
    pub total_tracked_hours: f64,
    pub activity_count: i64,
    pub unique_tags: usize,
    pub tag_time_distribution: BTreeMap<String, i64>,
    pub tag_percentages: BTreeMap<String, f64>,
    pub top_5_activities: Vec<TopActivity>,
    pub date_range: DateRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub total_minutes: i64,
    pub tag_breakdown: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeDistributionSummary {
    pub total_period_hours: f64,
    pub average_daily_hours: f64,
    pub most_productive_day: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeDistribution {
    pub time_series: Vec<TimeSeriesPoint>,
    pub summary: TimeDistributionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub raw_activities: i64,
    pub processed_activities: i64,
    pub tags: i64,
    pub note_pages: i64,
    pub note_blocks: i64,
    pub embeddings: i64,
    pub raw_date_range: DateRange,
    pub processed_date_range: DateRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceImportStatus {
    pub source: String,
    pub activity_count: i64,
    pub last_updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportStatus {
    pub sources: Vec<SourceImportStatus>,
    pub note_pages: i64,
    pub note_blocks: i64,
    pub last_page_edit: Option<String>,
}

fn hours(minutes: i64) -> f64 {
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}

pub fn overview(
    store: &Store,
    date_start: Option<&str>,
    date_end: Option<&str>,
) -> Result<OverviewInsights> {
    let conn = store.conn()?;
    let raw = insights::overview(&conn, date_start, date_end)?;

    let tag_time_distribution: BTreeMap<String, i64> = raw.tag_minutes.iter().cloned().collect();
    let tag_percentages: BTreeMap<String, f64> = if raw.total_minutes > 0 {
        raw.tag_minutes
            .iter()
            .map(|(tag, minutes)| {
                let percent =
                    (*minutes as f64 / raw.total_minutes as f64 * 1000.0).round() / 10.0;
                (tag.clone(), percent)
            })
            .collect()
    } else {
        BTreeMap::new()
    };
    let top_5_activities = raw
        .tag_minutes
        .iter()
        .take(5)
        .map(|(tag, minutes)| TopActivity {
            tag: tag.clone(),
            hours: hours(*minutes),
        })
        .collect();

    Ok(OverviewInsights {
        total_tracked_hours: hours(raw.total_minutes),
        activity_count: raw.activity_count,
        unique_tags: raw.tag_minutes.len(),
        tag_time_distribution,
        tag_percentages,
        top_5_activities,
        date_range: DateRange {
            start: date_start.map(String::from),
            end: date_end.map(String::from),
        },
    })
}

pub fn time_distribution(
    store: &Store,
    date_start: Option<&str>,
    date_end: Option<&str>,
    group_by: GroupBy,
) -> Result<TimeDistribution> {
    let conn = store.conn()?;
    let totals = insights::bucket_totals(&conn, date_start, date_end, group_by)?;
    let breakdown = insights::bucket_tag_breakdown(&conn, date_start, date_end, group_by)?;

    let mut by_bucket: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    for row in breakdown {
        by_bucket
            .entry(row.bucket)
            .or_default()
            .insert(row.tag, row.minutes);
    }

    let mut time_series = Vec::with_capacity(totals.len());
    let mut total_minutes = 0i64;
    let mut most_productive: Option<(String, i64)> = None;
    for total in &totals {
        total_minutes += total.minutes;
        if most_productive
            .as_ref()
            .is_none_or(|(_, best)| total.minutes > *best)
        {
            most_productive = Some((total.bucket.clone(), total.minutes));
        }
        time_series.push(TimeSeriesPoint {
            date: total.bucket.clone(),
            total_minutes: total.minutes,
            tag_breakdown: by_bucket.remove(&total.bucket).unwrap_or_default(),
        });
    }

    let average_daily_minutes = if totals.is_empty() {
        0
    } else {
        total_minutes / totals.len() as i64
    };
    let most_productive_day = most_productive
        .map(|(bucket, _)| bucket)
        .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());

    Ok(TimeDistribution {
        time_series,
        summary: TimeDistributionSummary {
            total_period_hours: hours(total_minutes),
            average_daily_hours: hours(average_daily_minutes),
            most_productive_day,
        },
    })
}

pub fn system_stats(store: &Store) -> Result<SystemStats> {
    let conn = store.conn()?;
    let raw_range = activities::date_range(&conn)?;
    let processed_range = processed::date_range(&conn)?;
    Ok(SystemStats {
        raw_activities: activities::count(&conn)?,
        processed_activities: processed::count(&conn)?,
        tags: tags::count(&conn)?,
        note_pages: notes::count_pages(&conn)?,
        note_blocks: notes::count_blocks(&conn)?,
        embeddings: embeddings::count(&conn)?,
        raw_date_range: DateRange {
            start: raw_range.as_ref().map(|r| r.0.clone()),
            end: raw_range.as_ref().map(|r| r.1.clone()),
        },
        processed_date_range: DateRange {
            start: processed_range.as_ref().map(|r| r.0.clone()),
            end: processed_range.as_ref().map(|r| r.1.clone()),
        },
    })
}

pub fn import_status(store: &Store) -> Result<ImportStatus> {
    let conn = store.conn()?;
    let mut sources = Vec::new();
    for source in [ActivitySource::Calendar, ActivitySource::Notes] {
        sources.push(SourceImportStatus {
            source: source.to_string(),
            activity_count: activities::count_for_source(&conn, source)?,
            last_updated_at: activities::last_updated_for_source(&conn, source)?,
        });
    }
    Ok(ImportStatus {
        sources,
        note_pages: notes::count_pages(&conn)?,
        note_blocks: notes::count_blocks(&conn)?,
        last_page_edit: notes::last_page_edit(&conn)?,
    })
}
