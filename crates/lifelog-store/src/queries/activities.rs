use lifelog_types::{ActivitySource, RawActivity};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::records::{ActivityFilter, NewRawActivity};
use crate::Result;

fn from_row(row: &Row<'_>) -> rusqlite::Result<RawActivity> {
    let source: String = row.get("source")?;
    let payload: Option<String> = row.get("source_payload")?;
    Ok(RawActivity {
        id: row.get("id")?,
        date: row.get("date")?,
        time: row.get("time")?,
        duration_minutes: row.get("duration_minutes")?,
        details: row.get("details")?,
        source: ActivitySource::parse(&source).unwrap_or(ActivitySource::Calendar),
        source_link: row.get("source_link")?,
        source_payload: payload.and_then(|p| serde_json::from_str(&p).ok()),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn insert(conn: &Connection, activity: &NewRawActivity) -> Result<i64> {
    let payload = activity
        .source_payload
        .as_ref()
        .map(|p| p.to_string());
    conn.execute(
        r#"
        INSERT INTO raw_activities (date, time, duration_minutes, details, source, source_link, source_payload)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            &activity.date,
            &activity.time,
            &activity.duration_minutes,
            &activity.details,
            activity.source.as_str(),
            &activity.source_link,
            &payload,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Locate an already-ingested event by provider event id or source link
/// within the same (date, time) slot. This is the idempotence key for
/// calendar ingestion.
pub fn find_by_source_identity(
    conn: &Connection,
    source: ActivitySource,
    event_id: Option<&str>,
    source_link: Option<&str>,
    date: &str,
    time: Option<&str>,
) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            r#"
            SELECT id FROM raw_activities
            WHERE source = ?1
              AND (json_extract(source_payload, '$.id') = ?2 OR source_link = ?3)
              AND date = ?4
              AND (time IS ?5 OR time = ?5)
            LIMIT 1
            "#,
            params![source.as_str(), &event_id, &source_link, date, &time],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Refresh the mutable fields of an already-ingested activity
pub fn update_mutable(conn: &Connection, id: i64, activity: &NewRawActivity) -> Result<usize> {
    let payload = activity
        .source_payload
        .as_ref()
        .map(|p| p.to_string());
    Ok(conn.execute(
        r#"
        UPDATE raw_activities
        SET duration_minutes = ?1, details = ?2, source_link = ?3, source_payload = ?4
        WHERE id = ?5
        "#,
        params![
            &activity.duration_minutes,
            &activity.details,
            &activity.source_link,
            &payload,
            id
        ],
    )?)
}

pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<RawActivity>> {
    let activity = conn
        .query_row("SELECT * FROM raw_activities WHERE id = ?1", [id], from_row)
        .optional()?;
    Ok(activity)
}

/// Paginated listing with optional source and date filters.
/// Returns (page, total_count).
pub fn list(conn: &Connection, filter: &ActivityFilter) -> Result<(Vec<RawActivity>, usize)> {
    let mut where_clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(source) = filter.source {
        where_clauses.push("source = ?");
        params.push(Box::new(source.as_str().to_string()));
    }
    if let Some(start) = &filter.date_start {
        where_clauses.push("date >= ?");
        params.push(Box::new(start.clone()));
    }
    if let Some(end) = &filter.date_end {
        where_clauses.push("date <= ?");
        params.push(Box::new(end.clone()));
    }

    let where_clause = if where_clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_clauses.join(" AND "))
    };

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM raw_activities {}", where_clause),
        param_refs.as_slice(),
        |row| row.get(0),
    )?;

    let query = format!(
        r#"
        SELECT * FROM raw_activities {}
        ORDER BY date DESC, time DESC
        LIMIT {} OFFSET {}
        "#,
        where_clause, filter.limit, filter.offset
    );
    let mut stmt = conn.prepare(&query)?;
    let activities = stmt
        .query_map(param_refs.as_slice(), from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((activities, total as usize))
}

/// All activities in an inclusive window, in store order (date, time).
/// Open bounds when None; the processor's scope query.
pub fn list_in_window(
    conn: &Connection,
    date_start: Option<&str>,
    date_end: Option<&str>,
) -> Result<Vec<RawActivity>> {
    let mut where_clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(start) = date_start {
        where_clauses.push("date >= ?");
        params.push(Box::new(start.to_string()));
    }
    if let Some(end) = date_end {
        where_clauses.push("date <= ?");
        params.push(Box::new(end.to_string()));
    }
    let where_clause = if where_clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_clauses.join(" AND "))
    };

    let query = format!(
        "SELECT * FROM raw_activities {} ORDER BY date ASC, time ASC, id ASC",
        where_clause
    );
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let activities = stmt
        .query_map(param_refs.as_slice(), from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(activities)
}

/// Recent event/abstract texts for taxonomy building
pub fn sample_texts(
    conn: &Connection,
    source: ActivitySource,
    date_start: Option<&str>,
    date_end: Option<&str>,
    limit: usize,
) -> Result<Vec<String>> {
    let mut where_clauses = vec!["source = ?".to_string()];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> =
        vec![Box::new(source.as_str().to_string())];
    if let Some(start) = date_start {
        where_clauses.push("date >= ?".to_string());
        params.push(Box::new(start.to_string()));
    }
    if let Some(end) = date_end {
        where_clauses.push("date <= ?".to_string());
        params.push(Box::new(end.to_string()));
    }
    let query = format!(
        r#"
        SELECT details FROM raw_activities
        WHERE {}
        ORDER BY date DESC, time DESC
        LIMIT {}
        "#,
        where_clauses.join(" AND "),
        limit
    );
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let texts = stmt
        .query_map(param_refs.as_slice(), |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(texts)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM raw_activities", [], |row| row.get(0))?)
}

/// (min_date, max_date) over all raw activities, None when empty
pub fn date_range(conn: &Connection) -> Result<Option<(String, String)>> {
    let range: (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(date), MAX(date) FROM raw_activities",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(match range {
        (Some(min), Some(max)) => Some((min, max)),
        _ => None,
    })
}

/// Last ingestion touch per source, for import status reporting
pub fn last_updated_for_source(
    conn: &Connection,
    source: ActivitySource,
) -> Result<Option<String>> {
    let updated: Option<String> = conn.query_row(
        "SELECT MAX(updated_at) FROM raw_activities WHERE source = ?1",
        [source.as_str()],
        |row| row.get(0),
    )?;
    Ok(updated)
}

pub fn count_for_source(conn: &Connection, source: ActivitySource) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM raw_activities WHERE source = ?1",
        [source.as_str()],
        |row| row.get(0),
    )?)
}
