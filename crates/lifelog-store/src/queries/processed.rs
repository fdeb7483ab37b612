use lifelog_types::{ProcessedActivity, Tag};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::records::{NewProcessedActivity, ProcessedFilter};
use crate::Result;

fn from_row(row: &Row<'_>) -> rusqlite::Result<ProcessedActivity> {
    let ids: String = row.get("raw_activity_ids")?;
    let sources: String = row.get("sources")?;
    Ok(ProcessedActivity {
        id: row.get("id")?,
        date: row.get("date")?,
        time: row.get("time")?,
        total_duration_minutes: row.get("total_duration_minutes")?,
        combined_details: row.get("combined_details")?,
        raw_activity_ids: serde_json::from_str(&ids).unwrap_or_default(),
        sources: serde_json::from_str(&sources).unwrap_or_default(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn insert(conn: &Connection, activity: &NewProcessedActivity) -> Result<i64> {
    let ids = serde_json::to_string(&activity.raw_activity_ids)?;
    let sources = serde_json::to_string(&activity.sources)?;
    conn.execute(
        r#"
        INSERT INTO processed_activities
            (date, time, total_duration_minutes, combined_details, raw_activity_ids, sources)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            &activity.date,
            &activity.time,
            &activity.total_duration_minutes,
            &activity.combined_details,
            &ids,
            &sources,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<ProcessedActivity>> {
    let activity = conn
        .query_row(
            "SELECT * FROM processed_activities WHERE id = ?1",
            [id],
            from_row,
        )
        .optional()?;
    Ok(activity)
}

/// Delete processed activities inside an inclusive window; links cascade.
/// Reprocessing a range starts here.
pub fn delete_in_window(
    conn: &Connection,
    date_start: Option<&str>,
    date_end: Option<&str>,
) -> Result<usize> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(start) = date_start {
        conditions.push("date >= ?");
        params.push(Box::new(start.to_string()));
    }
    if let Some(end) = date_end {
        conditions.push("date <= ?");
        params.push(Box::new(end.to_string()));
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    Ok(conn.execute(
        &format!("DELETE FROM processed_activities {}", where_clause),
        param_refs.as_slice(),
    )?)
}

/// Paginated listing with date and tag-name filters. Returns (page, total).
pub fn list(
    conn: &Connection,
    filter: &ProcessedFilter,
) -> Result<(Vec<ProcessedActivity>, usize)> {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(start) = &filter.date_start {
        conditions.push("pa.date >= ?".to_string());
        params.push(Box::new(start.clone()));
    }
    if let Some(end) = &filter.date_end {
        conditions.push("pa.date <= ?".to_string());
        params.push(Box::new(end.clone()));
    }

    let tag_join = if filter.tags.is_empty() {
        String::new()
    } else {
        let placeholders = vec!["?"; filter.tags.len()].join(",");
        conditions.push(format!("t.name IN ({})", placeholders));
        for tag in &filter.tags {
            params.push(Box::new(tag.clone()));
        }
        r#"
        INNER JOIN activity_tags at ON pa.id = at.processed_activity_id
        INNER JOIN tags t ON at.tag_id = t.id
        "#
        .to_string()
    };

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let total: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(DISTINCT pa.id) FROM processed_activities pa {} {}",
            tag_join, where_clause
        ),
        param_refs.as_slice(),
        |row| row.get(0),
    )?;

    let query = format!(
        r#"
        SELECT DISTINCT pa.* FROM processed_activities pa
        {} {}
        ORDER BY pa.date DESC, pa.time DESC
        LIMIT {} OFFSET {}
        "#,
        tag_join, where_clause, filter.limit, filter.offset
    );
    let mut stmt = conn.prepare(&query)?;
    let activities = stmt
        .query_map(param_refs.as_slice(), from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((activities, total as usize))
}

/// Tags attached to one processed activity with per-link confidence,
/// strongest first
pub fn tags_for(conn: &Connection, processed_activity_id: i64) -> Result<Vec<(Tag, f64)>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT t.id, t.name, t.description, t.color, t.usage_count,
               t.created_at, t.updated_at, at.confidence
        FROM tags t
        INNER JOIN activity_tags at ON t.id = at.tag_id
        WHERE at.processed_activity_id = ?1
        ORDER BY at.confidence DESC, t.name ASC
        "#,
    )?;
    let rows = stmt
        .query_map([processed_activity_id], |row| {
            Ok((
                Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    color: row.get(3)?,
                    usage_count: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                },
                row.get::<_, f64>(7)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM processed_activities", [], |row| row.get(0))?)
}

pub fn date_range(conn: &Connection) -> Result<Option<(String, String)>> {
    let range: (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(date), MAX(date) FROM processed_activities",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(match range {
        (Some(min), Some(max)) => Some((min, max)),
        _ => None,
    })
}
