//! Aggregations behind the insights endpoints. All heavy lifting happens
//! in SQL on indexed columns; callers only reshape rows.

use rusqlite::Connection;

use crate::Result;

/// How to bucket the time series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Day,
    Week,
    Month,
}

impl GroupBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(GroupBy::Day),
            "week" => Some(GroupBy::Week),
            "month" => Some(GroupBy::Month),
            _ => None,
        }
    }

    fn bucket_expr(&self) -> &'static str {
        match self {
            GroupBy::Day => "pa.date",
            GroupBy::Week => "strftime('%Y-W%W', pa.date)",
            GroupBy::Month => "strftime('%Y-%m', pa.date)",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Overview {
    pub total_minutes: i64,
    pub activity_count: i64,
    /// tag name -> minutes, descending by minutes
    pub tag_minutes: Vec<(String, i64)>,
}

/// Minutes spent per bucket per tag
#[derive(Debug, Clone)]
pub struct BucketRow {
    pub bucket: String,
    pub tag: String,
    pub minutes: i64,
}

/// Total minutes per bucket (independent of tagging)
#[derive(Debug, Clone)]
pub struct BucketTotal {
    pub bucket: String,
    pub minutes: i64,
}

fn window_clause(
    date_start: Option<&str>,
    date_end: Option<&str>,
    params: &mut Vec<Box<dyn rusqlite::ToSql>>,
) -> String {
    let mut conditions: Vec<&str> = Vec::new();
    if let Some(start) = date_start {
        conditions.push("pa.date >= ?");
        params.push(Box::new(start.to_string()));
    }
    if let Some(end) = date_end {
        conditions.push("pa.date <= ?");
        params.push(Box::new(end.to_string()));
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

pub fn overview(
    conn: &Connection,
    date_start: Option<&str>,
    date_end: Option<&str>,
) -> Result<Overview> {
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    let where_clause = window_clause(date_start, date_end, &mut params);
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let (total_minutes, activity_count): (i64, i64) = conn.query_row(
        &format!(
            "SELECT COALESCE(SUM(pa.total_duration_minutes), 0), COUNT(*) FROM processed_activities pa {}",
            where_clause
        ),
        param_refs.as_slice(),
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    // An activity's full duration counts toward each of its tags
    let query = format!(
        r#"
        SELECT t.name, COALESCE(SUM(pa.total_duration_minutes), 0) AS minutes
        FROM processed_activities pa
        JOIN activity_tags at ON pa.id = at.processed_activity_id
        JOIN tags t ON at.tag_id = t.id
        {}
        GROUP BY t.id, t.name
        ORDER BY minutes DESC, t.name ASC
        "#,
        where_clause
    );
    let mut stmt = conn.prepare(&query)?;
    let tag_minutes = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Overview {
        total_minutes,
        activity_count,
        tag_minutes,
    })
}

pub fn bucket_totals(
    conn: &Connection,
    date_start: Option<&str>,
    date_end: Option<&str>,
    group_by: GroupBy,
) -> Result<Vec<BucketTotal>> {
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    let where_clause = window_clause(date_start, date_end, &mut params);
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let query = format!(
        r#"
        SELECT {} AS bucket, COALESCE(SUM(pa.total_duration_minutes), 0) AS minutes
        FROM processed_activities pa
        {}
        GROUP BY bucket
        ORDER BY bucket ASC
        "#,
        group_by.bucket_expr(),
        where_clause
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(BucketTotal {
                bucket: row.get(0)?,
                minutes: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn bucket_tag_breakdown(
    conn: &Connection,
    date_start: Option<&str>,
    date_end: Option<&str>,
    group_by: GroupBy,
) -> Result<Vec<BucketRow>> {
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    let where_clause = window_clause(date_start, date_end, &mut params);
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let query = format!(
        r#"
        SELECT {} AS bucket, t.name, COALESCE(SUM(pa.total_duration_minutes), 0) AS minutes
        FROM processed_activities pa
        JOIN activity_tags at ON pa.id = at.processed_activity_id
        JOIN tags t ON at.tag_id = t.id
        {}
        GROUP BY bucket, t.id, t.name
        ORDER BY bucket ASC, minutes DESC
        "#,
        group_by.bucket_expr(),
        where_clause
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(BucketRow {
                bucket: row.get(0)?,
                tag: row.get(1)?,
                minutes: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{processed, tags};
    use crate::records::NewProcessedActivity;
    use crate::Store;

    fn seed(conn: &Connection, date: &str, minutes: i64, tag_names: &[&str]) {
        let id = processed::insert(
            conn,
            &NewProcessedActivity {
                date: date.to_string(),
                time: None,
                total_duration_minutes: minutes,
                combined_details: String::new(),
                raw_activity_ids: vec![1],
                sources: vec!["calendar".to_string()],
            },
        )
        .unwrap();
        for name in tag_names {
            let tag = tags::get_or_create(conn, name, "").unwrap();
            tags::link_activity(conn, id, tag, 0.8).unwrap();
        }
    }

    #[test]
    fn overview_sums_per_tag_and_overall() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        seed(&conn, "2025-08-01", 60, &["work"]);
        seed(&conn, "2025-08-01", 30, &["work", "meeting"]);
        seed(&conn, "2025-08-02", 90, &["health"]);

        let o = overview(&conn, None, None).unwrap();
        assert_eq!(o.total_minutes, 180);
        assert_eq!(o.activity_count, 3);
        assert_eq!(
            o.tag_minutes,
            vec![
                ("health".to_string(), 90),
                ("work".to_string(), 90),
                ("meeting".to_string(), 30),
            ]
        );
    }

    #[test]
    fn daily_buckets_are_sorted_and_complete() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        seed(&conn, "2025-08-02", 30, &["work"]);
        seed(&conn, "2025-08-01", 60, &["work"]);

        let totals = bucket_totals(&conn, None, None, GroupBy::Day).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].bucket, "2025-08-01");
        assert_eq!(totals[0].minutes, 60);

        let breakdown = bucket_tag_breakdown(&conn, None, None, GroupBy::Month).unwrap();
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].bucket, "2025-08");
        assert_eq!(breakdown[0].minutes, 90);
    }
}
