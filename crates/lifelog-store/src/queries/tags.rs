use lifelog_types::Tag;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::records::{NewTag, TagSort, TagUsageContext};
use crate::Result;

fn from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        color: row.get("color")?,
        usage_count: row.get("usage_count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Insert a new tag. The caller normalizes the name first; a duplicate
/// name surfaces as a uniqueness violation.
pub fn create(conn: &Connection, tag: &NewTag) -> Result<i64> {
    conn.execute(
        "INSERT INTO tags (name, description, color) VALUES (?1, ?2, ?3)",
        params![&tag.name, &tag.description, &tag.color],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get-or-create by name. Concurrent creators race on the uniqueness
/// constraint; the loser adopts the existing row.
pub fn get_or_create(conn: &Connection, name: &str, description: &str) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO tags (name, description) VALUES (?1, ?2)",
        params![name, description],
    )?;
    let id: i64 = conn.query_row("SELECT id FROM tags WHERE name = ?1", [name], |row| {
        row.get(0)
    })?;
    Ok(id)
}

pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Tag>> {
    let tag = conn
        .query_row("SELECT * FROM tags WHERE id = ?1", [id], from_row)
        .optional()?;
    Ok(tag)
}

pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Tag>> {
    let tag = conn
        .query_row("SELECT * FROM tags WHERE name = ?1", [name], from_row)
        .optional()?;
    Ok(tag)
}

pub fn list(conn: &Connection, sort: TagSort, limit: usize, offset: usize) -> Result<(Vec<Tag>, usize)> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;

    let order = match sort {
        TagSort::Name => "name ASC",
        TagSort::UsageCount => "usage_count DESC, name ASC",
        TagSort::CreatedAt => "created_at DESC, name ASC",
    };
    let query = format!(
        "SELECT * FROM tags ORDER BY {} LIMIT {} OFFSET {}",
        order, limit, offset
    );
    let mut stmt = conn.prepare(&query)?;
    let tags = stmt
        .query_map([], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((tags, total as usize))
}

pub fn update(
    conn: &Connection,
    id: i64,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE tags SET name = ?1, description = ?2, color = ?3 WHERE id = ?4",
        params![name, description, color, id],
    )?)
}

/// Delete a tag; its activity links cascade
pub fn delete(conn: &Connection, id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM tags WHERE id = ?1", [id])?)
}

/// Link a processed activity to a tag. Duplicate links on the same
/// activity are ignored, preserving the first confidence written.
pub fn link_activity(
    conn: &Connection,
    processed_activity_id: i64,
    tag_id: i64,
    confidence: f64,
) -> Result<usize> {
    Ok(conn.execute(
        r#"
        INSERT OR IGNORE INTO activity_tags (processed_activity_id, tag_id, confidence)
        VALUES (?1, ?2, ?3)
        "#,
        params![processed_activity_id, tag_id, confidence],
    )?)
}

/// Re-derive usage_count from the links table. The insert/delete triggers
/// keep the counter live; bulk tag_id rewrites go through here afterwards.
pub fn recompute_usage(conn: &Connection, tag_id: i64) -> Result<()> {
    conn.execute(
        r#"
        UPDATE tags
        SET usage_count = (SELECT COUNT(*) FROM activity_tags WHERE tag_id = ?1)
        WHERE id = ?1
        "#,
        [tag_id],
    )?;
    Ok(())
}

/// Tags with usage counts and a few sample activity texts, optionally
/// restricted to activities inside a date window. Cleanup analysis input.
pub fn usage_contexts(
    conn: &Connection,
    date_start: Option<&str>,
    date_end: Option<&str>,
    samples_per_tag: usize,
) -> Result<Vec<TagUsageContext>> {
    let scoped = date_start.is_some() || date_end.is_some();
    let mut conditions: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(start) = date_start {
        conditions.push("pa.date >= ?");
        params.push(Box::new(start.to_string()));
    }
    if let Some(end) = date_end {
        conditions.push("pa.date <= ?");
        params.push(Box::new(end.to_string()));
    }

    let query = if scoped {
        format!(
            r#"
            SELECT t.name,
                   COUNT(at.id) AS usage_in_scope,
                   GROUP_CONCAT(pa.combined_details, ' | ') AS samples
            FROM tags t
            JOIN activity_tags at ON t.id = at.tag_id
            JOIN processed_activities pa ON at.processed_activity_id = pa.id
            WHERE {}
            GROUP BY t.id, t.name
            ORDER BY usage_in_scope DESC
            "#,
            conditions.join(" AND ")
        )
    } else {
        r#"
        SELECT t.name,
               t.usage_count AS usage_in_scope,
               GROUP_CONCAT(pa.combined_details, ' | ') AS samples
        FROM tags t
        LEFT JOIN activity_tags at ON t.id = at.tag_id
        LEFT JOIN processed_activities pa ON at.processed_activity_id = pa.id
        WHERE t.usage_count > 0
        GROUP BY t.id, t.name, t.usage_count
        ORDER BY t.usage_count DESC
        "#
        .to_string()
    };

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            let name: String = row.get(0)?;
            let usage: i64 = row.get(1)?;
            let samples: Option<String> = row.get(2)?;
            Ok((name, usage, samples))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .map(|(name, usage_count, samples)| {
            let sample_activities = samples
                .unwrap_or_default()
                .split(" | ")
                .filter(|s| !s.trim().is_empty())
                .take(samples_per_tag)
                .map(|s| lifelog_types::truncate(s.trim(), 50))
                .collect();
            TagUsageContext {
                name,
                usage_count,
                sample_activities,
            }
        })
        .collect())
}

/// Remove links for the named tags, limited to processed activities inside
/// the date window. Tags themselves are untouched.
pub fn remove_links_in_range(
    conn: &Connection,
    tag_names: &[String],
    date_start: Option<&str>,
    date_end: Option<&str>,
) -> Result<usize> {
    if tag_names.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; tag_names.len()].join(",");
    let mut conditions = vec![format!("t.name IN ({})", placeholders)];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = tag_names
        .iter()
        .map(|n| Box::new(n.clone()) as Box<dyn rusqlite::ToSql>)
        .collect();
    if let Some(start) = date_start {
        conditions.push("pa.date >= ?".to_string());
        params.push(Box::new(start.to_string()));
    }
    if let Some(end) = date_end {
        conditions.push("pa.date <= ?".to_string());
        params.push(Box::new(end.to_string()));
    }

    let query = format!(
        r#"
        DELETE FROM activity_tags
        WHERE id IN (
            SELECT at.id FROM activity_tags at
            JOIN tags t ON at.tag_id = t.id
            JOIN processed_activities pa ON at.processed_activity_id = pa.id
            WHERE {}
        )
        "#,
        conditions.join(" AND ")
    );
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    Ok(conn.execute(&query, param_refs.as_slice())?)
}

pub fn delete_links_for_tag(conn: &Connection, tag_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM activity_tags WHERE tag_id = ?1", [tag_id])?)
}

/// Rewrite links from `source_id` to `target_id`, skipping activities that
/// already carry the target (no duplicate links per activity). Optionally
/// limited to activities inside a date window. Returns rewritten count.
pub fn merge_links(
    conn: &Connection,
    source_id: i64,
    target_id: i64,
    date_start: Option<&str>,
    date_end: Option<&str>,
) -> Result<usize> {
    let mut range_clause = String::from("1=1");
    let mut params: Vec<Box<dyn rusqlite::ToSql>> =
        vec![Box::new(target_id), Box::new(source_id)];
    match (date_start, date_end) {
        (Some(start), Some(end)) => {
            range_clause = "pa.date BETWEEN ? AND ?".to_string();
            params.push(Box::new(start.to_string()));
            params.push(Box::new(end.to_string()));
        }
        (Some(start), None) => {
            range_clause = "pa.date >= ?".to_string();
            params.push(Box::new(start.to_string()));
        }
        (None, Some(end)) => {
            range_clause = "pa.date <= ?".to_string();
            params.push(Box::new(end.to_string()));
        }
        (None, None) => {}
    }
    params.push(Box::new(target_id));

    let query = format!(
        r#"
        UPDATE activity_tags
        SET tag_id = ?1
        WHERE tag_id = ?2
          AND processed_activity_id IN (
              SELECT pa.id FROM processed_activities pa WHERE {}
          )
          AND NOT EXISTS (
              SELECT 1 FROM activity_tags at2
              WHERE at2.processed_activity_id = activity_tags.processed_activity_id
                AND at2.tag_id = ?{}
          )
        "#,
        range_clause,
        params.len()
    );
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    Ok(conn.execute(&query, param_refs.as_slice())?)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::processed;
    use crate::records::NewProcessedActivity;
    use crate::Store;

    fn activity(conn: &Connection, date: &str) -> i64 {
        processed::insert(
            conn,
            &NewProcessedActivity {
                date: date.to_string(),
                time: None,
                total_duration_minutes: 30,
                combined_details: "details".to_string(),
                raw_activity_ids: vec![1],
                sources: vec!["calendar".to_string()],
            },
        )
        .unwrap()
    }

    #[test]
    fn get_or_create_reuses_existing_row() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let a = get_or_create(&conn, "work", "").unwrap();
        let b = get_or_create(&conn, "work", "ignored").unwrap();
        assert_eq!(a, b);
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn link_is_unique_per_activity() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let pa = activity(&conn, "2025-08-01");
        let tag = get_or_create(&conn, "work", "").unwrap();

        assert_eq!(link_activity(&conn, pa, tag, 0.9).unwrap(), 1);
        assert_eq!(link_activity(&conn, pa, tag, 0.4).unwrap(), 0);

        let t = get_by_id(&conn, tag).unwrap().unwrap();
        assert_eq!(t.usage_count, 1);
    }

    #[test]
    fn merge_does_not_create_duplicates() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let pa1 = activity(&conn, "2025-08-01");
        let pa2 = activity(&conn, "2025-08-01");
        let meetings = get_or_create(&conn, "meetings", "").unwrap();
        let meeting = get_or_create(&conn, "meeting", "").unwrap();

        // pa1 carries both; pa2 carries only the source
        link_activity(&conn, pa1, meetings, 0.8).unwrap();
        link_activity(&conn, pa1, meeting, 0.9).unwrap();
        link_activity(&conn, pa2, meetings, 0.7).unwrap();

        let moved = merge_links(&conn, meetings, meeting, None, None).unwrap();
        assert_eq!(moved, 1); // only pa2's link moves

        // pa1's stale source link remains for the caller to delete
        delete_links_for_tag(&conn, meetings).unwrap();
        recompute_usage(&conn, meeting).unwrap();
        recompute_usage(&conn, meetings).unwrap();

        let target = get_by_id(&conn, meeting).unwrap().unwrap();
        assert_eq!(target.usage_count, 2);
        let source = get_by_id(&conn, meetings).unwrap().unwrap();
        assert_eq!(source.usage_count, 0);
    }

    #[test]
    fn usage_contexts_scopes_by_date() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        let in_range = activity(&conn, "2025-08-01");
        let out_of_range = activity(&conn, "2025-09-15");
        let tag = get_or_create(&conn, "work", "").unwrap();
        link_activity(&conn, in_range, tag, 0.9).unwrap();
        link_activity(&conn, out_of_range, tag, 0.9).unwrap();

        let all = usage_contexts(&conn, None, None, 5).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].usage_count, 2);

        let scoped = usage_contexts(&conn, Some("2025-08-01"), Some("2025-08-31"), 5).unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].usage_count, 1);
    }
}
