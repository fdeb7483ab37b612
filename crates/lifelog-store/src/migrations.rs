use rusqlite::Connection;

use crate::schema;
use crate::{Error, Result};

/// A forward schema migration. Down migrations are optional and rolling
/// back past version 1 is forbidden.
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up_sql: &'static str,
    pub down_sql: Option<&'static str>,
}

pub fn builtin_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "base tables: raw/processed activities, tags, links",
            up_sql: schema::V1_BASE,
            down_sql: None,
        },
        Migration {
            version: 2,
            description: "note workspace tables and embeddings",
            up_sql: schema::V2_NOTES,
            down_sql: None,
        },
        Migration {
            version: 3,
            description: "usage_count and updated_at triggers",
            up_sql: schema::V3_TRIGGERS,
            down_sql: None,
        },
    ]
}

/// Current schema version: MAX(version) over recorded migrations, 0 when
/// the bookkeeping table does not exist yet.
pub fn current_version(conn: &Connection) -> Result<i64> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_versions'",
        [],
        |row| row.get::<_, i64>(0).map(|n| n > 0),
    )?;
    if !exists {
        return Ok(0);
    }
    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_versions", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

/// Apply all pending migrations in ascending order, one transaction per
/// migration, recording each in schema_versions on success.
pub fn migrate_up(conn: &mut Connection) -> Result<i64> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_versions (
            version INTEGER PRIMARY KEY,
            description TEXT,
            applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )?;

    let current = current_version(conn)?;
    let mut applied = current;

    let mut migrations = builtin_migrations();
    migrations.sort_by_key(|m| m.version);

    for migration in migrations.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.up_sql).map_err(|e| {
            Error::Schema(format!(
                "migration {} ({}) failed: {}",
                migration.version, migration.description, e
            ))
        })?;
        tx.execute(
            "INSERT INTO schema_versions (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
        tx.commit()?;
        tracing::info!(version = migration.version, "applied migration: {}", migration.description);
        applied = migration.version;
    }

    Ok(applied)
}

/// Roll back to `target_version`, newest first, using down migrations
/// where they exist. Rolling back past version 1 is refused.
pub fn migrate_down(conn: &mut Connection, target_version: i64) -> Result<i64> {
    if target_version < 1 {
        return Err(Error::Schema(
            "cannot roll back past schema version 1".to_string(),
        ));
    }
    let current = current_version(conn)?;

    let mut migrations = builtin_migrations();
    migrations.sort_by_key(|m| std::cmp::Reverse(m.version));

    for migration in migrations
        .iter()
        .filter(|m| m.version <= current && m.version > target_version)
    {
        let Some(down_sql) = migration.down_sql else {
            return Err(Error::Schema(format!(
                "migration {} has no down migration",
                migration.version
            )));
        };
        let tx = conn.transaction()?;
        tx.execute_batch(down_sql)?;
        tx.execute(
            "DELETE FROM schema_versions WHERE version = ?1",
            [migration.version],
        )?;
        tx.commit()?;
    }

    current_version(conn)
}
