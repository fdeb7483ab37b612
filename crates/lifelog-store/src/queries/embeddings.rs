use lifelog_types::EmbeddingRecord;
use rusqlite::{params, Connection, OptionalExtension};

use crate::Result;

/// One live embedding per (block_id, model); re-embedding replaces the row
pub fn upsert(conn: &Connection, block_id: &str, model: &str, vector: &[f32]) -> Result<()> {
    let encoded = serde_json::to_string(vector)?;
    conn.execute(
        r#"
        INSERT INTO embeddings (block_id, model, vector, dim)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(block_id, model) DO UPDATE SET
            vector = ?3,
            dim = ?4,
            created_at = CURRENT_TIMESTAMP
        "#,
        params![block_id, model, &encoded, vector.len() as i64],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, block_id: &str, model: &str) -> Result<Option<EmbeddingRecord>> {
    let record = conn
        .query_row(
            "SELECT id, block_id, model, vector, dim, created_at FROM embeddings WHERE block_id = ?1 AND model = ?2",
            params![block_id, model],
            |row| {
                let encoded: String = row.get(3)?;
                Ok(EmbeddingRecord {
                    id: row.get(0)?,
                    block_id: row.get(1)?,
                    model: row.get(2)?,
                    vector: serde_json::from_str(&encoded).unwrap_or_default(),
                    dim: row.get::<_, i64>(4)? as usize,
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

pub fn exists(conn: &Connection, block_id: &str, model: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM embeddings WHERE block_id = ?1 AND model = ?2",
        params![block_id, model],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn upsert_replaces_vector_for_same_model() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();

        upsert(&conn, "b1", "hash-v1", &[1.0, 0.0]).unwrap();
        upsert(&conn, "b1", "hash-v1", &[0.0, 1.0]).unwrap();
        upsert(&conn, "b1", "other-model", &[0.5, 0.5, 0.5]).unwrap();

        assert_eq!(count(&conn).unwrap(), 2);
        let record = get(&conn, "b1", "hash-v1").unwrap().unwrap();
        assert_eq!(record.vector, vec![0.0, 1.0]);
        assert_eq!(record.dim, 2);

        let other = get(&conn, "b1", "other-model").unwrap().unwrap();
        assert_eq!(other.dim, 3);
    }
}
