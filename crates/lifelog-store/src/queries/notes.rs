use lifelog_types::{NoteBlock, NotePage};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::records::{NewNoteBlock, NewNotePage};
use crate::Result;

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<NotePage> {
    Ok(NotePage {
        page_id: row.get("page_id")?,
        title: row.get("title")?,
        url: row.get("url")?,
        last_edited_at: row.get("last_edited_at")?,
    })
}

fn block_from_row(row: &Row<'_>) -> rusqlite::Result<NoteBlock> {
    Ok(NoteBlock {
        block_id: row.get("block_id")?,
        page_id: row.get("page_id")?,
        parent_block_id: row.get("parent_block_id")?,
        block_type: row.get("block_type")?,
        is_leaf: row.get::<_, i64>("is_leaf")? != 0,
        text: row.get("text")?,
        abstract_text: row.get("abstract")?,
        last_edited_at: row.get("last_edited_at")?,
    })
}

pub fn upsert_page(conn: &Connection, page: &NewNotePage) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO note_pages (page_id, title, url, last_edited_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(page_id) DO UPDATE SET
            title = ?2,
            url = COALESCE(?3, url),
            last_edited_at = COALESCE(?4, last_edited_at)
        "#,
        params![&page.page_id, &page.title, &page.url, &page.last_edited_at],
    )?;
    Ok(())
}

/// Upsert a block from traversal. The abstract column is never touched
/// here; only the indexer writes it.
pub fn upsert_block(conn: &Connection, block: &NewNoteBlock) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO note_blocks (block_id, page_id, parent_block_id, block_type, is_leaf, text, last_edited_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(block_id) DO UPDATE SET
            page_id = ?2,
            parent_block_id = ?3,
            block_type = ?4,
            is_leaf = ?5,
            text = ?6,
            last_edited_at = COALESCE(?7, last_edited_at)
        "#,
        params![
            &block.block_id,
            &block.page_id,
            &block.parent_block_id,
            &block.block_type,
            block.is_leaf as i64,
            &block.text,
            &block.last_edited_at,
        ],
    )?;
    Ok(())
}

/// Append-only edit audit; feeds "recently edited" queries
pub fn record_edit(conn: &Connection, block_id: &str, edited_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO note_block_edits (block_id, edited_at) VALUES (?1, ?2)",
        params![block_id, edited_at],
    )?;
    Ok(())
}

pub fn set_abstract(conn: &Connection, block_id: &str, abstract_text: &str) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE note_blocks SET abstract = ?1 WHERE block_id = ?2",
        params![abstract_text, block_id],
    )?)
}

pub fn get_block(conn: &Connection, block_id: &str) -> Result<Option<NoteBlock>> {
    let block = conn
        .query_row(
            "SELECT * FROM note_blocks WHERE block_id = ?1",
            [block_id],
            block_from_row,
        )
        .optional()?;
    Ok(block)
}

pub fn get_page(conn: &Connection, page_id: &str) -> Result<Option<NotePage>> {
    let page = conn
        .query_row(
            "SELECT * FROM note_pages WHERE page_id = ?1",
            [page_id],
            page_from_row,
        )
        .optional()?;
    Ok(page)
}

pub fn leaf_blocks(conn: &Connection) -> Result<Vec<NoteBlock>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM note_blocks WHERE is_leaf = 1 ORDER BY last_edited_at DESC, block_id",
    )?;
    let blocks = stmt
        .query_map([], block_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(blocks)
}

/// Leaves edited at or after the cutoff ("YYYY-MM-DD HH:MM:SS").
/// Consults the edit audit as well as the block's own timestamp, so a
/// block re-edited after ingestion is still picked up.
pub fn leaf_blocks_edited_since(conn: &Connection, cutoff: &str) -> Result<Vec<NoteBlock>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT DISTINCT b.* FROM note_blocks b
        LEFT JOIN note_block_edits e ON e.block_id = b.block_id
        WHERE b.is_leaf = 1
          AND ((b.last_edited_at IS NOT NULL AND b.last_edited_at >= ?1)
               OR e.edited_at >= ?1)
        ORDER BY b.last_edited_at DESC, b.block_id
        "#,
    )?;
    let blocks = stmt
        .query_map([cutoff], block_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(blocks)
}

/// Leaves edited inside an inclusive timestamp window
pub fn leaf_blocks_edited_between(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<Vec<NoteBlock>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT * FROM note_blocks
        WHERE is_leaf = 1 AND last_edited_at IS NOT NULL
          AND last_edited_at >= ?1 AND last_edited_at <= ?2
        ORDER BY last_edited_at DESC, block_id
        "#,
    )?;
    let blocks = stmt
        .query_map(params![start, end], block_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(blocks)
}

pub fn count_children(conn: &Connection, block_id: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM note_blocks WHERE parent_block_id = ?1",
        [block_id],
        |row| row.get(0),
    )?)
}

/// Most recently edited abstracts (falling back to text) for taxonomy building
pub fn sample_abstracts(conn: &Connection, limit: usize) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT COALESCE(abstract, text) FROM note_blocks
        WHERE is_leaf = 1 AND (abstract IS NOT NULL OR text != '')
        ORDER BY last_edited_at DESC
        LIMIT ?1
        "#,
    )?;
    let texts = stmt
        .query_map([limit as i64], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(texts)
}

pub fn count_pages(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM note_pages", [], |row| row.get(0))?)
}

pub fn count_blocks(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM note_blocks", [], |row| row.get(0))?)
}

pub fn last_page_edit(conn: &Connection) -> Result<Option<String>> {
    Ok(conn.query_row(
        "SELECT MAX(last_edited_at) FROM note_pages",
        [],
        |row| row.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    fn block(block_id: &str, parent: Option<&str>, text: &str, edited: &str) -> NewNoteBlock {
        NewNoteBlock {
            block_id: block_id.to_string(),
            page_id: "page-1".to_string(),
            parent_block_id: parent.map(String::from),
            block_type: "paragraph".to_string(),
            is_leaf: parent.is_some(),
            text: text.to_string(),
            last_edited_at: Some(edited.to_string()),
        }
    }

    #[test]
    fn upsert_block_preserves_abstract() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();

        upsert_block(&conn, &block("b1", None, "hello", "2025-08-01 09:00:00")).unwrap();
        set_abstract(&conn, "b1", "an abstract").unwrap();

        // Re-traversal updates text but must not clear the abstract
        upsert_block(&conn, &block("b1", None, "hello edited", "2025-08-01 10:00:00")).unwrap();
        let b = get_block(&conn, "b1").unwrap().unwrap();
        assert_eq!(b.text, "hello edited");
        assert_eq!(b.abstract_text.as_deref(), Some("an abstract"));
    }

    #[test]
    fn upsert_block_does_not_duplicate() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        upsert_block(&conn, &block("b1", None, "a", "2025-08-01 09:00:00")).unwrap();
        upsert_block(&conn, &block("b1", None, "b", "2025-08-01 10:00:00")).unwrap();
        assert_eq!(count_blocks(&conn).unwrap(), 1);
    }

    #[test]
    fn edited_window_queries_filter_leaves() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.conn().unwrap();
        upsert_block(&conn, &block("parent", None, "", "2025-08-01 08:00:00")).unwrap();
        upsert_block(&conn, &block("early", Some("parent"), "early", "2025-08-01 08:30:00")).unwrap();
        upsert_block(&conn, &block("late", Some("parent"), "late", "2025-08-02 09:00:00")).unwrap();

        let since = leaf_blocks_edited_since(&conn, "2025-08-02 00:00:00").unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].block_id, "late");

        let between =
            leaf_blocks_edited_between(&conn, "2025-08-01 00:00:00", "2025-08-01 23:59:59").unwrap();
        assert_eq!(between.len(), 1);
        assert_eq!(between[0].block_id, "early");
    }
}
