//! Schema DDL, split into versioned migrations. Every statement is
//! idempotent (IF NOT EXISTS) so a migration can be re-run safely after a
//! partial failure.

/// Base tables: activities, tags, links, schema bookkeeping
pub const V1_BASE: &str = r#"
CREATE TABLE IF NOT EXISTS raw_activities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    time TEXT,
    duration_minutes INTEGER NOT NULL DEFAULT 0,
    details TEXT NOT NULL DEFAULT '',
    source TEXT NOT NULL,
    source_link TEXT,
    source_payload TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS processed_activities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    time TEXT,
    total_duration_minutes INTEGER NOT NULL DEFAULT 0,
    combined_details TEXT NOT NULL DEFAULT '',
    raw_activity_ids TEXT NOT NULL,
    sources TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    color TEXT,
    usage_count INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS activity_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    processed_activity_id INTEGER NOT NULL
        REFERENCES processed_activities(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL
        REFERENCES tags(id) ON DELETE CASCADE,
    confidence REAL NOT NULL DEFAULT 0.5,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(processed_activity_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_raw_activities_date ON raw_activities(date);
CREATE INDEX IF NOT EXISTS idx_raw_activities_source ON raw_activities(source);
CREATE INDEX IF NOT EXISTS idx_raw_activities_source_date ON raw_activities(source, date);
CREATE INDEX IF NOT EXISTS idx_processed_activities_date ON processed_activities(date);
CREATE INDEX IF NOT EXISTS idx_activity_tags_activity ON activity_tags(processed_activity_id);
CREATE INDEX IF NOT EXISTS idx_activity_tags_tag ON activity_tags(tag_id);
"#;

/// Note workspace tables: pages, block tree, edit audit, embeddings
pub const V2_NOTES: &str = r#"
CREATE TABLE IF NOT EXISTS note_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL DEFAULT '',
    url TEXT,
    last_edited_at DATETIME,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS note_blocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    block_id TEXT NOT NULL UNIQUE,
    page_id TEXT NOT NULL,
    parent_block_id TEXT,
    block_type TEXT NOT NULL DEFAULT '',
    is_leaf INTEGER NOT NULL DEFAULT 0,
    text TEXT NOT NULL DEFAULT '',
    abstract TEXT,
    last_edited_at DATETIME,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS note_block_edits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    block_id TEXT NOT NULL,
    edited_at DATETIME NOT NULL
);

CREATE TABLE IF NOT EXISTS embeddings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    block_id TEXT NOT NULL,
    model TEXT NOT NULL DEFAULT '',
    vector TEXT NOT NULL,
    dim INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(block_id, model)
);

CREATE INDEX IF NOT EXISTS idx_note_blocks_page ON note_blocks(page_id);
CREATE INDEX IF NOT EXISTS idx_note_blocks_parent ON note_blocks(parent_block_id);
CREATE INDEX IF NOT EXISTS idx_note_blocks_edited ON note_blocks(last_edited_at);
CREATE INDEX IF NOT EXISTS idx_note_blocks_leaf ON note_blocks(is_leaf);
CREATE INDEX IF NOT EXISTS idx_note_block_edits_block ON note_block_edits(block_id);
"#;

/// Derived-column maintenance. usage_count follows activity_tags
/// insert/delete; bulk tag_id rewrites (merges) recompute counts
/// explicitly instead.
pub const V3_TRIGGERS: &str = r#"
CREATE TRIGGER IF NOT EXISTS trg_activity_tags_insert
AFTER INSERT ON activity_tags
BEGIN
    UPDATE tags
    SET usage_count = usage_count + 1,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = NEW.tag_id;
END;

CREATE TRIGGER IF NOT EXISTS trg_activity_tags_delete
AFTER DELETE ON activity_tags
BEGIN
    UPDATE tags
    SET usage_count = MAX(usage_count - 1, 0),
        updated_at = CURRENT_TIMESTAMP
    WHERE id = OLD.tag_id;
END;

CREATE TRIGGER IF NOT EXISTS trg_raw_activities_touch
AFTER UPDATE ON raw_activities
BEGIN
    UPDATE raw_activities SET updated_at = CURRENT_TIMESTAMP WHERE id = NEW.id;
END;

CREATE TRIGGER IF NOT EXISTS trg_processed_activities_touch
AFTER UPDATE ON processed_activities
BEGIN
    UPDATE processed_activities SET updated_at = CURRENT_TIMESTAMP WHERE id = NEW.id;
END;

CREATE TRIGGER IF NOT EXISTS trg_tags_touch
AFTER UPDATE OF name, description, color ON tags
BEGIN
    UPDATE tags SET updated_at = CURRENT_TIMESTAMP WHERE id = NEW.id;
END;
"#;
