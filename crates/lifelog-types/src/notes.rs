use serde::{Deserialize, Serialize};

/// A note workspace page, keyed by its provider-native id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotePage {
    pub page_id: String,
    pub title: String,
    pub url: Option<String>,
    /// "YYYY-MM-DD HH:MM:SS", provider-reported
    pub last_edited_at: Option<String>,
}

/// A block in the note tree. parent_block_id is None for top-level blocks;
/// every non-null parent resolves to a block in the same page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteBlock {
    pub block_id: String,
    pub page_id: String,
    pub parent_block_id: Option<String>,
    pub block_type: String,
    /// true iff the block has no children, is text-bearing, and text is non-empty
    pub is_leaf: bool,
    pub text: String,
    /// 30-100 word summary produced by the indexer; None until indexed
    pub abstract_text: Option<String>,
    pub last_edited_at: Option<String>,
}

/// Append-only edit audit row used for "recently edited" queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteBlockEdit {
    pub id: i64,
    pub block_id: String,
    pub edited_at: String,
}

/// One live embedding per (block_id, model)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: i64,
    pub block_id: String,
    pub model: String,
    pub vector: Vec<f32>,
    pub dim: usize,
    pub created_at: Option<String>,
}
