//! Fills abstracts and embeddings for leaf note blocks

use chrono::{Duration, Utc};
use lifelog_providers::{ChatModel, Embedder};
use lifelog_store::queries::{embeddings, notes};
use lifelog_store::Store;

use crate::abstracts::{embed_or_fallback, generate_abstract, HASH_EMBED_MODEL};
use crate::Result;

/// Which leaves to index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexScope {
    /// Every leaf block
    All,
    /// Leaves edited within the last `hours` (default 24)
    Recent { hours: u32 },
}

impl Default for IndexScope {
    fn default() -> Self {
        IndexScope::Recent { hours: 24 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexOutcome {
    pub processed_blocks: usize,
    pub abstracts_written: usize,
    pub embeddings_written: usize,
    pub skipped: usize,
}

pub struct Indexer<'a> {
    store: &'a Store,
    chat: &'a dyn ChatModel,
    embedder: &'a dyn Embedder,
}

impl<'a> Indexer<'a> {
    pub fn new(store: &'a Store, chat: &'a dyn ChatModel, embedder: &'a dyn Embedder) -> Self {
        Self {
            store,
            chat,
            embedder,
        }
    }

    /// Index leaves in scope. Blocks that already carry both an abstract
    /// and a live embedding are skipped; per-block provider failures fall
    /// back deterministically and never abort the batch.
    pub async fn index(&self, scope: IndexScope) -> Result<IndexOutcome> {
        let conn = self.store.conn()?;
        let leaves = match scope {
            IndexScope::All => notes::leaf_blocks(&conn)?,
            IndexScope::Recent { hours } => {
                let cutoff = (Utc::now() - Duration::hours(hours as i64))
                    .naive_utc()
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string();
                notes::leaf_blocks_edited_since(&conn, &cutoff)?
            }
        };

        let mut outcome = IndexOutcome::default();

        for block in leaves {
            let has_abstract = block
                .abstract_text
                .as_deref()
                .is_some_and(|a| !a.is_empty());
            let has_embedding = embeddings::exists(&conn, &block.block_id, self.embedder.model())?
                || embeddings::exists(&conn, &block.block_id, HASH_EMBED_MODEL)?;

            if has_abstract && has_embedding {
                outcome.skipped += 1;
                continue;
            }

            let abstract_text = if has_abstract {
                block.abstract_text.clone().unwrap_or_default()
            } else {
                let text = generate_abstract(self.chat, &block.text).await;
                if !text.is_empty() {
                    notes::set_abstract(&conn, &block.block_id, &text)?;
                    outcome.abstracts_written += 1;
                }
                text
            };

            if !has_embedding {
                // Embed the abstract; fall back to the raw text when the
                // abstract came out empty
                let document = if abstract_text.is_empty() {
                    block.text.as_str()
                } else {
                    abstract_text.as_str()
                };
                if !document.trim().is_empty() {
                    let (vector, model) = embed_or_fallback(self.embedder, document).await;
                    embeddings::upsert(&conn, &block.block_id, &model, &vector)?;
                    outcome.embeddings_written += 1;
                }
            }

            outcome.processed_blocks += 1;
        }

        tracing::info!(
            processed = outcome.processed_blocks,
            abstracts = outcome.abstracts_written,
            embeddings = outcome.embeddings_written,
            skipped = outcome.skipped,
            "indexing pass finished"
        );
        Ok(outcome)
    }
}
