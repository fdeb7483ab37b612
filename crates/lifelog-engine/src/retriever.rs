//! Calendar-as-query retrieval: rank leaf blocks by cosine similarity to
//! a query text within an edited-time window.

use chrono::{Duration, NaiveDate, Utc};
use lifelog_providers::Embedder;
use lifelog_store::queries::{embeddings, notes};
use lifelog_store::Store;
use lifelog_types::NoteBlock;

use crate::abstracts::embed_or_fallback;
use crate::text::{clean_text, cosine};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub block: NoteBlock,
    pub score: f32,
}

pub struct Retriever<'a> {
    store: &'a Store,
    embedder: &'a dyn Embedder,
}

impl<'a> Retriever<'a> {
    pub fn new(store: &'a Store, embedder: &'a dyn Embedder) -> Self {
        Self { store, embedder }
    }

    /// Top-K leaf blocks edited within the last `hours`, ranked by cosine
    /// similarity to the query
    pub async fn retrieve(&self, query: &str, hours: u32, k: usize) -> Result<Vec<RetrievedContext>> {
        if clean_text(query).is_empty() {
            return Ok(Vec::new());
        }
        let cutoff = (Utc::now() - Duration::hours(hours as i64))
            .naive_utc()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let conn = self.store.conn()?;
        let candidates = notes::leaf_blocks_edited_since(&conn, &cutoff)?;
        drop(conn);
        self.rank(query, candidates, k).await
    }

    /// Top-K leaf blocks edited in [date - days_window, date + days_window]
    pub async fn retrieve_by_date(
        &self,
        query: &str,
        date: &str,
        days_window: u32,
        k: usize,
    ) -> Result<Vec<RetrievedContext>> {
        if clean_text(query).is_empty() {
            return Ok(Vec::new());
        }
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| Error::Invalid(format!("bad date: {}", date)))?;
        let start = format!("{} 00:00:00", day - Duration::days(days_window as i64));
        let end = format!("{} 23:59:59", day + Duration::days(days_window as i64));

        let conn = self.store.conn()?;
        let candidates = notes::leaf_blocks_edited_between(&conn, &start, &end)?;
        drop(conn);
        self.rank(query, candidates, k).await
    }

    async fn rank(
        &self,
        query: &str,
        candidates: Vec<NoteBlock>,
        k: usize,
    ) -> Result<Vec<RetrievedContext>> {
        // The query embeds with the same model family as the documents;
        // comparisons never cross model boundaries
        let (query_vec, query_model) = embed_or_fallback(self.embedder, query).await;

        let conn = self.store.conn()?;
        let mut results = Vec::new();
        for block in candidates {
            // Candidates without a live embedding are excluded, never imputed
            let Some(record) = embeddings::get(&conn, &block.block_id, &query_model)? else {
                continue;
            };
            let score = cosine(&query_vec, &record.vector);
            results.push(RetrievedContext { block, score });
        }

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.block.last_edited_at.cmp(&a.block.last_edited_at))
                .then_with(|| a.block.block_id.cmp(&b.block.block_id))
        });
        results.truncate(k);
        Ok(results)
    }
}
