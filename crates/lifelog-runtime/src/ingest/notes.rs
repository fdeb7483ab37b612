//! Traverses the note workspace page tree and upserts pages, blocks, and
//! edit timestamps. Traversal is iterative over an explicit stack; page
//! depth is unbounded in principle and recursion would not be.

use std::time::Duration;

use lifelog_providers::notes::{is_text_bearing, normalize_edited_time, BlockData};
use lifelog_providers::NotesSource;
use lifelog_store::queries::notes as note_queries;
use lifelog_store::{NewNoteBlock, NewNotePage, Store};

use crate::Result;

const DEFAULT_BATCH_SIZE: usize = 8;
const INTER_REQUEST_DELAY: Duration = Duration::from_millis(100);
const BATCH_DELAY: Duration = Duration::from_millis(500);
const MAX_FETCH_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub enum NoteProgress {
    DiscoveryProgress { pages_found: usize },
    BatchStarted { batch_index: usize, pages: usize },
    PageDone { page_id: String, blocks: usize },
    PageFailed { page_id: String, error: String },
    Completed { pages: usize, blocks: usize },
}

#[derive(Debug, Clone, Default)]
pub struct NoteIngestOutcome {
    pub pages_processed: usize,
    pub pages_failed: usize,
    pub blocks_processed: usize,
}

pub struct NoteIngestService<'a> {
    store: &'a Store,
    source: &'a dyn NotesSource,
    batch_size: usize,
}

/// One container whose children still need fetching
struct Frame {
    container_id: String,
    page_id: String,
    /// None when the container is the page itself
    parent_block_id: Option<String>,
}

impl<'a> NoteIngestService<'a> {
    pub fn new(store: &'a Store, source: &'a dyn NotesSource) -> Self {
        Self {
            store,
            source,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Ingest pages from an explicit seed list, or discover the whole
    /// workspace when none is given. Batched to bound memory and respect
    /// provider rate limits; per-page failures are logged and skipped.
    pub async fn ingest<F>(
        &self,
        seed_page_ids: Option<Vec<String>>,
        max_pages: Option<usize>,
        mut on_progress: F,
    ) -> Result<NoteIngestOutcome>
    where
        F: FnMut(NoteProgress),
    {
        let page_ids = match seed_page_ids {
            Some(ids) => ids,
            None => self.discover_pages(max_pages, &mut on_progress).await?,
        };

        let mut outcome = NoteIngestOutcome::default();

        for (batch_index, batch) in page_ids.chunks(self.batch_size).enumerate() {
            on_progress(NoteProgress::BatchStarted {
                batch_index,
                pages: batch.len(),
            });

            for page_id in batch {
                match self.ingest_page(page_id).await {
                    Ok(blocks) => {
                        outcome.pages_processed += 1;
                        outcome.blocks_processed += blocks;
                        on_progress(NoteProgress::PageDone {
                            page_id: page_id.clone(),
                            blocks,
                        });
                    }
                    Err(e) => {
                        tracing::error!("page '{}' ingestion failed: {}", page_id, e);
                        outcome.pages_failed += 1;
                        on_progress(NoteProgress::PageFailed {
                            page_id: page_id.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            tokio::time::sleep(BATCH_DELAY).await;
        }

        on_progress(NoteProgress::Completed {
            pages: outcome.pages_processed,
            blocks: outcome.blocks_processed,
        });
        tracing::info!(
            pages = outcome.pages_processed,
            blocks = outcome.blocks_processed,
            failed = outcome.pages_failed,
            "note ingestion finished"
        );
        Ok(outcome)
    }

    async fn discover_pages<F>(
        &self,
        max_pages: Option<usize>,
        on_progress: &mut F,
    ) -> Result<Vec<String>>
    where
        F: FnMut(NoteProgress),
    {
        let mut page_ids = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.source.search_pages(cursor.as_deref()).await?;
            for result in page.results {
                if result.object == "page" {
                    page_ids.push(result.id);
                    if let Some(max) = max_pages
                        && page_ids.len() >= max
                    {
                        return Ok(page_ids);
                    }
                }
            }
            if page_ids.len() % 50 == 0 && !page_ids.is_empty() {
                on_progress(NoteProgress::DiscoveryProgress {
                    pages_found: page_ids.len(),
                });
            }
            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
            tokio::time::sleep(INTER_REQUEST_DELAY).await;
        }
        Ok(page_ids)
    }

    /// Upsert one page and every block under it. Returns the block count.
    async fn ingest_page(&self, page_id: &str) -> Result<usize> {
        let page = self.source.get_page(page_id).await?;
        {
            let conn = self.store.conn()?;
            note_queries::upsert_page(
                &conn,
                &NewNotePage {
                    page_id: page.id.clone(),
                    title: page.title(),
                    url: page.url.clone(),
                    last_edited_at: page.last_edited_time.as_deref().map(normalize_edited_time),
                },
            )?;
        }

        // Depth-first over an explicit stack; children are only fetched
        // for containers that report has_children
        let mut total_blocks = 0;
        let mut stack = vec![Frame {
            container_id: page_id.to_string(),
            page_id: page_id.to_string(),
            parent_block_id: None,
        }];

        while let Some(frame) = stack.pop() {
            let mut cursor: Option<String> = None;
            loop {
                let children = self
                    .fetch_children_with_retry(&frame.container_id, cursor.as_deref())
                    .await?;

                for block in &children.results {
                    self.upsert_block(block, &frame)?;
                    total_blocks += 1;
                    if block.has_children {
                        stack.push(Frame {
                            container_id: block.id.clone(),
                            page_id: frame.page_id.clone(),
                            parent_block_id: Some(block.id.clone()),
                        });
                    }
                }

                if !children.has_more {
                    break;
                }
                cursor = children.next_cursor;
                tokio::time::sleep(INTER_REQUEST_DELAY).await;
            }
            tokio::time::sleep(INTER_REQUEST_DELAY).await;
        }

        Ok(total_blocks)
    }

    async fn fetch_children_with_retry(
        &self,
        container_id: &str,
        cursor: Option<&str>,
    ) -> Result<lifelog_providers::notes::BlockPage> {
        let mut attempt = 0;
        loop {
            match self.source.list_children(container_id, cursor).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt + 1 < MAX_FETCH_RETRIES => {
                    let backoff = Duration::from_secs(1 << attempt);
                    tracing::warn!(
                        "child fetch for '{}' failed (attempt {}): {}; retrying in {:?}",
                        container_id,
                        attempt + 1,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn upsert_block(&self, block: &BlockData, frame: &Frame) -> Result<()> {
        let text = block.plain_text();
        let is_leaf = !block.has_children && is_text_bearing(&block.block_type) && !text.is_empty();
        let last_edited = block
            .last_edited_time
            .as_deref()
            .map(normalize_edited_time);

        let conn = self.store.conn()?;
        note_queries::upsert_block(
            &conn,
            &NewNoteBlock {
                block_id: block.id.clone(),
                page_id: frame.page_id.clone(),
                parent_block_id: frame.parent_block_id.clone(),
                block_type: block.block_type.clone(),
                is_leaf,
                text,
                last_edited_at: last_edited.clone(),
            },
        )?;
        if let Some(edited_at) = last_edited {
            note_queries::record_edit(&conn, &block.id, &edited_at)?;
        }
        Ok(())
    }
}
