use async_trait::async_trait;

use crate::calendar::models::EventPage;
use crate::notes::models::{BlockPage, PageMeta, PageSearchPage};
use crate::Result;

/// Paginated read access to a calendar provider. Implementations expand
/// recurring events into single instances ordered by start time.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// One page of events in [time_min, time_max) for a calendar
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
        page_token: Option<&str>,
    ) -> Result<EventPage>;
}

/// Paginated read access to the note workspace
#[async_trait]
pub trait NotesSource: Send + Sync {
    /// One page of workspace page search results
    async fn search_pages(&self, cursor: Option<&str>) -> Result<PageSearchPage>;

    /// Metadata for a single page
    async fn get_page(&self, page_id: &str) -> Result<PageMeta>;

    /// One page of the direct children of a page or block
    async fn list_children(&self, block_id: &str, cursor: Option<&str>) -> Result<BlockPage>;
}

/// Chat-completion request. The caller owns prompt construction; the
/// provider only transports it.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            temperature: 0.3,
            max_tokens: 300,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A chat LLM. Callers must tolerate malformed output; every use site has
/// a deterministic fallback.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// Maps a text to a fixed-dimension vector for a named model
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier recorded next to stored vectors
    fn model(&self) -> &str;
}
