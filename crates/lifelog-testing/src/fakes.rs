//! Scripted collaborators implementing the provider traits

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use lifelog_providers::calendar::models::{CalendarEvent, EventPage};
use lifelog_providers::notes::models::{BlockPage, PageMeta, PageSearchPage};
use lifelog_providers::{
    CalendarSource, ChatModel, ChatRequest, Embedder, Error, NotesSource, Result,
};

fn provider_error(message: &str) -> Error {
    Error::Api {
        status: 500,
        message: message.to_string(),
    }
}

enum ChatBehavior {
    Reply(String),
    Fail(String),
}

/// Chat model double: a fixed reply, a fixed failure, or a script of
/// replies consumed in order (errors after exhaustion).
pub struct FakeChatModel {
    script: Mutex<VecDeque<ChatBehavior>>,
    fallback: Option<ChatBehavior>,
    call_count: AtomicUsize,
}

impl FakeChatModel {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(ChatBehavior::Reply(reply.into())),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(ChatBehavior::Fail(message.into())),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Replies consumed front to back; calls past the end fail
    pub fn scripted(replies: Vec<String>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().map(ChatBehavior::Reply).collect()),
            fallback: None,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for FakeChatModel {
    async fn complete(&self, _request: ChatRequest) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let behavior = script
            .pop_front()
            .or_else(|| match &self.fallback {
                Some(ChatBehavior::Reply(r)) => Some(ChatBehavior::Reply(r.clone())),
                Some(ChatBehavior::Fail(m)) => Some(ChatBehavior::Fail(m.clone())),
                None => None,
            })
            .unwrap_or_else(|| ChatBehavior::Fail("script exhausted".to_string()));
        match behavior {
            ChatBehavior::Reply(reply) => Ok(reply),
            ChatBehavior::Fail(message) => Err(provider_error(&message)),
        }
    }
}

/// Embedding double with a deterministic 32-dimension character-hash
/// vector, or a fixed failure to force the hashing fallback downstream.
pub struct FakeEmbedder {
    model: String,
    fail: bool,
    call_count: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            model: "fake-embed".to_string(),
            fail: false,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            model: "fake-embed".to_string(),
            fail: true,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// The deterministic vector this fake produces for `text`
    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; 32];
        for (i, ch) in text.chars().take(1024).enumerate() {
            vector[(ch as usize + i) % 32] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(provider_error("embedding offline"));
        }
        Ok(Self::vector_for(text))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Calendar double: canned event pages keyed by page token
pub struct FakeCalendarSource {
    pages: Vec<Vec<serde_json::Value>>,
    fail: bool,
}

impl FakeCalendarSource {
    /// One page of events built from JSON values shaped like the
    /// provider's wire format
    pub fn with_events(events: Vec<serde_json::Value>) -> Self {
        Self {
            pages: vec![events],
            fail: false,
        }
    }

    pub fn with_pages(pages: Vec<Vec<serde_json::Value>>) -> Self {
        Self { pages, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            pages: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl CalendarSource for FakeCalendarSource {
    async fn list_events(
        &self,
        _calendar_id: &str,
        _time_min: &str,
        _time_max: &str,
        page_token: Option<&str>,
    ) -> Result<EventPage> {
        if self.fail {
            return Err(provider_error("calendar offline"));
        }
        let index: usize = page_token.map(|t| t.parse().unwrap_or(0)).unwrap_or(0);
        let Some(events) = self.pages.get(index) else {
            return Ok(EventPage::default());
        };
        let items = events
            .iter()
            .map(|v| serde_json::from_value::<CalendarEvent>(v.clone()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| provider_error(&e.to_string()))?;
        let next_page_token = if index + 1 < self.pages.len() {
            Some((index + 1).to_string())
        } else {
            None
        };
        Ok(EventPage {
            items,
            next_page_token,
        })
    }
}

/// Notes double: an in-memory page list and block tree
pub struct FakeNotesSource {
    pages: Vec<serde_json::Value>,
    /// parent id -> children, shaped like the provider's block objects
    children: std::collections::HashMap<String, Vec<serde_json::Value>>,
    list_calls: AtomicUsize,
}

impl FakeNotesSource {
    pub fn new(
        pages: Vec<serde_json::Value>,
        children: std::collections::HashMap<String, Vec<serde_json::Value>>,
    ) -> Self {
        Self {
            pages,
            children,
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotesSource for FakeNotesSource {
    async fn search_pages(&self, cursor: Option<&str>) -> Result<PageSearchPage> {
        // Single page of results; cursor is never set
        if cursor.is_some() {
            return Ok(PageSearchPage::default());
        }
        let results = self
            .pages
            .iter()
            .map(|p| {
                serde_json::from_value(serde_json::json!({
                    "id": p["id"],
                    "object": "page"
                }))
                .map_err(|e: serde_json::Error| provider_error(&e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PageSearchPage {
            results,
            has_more: false,
            next_cursor: None,
        })
    }

    async fn get_page(&self, page_id: &str) -> Result<PageMeta> {
        let page = self
            .pages
            .iter()
            .find(|p| p["id"] == page_id)
            .ok_or_else(|| provider_error(&format!("unknown page {}", page_id)))?;
        serde_json::from_value(page.clone()).map_err(|e| provider_error(&e.to_string()))
    }

    async fn list_children(&self, block_id: &str, _cursor: Option<&str>) -> Result<BlockPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let results = self
            .children
            .get(block_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(|e: serde_json::Error| provider_error(&e.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Ok(BlockPage {
            results,
            has_more: false,
            next_cursor: None,
        })
    }
}
