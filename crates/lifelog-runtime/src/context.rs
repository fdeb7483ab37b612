//! Composition root: one ServiceContext built at startup owns the store,
//! the collaborators, and the job tracker. Explicit handles everywhere;
//! no global singletons.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use lifelog_providers::{
    CalendarSource, ChatModel, ChatRequest, Embedder, GoogleCalendarClient, NotesSource,
    NotionClient, OpenAiChatClient, OpenAiEmbedder,
};
use lifelog_store::Store;

use crate::config::Config;
use crate::jobs::JobTracker;
use crate::processor::Processor;
use crate::tagging_log::TaggingLogger;
use crate::Result;

/// Stands in when no chat credentials are configured; every call fails so
/// the deterministic fallbacks run.
struct OfflineChatModel;

#[async_trait]
impl ChatModel for OfflineChatModel {
    async fn complete(&self, _request: ChatRequest) -> lifelog_providers::Result<String> {
        Err(lifelog_providers::Error::Auth(
            "no chat model configured".to_string(),
        ))
    }
}

/// Stands in when no embedding credentials are configured; the hashing
/// fallback takes over downstream.
struct OfflineEmbedder {
    model: String,
}

#[async_trait]
impl Embedder for OfflineEmbedder {
    async fn embed(&self, _text: &str) -> lifelog_providers::Result<Vec<f32>> {
        Err(lifelog_providers::Error::Auth(
            "no embedding model configured".to_string(),
        ))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Application-wide service handles, created once during startup
pub struct ServiceContext {
    pub config: Config,
    pub store: Store,
    pub chat: Arc<dyn ChatModel>,
    pub embedder: Arc<dyn Embedder>,
    pub calendar: Option<Arc<dyn CalendarSource>>,
    pub notes: Option<Arc<dyn NotesSource>>,
    pub jobs: JobTracker,
    pub resources_dir: PathBuf,
}

impl ServiceContext {
    /// Build real collaborators from configuration. A missing database is
    /// fatal; missing provider credentials degrade to offline stand-ins
    /// (chat/embedding) or absent sources (calendar/notes).
    pub fn initialize(config: Config) -> Result<Self> {
        let db_path = config.database_path()?;
        let store = Store::open(&db_path, config.pool_size)?;
        let resources_dir = config.resources_dir()?;

        let chat: Arc<dyn ChatModel> = match &config.providers.llm_api_key {
            Some(key) => Arc::new(OpenAiChatClient::new(key.clone(), config.providers.llm_model.clone())?),
            None => {
                tracing::warn!("no llm_api_key configured; tagging falls back to heuristics");
                Arc::new(OfflineChatModel)
            }
        };
        let embedder: Arc<dyn Embedder> = match &config.providers.llm_api_key {
            Some(key) => Arc::new(OpenAiEmbedder::new(key.clone(), config.providers.embed_model.clone())?),
            None => Arc::new(OfflineEmbedder {
                model: config.providers.embed_model.clone(),
            }),
        };
        let calendar: Option<Arc<dyn CalendarSource>> =
            match &config.providers.calendar_token_path {
                Some(path) => match GoogleCalendarClient::from_token_file(path) {
                    Ok(client) => Some(Arc::new(client)),
                    Err(e) => {
                        tracing::warn!("calendar client unavailable: {}", e);
                        None
                    }
                },
                None => None,
            };
        let notes: Option<Arc<dyn NotesSource>> = match &config.providers.notes_api_key {
            Some(key) => Some(Arc::new(NotionClient::new(key.clone())?)),
            None => None,
        };

        Ok(Self {
            config,
            store,
            chat,
            embedder,
            calendar,
            notes,
            jobs: JobTracker::new(),
            resources_dir,
        })
    }

    /// Assemble a context from pre-built parts (tests, embedding hosts)
    pub fn with_collaborators(
        config: Config,
        store: Store,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        calendar: Option<Arc<dyn CalendarSource>>,
        notes: Option<Arc<dyn NotesSource>>,
        resources_dir: PathBuf,
    ) -> Self {
        Self {
            config,
            store,
            chat,
            embedder,
            calendar,
            notes,
            jobs: JobTracker::new(),
            resources_dir,
        }
    }

    /// The processor wired to this context's store, chat model, and jobs
    pub fn processor(&self) -> Processor {
        let mut processor = Processor::new(
            self.store.clone(),
            self.chat.clone(),
            self.jobs.clone(),
            self.resources_dir.clone(),
        );
        if let Some(path) = &self.config.tagging_log_file {
            processor = processor.with_tagging_log(TaggingLogger::new(path));
        }
        processor
    }
}
