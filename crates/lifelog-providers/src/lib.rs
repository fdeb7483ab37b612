// Error types
pub mod error;

// Collaborator contracts (public API)
pub mod traits;

// Provider implementations
pub mod calendar;
pub mod llm;
pub mod notes;

// Traits
pub use traits::{CalendarSource, ChatModel, ChatRequest, Embedder, NotesSource};

// Clients
pub use calendar::GoogleCalendarClient;
pub use llm::{OpenAiChatClient, OpenAiEmbedder, DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL};
pub use notes::NotionClient;

// Error types
pub use error::{Error, Result};
