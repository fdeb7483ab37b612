//! Testing infrastructure for lifelog integration tests:
//! - `fakes`: scripted in-memory collaborators (chat, embedding,
//!   calendar, notes) implementing the provider traits
//! - `fixtures`: store seeding helpers for common shapes

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeCalendarSource, FakeChatModel, FakeEmbedder, FakeNotesSource};
