// Embedded SQLite store: pooled handles, versioned schema, typed queries

mod error;
mod migrations;
mod pool;
mod records;
mod schema;
mod store;

pub mod queries;

pub use error::{Error, Result};
pub use migrations::{builtin_migrations, current_version, migrate_down, migrate_up, Migration};
pub use pool::{ConnectionPool, PooledConnection, DEFAULT_POOL_SIZE, MAX_POOL_SIZE};
pub use records::{
    ActivityFilter, NewNoteBlock, NewNotePage, NewProcessedActivity, NewRawActivity, NewTag,
    ProcessedFilter, TagSort, TagUsageContext,
};
pub use store::Store;
