// Runtime layer - configuration, composition root, ingestion services,
// processing jobs, and read models for the API surface.

mod error;

pub mod config;
pub mod context;
pub mod ingest;
pub mod insights;
pub mod jobs;
pub mod processor;
pub mod tagging_log;

pub use config::{resolve_data_path, Config, CorsConfig, Environment, ProviderSettings};
pub use context::ServiceContext;
pub use error::{Error, Result};
pub use ingest::{
    CalendarIngestOutcome, CalendarIngestService, CalendarProgress, NoteIngestOutcome,
    NoteIngestService, NoteProgress,
};
pub use insights::{
    import_status, overview, system_stats, time_distribution, GroupBy, ImportStatus,
    OverviewInsights, SystemStats, TimeDistribution,
};
pub use jobs::{JobHandle, JobTracker};
pub use processor::{ProcessingOptions, Processor};
pub use tagging_log::{TaggingLogEntry, TaggingLogger};
