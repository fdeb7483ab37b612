//! Optional structured JSONL log of per-activity tagging decisions

use std::io::Write;
use std::path::PathBuf;

use lifelog_types::TagAssignment;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TaggingLogEntry {
    pub timestamp: String,
    pub raw_activity_id: i64,
    pub processed_activity_id: i64,
    pub activity_text: String,
    pub stage: &'static str,
    pub needs_review: bool,
    pub tags: Vec<TagAssignment>,
}

/// Append-only JSONL writer. Logging failures are reported but never
/// fail the pipeline.
pub struct TaggingLogger {
    path: PathBuf,
}

impl TaggingLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, entry: &TaggingLogEntry) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            let line = serde_json::to_string(entry).map_err(std::io::Error::other)?;
            writeln!(file, "{}", line)
        })();
        if let Err(e) = result {
            tracing::warn!("tagging log write failed: {}", e);
        }
    }
}
