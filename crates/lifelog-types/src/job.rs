use serde::{Deserialize, Serialize};

/// Lifecycle state of an asynchronous job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Final counters published when a processing job completes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobCounters {
    pub raw_activities: usize,
    pub processed_activities: usize,
    pub unique_tags: usize,
    pub average_tags_per_activity: f64,
}

/// The externally observable handle to an asynchronous operation.
/// Readers observe the latest snapshot; intermediate values may be missed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub error: Option<String>,
    /// Fraction of work done, in [0, 1]
    pub progress: f64,
    pub current: usize,
    pub total: usize,
    /// Text of the activity being processed, clipped to 200 chars
    pub current_activity: Option<String>,
    /// Tags assigned to the current activity, at most 10
    pub current_tags: Vec<String>,
    pub counters: Option<JobCounters>,
}

impl JobSnapshot {
    pub fn new(job_id: impl Into<String>, started_at: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Running,
            started_at: started_at.into(),
            completed_at: None,
            error: None,
            progress: 0.0,
            current: 0,
            total: 0,
            current_activity: None,
            current_tags: Vec::new(),
            counters: None,
        }
    }
}
