//! In-process job state and progress snapshots. One worker owns each
//! job's snapshot; readers observe the latest value and may miss
//! intermediate updates.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use lifelog_types::{truncate, JobCounters, JobSnapshot, JobStatus};

const HISTORY_LIMIT: usize = 50;
const ACTIVITY_CLIP_CHARS: usize = 200;
const TAGS_CLIP: usize = 10;

struct TrackerState {
    jobs: HashMap<String, JobSnapshot>,
    /// Insertion order, newest last; trimmed to HISTORY_LIMIT
    order: VecDeque<String>,
    cancel_flags: HashMap<String, Arc<AtomicBool>>,
}

/// Shared registry of jobs and their latest progress snapshots
#[derive(Clone)]
pub struct JobTracker {
    state: Arc<RwLock<TrackerState>>,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TrackerState {
                jobs: HashMap::new(),
                order: VecDeque::new(),
                cancel_flags: HashMap::new(),
            })),
        }
    }

    /// Register a new running job and hand its write side to the worker
    pub fn create_job(&self) -> JobHandle {
        let job_id = uuid::Uuid::new_v4().to_string();
        let snapshot = JobSnapshot::new(job_id.clone(), chrono::Utc::now().to_rfc3339());
        let cancel_flag = Arc::new(AtomicBool::new(false));

        let mut state = self.state.write().unwrap();
        state.jobs.insert(job_id.clone(), snapshot);
        state.order.push_back(job_id.clone());
        state.cancel_flags.insert(job_id.clone(), cancel_flag.clone());
        while state.order.len() > HISTORY_LIMIT {
            if let Some(evicted) = state.order.pop_front() {
                state.jobs.remove(&evicted);
                state.cancel_flags.remove(&evicted);
            }
        }
        drop(state);

        JobHandle {
            job_id,
            tracker: self.clone(),
            cancel_flag,
        }
    }

    pub fn snapshot(&self, job_id: &str) -> Option<JobSnapshot> {
        self.state.read().unwrap().jobs.get(job_id).cloned()
    }

    /// Recent jobs, newest first
    pub fn recent(&self, limit: usize) -> Vec<JobSnapshot> {
        let state = self.state.read().unwrap();
        state
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| state.jobs.get(id).cloned())
            .collect()
    }

    /// Request cooperative cancellation; the worker checks between
    /// activities
    pub fn cancel(&self, job_id: &str) -> bool {
        let state = self.state.read().unwrap();
        match state.cancel_flags.get(job_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    fn update(&self, job_id: &str, mutate: impl FnOnce(&mut JobSnapshot)) {
        let mut state = self.state.write().unwrap();
        if let Some(snapshot) = state.jobs.get_mut(job_id) {
            mutate(snapshot);
        }
    }
}

/// Write side of one job, owned by its worker task
pub struct JobHandle {
    job_id: String,
    tracker: JobTracker,
    cancel_flag: Arc<AtomicBool>,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.job_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// Publish a bounded progress snapshot; overwrites the previous one
    pub fn progress(&self, current: usize, total: usize, activity_text: &str, tags: &[String]) {
        let clipped_text = truncate(activity_text, ACTIVITY_CLIP_CHARS);
        let clipped_tags: Vec<String> = tags.iter().take(TAGS_CLIP).cloned().collect();
        self.tracker.update(&self.job_id, |snapshot| {
            snapshot.current = current;
            snapshot.total = total;
            snapshot.progress = if total == 0 {
                0.0
            } else {
                current as f64 / total as f64
            };
            snapshot.current_activity = Some(clipped_text);
            snapshot.current_tags = clipped_tags;
        });
    }

    pub fn complete(&self, counters: JobCounters) {
        self.tracker.update(&self.job_id, |snapshot| {
            snapshot.status = JobStatus::Completed;
            snapshot.completed_at = Some(chrono::Utc::now().to_rfc3339());
            snapshot.progress = 1.0;
            snapshot.counters = Some(counters);
        });
    }

    pub fn fail(&self, error: &str) {
        let error = error.to_string();
        self.tracker.update(&self.job_id, |snapshot| {
            snapshot.status = JobStatus::Failed;
            snapshot.completed_at = Some(chrono::Utc::now().to_rfc3339());
            snapshot.error = Some(error);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_snapshots_overwrite_and_clip() {
        let tracker = JobTracker::new();
        let handle = tracker.create_job();

        let long_text = "x".repeat(500);
        let many_tags: Vec<String> = (0..20).map(|i| format!("tag{}", i)).collect();
        handle.progress(1, 4, &long_text, &many_tags);
        handle.progress(2, 4, "second", &[]);

        let snapshot = tracker.snapshot(handle.id()).unwrap();
        assert_eq!(snapshot.current, 2);
        assert_eq!(snapshot.progress, 0.5);
        assert_eq!(snapshot.current_activity.as_deref(), Some("second"));

        // Clipping applied on the earlier update too
        handle.progress(3, 4, &long_text, &many_tags);
        let snapshot = tracker.snapshot(handle.id()).unwrap();
        assert_eq!(snapshot.current_activity.unwrap().chars().count(), 200);
        assert_eq!(snapshot.current_tags.len(), 10);
    }

    #[test]
    fn completion_publishes_counters() {
        let tracker = JobTracker::new();
        let handle = tracker.create_job();
        handle.complete(JobCounters {
            raw_activities: 3,
            processed_activities: 3,
            unique_tags: 2,
            average_tags_per_activity: 1.5,
        });

        let snapshot = tracker.snapshot(handle.id()).unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.counters.unwrap().unique_tags, 2);
        assert!(snapshot.completed_at.is_some());
    }

    #[test]
    fn failure_surfaces_error_text() {
        let tracker = JobTracker::new();
        let handle = tracker.create_job();
        handle.fail("database unreachable");

        let snapshot = tracker.snapshot(handle.id()).unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("database unreachable"));
    }

    #[test]
    fn cancellation_is_cooperative() {
        let tracker = JobTracker::new();
        let handle = tracker.create_job();
        assert!(!handle.is_cancelled());
        assert!(tracker.cancel(handle.id()));
        assert!(handle.is_cancelled());
        assert!(!tracker.cancel("unknown-job"));
    }

    #[test]
    fn recent_returns_newest_first() {
        let tracker = JobTracker::new();
        let first = tracker.create_job();
        let second = tracker.create_job();

        let recent = tracker.recent(10);
        assert_eq!(recent[0].job_id, second.id());
        assert_eq!(recent[1].job_id, first.id());

        let limited = tracker.recent(1);
        assert_eq!(limited.len(), 1);
    }
}
