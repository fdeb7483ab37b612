//! The pipeline orchestrator: load raw activities in scope, tag each one,
//! persist processed activities and links, and publish job progress.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use lifelog_engine::{ActivityMatcher, MatchedActivity, Tagger, TaxonomyBuilder, TaxonomyResources};
use lifelog_providers::ChatModel;
use lifelog_store::queries::{activities, notes, processed, tags};
use lifelog_store::{NewProcessedActivity, Store};
use lifelog_types::{ActivitySource, JobCounters, JobSnapshot, RawActivity};

use crate::jobs::{JobHandle, JobTracker};
use crate::tagging_log::{TaggingLogEntry, TaggingLogger};
use crate::{Error, Result};

const DETAILS_CLIP_CHARS: usize = 1000;
const CORPUS_SAMPLE: usize = 100;
const TAG_RATIO_REBUILD_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Default)]
pub struct ProcessingOptions {
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    /// Force a taxonomy rebuild before tagging
    pub regenerate_taxonomy: bool,
    /// Correlate notes and calendar activities into shared processed
    /// activities. Off by default: one processed activity per raw.
    pub enable_matching: bool,
}

impl ProcessingOptions {
    fn is_range_scoped(&self) -> bool {
        self.date_start.is_some() || self.date_end.is_some()
    }
}

#[derive(Clone)]
pub struct Processor {
    store: Store,
    chat: Arc<dyn ChatModel>,
    jobs: JobTracker,
    resources_dir: PathBuf,
    tagging_log: Option<Arc<TaggingLogger>>,
    /// Rebuild the taxonomy automatically when tags outnumber 30% of
    /// activities. Never applies to range-scoped runs.
    auto_taxonomy_rebuild: bool,
}

impl Processor {
    pub fn new(
        store: Store,
        chat: Arc<dyn ChatModel>,
        jobs: JobTracker,
        resources_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            chat,
            jobs,
            resources_dir,
            tagging_log: None,
            auto_taxonomy_rebuild: false,
        }
    }

    pub fn with_tagging_log(mut self, logger: TaggingLogger) -> Self {
        self.tagging_log = Some(Arc::new(logger));
        self
    }

    pub fn with_auto_taxonomy_rebuild(mut self, enabled: bool) -> Self {
        self.auto_taxonomy_rebuild = enabled;
        self
    }

    /// Start a processing job on a worker task and return its initial
    /// snapshot immediately. Status endpoints observe the rest.
    pub fn spawn(&self, options: ProcessingOptions) -> JobSnapshot {
        let handle = self.jobs.create_job();
        let snapshot = self
            .jobs
            .snapshot(handle.id())
            .expect("job registered on create");
        let processor = self.clone();
        tokio::spawn(async move {
            processor.execute(handle, options).await;
        });
        snapshot
    }

    /// Run a processing job inline and return the final snapshot.
    /// Used by tests and synchronous callers.
    pub async fn run_to_completion(&self, options: ProcessingOptions) -> JobSnapshot {
        let handle = self.jobs.create_job();
        let job_id = handle.id().to_string();
        self.execute(handle, options).await;
        self.jobs.snapshot(&job_id).expect("job snapshot")
    }

    async fn execute(&self, handle: JobHandle, options: ProcessingOptions) {
        match self.execute_inner(&handle, &options).await {
            Ok(counters) => handle.complete(counters),
            Err(Error::Cancelled) => handle.fail("cancelled"),
            Err(e) => {
                tracing::error!("processing job {} failed: {}", handle.id(), e);
                handle.fail(&e.to_string());
            }
        }
    }

    async fn execute_inner(
        &self,
        handle: &JobHandle,
        options: &ProcessingOptions,
    ) -> Result<JobCounters> {
        let raw_activities = {
            let conn = self.store.conn()?;
            activities::list_in_window(
                &conn,
                options.date_start.as_deref(),
                options.date_end.as_deref(),
            )?
        };
        let total = raw_activities.len();
        tracing::info!(
            total,
            range_scoped = options.is_range_scoped(),
            "processing job {} started",
            handle.id()
        );

        // Reprocessing a window replaces its processed activities wholesale
        {
            let conn = self.store.conn()?;
            processed::delete_in_window(
                &conn,
                options.date_start.as_deref(),
                options.date_end.as_deref(),
            )?;
        }

        if total == 0 {
            return Ok(JobCounters::default());
        }

        self.maybe_rebuild_taxonomy(options, total).await?;

        let resources = TaxonomyResources::new(&self.resources_dir);
        let (taxonomy, synonyms) = resources.load();
        let tagger = Tagger::new(self.chat.as_ref(), taxonomy, synonyms);

        let groups: Vec<MatchedActivity> = if options.enable_matching {
            let (groups, stats) = ActivityMatcher::default().match_activities(raw_activities);
            tracing::info!(
                merged = stats.merged_activities,
                "activity matching enabled for job {}",
                handle.id()
            );
            groups
        } else {
            raw_activities
                .into_iter()
                .map(MatchedActivity::single)
                .collect()
        };

        let mut processed_count = 0usize;
        let mut link_count = 0usize;
        let mut unique_tags: HashSet<String> = HashSet::new();

        for (index, group) in groups.iter().enumerate() {
            if handle.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match self.process_group(&tagger, group).await {
                Ok((_, tag_names)) => {
                    processed_count += 1;
                    link_count += tag_names.len();
                    unique_tags.extend(tag_names.iter().cloned());
                    handle.progress(
                        index + 1,
                        groups.len(),
                        &group.combined_details(),
                        &tag_names,
                    );
                }
                Err(e) => {
                    // Per-activity errors skip the activity, never the job
                    tracing::error!(
                        "activity {} failed in job {}: {}",
                        group.primary.id,
                        handle.id(),
                        e
                    );
                    handle.progress(index + 1, groups.len(), &group.combined_details(), &[]);
                }
            }
        }

        let average = if processed_count == 0 {
            0.0
        } else {
            (link_count as f64 / processed_count as f64 * 100.0).round() / 100.0
        };
        Ok(JobCounters {
            raw_activities: total,
            processed_activities: processed_count,
            unique_tags: unique_tags.len(),
            average_tags_per_activity: average,
        })
    }

    /// Tag one group and persist the processed activity with its links
    async fn process_group(
        &self,
        tagger: &Tagger<'_>,
        group: &MatchedActivity,
    ) -> Result<(i64, Vec<String>)> {
        let mut representative: RawActivity = group.primary.clone();
        representative.details = group.combined_details();
        let outcome = tagger.tag_activity(&representative).await;

        let record = NewProcessedActivity {
            date: group.primary.date.clone(),
            time: group.primary.time.clone(),
            total_duration_minutes: group.total_duration_minutes(),
            combined_details: lifelog_types::truncate(&group.combined_details(), DETAILS_CLIP_CHARS),
            raw_activity_ids: group.raw_ids(),
            sources: group.sources(),
        };
        let assignments = outcome.tags.clone();
        let processed_id = self.store.transaction(|tx| {
            let id = processed::insert(tx, &record)?;
            for assignment in &assignments {
                let tag_id = tags::get_or_create(
                    tx,
                    &lifelog_types::validate::normalize_tag_name(&assignment.name),
                    "",
                )?;
                tags::link_activity(tx, id, tag_id, assignment.confidence)?;
            }
            Ok(id)
        })?;

        if let Some(logger) = &self.tagging_log {
            logger.append(&TaggingLogEntry {
                timestamp: chrono::Utc::now().to_rfc3339(),
                raw_activity_id: group.primary.id,
                processed_activity_id: processed_id,
                activity_text: lifelog_types::truncate(&representative.details, 200),
                stage: outcome.stage.as_str(),
                needs_review: outcome.needs_review,
                tags: outcome.tags.clone(),
            });
        }

        Ok((
            processed_id,
            outcome.tags.into_iter().map(|t| t.name).collect(),
        ))
    }

    async fn maybe_rebuild_taxonomy(
        &self,
        options: &ProcessingOptions,
        total_activities: usize,
    ) -> Result<()> {
        let auto_triggered = self.auto_taxonomy_rebuild
            && !options.is_range_scoped()
            && self.tag_activity_ratio(total_activities)? > TAG_RATIO_REBUILD_THRESHOLD;
        if !(options.regenerate_taxonomy || auto_triggered) {
            return Ok(());
        }

        let (event_texts, note_texts) = {
            let conn = self.store.conn()?;
            let events = activities::sample_texts(
                &conn,
                ActivitySource::Calendar,
                options.date_start.as_deref(),
                options.date_end.as_deref(),
                CORPUS_SAMPLE,
            )?;
            let notes = notes::sample_abstracts(&conn, CORPUS_SAMPLE)?;
            (events, notes)
        };

        let builder = TaxonomyBuilder::new(self.chat.as_ref());
        let (taxonomy, synonyms) = builder.build(&event_texts, &note_texts).await;
        TaxonomyResources::new(&self.resources_dir).save(&taxonomy, &synonyms)?;
        tracing::info!(
            categories = taxonomy.tag_names().len(),
            "taxonomy regenerated"
        );
        Ok(())
    }

    fn tag_activity_ratio(&self, total_activities: usize) -> Result<f64> {
        if total_activities == 0 {
            return Ok(0.0);
        }
        let conn = self.store.conn()?;
        let tag_count = tags::count(&conn)?;
        Ok(tag_count as f64 / total_activities as f64)
    }
}
