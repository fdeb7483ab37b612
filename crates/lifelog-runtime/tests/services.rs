//! Ingestion and processing service scenarios over fakes

use std::collections::HashMap;
use std::sync::Arc;

use lifelog_runtime::{
    CalendarIngestService, JobTracker, NoteIngestService, ProcessingOptions, Processor,
};
use lifelog_store::queries::{activities, notes, processed, tags};
use lifelog_store::ActivityFilter;
use lifelog_testing::fixtures::{
    calendar_event_json, memory_store, note_block_json, note_page_json, seed_raw_activity,
};
use lifelog_testing::{FakeCalendarSource, FakeChatModel, FakeNotesSource};
use lifelog_types::{ActivitySource, JobStatus};

#[tokio::test]
async fn calendar_ingestion_is_idempotent_over_a_window() {
    let store = memory_store();
    let source = FakeCalendarSource::with_events(vec![
        calendar_event_json("a", "2025-08-01T09:00:00Z", "2025-08-01T10:00:00Z", "Standup"),
        calendar_event_json("b", "2025-08-02", "2025-08-03", "Conference"),
    ]);

    let service = CalendarIngestService::new(&store, &source);
    let first = service
        .ingest_window("2025-08-01", "2025-08-02", &[], |_| {})
        .await
        .unwrap();
    assert_eq!(first.inserted, 2);
    assert_eq!(first.updated, 0);

    // Same window again: zero new rows, both refreshed
    let second = service
        .ingest_window("2025-08-01", "2025-08-02", &[], |_| {})
        .await
        .unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 2);

    let conn = store.conn().unwrap();
    let (rows, total) = activities::list(
        &conn,
        &ActivityFilter {
            limit: 10,
            offset: 0,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(total, 2);

    let standup = rows.iter().find(|r| r.details == "Standup").unwrap();
    assert_eq!(standup.time.as_deref(), Some("09:00"));
    assert_eq!(standup.duration_minutes, 60);

    let conference = rows.iter().find(|r| r.details == "Conference").unwrap();
    assert_eq!(conference.time, None);
    assert_eq!(conference.duration_minutes, 1440);
}

#[tokio::test]
async fn calendar_ingestion_paginates_and_survives_bad_events() {
    let store = memory_store();
    let source = FakeCalendarSource::with_pages(vec![
        vec![
            calendar_event_json("a", "2025-08-01T09:00:00Z", "2025-08-01T09:30:00Z", "One"),
            // No usable start: skipped, batch continues
            serde_json::json!({"id": "broken", "summary": "no start"}),
        ],
        vec![calendar_event_json(
            "c",
            "2025-08-01T11:00:00Z",
            "2025-08-01T12:00:00Z",
            "Two",
        )],
    ]);

    let service = CalendarIngestService::new(&store, &source);
    let outcome = service
        .ingest_window("2025-08-01", "2025-08-01", &[], |_| {})
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.skipped, 1);
}

#[tokio::test]
async fn note_ingestion_builds_the_block_tree() {
    let store = memory_store();
    let mut children = HashMap::new();
    children.insert(
        "page-1".to_string(),
        vec![note_block_json("root-block", "Weekly log", true, "2025-08-01T09:00:00.000Z")],
    );
    children.insert(
        "root-block".to_string(),
        vec![
            note_block_json("leaf-1", "Shipped the retriever", false, "2025-08-01T09:05:00.000Z"),
            note_block_json("leaf-2", "", false, "2025-08-01T09:06:00.000Z"),
        ],
    );
    let source = FakeNotesSource::new(
        vec![note_page_json("page-1", "Daily log", "2025-08-01T09:10:00.000Z")],
        children,
    );

    let service = NoteIngestService::new(&store, &source);
    let outcome = service.ingest(None, None, |_| {}).await.unwrap();
    assert_eq!(outcome.pages_processed, 1);
    assert_eq!(outcome.blocks_processed, 3);

    let conn = store.conn().unwrap();
    let page = notes::get_page(&conn, "page-1").unwrap().unwrap();
    assert_eq!(page.title, "Daily log");
    assert_eq!(page.last_edited_at.as_deref(), Some("2025-08-01 09:10:00"));

    // A block with children is never a leaf, regardless of text
    let root = notes::get_block(&conn, "root-block").unwrap().unwrap();
    assert!(!root.is_leaf);
    assert_eq!(root.parent_block_id, None);

    let leaf = notes::get_block(&conn, "leaf-1").unwrap().unwrap();
    assert!(leaf.is_leaf);
    assert_eq!(leaf.parent_block_id.as_deref(), Some("root-block"));
    assert_eq!(leaf.text, "Shipped the retriever");

    // Empty text never marks a leaf
    let empty = notes::get_block(&conn, "leaf-2").unwrap().unwrap();
    assert!(!empty.is_leaf);

    // Re-ingesting the same tree duplicates nothing
    let again = service.ingest(None, None, |_| {}).await.unwrap();
    assert_eq!(again.pages_processed, 1);
    assert_eq!(notes::count_blocks(&conn).unwrap(), 3);
}

fn processor_with(store: &lifelog_store::Store, chat: FakeChatModel) -> (Processor, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let processor = Processor::new(
        store.clone(),
        Arc::new(chat),
        JobTracker::new(),
        dir.path().to_path_buf(),
    );
    (processor, dir)
}

#[tokio::test]
async fn processing_tags_activities_and_completes() {
    let store = memory_store();
    seed_raw_activity(&store, ActivitySource::Calendar, "2025-08-01", Some("09:00"), "Team standup meeting");

    // Offline chat: the lexical pass alone must place this one
    let (processor, _dir) = processor_with(&store, FakeChatModel::failing("offline"));
    let snapshot = processor
        .run_to_completion(ProcessingOptions::default())
        .await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.current, 1);
    assert_eq!(snapshot.total, 1);
    let counters = snapshot.counters.unwrap();
    assert_eq!(counters.raw_activities, 1);
    assert_eq!(counters.processed_activities, 1);

    let conn = store.conn().unwrap();
    let (rows, _) = processed::list(
        &conn,
        &lifelog_store::ProcessedFilter {
            limit: 10,
            offset: 0,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sources, vec!["calendar"]);
    assert!(!rows[0].raw_activity_ids.is_empty());

    let links = processed::tags_for(&conn, rows[0].id).unwrap();
    let (work, confidence) = links
        .iter()
        .find(|(tag, _)| tag.name == "work")
        .expect("work tag linked");
    assert!(*confidence >= 0.7);
    assert!(work.usage_count >= 1);
}

#[tokio::test]
async fn reprocessing_a_range_replaces_processed_activities() {
    let store = memory_store();
    seed_raw_activity(&store, ActivitySource::Calendar, "2025-08-01", Some("09:00"), "Standup meeting");
    seed_raw_activity(&store, ActivitySource::Calendar, "2025-08-02", Some("10:00"), "Conference call");
    // Outside the reprocessed range
    seed_raw_activity(&store, ActivitySource::Calendar, "2025-09-15", Some("10:00"), "Later meeting");

    let (processor, _dir) = processor_with(&store, FakeChatModel::failing("offline"));

    // First pass over everything
    let first = processor.run_to_completion(ProcessingOptions::default()).await;
    assert_eq!(first.status, JobStatus::Completed);
    let conn = store.conn().unwrap();
    assert_eq!(processed::count(&conn).unwrap(), 3);

    // Range-scoped rerun deletes and recreates only the window
    let options = ProcessingOptions {
        date_start: Some("2025-08-01".to_string()),
        date_end: Some("2025-08-02".to_string()),
        ..Default::default()
    };
    let second = processor.run_to_completion(options).await;
    assert_eq!(second.status, JobStatus::Completed);
    let counters = second.counters.unwrap();
    assert_eq!(counters.raw_activities, 2);
    assert_eq!(counters.processed_activities, 2);
    assert_eq!(processed::count(&conn).unwrap(), 3);

    // Tag usage counters stayed consistent with the links table
    let (all_tags, _) = tags::list(&conn, lifelog_store::TagSort::UsageCount, 100, 0).unwrap();
    for tag in all_tags {
        let links: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM activity_tags WHERE tag_id = ?1",
                [tag.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tag.usage_count, links, "usage_count drift for {}", tag.name);
    }
}

#[tokio::test]
async fn processing_with_no_activities_completes_empty() {
    let store = memory_store();
    let (processor, _dir) = processor_with(&store, FakeChatModel::failing("offline"));
    let snapshot = processor.run_to_completion(ProcessingOptions::default()).await;
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.counters.unwrap().processed_activities, 0);
}

#[tokio::test]
async fn matching_folds_note_into_calendar_event() {
    let store = memory_store();
    seed_raw_activity(&store, ActivitySource::Calendar, "2025-08-01", Some("09:00"), "Standup meeting notes");
    seed_raw_activity(&store, ActivitySource::Notes, "2025-08-01", Some("09:05"), "standup meeting follow-ups");

    let (processor, _dir) = processor_with(&store, FakeChatModel::failing("offline"));
    let snapshot = processor
        .run_to_completion(ProcessingOptions {
            enable_matching: true,
            ..Default::default()
        })
        .await;
    assert_eq!(snapshot.status, JobStatus::Completed);

    let conn = store.conn().unwrap();
    let (rows, _) = processed::list(
        &conn,
        &lifelog_store::ProcessedFilter {
            limit: 10,
            offset: 0,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].raw_activity_ids.len(), 2);
    let mut sources = rows[0].sources.clone();
    sources.sort();
    assert_eq!(sources, vec!["calendar", "notes"]);
}
