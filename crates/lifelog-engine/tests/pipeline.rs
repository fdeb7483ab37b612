//! End-to-end engine scenarios over an in-memory store and fake
//! collaborators: indexing, retrieval, and two-phase cleanup.

use lifelog_engine::{
    CleanupOptions, IndexScope, Indexer, Retriever, TagCleaner, HASH_EMBED_DIM,
};
use lifelog_store::queries::{embeddings, notes, tags};
use lifelog_testing::fixtures::{memory_store, seed_leaf_block, seed_processed_activity};
use lifelog_testing::{FakeChatModel, FakeEmbedder};

fn recent_timestamp() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[tokio::test]
async fn indexing_writes_abstract_and_embedding_for_leaves() {
    let store = memory_store();
    seed_leaf_block(
        &store,
        "b1",
        "Team sync about auth module. Implemented OAuth2 and JWT middleware.",
        &recent_timestamp(),
    );

    let chat = FakeChatModel::failing("offline");
    let embedder = FakeEmbedder::failing();
    let indexer = Indexer::new(&store, &chat, &embedder);
    let outcome = indexer.index(IndexScope::Recent { hours: 24 }).await.unwrap();

    assert_eq!(outcome.processed_blocks, 1);
    assert_eq!(outcome.abstracts_written, 1);
    assert_eq!(outcome.embeddings_written, 1);

    let conn = store.conn().unwrap();
    let block = notes::get_block(&conn, "b1").unwrap().unwrap();
    let abstract_text = block.abstract_text.unwrap();
    // Offline fallback: truncated prefix of the source text
    assert!(abstract_text.starts_with("Team sync about auth module."));
    let word_count = abstract_text.split_whitespace().count();
    assert!(word_count <= 100);

    let record = embeddings::get(&conn, "b1", "hash-256").unwrap().unwrap();
    assert_eq!(record.dim, HASH_EMBED_DIM);
}

#[tokio::test]
async fn indexing_skips_fully_indexed_blocks() {
    let store = memory_store();
    seed_leaf_block(&store, "b1", "some text worth indexing", &recent_timestamp());

    let chat = FakeChatModel::failing("offline");
    let embedder = FakeEmbedder::failing();
    let indexer = Indexer::new(&store, &chat, &embedder);

    indexer.index(IndexScope::All).await.unwrap();
    let second = indexer.index(IndexScope::All).await.unwrap();
    assert_eq!(second.processed_blocks, 0);
    assert_eq!(second.skipped, 1);
}

#[tokio::test]
async fn retrieval_ranks_exact_phrase_above_unrelated() {
    let store = memory_store();
    let now = recent_timestamp();
    seed_leaf_block(&store, "match", "Standup", &now);
    seed_leaf_block(&store, "other", "grocery shopping list for the weekend", &now);

    let chat = FakeChatModel::failing("offline");
    let embedder = FakeEmbedder::failing();
    Indexer::new(&store, &chat, &embedder)
        .index(IndexScope::All)
        .await
        .unwrap();

    let retriever = Retriever::new(&store, &embedder);
    let results = retriever.retrieve("Standup", 48, 3).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].block.block_id, "match");
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn retrieval_excludes_blocks_without_embeddings() {
    let store = memory_store();
    seed_leaf_block(&store, "unindexed", "never embedded", &recent_timestamp());

    let embedder = FakeEmbedder::failing();
    let retriever = Retriever::new(&store, &embedder);
    let results = retriever.retrieve("anything", 48, 5).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn empty_query_returns_no_results() {
    let store = memory_store();
    let embedder = FakeEmbedder::new();
    let retriever = Retriever::new(&store, &embedder);
    assert!(retriever.retrieve("   ", 24, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn retrieve_by_date_respects_the_window() {
    let store = memory_store();
    seed_leaf_block(&store, "inside", "project planning notes", "2025-08-01 10:00:00");
    seed_leaf_block(&store, "outside", "project planning notes", "2025-07-20 10:00:00");

    let chat = FakeChatModel::failing("offline");
    let embedder = FakeEmbedder::failing();
    Indexer::new(&store, &chat, &embedder)
        .index(IndexScope::All)
        .await
        .unwrap();

    let retriever = Retriever::new(&store, &embedder);
    let results = retriever
        .retrieve_by_date("project planning", "2025-08-01", 1, 5)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].block.block_id, "inside");
}

#[tokio::test]
async fn cleanup_removes_then_merges_with_phase_ordering() {
    let store = memory_store();
    // Three activities: one carries the artifact tag, one carries the
    // plural, one carries both plural and singular
    seed_processed_activity(&store, "2025-08-01", 30, "planning the week", &["scheduled_activity"]);
    seed_processed_activity(&store, "2025-08-01", 60, "team meeting", &["meetings"]);
    seed_processed_activity(&store, "2025-08-02", 45, "standup", &["meetings", "meeting"]);

    let chat = FakeChatModel::failing("offline");
    let cleaner = TagCleaner::new(&chat);
    let summary = cleaner
        .clean(
            &store,
            &CleanupOptions {
                dry_run: false,
                removal_threshold: 0.8,
                merge_threshold: 0.6,
                date_start: None,
                date_end: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(summary.removed, 1);
    assert_eq!(summary.merged, 1);
    assert!(summary
        .tags_to_remove
        .iter()
        .any(|t| t.name == "scheduled_activity"));
    assert!(summary
        .tags_to_merge
        .iter()
        .any(|t| t.source == "meetings" && t.target == "meeting"));

    let conn = store.conn().unwrap();
    assert!(tags::get_by_name(&conn, "scheduled_activity").unwrap().is_none());
    assert!(tags::get_by_name(&conn, "meetings").unwrap().is_none());

    // Union semantics: the double-tagged activity keeps one link
    let meeting = tags::get_by_name(&conn, "meeting").unwrap().unwrap();
    assert_eq!(meeting.usage_count, 2);
}

#[tokio::test]
async fn dry_run_cleanup_mutates_nothing() {
    let store = memory_store();
    seed_processed_activity(&store, "2025-08-01", 30, "x", &["scheduled_activity"]);

    let chat = FakeChatModel::failing("offline");
    let cleaner = TagCleaner::new(&chat);
    let summary = cleaner.clean(&store, &CleanupOptions::default()).await.unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.removed, 0);
    assert!(summary.marked_for_removal >= 1);

    let conn = store.conn().unwrap();
    assert!(tags::get_by_name(&conn, "scheduled_activity").unwrap().is_some());
}

#[tokio::test]
async fn scoped_cleanup_only_touches_links_in_range() {
    let store = memory_store();
    seed_processed_activity(&store, "2025-08-01", 30, "in range", &["scheduled_activity"]);
    seed_processed_activity(&store, "2025-09-10", 30, "out of range", &["scheduled_activity"]);

    let chat = FakeChatModel::failing("offline");
    let cleaner = TagCleaner::new(&chat);
    cleaner
        .clean(
            &store,
            &CleanupOptions {
                dry_run: false,
                removal_threshold: 0.8,
                merge_threshold: 0.8,
                date_start: Some("2025-08-01".to_string()),
                date_end: Some("2025-08-31".to_string()),
            },
        )
        .await
        .unwrap();

    let conn = store.conn().unwrap();
    // The tag row survives a scoped run, with only the out-of-range link
    let tag = tags::get_by_name(&conn, "scheduled_activity").unwrap().unwrap();
    assert_eq!(tag.usage_count, 1);
}

#[tokio::test]
async fn llm_classification_drives_cleanup_when_parseable() {
    let store = memory_store();
    seed_processed_activity(&store, "2025-08-01", 30, "deep work", &["focus"]);
    seed_processed_activity(&store, "2025-08-01", 30, "junk", &["stuffthing"]);

    let reply = r#"{"actions": [
        {"tag": "focus", "action": "keep", "reason": "specific", "confidence": 0.9},
        {"tag": "stuffthing", "action": "remove", "reason": "meaningless", "confidence": 0.95}
    ]}"#;
    let chat = FakeChatModel::replying(reply);
    let cleaner = TagCleaner::new(&chat);
    let summary = cleaner
        .clean(
            &store,
            &CleanupOptions {
                dry_run: false,
                removal_threshold: 0.9,
                merge_threshold: 0.8,
                date_start: None,
                date_end: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(summary.removed, 1);
    let conn = store.conn().unwrap();
    assert!(tags::get_by_name(&conn, "focus").unwrap().is_some());
    assert!(tags::get_by_name(&conn, "stuffthing").unwrap().is_none());
}
