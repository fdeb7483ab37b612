//! Store seeding helpers for integration tests

use lifelog_store::queries::{notes, processed, tags};
use lifelog_store::{NewNoteBlock, NewProcessedActivity, NewRawActivity, Store};
use lifelog_types::ActivitySource;

/// Fresh in-memory store at the latest schema version
pub fn memory_store() -> Store {
    Store::open_in_memory().expect("in-memory store")
}

pub fn seed_raw_activity(
    store: &Store,
    source: ActivitySource,
    date: &str,
    time: Option<&str>,
    details: &str,
) -> i64 {
    let conn = store.conn().expect("conn");
    lifelog_store::queries::activities::insert(
        &conn,
        &NewRawActivity {
            date: date.to_string(),
            time: time.map(String::from),
            duration_minutes: if time.is_some() { 60 } else { 0 },
            details: details.to_string(),
            source,
            source_link: Some(format!("https://source.example/{}", details.replace(' ', "-"))),
            source_payload: Some(serde_json::json!({"id": details})),
        },
    )
    .expect("insert raw activity")
}

/// A leaf block under an implicit parent, with text and edit timestamp
pub fn seed_leaf_block(store: &Store, block_id: &str, text: &str, edited_at: &str) {
    let conn = store.conn().expect("conn");
    notes::upsert_block(
        &conn,
        &NewNoteBlock {
            block_id: block_id.to_string(),
            page_id: "page-1".to_string(),
            parent_block_id: None,
            block_type: "paragraph".to_string(),
            is_leaf: true,
            text: text.to_string(),
            last_edited_at: Some(edited_at.to_string()),
        },
    )
    .expect("insert leaf block");
    notes::record_edit(&conn, block_id, edited_at).expect("record edit");
}

/// A processed activity linked to the given tags at fixed confidence
pub fn seed_processed_activity(
    store: &Store,
    date: &str,
    minutes: i64,
    details: &str,
    tag_names: &[&str],
) -> i64 {
    let conn = store.conn().expect("conn");
    let id = processed::insert(
        &conn,
        &NewProcessedActivity {
            date: date.to_string(),
            time: Some("09:00".to_string()),
            total_duration_minutes: minutes,
            combined_details: details.to_string(),
            raw_activity_ids: vec![1],
            sources: vec!["calendar".to_string()],
        },
    )
    .expect("insert processed activity");
    for name in tag_names {
        let tag = tags::get_or_create(&conn, name, "").expect("tag");
        tags::link_activity(&conn, id, tag, 0.8).expect("link");
    }
    id
}

/// Wire-shaped calendar event JSON for the fake calendar source
pub fn calendar_event_json(id: &str, start: &str, end: &str, summary: &str) -> serde_json::Value {
    let key = |value: &str| {
        if value.len() == 10 { "date" } else { "dateTime" }
    };
    serde_json::json!({
        "id": id,
        "summary": summary,
        "htmlLink": format!("https://cal.example/{}", id),
        "start": { key(start): start },
        "end": { key(end): end },
    })
}

/// Wire-shaped note page JSON for the fake notes source
pub fn note_page_json(id: &str, title: &str, last_edited: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "url": format!("https://notes.example/{}", id),
        "last_edited_time": last_edited,
        "properties": {
            "Name": {"type": "title", "title": [{"plain_text": title}]}
        }
    })
}

/// Wire-shaped text block JSON for the fake notes source
pub fn note_block_json(id: &str, text: &str, has_children: bool, last_edited: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "type": "paragraph",
        "has_children": has_children,
        "last_edited_time": last_edited,
        "paragraph": {"rich_text": [{"plain_text": text}]}
    })
}
