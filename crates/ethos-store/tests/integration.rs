//! Integration tests for the ethos-store crate.
//!
//! These exercise the reminder lifecycle against a real JSON file on disk
//! (via tempfile): create, list, delete by view index, trigger, reload.

use chrono::{DateTime, Duration, Local, TimeZone};
use ethos_store::{DEFAULT_TAG, ReminderStore, ReminderView, StoreError};

fn noon() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap()
}

fn open(dir: &tempfile::TempDir) -> ReminderStore {
    ReminderStore::open(dir.path().join("reminders.json"))
}

// ═══════════════════════════════════════════════════════════════════════
//  Create / list
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn add_then_list_all_returns_untriggered_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);

    let when = noon() + Duration::hours(6);
    store.add("call Sam", when, Some("family")).unwrap();

    let all = store.list(ReminderView::All);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].task, "call Sam");
    assert_eq!(all[0].time, when);
    assert_eq!(all[0].tag, "family");
    assert!(!all[0].triggered);
}

#[test]
fn list_preserves_creation_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);

    // Later time added first: order follows creation, not due time.
    store.add("second due", noon() + Duration::hours(2), None).unwrap();
    store.add("first due", noon() + Duration::hours(1), None).unwrap();

    let tasks: Vec<_> = store
        .list(ReminderView::Pending)
        .into_iter()
        .map(|r| r.task)
        .collect();
    assert_eq!(tasks, vec!["second due", "first due"]);
}

#[test]
fn missing_tag_defaults_to_general() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let r = store.add("stretch", noon(), None).unwrap();
    assert_eq!(r.tag, DEFAULT_TAG);
}

// ═══════════════════════════════════════════════════════════════════════
//  Persistence
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn reopen_restores_reminders_and_trigger_state() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open(&dir);
        store.add("past", noon() - Duration::minutes(5), None).unwrap();
        store.add("future", noon() + Duration::hours(1), None).unwrap();
        assert_eq!(store.mark_and_collect_due(noon()).len(), 1);
    }

    let store = open(&dir);
    let all = store.list(ReminderView::All);
    assert_eq!(all.len(), 2);
    assert!(all[0].triggered);
    assert!(!all[1].triggered);
    assert_eq!(store.list(ReminderView::Pending).len(), 1);
}

#[test]
fn persisted_file_is_a_json_array_of_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    store.add("call Sam", noon(), None).unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["task"], "call Sam");
    assert_eq!(records[0]["tag"], "general");
    assert_eq!(records[0]["triggered"], false);
    assert!(records[0]["time"].is_string());
}

#[test]
fn corrupt_file_loads_as_empty_usable_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reminders.json");
    std::fs::write(&path, "[{\"task\": \"half written").unwrap();

    let store = ReminderStore::open(&path);
    assert!(store.is_empty());

    store.add("fresh start", noon(), None).unwrap();
    let reopened = ReminderStore::open(&path);
    assert_eq!(reopened.len(), 1);
}

#[test]
fn malformed_record_does_not_discard_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reminders.json");
    std::fs::write(
        &path,
        r#"[
  {"task": "pay rent", "time": "2024-06-12T12:00:00", "triggered": false, "tag": "general"},
  {"task": "someday", "time": "tomorrow-ish", "triggered": false, "tag": "general"},
  {"task": "call Sam", "time": "2024-06-12T18:00:00", "triggered": false, "tag": "general"}
]"#,
    )
    .unwrap();

    let store = ReminderStore::open(&path);
    let tasks: Vec<_> = store.list(ReminderView::All).into_iter().map(|r| r.task).collect();
    assert_eq!(tasks, vec!["pay rent", "call Sam"]);

    store.add("new", noon(), None).unwrap();
    let reopened: Vec<_> = ReminderStore::open(&path)
        .list(ReminderView::All)
        .into_iter()
        .map(|r| r.task)
        .collect();
    assert_eq!(reopened, vec!["pay rent", "call Sam", "new"]);
}

#[test]
fn legacy_file_without_offsets_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reminders.json");
    std::fs::write(
        &path,
        r#"[
  {"task": "old one", "time": "2024-06-12T12:00:00", "triggered": true, "tag": "general"},
  {"task": "older one", "time": "2024-06-12T18:30:00", "tag": null}
]"#,
    )
    .unwrap();

    let store = ReminderStore::open(&path);
    let pending = store.list(ReminderView::Pending);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task, "older one");
    assert_eq!(pending[0].time, noon() + Duration::minutes(390));
    assert_eq!(pending[0].tag, DEFAULT_TAG);
}

// ═══════════════════════════════════════════════════════════════════════
//  Delete by view index
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn delete_resolves_index_against_pending_view() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);

    store.add("fired", noon() - Duration::hours(1), None).unwrap();
    store.add("a", noon() + Duration::hours(1), None).unwrap();
    store.add("b", noon() + Duration::hours(2), None).unwrap();
    store.mark_and_collect_due(noon());

    // Pending view is [a, b]; index 1 is "b", not "a".
    let removed = store.delete(1, ReminderView::Pending).unwrap();
    assert_eq!(removed.task, "b");

    let all: Vec<_> = store.list(ReminderView::All).into_iter().map(|r| r.task).collect();
    assert_eq!(all, vec!["fired", "a"]);
}

#[test]
fn delete_out_of_range_leaves_collection_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    store.add("only", noon(), None).unwrap();

    let err = store.delete(1, ReminderView::Pending).unwrap_err();
    assert!(matches!(err, StoreError::InvalidIndex { index: 1, len: 1 }));
    assert_eq!(store.len(), 1);
}

#[test]
fn delete_persists() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    store.add("a", noon(), None).unwrap();
    store.add("b", noon(), None).unwrap();
    store.delete(0, ReminderView::All).unwrap();

    let reopened = open(&dir);
    let tasks: Vec<_> = reopened.list(ReminderView::All).into_iter().map(|r| r.task).collect();
    assert_eq!(tasks, vec!["b"]);
}

// ═══════════════════════════════════════════════════════════════════════
//  Trigger marking
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn mark_and_collect_due_fires_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    store.add("due a", noon() - Duration::minutes(1), None).unwrap();
    store.add("due b", noon(), None).unwrap();
    store.add("later", noon() + Duration::seconds(1), None).unwrap();

    let first = store.mark_and_collect_due(noon());
    let tasks: Vec<_> = first.iter().map(|r| r.task.as_str()).collect();
    assert_eq!(tasks, vec!["due a", "due b"]);
    assert!(first.iter().all(|r| r.triggered));

    let second = store.mark_and_collect_due(noon());
    assert!(second.is_empty());

    assert_eq!(store.list(ReminderView::Pending).len(), 1);
}

#[test]
fn concurrent_scans_never_double_fire() {
    let dir = tempfile::tempdir().unwrap();
    let store = std::sync::Arc::new(open(&dir));
    for i in 0..20 {
        store
            .add(&format!("task {i}"), noon() - Duration::minutes(i), None)
            .unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || store.mark_and_collect_due(noon()).len())
        })
        .collect();

    let fired: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(fired, 20);
    assert!(store.list(ReminderView::Pending).is_empty());
}
