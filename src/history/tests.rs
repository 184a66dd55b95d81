//! Tests for the history store and its backends.

use super::backend::{HistoryBackend, parse_log};
use super::entry::HistoryEntry;
use super::*;
use crate::context::AppContext;
use crate::error::ReclaimError;
use crate::record::{FailedItem, OperationRecord, QuarantinedItem, RecordStatus};
use chrono::{Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn record(id: u64, status: RecordStatus) -> OperationRecord {
    OperationRecord::new(
        id,
        "tester@host".to_string(),
        vec![PathBuf::from("/work")],
        vec![QuarantinedItem {
            original_path: PathBuf::from(format!("/work/{}.tmp", id)),
            quarantine_path: PathBuf::from(format!("/q/op-{:06}/00000_{}.tmp", id, id)),
            size: 100,
        }],
        status,
        vec![],
    )
}

/// Append a record under whatever id the store allocates.
fn append(store: &HistoryStore, status: RecordStatus) -> OperationRecord {
    store.append(|id| Ok(record(id, status))).unwrap()
}

fn durable_store() -> (TempDir, AppContext, HistoryStore) {
    let temp = TempDir::new().unwrap();
    let ctx = AppContext::at(temp.path()).unwrap();
    let store = HistoryStore::open(&ctx);
    (temp, ctx, store)
}

#[test]
fn test_append_and_get() {
    let store = HistoryStore::with_backend(MemoryBackend::new());
    let appended = append(&store, RecordStatus::Applied);

    assert_eq!(appended.id, 1);
    assert_eq!(store.get(1).unwrap(), appended);

    let err = store.get(2).unwrap_err();
    assert!(matches!(err, ReclaimError::NotFoundError(_)));
}

#[test]
fn test_record_with_wrong_id_is_rejected() {
    let store = HistoryStore::with_backend(MemoryBackend::new());

    let err = store
        .append(|_| Ok(record(5, RecordStatus::Applied)))
        .unwrap_err();
    assert!(matches!(err, ReclaimError::HistoryError(_)));
    assert_eq!(store.list(HistoryFilter::default()).unwrap().count(), 0);
}

#[test]
fn test_failed_build_consumes_its_id() {
    let store = HistoryStore::with_backend(MemoryBackend::new());

    let err = store
        .append(|id| {
            assert_eq!(id, 1);
            Err(ReclaimError::QuarantineError("no room".to_string()))
        })
        .unwrap_err();
    assert!(matches!(err, ReclaimError::QuarantineError(_)));

    assert_eq!(append(&store, RecordStatus::Applied).id, 2);
    assert!(store.get(1).is_err());
}

#[test]
fn test_list_is_ordered_and_filtered() {
    let store = HistoryStore::with_backend(MemoryBackend::new());
    append(&store, RecordStatus::Applied);
    append(&store, RecordStatus::FailedPartial);
    append(&store, RecordStatus::Applied);

    let ids: Vec<u64> = store
        .list(HistoryFilter::default())
        .unwrap()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let failed: Vec<u64> = store
        .list(HistoryFilter {
            status: Some(RecordStatus::FailedPartial),
            ..Default::default()
        })
        .unwrap()
        .map(|r| r.id)
        .collect();
    assert_eq!(failed, vec![2]);
}

#[test]
fn test_list_time_bounds_are_inclusive() {
    let store = HistoryStore::with_backend(MemoryBackend::new());
    let created = append(&store, RecordStatus::Applied).created_at;

    let exact = HistoryFilter {
        since: Some(created),
        until: Some(created),
        ..Default::default()
    };
    assert_eq!(store.list(exact).unwrap().count(), 1);

    let later = HistoryFilter {
        since: Some(created + Duration::seconds(1)),
        ..Default::default()
    };
    assert_eq!(store.list(later).unwrap().count(), 0);

    let earlier = HistoryFilter {
        until: Some(created - Duration::seconds(1)),
        ..Default::default()
    };
    assert_eq!(store.list(earlier).unwrap().count(), 0);
}

#[test]
fn test_latest() {
    let store = HistoryStore::with_backend(MemoryBackend::new());
    assert!(store.latest().unwrap().is_none());

    append(&store, RecordStatus::Applied);
    append(&store, RecordStatus::Applied);
    assert_eq!(store.latest().unwrap().unwrap().id, 2);
}

#[test]
fn test_update_status_records_transition() {
    let backend = MemoryBackend::new();
    let store = HistoryStore::with_backend(backend.clone());
    append(&store, RecordStatus::Applied);

    let failures = vec![FailedItem::new("/work/1.tmp", "original path is occupied")];
    let updated = store
        .update_status(1, RecordStatus::Applied, failures.clone())
        .unwrap();
    assert_eq!(updated.failed_items, failures);
    assert!(updated.updated_at.is_some());

    let updated = store.update_status(1, RecordStatus::Undone, vec![]).unwrap();
    assert_eq!(updated.status, RecordStatus::Undone);
    assert!(updated.failed_items.is_empty());

    // Items are never rewritten; the log only gains status entries.
    assert_eq!(store.get(1).unwrap().items, record(1, RecordStatus::Applied).items);
    assert_eq!(backend.entries().len(), 3);
}

#[test]
fn test_update_status_rejects_forbidden_transitions() {
    let store = HistoryStore::with_backend(MemoryBackend::new());
    append(&store, RecordStatus::Undone);
    append(&store, RecordStatus::FailedPartial);
    append(&store, RecordStatus::Applied);

    for (id, next) in [
        (1, RecordStatus::Applied),
        (1, RecordStatus::Undone),
        (2, RecordStatus::Undone),
        (3, RecordStatus::FailedPartial),
    ] {
        let err = store.update_status(id, next, vec![]).unwrap_err();
        assert!(matches!(err, ReclaimError::InvalidStateError(_)), "{id} -> {next}");
    }

    assert_eq!(store.get(1).unwrap().status, RecordStatus::Undone);
    assert!(store.get(3).unwrap().updated_at.is_none());

    let err = store.update_status(9, RecordStatus::Undone, vec![]).unwrap_err();
    assert!(matches!(err, ReclaimError::NotFoundError(_)));
}

#[test]
fn test_history_survives_reopen() {
    let (_temp, ctx, store) = durable_store();
    let id = append(&store, RecordStatus::Applied).id;
    store.update_status(id, RecordStatus::Undone, vec![]).unwrap();
    drop(store);

    let reopened = HistoryStore::open(&ctx);
    let got = reopened.get(id).unwrap();
    assert_eq!(got.status, RecordStatus::Undone);
    assert_eq!(got.items.len(), 1);
    assert_eq!(append(&reopened, RecordStatus::Applied).id, id + 1);

    let content = fs::read_to_string(ctx.history_log_path()).unwrap();
    let events: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events[0]["event"], "created");
    assert_eq!(events[1]["event"], "status_changed");
    assert_eq!(events[1]["status"], "undone");
}

#[test]
fn test_counter_is_recovered_from_log_when_missing() {
    let (_temp, ctx, store) = durable_store();
    for _ in 0..5 {
        append(&store, RecordStatus::Applied);
    }
    fs::remove_file(ctx.next_id_path()).unwrap();

    assert_eq!(append(&store, RecordStatus::Applied).id, 6);
}

#[test]
fn test_truncated_trailing_line_is_ignored_and_repaired() {
    let (_temp, ctx, store) = durable_store();
    append(&store, RecordStatus::Applied);

    let log = ctx.history_log_path();
    let mut content = fs::read_to_string(&log).unwrap();
    content.push_str("{\"event\":\"created\",\"record\":{\"id\":2,");
    fs::write(&log, &content).unwrap();

    let ids: Vec<u64> = store
        .list(HistoryFilter::default())
        .unwrap()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![1]);

    // The next append starts on a clean line.
    append(&store, RecordStatus::Applied);
    let ids: Vec<u64> = store
        .list(HistoryFilter::default())
        .unwrap()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_malformed_inner_line_is_an_error() {
    let (_temp, ctx, store) = durable_store();
    append(&store, RecordStatus::Applied);

    let log = ctx.history_log_path();
    let mut content = fs::read_to_string(&log).unwrap();
    content.push_str("not json\n");
    fs::write(&log, &content).unwrap();

    let err = store.get(1).unwrap_err();
    assert!(matches!(err, ReclaimError::HistoryError(_)));
    assert!(err.to_string().contains(":2:"));
}

#[test]
fn test_parse_log_skips_blank_lines() {
    let line = HistoryEntry::Created {
        record: record(1, RecordStatus::Applied),
    }
    .to_ndjson_line()
    .unwrap();
    let content = format!("{}\n\n", line);

    let entries = parse_log(&content, Path::new("ops.ndjson")).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(matches!(&entries[0], HistoryEntry::Created { record } if record.id == 1));
}

#[test]
fn test_status_change_for_unknown_record_is_corruption() {
    let backend = MemoryBackend::new();
    backend
        .append(&HistoryEntry::StatusChanged {
            id: 4,
            status: RecordStatus::Undone,
            failed_items: vec![],
            at: Utc::now(),
        })
        .unwrap();
    let store = HistoryStore::with_backend(backend);

    assert!(matches!(store.latest(), Err(ReclaimError::HistoryError(_))));
}

#[test]
fn test_concurrent_appends_are_logged_in_id_order() {
    let (_temp, ctx, _store) = durable_store();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                // Separate stores only share the lock file, like separate processes.
                let store = HistoryStore::open(&ctx);
                (0..5)
                    .map(|_| append(&store, RecordStatus::Applied).id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        let ids = handle.join().unwrap();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        all.extend(ids);
    }
    all.sort_unstable();
    all.dedup();
    assert_eq!(all, (1..=20).collect::<Vec<_>>());

    let logged: Vec<u64> = fs::read_to_string(ctx.history_log_path())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .map(|v| v["record"]["id"].as_u64().unwrap())
        .collect();
    assert_eq!(logged, all);
}

#[test]
fn test_shared_store_serializes_appends() {
    let store = Arc::new(HistoryStore::with_backend(MemoryBackend::new()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                append(&store, RecordStatus::Applied);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let ids: Vec<u64> = store
        .list(HistoryFilter::default())
        .unwrap()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}
