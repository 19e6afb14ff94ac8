//! Integration tests for durable storage and idempotent delivery

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use peroxide_scan::{
    AnalysisRecord, ComplianceStatus, FileRecordStore, RecordStore, SyncApi, SyncEngine,
    SyncPayload, SyncResult, SyncRunStats,
};

/// Remote side that can be switched on and off, recording every key seen
#[derive(Default)]
struct SwitchableApi {
    available: Mutex<bool>,
    keys_seen: Mutex<Vec<String>>,
}

impl SwitchableApi {
    fn set_available(&self, available: bool) {
        *self.available.lock().unwrap() = available;
    }
}

impl SyncApi for SwitchableApi {
    fn push_analysis(&self, payload: &SyncPayload) -> SyncResult {
        self.keys_seen
            .lock()
            .unwrap()
            .push(payload.idempotency_key.clone());
        if *self.available.lock().unwrap() {
            SyncResult::Ack {
                remote_receipt_id: format!("ack-{}", payload.local_id),
            }
        } else {
            SyncResult::RetryableFailure {
                reason: "server unreachable".to_string(),
            }
        }
    }
}

fn record(local_id: &str) -> AnalysisRecord {
    AnalysisRecord {
        local_id: local_id.to_string(),
        captured_at: Utc.with_ymd_and_hms(2024, 6, 11, 7, 45, 0).unwrap(),
        ppm: 320,
        compliance_status: ComplianceStatus::Compliant,
        image_ref: "images/scan-12.jpg".to_string(),
        capture_rules_version: "capture-rules/v1".to_string(),
        analysis_rules_version: "analysis-rules/v1".to_string(),
    }
}

#[test]
fn test_retry_then_ack_reuses_idempotency_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileRecordStore::open(dir.path()).unwrap());
    let api = Arc::new(SwitchableApi::default());
    let engine = SyncEngine::new(store.clone(), api.clone());

    store.save_validated_analysis(&record("rec-42")).unwrap();
    store
        .enqueue_for_sync("rec-42", Utc.with_ymd_and_hms(2024, 6, 11, 7, 46, 0).unwrap())
        .unwrap();

    let first = engine.run_once().unwrap();
    assert_eq!(first.failed, 1);
    let pending = store.list_pending_queue().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempt_count, 1);
    assert_eq!(pending[0].last_error.as_deref(), Some("server unreachable"));

    api.set_available(true);
    let second = engine.run_once().unwrap();
    assert_eq!(second.acked, 1);
    assert!(store.list_pending_queue().unwrap().is_empty());

    let keys = api.keys_seen.lock().unwrap().clone();
    assert_eq!(keys, vec!["rec-42".to_string(), "rec-42".to_string()]);
}

#[test]
fn test_pending_delivery_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(SwitchableApi::default());

    {
        let store = Arc::new(FileRecordStore::open(dir.path()).unwrap());
        store.save_validated_analysis(&record("rec-7")).unwrap();
        store.enqueue_for_sync("rec-7", Utc::now()).unwrap();
        SyncEngine::new(store, api.clone()).run_once().unwrap();
    }

    let store = Arc::new(FileRecordStore::open(dir.path()).unwrap());
    assert_eq!(store.list_pending_queue().unwrap()[0].attempt_count, 1);

    api.set_available(true);
    let stats = SyncEngine::new(store.clone(), api.clone()).run_once().unwrap();
    assert_eq!(
        stats,
        SyncRunStats {
            sent: 1,
            acked: 1,
            failed: 0,
            orphaned: 0
        }
    );
    assert_eq!(store.list_analyses().unwrap(), vec![record("rec-7")]);
}

#[test]
fn test_concurrent_passes_deliver_once_each() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileRecordStore::open(dir.path()).unwrap());
    let api = Arc::new(SwitchableApi::default());
    api.set_available(true);

    for i in 0..20 {
        let id = format!("rec-{i}");
        store.save_validated_analysis(&record(&id)).unwrap();
        store.enqueue_for_sync(&id, Utc::now()).unwrap();
    }

    let engine = Arc::new(SyncEngine::new(store.clone(), api.clone()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || engine.run_once().unwrap())
        })
        .collect();
    let acked: u32 = handles.into_iter().map(|h| h.join().unwrap().acked).sum();

    assert_eq!(acked, 20);
    assert_eq!(api.keys_seen.lock().unwrap().len(), 20);
    assert!(store.list_pending_queue().unwrap().is_empty());
}
