//! Delivery of stored analyses to the remote system
//!
//! Delivery is at-least-once: an item leaves the queue only when the
//! remote side acknowledges it. Every attempt for a record carries the
//! same idempotency key (the record id), so the remote side can discard
//! duplicates after a retry.
//!
//! There is no backoff policy here; callers decide when to run a pass.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::store::{AnalysisRecord, RecordStore};
use crate::{AnalysisError, Result};

/// Body of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub local_id: String,
    pub idempotency_key: String,
    pub analysis: AnalysisRecord,
}

/// Outcome of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncResult {
    Ack { remote_receipt_id: String },
    /// Transport errors and timeouts map here
    RetryableFailure { reason: String },
}

/// Remote endpoint receiving analyses
pub trait SyncApi: Send + Sync {
    fn push_analysis(&self, payload: &SyncPayload) -> SyncResult;
}

/// Endpoint for devices with no remote configured: every push fails
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSyncApi;

impl SyncApi for OfflineSyncApi {
    fn push_analysis(&self, _payload: &SyncPayload) -> SyncResult {
        SyncResult::RetryableFailure {
            reason: "no remote endpoint configured".to_string(),
        }
    }
}

/// Counters for one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRunStats {
    /// Delivery attempts made
    pub sent: u32,
    pub acked: u32,
    pub failed: u32,
    /// Queue items dropped because their record is missing
    pub orphaned: u32,
}

/// Drains the sync queue of a record store into a remote API
pub struct SyncEngine {
    store: Arc<dyn RecordStore>,
    api: Arc<dyn SyncApi>,
    run_guard: Mutex<()>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine").finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(store: Arc<dyn RecordStore>, api: Arc<dyn SyncApi>) -> Self {
        Self {
            store,
            api,
            run_guard: Mutex::new(()),
        }
    }

    /// Make exactly one delivery attempt per currently queued item
    ///
    /// Concurrent calls on the same engine run one after the other.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::StorageError` if the store cannot be read or
    /// updated. Failed deliveries are counted, not returned as errors.
    pub fn run_once(&self) -> Result<SyncRunStats> {
        let _guard = self.run_guard.lock().map_err(|_| AnalysisError::ProcessingError {
            message: "sync run guard poisoned".to_string(),
        })?;

        let mut stats = SyncRunStats::default();

        for item in self.store.list_pending_queue()? {
            let Some(record) = self.store.get_by_id(&item.local_id)? else {
                warn!("Dropping orphaned sync item {}", item.local_id);
                self.store.acknowledge(&item.local_id)?;
                stats.orphaned += 1;
                continue;
            };

            let payload = SyncPayload {
                local_id: item.local_id.clone(),
                idempotency_key: item.idempotency_key.clone(),
                analysis: record,
            };
            stats.sent += 1;

            match self.api.push_analysis(&payload) {
                SyncResult::Ack { remote_receipt_id } => {
                    self.store.acknowledge(&item.local_id)?;
                    stats.acked += 1;
                    debug!("Delivered {} (receipt {})", item.local_id, remote_receipt_id);
                }
                SyncResult::RetryableFailure { reason } => {
                    warn!(
                        "Delivery of {} failed (attempt {}): {}",
                        item.local_id,
                        item.attempt_count + 1,
                        reason
                    );
                    self.store.mark_retry(&item.local_id, &reason)?;
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Sync pass: {} sent, {} acked, {} failed, {} orphaned",
            stats.sent, stats.acked, stats.failed, stats.orphaned
        );
        Ok(stats)
    }
}
