//! Local persistence of accepted analyses and their delivery queue
//!
//! Records are append-only: an analysis is saved once and never mutated.
//! The sync queue holds one item per record awaiting delivery; items are
//! removed on acknowledgment and only ever mutated by a retry (attempt
//! count and last error).
//!
//! Two implementations share the same in-memory index:
//! - [`MemoryRecordStore`] for tests and ephemeral use
//! - [`FileRecordStore`] backed by append-only JSON-lines logs that are
//!   replayed on open

mod file;
mod index;
mod memory;

pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::ComplianceStatus;
use crate::Result;

/// Durable result of one completed, accepted analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub local_id: String,
    pub captured_at: DateTime<Utc>,
    pub ppm: u32,
    pub compliance_status: ComplianceStatus,
    /// Reference of the analysed image (path or device URI)
    pub image_ref: String,
    pub capture_rules_version: String,
    pub analysis_rules_version: String,
}

/// Pending delivery of one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// Id of the queued [`AnalysisRecord`]
    pub local_id: String,
    /// Deduplication key sent with every delivery attempt of this record
    pub idempotency_key: String,
    pub queued_at: DateTime<Utc>,
    pub attempt_count: u32,
    pub last_error: Option<String>,
}

impl SyncQueueItem {
    /// Fresh queue item; the record id doubles as idempotency key
    pub fn new(local_id: impl Into<String>, queued_at: DateTime<Utc>) -> Self {
        let local_id = local_id.into();
        Self {
            idempotency_key: local_id.clone(),
            local_id,
            queued_at,
            attempt_count: 0,
            last_error: None,
        }
    }
}

/// Generate a new record id
pub fn new_local_id() -> String {
    Uuid::new_v4().to_string()
}

/// Local record store consumed by the workflow and the sync engine
///
/// Implementations serialize all mutations internally, so a store may be
/// shared across threads behind an `Arc`.
pub trait RecordStore: Send + Sync {
    /// Append a record; no-op if the id already exists
    fn save_validated_analysis(&self, record: &AnalysisRecord) -> Result<()>;

    /// Save a record together with its queue item
    ///
    /// The queue item is written first. A failure between the two writes
    /// leaves at worst a queue item without a record, which the sync engine
    /// acknowledges as an orphan; a stored record is never left unqueued.
    /// Implementations holding a single lock should override this so a
    /// concurrent sync pass never sees the intermediate state.
    fn save_and_enqueue(&self, record: &AnalysisRecord, queued_at: DateTime<Utc>) -> Result<()> {
        self.enqueue_for_sync(&record.local_id, queued_at)?;
        self.save_validated_analysis(record)
    }

    fn get_by_id(&self, local_id: &str) -> Result<Option<AnalysisRecord>>;

    /// All records in save order
    fn list_analyses(&self) -> Result<Vec<AnalysisRecord>>;

    /// Queue a record for delivery; no-op if already queued
    fn enqueue_for_sync(&self, local_id: &str, queued_at: DateTime<Utc>) -> Result<()>;

    /// Queued items in enqueue order
    fn list_pending_queue(&self) -> Result<Vec<SyncQueueItem>>;

    /// Record a failed delivery attempt; no-op if not queued
    fn mark_retry(&self, local_id: &str, error: &str) -> Result<()>;

    /// Drop a delivered (or orphaned) item; no-op if not queued
    fn acknowledge(&self, local_id: &str) -> Result<()>;
}
