use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::index::{lock, StoreIndex};
use super::{AnalysisRecord, RecordStore, SyncQueueItem};
use crate::Result;

/// Non-durable record store
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    index: Mutex<StoreIndex>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn save_validated_analysis(&self, record: &AnalysisRecord) -> Result<()> {
        lock(&self.index)?.insert_record(record.clone());
        Ok(())
    }

    fn save_and_enqueue(&self, record: &AnalysisRecord, queued_at: DateTime<Utc>) -> Result<()> {
        let mut index = lock(&self.index)?;
        index.enqueue(SyncQueueItem::new(record.local_id.as_str(), queued_at));
        index.insert_record(record.clone());
        Ok(())
    }

    fn get_by_id(&self, local_id: &str) -> Result<Option<AnalysisRecord>> {
        Ok(lock(&self.index)?.record(local_id))
    }

    fn list_analyses(&self) -> Result<Vec<AnalysisRecord>> {
        Ok(lock(&self.index)?.records())
    }

    fn enqueue_for_sync(&self, local_id: &str, queued_at: DateTime<Utc>) -> Result<()> {
        lock(&self.index)?.enqueue(SyncQueueItem::new(local_id, queued_at));
        Ok(())
    }

    fn list_pending_queue(&self) -> Result<Vec<SyncQueueItem>> {
        Ok(lock(&self.index)?.pending())
    }

    fn mark_retry(&self, local_id: &str, error: &str) -> Result<()> {
        let mut index = lock(&self.index)?;
        if let Some(attempt) = index.next_attempt(local_id) {
            index.set_retry(local_id, attempt, error);
        }
        Ok(())
    }

    fn acknowledge(&self, local_id: &str) -> Result<()> {
        lock(&self.index)?.remove_from_queue(local_id);
        Ok(())
    }
}
