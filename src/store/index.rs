//! In-memory index shared by the store implementations

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{AnalysisRecord, SyncQueueItem};
use crate::{AnalysisError, Result};

/// Records by id plus the ordered sync queue
#[derive(Debug, Default)]
pub(super) struct StoreIndex {
    records: HashMap<String, AnalysisRecord>,
    record_order: Vec<String>,
    queue: HashMap<String, SyncQueueItem>,
    queue_order: Vec<String>,
}

impl StoreIndex {
    pub fn contains_record(&self, local_id: &str) -> bool {
        self.records.contains_key(local_id)
    }

    /// Returns false if the id was already present
    pub fn insert_record(&mut self, record: AnalysisRecord) -> bool {
        if self.records.contains_key(&record.local_id) {
            return false;
        }
        self.record_order.push(record.local_id.clone());
        self.records.insert(record.local_id.clone(), record);
        true
    }

    pub fn record(&self, local_id: &str) -> Option<AnalysisRecord> {
        self.records.get(local_id).cloned()
    }

    pub fn records(&self) -> Vec<AnalysisRecord> {
        self.record_order
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_queued(&self, local_id: &str) -> bool {
        self.queue.contains_key(local_id)
    }

    /// Returns false if the record was already queued
    pub fn enqueue(&mut self, item: SyncQueueItem) -> bool {
        if self.queue.contains_key(&item.local_id) {
            return false;
        }
        self.queue_order.push(item.local_id.clone());
        self.queue.insert(item.local_id.clone(), item);
        true
    }

    pub fn pending(&self) -> Vec<SyncQueueItem> {
        self.queue_order
            .iter()
            .filter_map(|id| self.queue.get(id).cloned())
            .collect()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Attempt count a retry of `local_id` would produce, if queued
    pub fn next_attempt(&self, local_id: &str) -> Option<u32> {
        self.queue
            .get(local_id)
            .map(|item| item.attempt_count.saturating_add(1))
    }

    /// Set the retry state of a queued item; false if not queued
    pub fn set_retry(&mut self, local_id: &str, attempt_count: u32, error: &str) -> bool {
        match self.queue.get_mut(local_id) {
            Some(item) => {
                item.attempt_count = attempt_count;
                item.last_error = Some(error.to_string());
                true
            }
            None => false,
        }
    }

    /// Returns false if the item was not queued
    pub fn remove_from_queue(&mut self, local_id: &str) -> bool {
        if self.queue.remove(local_id).is_none() {
            return false;
        }
        self.queue_order.retain(|id| id != local_id);
        true
    }
}

/// Lock a store mutex, mapping poisoning to a processing error
pub(super) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| AnalysisError::ProcessingError {
        message: "record store lock poisoned".to_string(),
    })
}
