//! Durable record store on append-only JSON-lines logs
//!
//! Layout of the store directory:
//! - `analyses.jsonl`: one line per saved record, never rewritten
//! - `sync_queue.jsonl`: queue events (`enqueued`, `retry`, `ack`)
//!
//! Every line carries the storage schema version. On open both logs are
//! replayed into the in-memory index. A line that fails to parse at the
//! very end of a log is a write torn by a crash before `sync_data`
//! returned; it is truncated away with a warning. A final line that parses
//! but lost its newline gets one appended, so the next append starts on a
//! fresh line. An unparseable line anywhere else is corruption and fails
//! the open.
//!
//! Each mutation is written and synced before the index changes, so an
//! acknowledged call survives a crash. A failed append is cut back off the
//! log before the error is returned. The queue log is compacted
//! (rewritten to a temp file, then renamed over) when the queue drains or
//! when stale events outnumber live items.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::index::{lock, StoreIndex};
use super::{AnalysisRecord, RecordStore, SyncQueueItem};
use crate::constants::versions::STORAGE_SCHEMA_VERSION;
use crate::{AnalysisError, Result};

const ANALYSES_LOG: &str = "analyses.jsonl";
const QUEUE_LOG: &str = "sync_queue.jsonl";
const QUEUE_LOG_TMP: &str = "sync_queue.jsonl.tmp";

/// Queue logs shorter than this are never compacted while items remain
const COMPACTION_MIN_EVENTS: usize = 64;
/// Compact once the log holds this many events per live item
const COMPACTION_RATIO: usize = 4;

#[derive(Debug, Serialize, Deserialize)]
struct RecordLine {
    schema: String,
    record: AnalysisRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueueLine {
    schema: String,
    event: QueueEvent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum QueueEvent {
    Enqueued(SyncQueueItem),
    Retry {
        local_id: String,
        attempt_count: u32,
        error: String,
    },
    Ack {
        local_id: String,
    },
}

struct FileState {
    index: StoreIndex,
    analyses: File,
    queue: File,
    /// Events currently in the queue log
    queue_events: usize,
}

/// Record store persisted under a directory
pub struct FileRecordStore {
    root: PathBuf,
    state: Mutex<FileState>,
}

impl std::fmt::Debug for FileRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRecordStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FileRecordStore {
    /// Open or create a store in `root`, replaying existing logs
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::StorageError` if the directory or logs
    /// cannot be opened, a log has corrupt interior lines, or a line was
    /// written under another storage schema.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            AnalysisError::storage(format!("cannot create store directory {}", root.display()), e)
        })?;

        let analyses_path = root.join(ANALYSES_LOG);
        let queue_path = root.join(QUEUE_LOG);
        let analyses = open_log(&analyses_path)?;
        let queue = open_log(&queue_path)?;

        let mut index = StoreIndex::default();

        let record_lines: Vec<RecordLine> = replay(&analyses, &analyses_path)?;
        for line in record_lines {
            check_schema(&line.schema, &analyses_path)?;
            index.insert_record(line.record);
        }

        let queue_lines: Vec<QueueLine> = replay(&queue, &queue_path)?;
        let queue_events = queue_lines.len();
        for line in queue_lines {
            check_schema(&line.schema, &queue_path)?;
            match line.event {
                QueueEvent::Enqueued(item) => {
                    index.enqueue(item);
                }
                QueueEvent::Retry {
                    local_id,
                    attempt_count,
                    error,
                } => {
                    index.set_retry(&local_id, attempt_count, &error);
                }
                QueueEvent::Ack { local_id } => {
                    index.remove_from_queue(&local_id);
                }
            }
        }

        info!(
            "Opened record store {}: {} records, {} pending sync",
            root.display(),
            index.record_count(),
            index.queue_len()
        );

        Ok(Self {
            root,
            state: Mutex::new(FileState {
                index,
                analyses,
                queue,
                queue_events,
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn append_queue_event(&self, state: &mut FileState, event: QueueEvent) -> Result<()> {
        let line = QueueLine {
            schema: STORAGE_SCHEMA_VERSION.to_string(),
            event,
        };
        append_line(&mut state.queue, &line, &self.root.join(QUEUE_LOG))?;
        state.queue_events += 1;
        Ok(())
    }

    fn save_locked(&self, state: &mut FileState, record: &AnalysisRecord) -> Result<()> {
        if state.index.contains_record(&record.local_id) {
            return Ok(());
        }

        let line = RecordLine {
            schema: STORAGE_SCHEMA_VERSION.to_string(),
            record: record.clone(),
        };
        append_line(&mut state.analyses, &line, &self.root.join(ANALYSES_LOG))?;
        state.index.insert_record(record.clone());
        Ok(())
    }

    /// Returns false if the record was already queued
    fn enqueue_locked(
        &self,
        state: &mut FileState,
        local_id: &str,
        queued_at: DateTime<Utc>,
    ) -> Result<bool> {
        if state.index.is_queued(local_id) {
            return Ok(false);
        }

        let item = SyncQueueItem::new(local_id, queued_at);
        self.append_queue_event(state, QueueEvent::Enqueued(item.clone()))?;
        state.index.enqueue(item);
        Ok(true)
    }

    fn acknowledge_locked(&self, state: &mut FileState, local_id: &str) -> Result<()> {
        if !state.index.is_queued(local_id) {
            return Ok(());
        }

        self.append_queue_event(
            state,
            QueueEvent::Ack {
                local_id: local_id.to_string(),
            },
        )?;
        state.index.remove_from_queue(local_id);
        self.compact_if_needed(state)
    }

    fn compact_if_needed(&self, state: &mut FileState) -> Result<()> {
        let live = state.index.queue_len();
        let drained = live == 0 && state.queue_events > 0;
        let bloated = state.queue_events >= COMPACTION_MIN_EVENTS
            && state.queue_events > live * COMPACTION_RATIO;
        if drained || bloated {
            self.compact_queue(state)?;
        }
        Ok(())
    }

    /// Rewrite the queue log as one `enqueued` event per live item
    fn compact_queue(&self, state: &mut FileState) -> Result<()> {
        let tmp_path = self.root.join(QUEUE_LOG_TMP);
        let queue_path = self.root.join(QUEUE_LOG);
        let pending = state.index.pending();

        {
            let mut tmp = File::create(&tmp_path).map_err(|e| {
                AnalysisError::storage(format!("cannot create {}", tmp_path.display()), e)
            })?;
            for item in &pending {
                let line = QueueLine {
                    schema: STORAGE_SCHEMA_VERSION.to_string(),
                    event: QueueEvent::Enqueued(item.clone()),
                };
                write_line(&mut tmp, &line, &tmp_path)?;
            }
            tmp.sync_all().map_err(|e| {
                AnalysisError::storage(format!("cannot sync {}", tmp_path.display()), e)
            })?;
        }

        fs::rename(&tmp_path, &queue_path).map_err(|e| {
            AnalysisError::storage(format!("cannot replace {}", queue_path.display()), e)
        })?;
        state.queue = open_log(&queue_path)?;

        debug!(
            "Compacted sync queue log from {} to {} events",
            state.queue_events,
            pending.len()
        );
        state.queue_events = pending.len();
        Ok(())
    }
}

impl RecordStore for FileRecordStore {
    fn save_validated_analysis(&self, record: &AnalysisRecord) -> Result<()> {
        let mut state = lock(&self.state)?;
        self.save_locked(&mut state, record)
    }

    fn save_and_enqueue(&self, record: &AnalysisRecord, queued_at: DateTime<Utc>) -> Result<()> {
        let mut state = lock(&self.state)?;
        let newly_queued = self.enqueue_locked(&mut state, &record.local_id, queued_at)?;

        if let Err(e) = self.save_locked(&mut state, record) {
            if newly_queued {
                if let Err(rollback) = self.acknowledge_locked(&mut state, &record.local_id) {
                    // Left as an orphan; the next sync pass drops it
                    warn!(
                        "Cannot withdraw queue item {}: {}",
                        record.local_id, rollback
                    );
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn get_by_id(&self, local_id: &str) -> Result<Option<AnalysisRecord>> {
        Ok(lock(&self.state)?.index.record(local_id))
    }

    fn list_analyses(&self) -> Result<Vec<AnalysisRecord>> {
        Ok(lock(&self.state)?.index.records())
    }

    fn enqueue_for_sync(&self, local_id: &str, queued_at: DateTime<Utc>) -> Result<()> {
        let mut state = lock(&self.state)?;
        self.enqueue_locked(&mut state, local_id, queued_at)
            .map(|_| ())
    }

    fn list_pending_queue(&self) -> Result<Vec<SyncQueueItem>> {
        Ok(lock(&self.state)?.index.pending())
    }

    fn mark_retry(&self, local_id: &str, error: &str) -> Result<()> {
        let mut state = lock(&self.state)?;
        let Some(attempt_count) = state.index.next_attempt(local_id) else {
            return Ok(());
        };

        self.append_queue_event(
            &mut state,
            QueueEvent::Retry {
                local_id: local_id.to_string(),
                attempt_count,
                error: error.to_string(),
            },
        )?;
        state.index.set_retry(local_id, attempt_count, error);
        self.compact_if_needed(&mut state)
    }

    fn acknowledge(&self, local_id: &str) -> Result<()> {
        let mut state = lock(&self.state)?;
        self.acknowledge_locked(&mut state, local_id)
    }
}

fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| AnalysisError::storage(format!("cannot open {}", path.display()), e))
}

fn check_schema(schema: &str, path: &Path) -> Result<()> {
    if schema == STORAGE_SCHEMA_VERSION {
        Ok(())
    } else {
        Err(AnalysisError::storage_corrupt(format!(
            "{} was written with schema '{}', expected '{}'",
            path.display(),
            schema,
            STORAGE_SCHEMA_VERSION
        )))
    }
}

fn write_line<T: Serialize>(file: &mut File, value: &T, path: &Path) -> Result<()> {
    let mut bytes = serde_json::to_vec(value)
        .map_err(|e| AnalysisError::storage(format!("cannot encode entry for {}", path.display()), e))?;
    bytes.push(b'\n');
    file.write_all(&bytes)
        .map_err(|e| AnalysisError::storage(format!("cannot write {}", path.display()), e))
}

/// Append and sync one line; on failure the log is cut back to its prior length
fn append_line<T: Serialize>(file: &mut File, value: &T, path: &Path) -> Result<()> {
    let len_before = file
        .metadata()
        .map_err(|e| AnalysisError::storage(format!("cannot stat {}", path.display()), e))?
        .len();

    let appended = write_line(file, value, path).and_then(|()| {
        file.sync_data()
            .map_err(|e| AnalysisError::storage(format!("cannot sync {}", path.display()), e))
    });

    if appended.is_err() {
        if let Err(e) = file.set_len(len_before).and_then(|()| file.sync_all()) {
            warn!(
                "Cannot roll back partial append to {}: {}",
                path.display(),
                e
            );
        }
    }
    appended
}

/// Parse every line of a log, truncating a torn final line
fn replay<T: DeserializeOwned>(file: &File, path: &Path) -> Result<Vec<T>> {
    let mut bytes = Vec::new();
    let mut reader = file;
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| AnalysisError::storage(format!("cannot read {}", path.display()), e))?;

    let lines: Vec<&[u8]> = bytes.split(|b| *b == b'\n').collect();
    let last_content = lines
        .iter()
        .rposition(|line| !line.iter().all(u8::is_ascii_whitespace));

    let mut entries = Vec::new();
    let mut offset = 0u64;
    let mut truncate_to = None;

    for (line_idx, line) in lines.iter().enumerate() {
        let line_len = line.len() as u64 + 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            offset += line_len;
            continue;
        }
        match serde_json::from_slice::<T>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) if Some(line_idx) == last_content => {
                warn!(
                    "Truncating torn tail at line {} of {}: {}",
                    line_idx + 1,
                    path.display(),
                    e
                );
                truncate_to = Some(offset);
            }
            Err(e) => {
                return Err(AnalysisError::StorageError {
                    message: format!("corrupt entry at line {} of {}", line_idx + 1, path.display()),
                    source: Some(Box::new(e)),
                });
            }
        }
        offset += line_len;
    }

    if let Some(len) = truncate_to {
        file.set_len(len)
            .and_then(|()| file.sync_all())
            .map_err(|e| AnalysisError::storage(format!("cannot truncate {}", path.display()), e))?;
    } else if bytes.last().is_some_and(|b| *b != b'\n') {
        // A complete final entry whose newline never reached the disk
        debug!("Terminating unfinished final line of {}", path.display());
        let mut writer = file;
        writer
            .write_all(b"\n")
            .and_then(|()| file.sync_data())
            .map_err(|e| AnalysisError::storage(format!("cannot repair {}", path.display()), e))?;
    }

    Ok(entries)
}
