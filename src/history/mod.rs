pub(crate) mod analytics;
pub(crate) mod blob;

use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;

use crate::core::config::{HistoryBackend, Settings};
use crate::core::redis::RedisHandle;
use crate::exam::result::TestResult;
use blob::{BlobStore, FileBlobStore, MemoryBlobStore, RedisBlobStore};

pub(crate) const HISTORY_KEY: &str = "exam_history";

/// Append-only log of finished sessions kept in a single JSON blob.
///
/// Appends read the blob, push and write it back. Two writers on the same blob
/// race and the last write wins; the store assumes a single writer.
#[derive(Clone)]
pub(crate) struct HistoryStore {
    blobs: Arc<dyn BlobStore>,
}

impl HistoryStore {
    pub(crate) fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub(crate) fn from_settings(settings: &Settings, redis: &RedisHandle) -> Self {
        let history = settings.history();
        let blobs: Arc<dyn BlobStore> = match history.backend {
            HistoryBackend::Memory => Arc::new(MemoryBlobStore::new()),
            HistoryBackend::File => Arc::new(FileBlobStore::new(history.dir.clone())),
            HistoryBackend::Redis => Arc::new(RedisBlobStore::new(redis.clone())),
        };
        tracing::info!(backend = history.backend.as_str(), "Exam history store configured");
        Self::new(blobs)
    }

    pub(crate) fn backend(&self) -> &'static str {
        self.blobs.backend()
    }

    /// Stored results in insertion order. Entries that do not decode are
    /// skipped; unreadable data or a blob that is not a JSON array reads as an
    /// empty history.
    pub(crate) async fn read_all(&self) -> Vec<TestResult> {
        let entries = match self.blobs.read(HISTORY_KEY).await {
            Ok(Some(raw)) => match parse_entries(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(error = %err, "Stored exam history is corrupt; treating it as empty");
                    return Vec::new();
                }
            },
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, backend = self.backend(), "Failed to read exam history");
                return Vec::new();
            }
        };
        decode_results(entries)
    }

    /// Best-effort append. Returns whether the result was persisted; failures
    /// are logged and never propagated to the session flow.
    ///
    /// Stored entries are carried over as they were read, including ones
    /// `read_all` skips. Nothing is written unless the existing blob could be
    /// read as a JSON array.
    pub(crate) async fn append(&self, result: &TestResult) -> bool {
        let stored = match self.blobs.read(HISTORY_KEY).await {
            Ok(Some(raw)) => parse_entries(&raw),
            Ok(None) => Ok(Vec::new()),
            Err(err) => Err(err),
        };
        let mut entries = match stored {
            Ok(entries) => entries,
            Err(err) => {
                // Writing now would replace entries we could not see.
                tracing::warn!(
                    error = %err,
                    result_id = %result.id,
                    "Failed to load exam history before append; result not saved"
                );
                metrics::counter!("exam_history_write_failures_total").increment(1);
                return false;
            }
        };

        let encoded = serde_json::to_value(result).and_then(|entry| {
            entries.push(entry);
            serde_json::to_string(&entries)
        });
        let encoded = match encoded {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode exam history");
                metrics::counter!("exam_history_write_failures_total").increment(1);
                return false;
            }
        };

        match self.blobs.write(HISTORY_KEY, &encoded).await {
            Ok(()) => {
                tracing::debug!(result_id = %result.id, entries = entries.len(), "Exam result saved");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, result_id = %result.id, "Failed to save exam result");
                metrics::counter!("exam_history_write_failures_total").increment(1);
                false
            }
        }
    }
}

fn parse_entries(raw: &str) -> anyhow::Result<Vec<Value>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).context("stored exam history is not a JSON array")
}

fn decode_results(entries: Vec<Value>) -> Vec<TestResult> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(position, entry)| match serde_json::from_value(entry) {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(error = %err, position, "Skipping unreadable exam history entry");
                None
            }
        })
        .collect()
}
