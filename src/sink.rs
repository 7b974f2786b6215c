//! Persistence seam.
//!
//! A [`RecordSink`] receives normalized records in batches while a download
//! is still running. [`BatchingSink`] regroups page-sized batches into
//! fixed-size ones; [`JsonlFileSink`] mirrors them into an append-only file.
//!
//! A sink failure stops the run with [`ChanpackError::Sink`]. Retrying is up
//! to the caller.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{ChanpackError, Result};
use crate::record::MessageRecord;

/// Receiver of normalized record batches.
#[async_trait]
pub trait RecordSink: Send {
    /// Accepts one batch. Records arrive in download order (newest first).
    async fn accept(&mut self, batch: &[MessageRecord]) -> Result<()>;

    /// Called once after the last batch.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    async fn accept(&mut self, batch: &[MessageRecord]) -> Result<()> {
        (**self).accept(batch).await
    }

    async fn finish(&mut self) -> Result<()> {
        (**self).finish().await
    }
}

/// Groups records into batches of exactly `batch_size` before handing them
/// to the inner sink. [`flush`](Self::flush) sends the remainder.
pub struct BatchingSink<S> {
    inner: S,
    batch_size: usize,
    pending: Vec<MessageRecord>,
    batches: u64,
}

impl<S: RecordSink> BatchingSink<S> {
    pub fn new(inner: S, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(ChanpackError::invalid_config(
                "persist_batch_size",
                "must be at least 1",
            ));
        }
        Ok(Self {
            inner,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            batches: 0,
        })
    }

    /// Queues records and forwards every full batch.
    pub async fn push(&mut self, records: impl IntoIterator<Item = MessageRecord>) -> Result<()> {
        for record in records {
            self.pending.push(record);
            if self.pending.len() == self.batch_size {
                self.send_pending().await?;
            }
        }
        Ok(())
    }

    /// Forwards any partial batch and finishes the inner sink.
    pub async fn flush(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            self.send_pending().await?;
        }
        self.inner.finish().await
    }

    /// Number of batches forwarded so far.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    async fn send_pending(&mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.pending);
        self.inner.accept(&batch).await?;
        self.batches += 1;
        tracing::debug!(records = batch.len(), batches = self.batches, "Batch persisted");
        Ok(())
    }
}

/// Appends every record as one JSON line to a file.
pub struct JsonlFileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl JsonlFileSink {
    /// Opens `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(ChanpackError::invalid_config("persist", "path is empty"));
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| ChanpackError::sink(format!("{}: {e}", path.display())))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn sink_error(&self, e: impl std::fmt::Display) -> ChanpackError {
        ChanpackError::sink(format!("{}: {e}", self.path.display()))
    }
}

#[async_trait]
impl RecordSink for JsonlFileSink {
    async fn accept(&mut self, batch: &[MessageRecord]) -> Result<()> {
        let mut buf = Vec::new();
        for record in batch {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        if let Err(e) = self.writer.write_all(&buf).await {
            return Err(self.sink_error(e));
        }
        if let Err(e) = self.writer.flush().await {
            return Err(self.sink_error(e));
        }
        self.written += batch.len() as u64;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if let Err(e) = self.writer.flush().await {
            return Err(self.sink_error(e));
        }
        tracing::info!(path = %self.path.display(), records = self.written, "Persisted records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[derive(Default)]
    struct Collect {
        batches: Vec<Vec<i64>>,
        finished: bool,
    }

    #[async_trait]
    impl RecordSink for Collect {
        async fn accept(&mut self, batch: &[MessageRecord]) -> Result<()> {
            self.batches.push(batch.iter().map(|r| r.id).collect());
            Ok(())
        }

        async fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl RecordSink for Failing {
        async fn accept(&mut self, _batch: &[MessageRecord]) -> Result<()> {
            Err(ChanpackError::sink("database unavailable"))
        }
    }

    fn records(ids: std::ops::RangeInclusive<i64>) -> Vec<MessageRecord> {
        ids.map(|id| MessageRecord::new(id, Utc.timestamp_opt(id, 0).unwrap(), "", "x"))
            .collect()
    }

    #[tokio::test]
    async fn test_batching_fixed_size() {
        let mut sink = BatchingSink::new(Collect::default(), 3).unwrap();
        sink.push(records(1..=4)).await.unwrap();
        sink.push(records(5..=7)).await.unwrap();
        assert_eq!(sink.batches(), 2);
        assert_eq!(sink.pending(), 1);

        sink.flush().await.unwrap();
        let inner = sink.into_inner();
        assert_eq!(inner.batches, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
        assert!(inner.finished);
    }

    #[tokio::test]
    async fn test_batching_rejects_zero() {
        assert!(BatchingSink::new(Collect::default(), 0).is_err());
    }

    #[tokio::test]
    async fn test_sink_failure_propagates() {
        let mut sink = BatchingSink::new(Box::new(Failing) as Box<dyn RecordSink>, 1).unwrap();
        let err = sink.push(records(1..=1)).await.unwrap_err();
        assert!(err.is_retryable_by_caller());
    }

    #[tokio::test]
    async fn test_jsonl_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.jsonl");

        let mut sink = JsonlFileSink::open(&path).await.unwrap();
        sink.accept(&records(1..=2)).await.unwrap();
        sink.finish().await.unwrap();

        let mut sink = JsonlFileSink::open(&path).await.unwrap();
        sink.accept(&records(3..=3)).await.unwrap();
        sink.finish().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let ids: Vec<i64> = content
            .lines()
            .map(|line| serde_json::from_str::<MessageRecord>(line).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_jsonl_file_sink_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("mirror.jsonl");
        let err = JsonlFileSink::open(&path).await.err().unwrap();
        assert!(matches!(err, ChanpackError::Sink(_)));
    }
}
