//! End-to-end archive pipeline.
//!
//! [`ChannelArchiver`] chains the stages together: parse the user's channel
//! identifier, resolve it, download every page, optionally mirror batches into
//! a [`RecordSink`], and serialize the ordered document.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chanpack::api::HttpChannelApi;
//! use chanpack::archive::ChannelArchiver;
//! use chanpack::config::ApiConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> chanpack::Result<()> {
//! let api = HttpChannelApi::new(&ApiConfig::new("https://gateway.example.com/v1"))?;
//! let mut archiver = ChannelArchiver::new(Arc::new(api));
//!
//! let mut out = Vec::new();
//! let summary = archiver
//!     .archive("https://t.me/rustlang", &mut out, CancellationToken::new())
//!     .await?;
//! println!("{} messages, {} bytes", summary.records, summary.bytes_written);
//! # Ok(())
//! # }
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::ChannelApi;
use crate::channel::{ChannelDescriptor, resolve_channel};
use crate::config::{DownloadConfig, ExportConfig};
use crate::download::Downloader;
use crate::error::{ChanpackError, Result};
use crate::export::{self, ExportFormat};
use crate::handle;
use crate::progress::{DownloadProgress, ProgressCallback, no_progress};
use crate::record::MessageRecord;
use crate::sink::{BatchingSink, RecordSink};

/// Outcome of a completed archive run.
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub descriptor: ChannelDescriptor,
    /// Records written to the document.
    pub records: usize,
    pub bytes_written: u64,
    /// Final download progress, including skipped records.
    pub progress: DownloadProgress,
}

/// Runs the full pipeline for one channel at a time.
pub struct ChannelArchiver<A: ChannelApi + ?Sized> {
    api: Arc<A>,
    download: DownloadConfig,
    export: ExportConfig,
    on_progress: ProgressCallback,
    sink: Option<Box<dyn RecordSink>>,
}

impl<A: ChannelApi + ?Sized> ChannelArchiver<A> {
    /// Creates an archiver with default configuration and no sink.
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            download: DownloadConfig::default(),
            export: ExportConfig::default(),
            on_progress: no_progress(),
            sink: None,
        }
    }

    #[must_use]
    pub fn with_download_config(mut self, config: DownloadConfig) -> Self {
        self.download = config;
        self
    }

    #[must_use]
    pub fn with_export_config(mut self, config: ExportConfig) -> Self {
        self.export = config;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = callback;
        self
    }

    /// Mirrors every downloaded record into `sink`, in batches of
    /// `persist_batch_size`.
    #[must_use]
    pub fn with_sink(mut self, sink: impl RecordSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn format(&self) -> ExportFormat {
        self.export.format
    }

    /// Parses `input` and resolves it into a descriptor.
    pub async fn resolve(&self, input: &str) -> Result<ChannelDescriptor> {
        let handle = handle::parse(input)?;
        resolve_channel(&*self.api, &handle).await
    }

    /// Downloads every record of `descriptor`, feeding the sink on the way.
    pub async fn collect(
        &mut self,
        descriptor: &ChannelDescriptor,
        cancel: CancellationToken,
    ) -> Result<(Vec<MessageRecord>, DownloadProgress)> {
        let mut downloader =
            Downloader::new(Arc::clone(&self.api), descriptor, &self.download, cancel)?
                .with_progress(Arc::clone(&self.on_progress));

        let mut sink = match self.sink.take() {
            Some(sink) => Some(BatchingSink::new(sink, self.export.persist_batch_size)?),
            None => None,
        };

        let result = async {
            let mut records = Vec::new();
            while let Some(batch) = downloader.next_batch().await? {
                if let Some(sink) = sink.as_mut() {
                    sink.push(batch.records.iter().cloned()).await?;
                }
                records.extend(batch.records);
            }
            if let Some(sink) = sink.as_mut() {
                sink.flush().await?;
            }
            Ok::<_, ChanpackError>(records)
        }
        .await;

        self.sink = sink.map(BatchingSink::into_inner);
        Ok((result?, downloader.progress()))
    }

    /// Resolves `input`, downloads it and writes the document to `writer`.
    pub async fn archive<W: Write>(
        &mut self,
        input: &str,
        writer: W,
        cancel: CancellationToken,
    ) -> Result<ArchiveSummary> {
        let descriptor = self.resolve(input).await?;
        let (records, progress) = self.collect(&descriptor, cancel).await?;
        let bytes_written = export::serialize(&records, &descriptor, self.export.format, writer)?;

        Ok(ArchiveSummary {
            records: records.len(),
            descriptor,
            bytes_written,
            progress,
        })
    }

    /// Like [`archive`](Self::archive), but writes to a file.
    ///
    /// Without an explicit `output`, the file is `<handle>.<ext>` in the
    /// current directory. The file is created only after the download
    /// succeeds.
    pub async fn archive_to_path(
        &mut self,
        input: &str,
        output: Option<PathBuf>,
        cancel: CancellationToken,
    ) -> Result<(ArchiveSummary, PathBuf)> {
        if output.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(ChanpackError::invalid_config("output", "path is empty"));
        }

        let descriptor = self.resolve(input).await?;
        let (records, progress) = self.collect(&descriptor, cancel).await?;

        let path = output.unwrap_or_else(|| default_output_path(&descriptor, self.export.format));
        let bytes_written =
            export::serialize_to_path(&records, &descriptor, self.export.format, &path)?;

        Ok((
            ArchiveSummary {
                records: records.len(),
                descriptor,
                bytes_written,
                progress,
            },
            path,
        ))
    }
}

/// Returns `<handle>.<ext>` for `descriptor`.
pub fn default_output_path(descriptor: &ChannelDescriptor, format: ExportFormat) -> PathBuf {
    PathBuf::from(format!("{}.{}", descriptor.handle.as_str(), format.extension()))
}
