//! Export serializer.
//!
//! Orders a complete set of [`MessageRecord`]s oldest-first and renders them
//! into one of several document formats:
//!
//! | Format | Shape | Use case |
//! |--------|-------|----------|
//! | Text | header + one `=== Message #<id> ===` section per record | reading, grepping |
//! | JSON | `{"channel": {...}, "messages": [...]}` | structured archives |
//! | JSONL | one record per line | streaming into other tools |
//! | CSV | semicolon-delimited rows (`csv-output` feature) | spreadsheets |
//!
//! Records are ordered by `(timestamp, id)` regardless of the order they were
//! downloaded in.
//!
//! # Example
//!
//! ```rust
//! use chanpack::channel::ChannelDescriptor;
//! use chanpack::export::{ExportFormat, count_sections, to_string};
//! use chanpack::MessageRecord;
//! use chrono::{TimeZone, Utc};
//!
//! let descriptor = ChannelDescriptor::new(1, "rustlang".parse()?, "Rust");
//! let records = vec![
//!     MessageRecord::new(2, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(), "", "second"),
//!     MessageRecord::new(1, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), "", "first"),
//! ];
//!
//! let text = to_string(&records, &descriptor, ExportFormat::Text)?;
//! assert_eq!(count_sections(&text), 2);
//! assert!(text.find("first").unwrap() < text.find("second").unwrap());
//! # Ok::<(), chanpack::ChanpackError>(())
//! ```

#[cfg(feature = "csv-output")]
mod csv_writer;
mod json_writer;
mod jsonl_writer;
mod text;

pub use text::{SECTION_PREFIX, count_sections};

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelDescriptor;
use crate::error::{ChanpackError, Result};
use crate::record::MessageRecord;

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Human-readable sectioned document
    #[default]
    Text,
    /// Single JSON object with header and messages
    Json,
    /// One JSON record per line
    Jsonl,
    /// Semicolon-delimited CSV
    #[cfg(feature = "csv-output")]
    Csv,
}

impl ExportFormat {
    /// Returns the file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Jsonl => "jsonl",
            #[cfg(feature = "csv-output")]
            ExportFormat::Csv => "csv",
        }
    }

    /// Guesses the format from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        ext.parse().ok()
    }

    /// Returns every format compiled into this build.
    pub fn all() -> &'static [ExportFormat] {
        &[
            ExportFormat::Text,
            ExportFormat::Json,
            ExportFormat::Jsonl,
            #[cfg(feature = "csv-output")]
            ExportFormat::Csv,
        ]
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Text => "text",
            ExportFormat::Json => "json",
            ExportFormat::Jsonl => "jsonl",
            #[cfg(feature = "csv-output")]
            ExportFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = ChanpackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            "jsonl" | "ndjson" => Ok(ExportFormat::Jsonl),
            #[cfg(feature = "csv-output")]
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ChanpackError::invalid_config(
                "format",
                format!("unknown export format '{other}'"),
            )),
        }
    }
}

/// Document header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportHeader {
    pub title: String,
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub message_count: usize,
    pub exported_at: DateTime<Utc>,
}

impl ExportHeader {
    pub fn new(descriptor: &ChannelDescriptor, message_count: usize, exported_at: DateTime<Utc>) -> Self {
        Self {
            title: descriptor.title.clone(),
            handle: descriptor.handle.as_str().to_string(),
            description: descriptor
                .description
                .clone()
                .filter(|d| !d.trim().is_empty()),
            message_count,
            exported_at,
        }
    }
}

/// Returns `records` ordered oldest-first, ties broken by id.
pub fn ordered(records: &[MessageRecord]) -> Vec<&MessageRecord> {
    let mut sorted: Vec<&MessageRecord> = records.iter().collect();
    sorted.sort_by_key(|r| (r.timestamp, r.id));
    sorted
}

/// Renders `records` into `writer` and returns the number of bytes written.
///
/// The export timestamp is the current time.
pub fn serialize<W: Write>(
    records: &[MessageRecord],
    descriptor: &ChannelDescriptor,
    format: ExportFormat,
    writer: W,
) -> Result<u64> {
    let header = ExportHeader::new(descriptor, records.len(), Utc::now());
    write_document(records, &header, format, writer)
}

/// Renders `records` under an explicit `header`.
pub fn write_document<W: Write>(
    records: &[MessageRecord],
    header: &ExportHeader,
    format: ExportFormat,
    writer: W,
) -> Result<u64> {
    let sorted = ordered(records);
    let mut out = CountingWriter::new(writer);

    match format {
        ExportFormat::Text => text::write_text(&sorted, header, &mut out)?,
        ExportFormat::Json => json_writer::write_json(&sorted, header, &mut out)?,
        ExportFormat::Jsonl => jsonl_writer::write_jsonl(&sorted, &mut out)?,
        #[cfg(feature = "csv-output")]
        ExportFormat::Csv => csv_writer::write_csv(&sorted, &mut out)?,
    }

    out.flush()?;
    Ok(out.count())
}

/// Renders `records` into a new file at `path`.
///
/// An empty path is an input error.
pub fn serialize_to_path(
    records: &[MessageRecord],
    descriptor: &ChannelDescriptor,
    format: ExportFormat,
    path: impl AsRef<Path>,
) -> Result<u64> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(ChanpackError::invalid_config("output", "path is empty"));
    }
    let file = File::create(path)?;
    let bytes = serialize(records, descriptor, format, BufWriter::new(file))?;
    tracing::info!(path = %path.display(), bytes, format = %format, "Export written");
    Ok(bytes)
}

/// Renders `records` into a string.
pub fn to_string(
    records: &[MessageRecord],
    descriptor: &ChannelDescriptor,
    format: ExportFormat,
) -> Result<String> {
    let mut buf = Vec::new();
    serialize(records, descriptor, format, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ChanpackError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Counts bytes on their way to the inner writer.
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn descriptor() -> ChannelDescriptor {
        ChannelDescriptor::new(1, "rustlang".parse().unwrap(), "Rust")
    }

    fn record(id: i64, secs: i64) -> MessageRecord {
        MessageRecord::new(id, Utc.timestamp_opt(secs, 0).unwrap(), "", format!("msg {id}"))
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("TXT".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!("ndjson".parse::<ExportFormat>().unwrap(), ExportFormat::Jsonl);
        assert!("xml".parse::<ExportFormat>().unwrap_err().is_input());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path("out.jsonl"), Some(ExportFormat::Jsonl));
        assert_eq!(ExportFormat::from_path("out"), None);
        for format in ExportFormat::all() {
            let path = format!("x.{}", format.extension());
            assert_eq!(ExportFormat::from_path(&path), Some(*format));
        }
    }

    #[test]
    fn test_ordered_by_timestamp_then_id() {
        let records = vec![record(3, 200), record(1, 100), record(5, 100), record(2, 50)];
        let ids: Vec<i64> = ordered(&records).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1, 5, 3]);
    }

    #[test]
    fn test_byte_count_matches_output() {
        let records = vec![record(1, 100), record(2, 200)];
        for format in ExportFormat::all() {
            let mut buf = Vec::new();
            let bytes = serialize(&records, &descriptor(), *format, &mut buf).unwrap();
            assert_eq!(bytes, buf.len() as u64, "format: {format}");
        }
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = serialize_to_path(&[], &descriptor(), ExportFormat::Text, "").unwrap_err();
        assert!(err.is_input());
    }

    #[test]
    fn test_serialize_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let bytes =
            serialize_to_path(&[record(1, 100)], &descriptor(), ExportFormat::Text, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(bytes, content.len() as u64);
        assert_eq!(count_sections(&content), 1);
    }
}
