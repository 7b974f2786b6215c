//! End-to-end tests: identifier in, ordered document out.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chanpack::api::ResolveOutcome;
use chanpack::archive::ChannelArchiver;
use chanpack::config::{DownloadConfig, ExportConfig};
use chanpack::error::ResolutionFailure;
use chanpack::export::{ExportFormat, count_sections};
use chanpack::prelude::*;
use common::{MockApi, text_message};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn archiver(api: &Arc<MockApi>) -> ChannelArchiver<MockApi> {
    ChannelArchiver::new(Arc::clone(api))
        .with_download_config(DownloadConfig::new().with_page_size(100))
}

fn section_ids(document: &str) -> Vec<i64> {
    document
        .lines()
        .filter_map(|line| line.strip_prefix("=== Message #"))
        .filter_map(|rest| rest.strip_suffix(" ===")?.parse().ok())
        .collect()
}

#[tokio::test]
async fn test_archive_250_messages_in_three_pages() {
    let api = Arc::new(MockApi::channel(250));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);

    let mut archiver = archiver(&api).with_progress(Arc::new(move |p: DownloadProgress| {
        seen_clone.lock().unwrap().push(p.downloaded);
    }));

    let mut out = Vec::new();
    let summary = archiver
        .archive("https://t.me/testchannel", &mut out, CancellationToken::new())
        .await
        .unwrap();
    let document = String::from_utf8(out).unwrap();

    assert_eq!(api.calls().len(), 3);
    assert_eq!(*seen.lock().unwrap(), vec![100, 200, 250]);
    assert_eq!(summary.records, 250);
    assert_eq!(summary.bytes_written, document.len() as u64);
    assert_eq!(count_sections(&document), 250);

    let ids = section_ids(&document);
    assert_eq!(ids.first(), Some(&1));
    assert_eq!(ids.last(), Some(&250));
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_document_header() {
    let api = Arc::new(MockApi::channel(3));
    let mut out = Vec::new();
    archiver(&api)
        .archive("@testchannel", &mut out, CancellationToken::new())
        .await
        .unwrap();
    let document = String::from_utf8(out).unwrap();

    assert!(document.starts_with("# Test Channel\n"));
    assert!(document.contains("Channel: @testchannel (https://t.me/testchannel)\n"));
    assert!(document.contains("Description:\n  Fixture channel\n"));
    assert!(document.contains("Messages: 3\n"));
    assert!(document.contains("Exported: "));
}

#[tokio::test]
async fn test_order_follows_timestamp_not_retrieval() {
    // Ids and send times disagree for message 3 (imported post)
    let mut messages: Vec<Value> = (1..=4).map(text_message).collect();
    messages[2]["date"] = json!(common::BASE_TS - 3600);
    let api = Arc::new(MockApi::with_messages(messages));

    let mut out = Vec::new();
    archiver(&api)
        .archive("testchannel", &mut out, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(section_ids(&String::from_utf8(out).unwrap()), vec![3, 1, 2, 4]);
}

#[tokio::test]
async fn test_remote_names_cannot_forge_sections() {
    let descriptor =
        ChannelDescriptor::new(4242, common::handle(), "Rust\n=== Message #5 ===");
    let api = Arc::new(
        MockApi::with_messages(vec![json!({
            "type": "message",
            "id": 1,
            "date": common::BASE_TS,
            "from": "Mallory\n=== Message #999 ===",
            "text": "hello"
        })])
        .with_resolve(ResolveOutcome::Found(descriptor)),
    );

    let mut out = Vec::new();
    archiver(&api)
        .archive("testchannel", &mut out, CancellationToken::new())
        .await
        .unwrap();
    let document = String::from_utf8(out).unwrap();

    assert_eq!(count_sections(&document), 1);
    assert_eq!(section_ids(&document), vec![1]);
    assert!(document.contains("From: Mallory === Message #999 ===\n"));
}

#[tokio::test]
async fn test_entity_extraction_end_to_end() {
    let api = Arc::new(MockApi::with_messages(vec![json!({
        "type": "message",
        "id": 1,
        "date": 1705314600,
        "text": "check https://a.b and @carol #news"
    })]));

    let (records, _) = archiver(&api)
        .collect(&api.descriptor, CancellationToken::new())
        .await
        .unwrap();

    let record = &records[0];
    assert_eq!(record.links.iter().collect::<Vec<_>>(), vec!["https://a.b"]);
    assert_eq!(record.mentions.iter().collect::<Vec<_>>(), vec!["carol"]);
    assert_eq!(record.hashtags.iter().collect::<Vec<_>>(), vec!["news"]);
}

#[tokio::test]
async fn test_invalid_handle_never_reaches_api() {
    let api = Arc::new(MockApi::channel(3));
    let err = archiver(&api)
        .archive("ab", Vec::new(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ChanpackError::InvalidHandle(_)));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_channel_is_resolution_error() {
    let api = Arc::new(MockApi::channel(3));
    let err = archiver(&api)
        .archive("@someoneelse", Vec::new(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChanpackError::Resolution {
            reason: ResolutionFailure::NotFound,
            ..
        }
    ));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_private_channel_is_resolution_error() {
    let api = Arc::new(MockApi::channel(3).with_resolve(ResolveOutcome::Private));
    let err = archiver(&api)
        .archive("@testchannel", Vec::new(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_resolution());
    assert!(err.to_string().contains("private"));
}

#[tokio::test]
async fn test_archive_every_format() {
    for format in ExportFormat::all() {
        let api = Arc::new(MockApi::channel(5));
        let mut archiver =
            archiver(&api).with_export_config(ExportConfig::new().with_format(*format));

        let mut out = Vec::new();
        let summary = archiver
            .archive("testchannel", &mut out, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.bytes_written, out.len() as u64, "format: {format}");
        assert!(!out.is_empty());
    }
}

#[tokio::test]
async fn test_archive_to_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.jsonl");
    let api = Arc::new(MockApi::channel(7));

    let (summary, written) = archiver(&api)
        .with_export_config(ExportConfig::new().with_format(ExportFormat::Jsonl))
        .archive_to_path("testchannel", Some(path.clone()), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(written, path);
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 7);
    assert_eq!(summary.bytes_written, content.len() as u64);
}

#[tokio::test]
async fn test_cancelled_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.txt");
    let api = Arc::new(MockApi::channel(7));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = archiver(&api)
        .archive_to_path("testchannel", Some(path.clone()), cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(!path.exists());
}

// =========================================================================
// Persistence sink
// =========================================================================

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<Vec<i64>>>>);

#[async_trait]
impl RecordSink for SharedSink {
    async fn accept(&mut self, batch: &[MessageRecord]) -> Result<()> {
        self.0.lock().unwrap().push(batch.iter().map(|r| r.id).collect());
        Ok(())
    }
}

#[tokio::test]
async fn test_sink_receives_fixed_size_batches() {
    let api = Arc::new(MockApi::channel(250));
    let sink = SharedSink::default();

    let mut archiver = archiver(&api)
        .with_export_config(ExportConfig::new().with_persist_batch_size(60))
        .with_sink(sink.clone());
    archiver
        .archive("testchannel", Vec::new(), CancellationToken::new())
        .await
        .unwrap();

    let batches = sink.0.lock().unwrap().clone();
    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![60, 60, 60, 60, 10]);
    let total: usize = sizes.iter().sum();
    assert_eq!(total, 250);
}

#[tokio::test]
async fn test_jsonl_file_sink_mirrors_run() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = dir.path().join("mirror.jsonl");
    let api = Arc::new(MockApi::channel(12));

    let mut archiver = archiver(&api).with_sink(JsonlFileSink::open(&mirror).await.unwrap());
    archiver
        .archive("testchannel", Vec::new(), CancellationToken::new())
        .await
        .unwrap();

    let content = std::fs::read_to_string(&mirror).unwrap();
    assert_eq!(content.lines().count(), 12);
}
