//! JSON document writer.

use std::io::Write;

use super::ExportHeader;
use crate::error::Result;
use crate::record::MessageRecord;

/// Writes `{"channel": {...}, "messages": [...]}`.
///
/// Records are written one at a time so the whole document is never held
/// in memory as a `Value`.
///
/// # Format
/// ```json
/// {
///   "channel": {"title": "Rust", "handle": "rustlang", "message_count": 2, ...},
///   "messages": [
///     {"id": 1, "timestamp": "2024-01-01T00:00:00Z", ...},
///     {"id": 2, "timestamp": "2024-01-02T00:00:00Z", ...}
///   ]
/// }
/// ```
pub(super) fn write_json<W: Write>(
    records: &[&MessageRecord],
    header: &ExportHeader,
    w: &mut W,
) -> Result<()> {
    w.write_all(b"{\n  \"channel\": ")?;
    serde_json::to_writer(&mut *w, header)?;
    w.write_all(b",\n  \"messages\": [")?;

    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        w.write_all(b"\n    ")?;
        serde_json::to_writer(&mut *w, record)?;
    }
    if !records.is_empty() {
        w.write_all(b"\n  ")?;
    }

    w.write_all(b"]\n}\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    fn header(count: usize) -> ExportHeader {
        ExportHeader {
            title: "Rust".into(),
            handle: "rustlang".into(),
            description: None,
            message_count: count,
            exported_at: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_write_json_is_valid() {
        let a = MessageRecord::new(1, Utc.timestamp_opt(100, 0).unwrap(), "Alice", "Hi");
        let b = MessageRecord::new(2, Utc.timestamp_opt(200, 0).unwrap(), "Bob", "Yo");
        let mut buf = Vec::new();
        write_json(&[&a, &b], &header(2), &mut buf).unwrap();

        let parsed: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["channel"]["handle"], "rustlang");
        assert_eq!(parsed["channel"]["message_count"], 2);
        assert!(parsed["channel"].get("description").is_none());
        let messages = parsed["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["id"], 1);
        assert_eq!(messages[1]["sender_display"], "Bob");
    }

    #[test]
    fn test_write_json_empty() {
        let mut buf = Vec::new();
        write_json(&[], &header(0), &mut buf).unwrap();
        let parsed: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["messages"], Value::Array(vec![]));
    }
}
