//! JSON Lines writer.

use std::io::Write;

use crate::error::Result;
use crate::record::MessageRecord;

/// Writes one JSON object per line.
///
/// # Format
/// ```text
/// {"id":1,"timestamp":"2024-01-01T00:00:00Z","sender_display":"Alice",...}
/// {"id":2,"timestamp":"2024-01-02T00:00:00Z","sender_display":"Bob",...}
/// ```
pub(super) fn write_jsonl<W: Write>(records: &[&MessageRecord], w: &mut W) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut *w, record)?;
        w.write_all(b"\n")?;
    }
    Ok(())
}
