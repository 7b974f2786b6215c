//! CSV writer.

use std::io::Write;

use crate::error::Result;
use crate::record::MessageRecord;

const HEADER: [&str; 11] = [
    "ID", "Date", "Sender", "Text", "Media", "Links", "Mentions", "Hashtags", "ReplyTo", "Views",
    "Edited",
];

/// Writes records as CSV.
///
/// # Format
/// - Delimiter: `;`
/// - Columns: `ID`, `Date`, `Sender`, `Text`, `Media`, `Links`, `Mentions`,
///   `Hashtags`, `ReplyTo`, `Views`, `Edited`
/// - Set-valued columns are space-separated
pub(super) fn write_csv<W: Write>(records: &[&MessageRecord], w: &mut W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(w);
    writer.write_record(HEADER)?;
    for record in records {
        writer.write_record(build_record(record))?;
    }
    writer.flush()?;
    Ok(())
}

fn build_record(record: &MessageRecord) -> Vec<String> {
    let join = |set: &std::collections::BTreeSet<String>| {
        set.iter().cloned().collect::<Vec<_>>().join(" ")
    };

    vec![
        record.id.to_string(),
        record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        record.sender_display.clone(),
        record.raw_text.clone(),
        if record.media_kind.is_media() {
            record.media_kind.to_string()
        } else {
            String::new()
        },
        join(&record.links),
        join(&record.mentions),
        join(&record.hashtags),
        record.reply_to_id.map(|id| id.to_string()).unwrap_or_default(),
        record.view_count.map(|v| v.to_string()).unwrap_or_default(),
        record
            .edited_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
    ]
}
