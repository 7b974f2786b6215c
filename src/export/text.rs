//! Plain text document writer.
//!
//! ```text
//! # Rust News
//! Channel: @rustlang (https://t.me/rustlang)
//! Messages: 2
//! Exported: 2024-06-15 12:00:00 UTC
//!
//! === Message #41 ===
//! Date: 2024-06-15 11:58:00 UTC
//! From: Rust News
//!
//! Release day!
//!
//! === Message #42 ===
//! ...
//! ```
//!
//! Body lines that would start with `===` are prefixed with `\` and line
//! breaks inside single-line fields are flattened to spaces, so that
//! [`count_sections`] only ever sees real section markers.

use std::borrow::Cow;
use std::io::{self, Write};

use super::ExportHeader;
use crate::record::{MediaMeta, MessageRecord};

/// Start of every section marker line.
pub const SECTION_PREFIX: &str = "=== Message #";
const SECTION_SUFFIX: &str = " ===";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

pub(super) fn write_text<W: Write>(
    records: &[&MessageRecord],
    header: &ExportHeader,
    w: &mut W,
) -> io::Result<()> {
    write_header(header, w)?;
    for record in records {
        write_section(record, header, w)?;
    }
    Ok(())
}

fn write_header<W: Write>(header: &ExportHeader, w: &mut W) -> io::Result<()> {
    writeln!(w, "# {}", single_line(&header.title))?;
    writeln!(
        w,
        "Channel: @{} (https://t.me/{})",
        header.handle, header.handle
    )?;
    if let Some(description) = &header.description {
        writeln!(w, "Description:")?;
        for line in description.lines() {
            writeln!(w, "  {line}")?;
        }
    }
    writeln!(w, "Messages: {}", header.message_count)?;
    writeln!(w, "Exported: {}", header.exported_at.format(DATE_FORMAT))?;
    writeln!(w)
}

fn write_section<W: Write>(
    record: &MessageRecord,
    header: &ExportHeader,
    w: &mut W,
) -> io::Result<()> {
    writeln!(w, "{SECTION_PREFIX}{}{SECTION_SUFFIX}", record.id)?;
    writeln!(w, "Date: {}", record.timestamp.format(DATE_FORMAT))?;

    let from = if record.sender_display.trim().is_empty() {
        header.title.as_str()
    } else {
        record.sender_display.as_str()
    };
    writeln!(w, "From: {}", single_line(from))?;

    if let Some(views) = record.view_count {
        writeln!(w, "Views: {views}")?;
    }
    if record.is_edited {
        match record.edited_at {
            Some(at) => writeln!(w, "Edited: {}", at.format(DATE_FORMAT))?,
            None => writeln!(w, "Edited: yes")?,
        }
    }
    if let Some(origin) = &record.forward_origin {
        let source = match (&origin.channel, &origin.sender) {
            (Some(channel), Some(sender)) => format!("{sender} via {channel}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => "unknown".to_string(),
        };
        write!(w, "Forwarded from: {}", single_line(&source))?;
        if let Some(id) = origin.original_id {
            write!(w, " #{id}")?;
        }
        if let Some(date) = origin.original_date {
            write!(w, " ({})", date.format(DATE_FORMAT))?;
        }
        writeln!(w)?;
    }
    if let Some(reply_to) = record.reply_to_id {
        writeln!(w, "Reply to: #{reply_to}")?;
    }

    writeln!(w)?;
    if record.has_text() {
        for line in record.raw_text.lines() {
            writeln!(w, "{}", escape_line(line))?;
        }
    } else {
        writeln!(w, "{}", record.media_kind.placeholder())?;
    }

    if record.media_kind.is_media() {
        writeln!(w)?;
        writeln!(w, "Media: {}", record.media_kind)?;
        if let Some(meta) = &record.media_meta {
            write_media_meta(meta, w)?;
        }
    }

    if !record.links.is_empty() {
        writeln!(w)?;
        writeln!(w, "Links:")?;
        for link in &record.links {
            writeln!(w, "  - {}", single_line(link))?;
        }
    }
    if !record.mentions.is_empty() {
        let mentions: Vec<String> = record.mentions.iter().map(|m| format!("@{m}")).collect();
        writeln!(w, "Mentions: {}", mentions.join(", "))?;
    }
    if !record.hashtags.is_empty() {
        let tags: Vec<String> = record.hashtags.iter().map(|t| format!("#{t}")).collect();
        writeln!(w, "Hashtags: {}", tags.join(", "))?;
    }

    writeln!(w)
}

fn write_media_meta<W: Write>(meta: &MediaMeta, w: &mut W) -> io::Result<()> {
    if let Some(name) = &meta.file_name {
        writeln!(w, "  File: {}", single_line(name))?;
    }
    if let Some(size) = meta.size {
        writeln!(w, "  Size: {}", format_size(size))?;
    }
    if let Some(mime) = &meta.mime {
        writeln!(w, "  Type: {}", single_line(mime))?;
    }
    if let (Some(width), Some(height)) = (meta.width, meta.height) {
        writeln!(w, "  Dimensions: {width}x{height}")?;
    }
    if let Some(secs) = meta.duration_sec {
        writeln!(w, "  Duration: {}", format_duration(secs))?;
    }
    if let Some(caption) = &meta.caption {
        let mut lines = caption.lines();
        writeln!(w, "  Caption: {}", lines.next().unwrap_or_default())?;
        for line in lines {
            writeln!(w, "    {line}")?;
        }
    }
    Ok(())
}

fn escape_line(line: &str) -> Cow<'_, str> {
    if line.starts_with("===") || line.starts_with('\\') {
        format!("\\{line}").into()
    } else {
        line.into()
    }
}

fn single_line(field: &str) -> Cow<'_, str> {
    if field.contains(['\r', '\n']) {
        field.replace(['\r', '\n'], " ").into()
    } else {
        field.into()
    }
}

/// Counts the sections of a text document.
///
/// ```rust
/// use chanpack::export::count_sections;
///
/// let doc = "# T\n\n=== Message #1 ===\nhi\n\n=== Message #2 ===\n\\=== Message #3 ===\n";
/// assert_eq!(count_sections(doc), 2);
/// ```
pub fn count_sections(document: &str) -> usize {
    document
        .lines()
        .filter(|line| {
            line.strip_prefix(SECTION_PREFIX)
                .and_then(|rest| rest.strip_suffix(SECTION_SUFFIX))
                .is_some_and(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        })
        .count()
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn format_duration(secs: u32) -> String {
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
