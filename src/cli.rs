//! Command-line interface definition using clap.
//!
//! This module defines:
//! - [`Args`] - CLI argument structure (for use with clap)
//! - [`OutputFormat`] - Output format options
//!
//! `Args` maps onto the library configuration types, so the binary stays a
//! thin shell over [`ChannelArchiver`](crate::archive::ChannelArchiver):
//!
//! ```rust
//! use chanpack::cli::Args;
//! use clap::Parser;
//!
//! let args = Args::parse_from(["chanpack", "@rustlang", "--page-size", "50", "--strict"]);
//! let download = args.download_config();
//! assert_eq!(download.page_size, 50);
//! assert!(!download.skip_invalid);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::{ApiConfig, DownloadConfig, ExportConfig};
use crate::export::ExportFormat;

/// Archive the message history of a public channel into a single document.
#[derive(Parser, Debug, Clone)]
#[command(name = "chanpack")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chanpack @rustlang
    chanpack https://t.me/rustlang -f jsonl
    chanpack t.me/s/rustlang -o rust.txt --page-size 50
    chanpack rustlang --persist mirror.jsonl --strict")]
pub struct Args {
    /// Channel handle or link (@name, name, t.me/name, https://t.me/s/name)
    pub channel: String,

    /// Path to output file [default: <handle>.<ext>]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Messages requested per page (1-100)
    #[arg(long, default_value_t = 100, value_name = "N")]
    pub page_size: u32,

    /// Channel gateway base URL
    #[arg(
        long,
        env = "CHANPACK_API_URL",
        default_value = "http://127.0.0.1:8080/v1",
        value_name = "URL"
    )]
    pub api_url: String,

    /// Gateway bearer token
    #[arg(long, env = "CHANPACK_API_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, value_name = "SECS")]
    pub timeout: u64,

    /// Also append every record to this JSONL file while downloading
    #[arg(long, value_name = "FILE")]
    pub persist: Option<PathBuf>,

    /// Records per persisted batch
    #[arg(long, default_value_t = 500, value_name = "N")]
    pub persist_batch: usize,

    /// Abort on the first malformed record instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Suppress per-page progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig::new()
            .with_page_size(self.page_size)
            .with_skip_invalid(!self.strict)
    }

    pub fn api_config(&self) -> ApiConfig {
        let config = ApiConfig::new(self.api_url.clone())
            .with_timeout(Duration::from_secs(self.timeout));
        match &self.token {
            Some(token) => config.with_token(token.clone()),
            None => config,
        }
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig::new()
            .with_format(self.format.into())
            .with_persist_batch_size(self.persist_batch)
    }
}

/// Output format options.
///
/// - [`Text`](OutputFormat::Text) - Sectioned document for reading (default)
/// - [`Json`](OutputFormat::Json) - Header plus message array
/// - [`Jsonl`](OutputFormat::Jsonl) - One JSON record per line
/// - [`Csv`](OutputFormat::Csv) - Semicolon-delimited rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text document, one section per message
    #[default]
    #[value(alias = "txt")]
    Text,

    /// JSON object with channel header and messages
    Json,

    /// JSON Lines - one JSON object per line
    #[value(alias = "ndjson")]
    Jsonl,

    /// CSV with semicolon delimiter
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "Text"),
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Jsonl => write!(f, "JSONL"),
            OutputFormat::Csv => write!(f, "CSV"),
        }
    }
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> ExportFormat {
        match format {
            OutputFormat::Text => ExportFormat::Text,
            OutputFormat::Json => ExportFormat::Json,
            OutputFormat::Jsonl => ExportFormat::Jsonl,
            OutputFormat::Csv => ExportFormat::Csv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["chanpack", "rustlang"]);
        assert_eq!(args.channel, "rustlang");
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.page_size, 100);
        assert!(args.output.is_none());
        assert!(!args.strict);
        assert_eq!(args.export_config().persist_batch_size, 500);
    }

    #[test]
    fn test_format_alias() {
        let args = Args::parse_from(["chanpack", "rustlang", "-f", "ndjson"]);
        assert_eq!(args.format, OutputFormat::Jsonl);
        assert_eq!(ExportFormat::from(args.format), ExportFormat::Jsonl);
    }

    #[test]
    fn test_api_config_from_args() {
        let args = Args::parse_from([
            "chanpack",
            "rustlang",
            "--api-url",
            "https://gw.example",
            "--token",
            "abc",
            "--timeout",
            "5",
        ]);
        let config = args.api_config();
        assert_eq!(config.base_url, "https://gw.example");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_format_display() {
        assert_eq!(OutputFormat::Jsonl.to_string(), "JSONL");
        assert_eq!(OutputFormat::Text.to_string(), "Text");
    }

    #[test]
    fn test_format_serde() {
        let json = serde_json::to_string(&OutputFormat::Csv).unwrap();
        assert_eq!(json, "\"csv\"");
    }
}
