//! # chanpack CLI
//!
//! Command-line interface for the chanpack library.

use std::process;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser as ClapParser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use chanpack::api::HttpChannelApi;
use chanpack::archive::ChannelArchiver;
use chanpack::cli::Args;
use chanpack::progress::stderr_progress;
use chanpack::sink::JsonlFileSink;
use chanpack::{ChanpackError, ExportFormat};

#[tokio::main]
async fn main() {
    let args = <Args as ClapParser>::parse();
    init_logging(args.quiet);

    if let Err(e) = run(args).await {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "warn,chanpack=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<(), ChanpackError> {
    let total_start = Instant::now();

    // Reject bad input before touching the network
    let handle = chanpack::handle::parse(&args.channel)?;
    let format: ExportFormat = args.format.into();

    println!("📦 chanpack v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📡 Channel: {}", handle);
    println!("🌐 Gateway: {}", args.api_url);
    println!("📄 Format:  {}", args.format);
    if let Some(ref persist) = args.persist {
        println!("🗄️  Mirror:  {}", persist.display());
    }
    println!();

    let api = HttpChannelApi::new(&args.api_config())?;
    let mut archiver = ChannelArchiver::new(Arc::new(api))
        .with_download_config(args.download_config())
        .with_export_config(args.export_config());
    if !args.quiet {
        archiver = archiver.with_progress(stderr_progress());
    }
    if let Some(ref persist) = args.persist {
        archiver = archiver.with_sink(JsonlFileSink::open(persist).await?);
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("⏹️  Cancelling after the current page...");
                cancel.cancel();
            }
        }
    });

    println!("⏳ Downloading {}...", handle);
    let (summary, path) = archiver
        .archive_to_path(handle.as_str(), args.output.clone(), cancel)
        .await?;
    let progress = summary.progress;

    println!();
    println!("✅ Done! {} written to {}", format, path.display());

    println!();
    println!("📊 Summary:");
    println!("   Channel:     {}", summary.descriptor.title);
    println!("   Messages:    {}", summary.records);
    if progress.skipped > 0 {
        println!("   Skipped:     {} malformed", progress.skipped);
    }
    println!("   Pages:       {}", progress.pages);
    if progress.rate_limit_waits > 0 {
        println!("   Rate limits: {} waits", progress.rate_limit_waits);
    }
    println!("   Size:        {} bytes", summary.bytes_written);

    let total_time = total_start.elapsed();
    println!();
    println!("⚡ Performance:");
    println!("   Total time:  {:.2}s", total_time.as_secs_f64());
    println!("   Throughput:  {:.0} messages/sec", progress.rate_per_second);

    Ok(())
}
