//! Example downloading a batch of files with console progress and a summary table.
//!
//! ```text
//! cargo run --example batch -- https://example.com/a.iso https://example.com/b.iso
//! RUST_LOG=haul=debug cargo run --example batch
//! ```
//!
//! Press Ctrl-C to cancel the batch; partial files are removed.

use color_eyre::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use console::style;
use haul::downloader::DownloaderBuilder;
use haul::progress::{ConsoleProgress, StyleOptions};
use haul::transfer::{Status, TransferSpec};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        urls = (1..=8)
            .map(|i| format!("https://httpbin.org/bytes/256000?seed={}", i))
            .collect();
    }
    let specs = urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            let spec = TransferSpec::try_from(url.as_str())?;
            // httpbin serves every seed as "bytes", keep names apart.
            let name = format!("{}-{}", i, spec.label());
            Ok(TransferSpec::new(spec.url(), name))
        })
        .collect::<haul::Result<Vec<_>>>()?;

    let downloader = DownloaderBuilder::new()
        .directory(PathBuf::from("downloads"))
        .concurrent_downloads(4)
        .progress(ConsoleProgress::new(StyleOptions::default()))
        .build();

    let token = downloader.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = downloader.download(&specs).await;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["File", "Status", "Attempts", "Size"]);
    for summary in result.summaries() {
        let status = match summary.status() {
            Status::Done => style("done").green().to_string(),
            Status::Failed(msg) => style(format!("failed: {}", msg)).red().to_string(),
            Status::Cancelled => style("cancelled").yellow().to_string(),
        };
        table.add_row(vec![
            summary.spec().label(),
            status,
            summary.attempts().to_string(),
            summary.size().to_string(),
        ]);
    }
    println!("{table}");
    println!(
        "{} succeeded, {} failed",
        style(result.succeeded()).bold().green(),
        style(result.failed()).bold().red()
    );

    Ok(())
}
