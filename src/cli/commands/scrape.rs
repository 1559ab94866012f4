//! Scrape command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::scraper::{ScrapeOptions, Scraper, YtDlp};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Run the scrape command.
pub async fn run_scrape(
    channel_url: &str,
    output_dir: &Path,
    failed_log: &Path,
    workers: Option<usize>,
    limit: Option<usize>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Scrape, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let ytdlp = Arc::new(YtDlp::new(&settings.scraper.language)?);

    let spinner = Output::spinner("Listing channel videos...");
    let videos = ytdlp.list_channel_videos(channel_url, limit).await;
    spinner.finish_and_clear();
    let videos = videos?;

    if videos.is_empty() {
        Output::warning("No videos found on this channel.");
        return Ok(());
    }
    Output::info(&format!("Found {} videos", videos.len()));

    let mut options = ScrapeOptions::from(&settings.scraper);
    if let Some(workers) = workers {
        options.workers = workers.max(1);
    }

    let scraper = Scraper::new(ytdlp, options);
    let pb = Output::progress_bar(videos.len() as u64, "Fetching transcripts");
    let result = scraper
        .scrape_with_progress(videos, output_dir, failed_log, &pb)
        .await;
    pb.finish_and_clear();
    let report = result?;

    Output::success(&format!(
        "Saved {} transcripts to {}",
        report.written,
        output_dir.display()
    ));
    Output::kv("Already present", &report.skipped.to_string());
    if report.failed > 0 {
        Output::warning(&format!(
            "{} videos had no transcript, see {}",
            report.failed,
            failed_log.display()
        ));
    }

    Ok(())
}
