//! Channel transcript scraping.
//!
//! Lists a channel's videos and saves one `{video_id, title, transcript}` JSON
//! file per video. Videos whose file already exists are skipped, so an
//! interrupted run can simply be restarted.

mod youtube;

pub use youtube::{parse_json3, YtDlp};

use crate::config::ScraperSettings;
use crate::corpus::TranscriptFile;
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// A video found on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoListing {
    pub id: String,
    pub title: String,
}

/// Source of video transcripts.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Fetch the transcript of a video.
    ///
    /// `Ok(None)` means the video has no transcript and is not retried.
    /// Errors are treated as transient.
    async fn fetch(&self, video_id: &str) -> Result<Option<String>>;
}

/// Retry and concurrency limits for a scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub workers: usize,
    pub attempts: u32,
    pub retry_delay: Duration,
    pub fetch_timeout: Duration,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self::from(&ScraperSettings::default())
    }
}

impl From<&ScraperSettings> for ScrapeOptions {
    fn from(settings: &ScraperSettings) -> Self {
        Self {
            workers: settings.workers.max(1),
            attempts: settings.retries.max(1),
            retry_delay: Duration::from_secs(settings.retry_delay_secs),
            fetch_timeout: Duration::from_secs(settings.fetch_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    /// Transcript files written in this run.
    pub written: usize,
    /// Videos whose transcript file already existed.
    pub skipped: usize,
    /// Videos recorded in the failure log.
    pub failed: usize,
}

/// Fetch a transcript with bounded attempts, a fixed delay and a per-attempt timeout.
pub async fn fetch_with_retry(
    fetcher: &dyn TranscriptFetcher,
    video_id: &str,
    options: &ScrapeOptions,
) -> Result<Option<String>> {
    let attempts = options.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match tokio::time::timeout(options.fetch_timeout, fetcher.fetch(video_id)).await {
            Ok(Ok(transcript)) => return Ok(transcript),
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => last_error = format!("timed out after {:?}", options.fetch_timeout),
        }

        debug!("Attempt {}/{} for {} failed: {}", attempt, attempts, video_id, last_error);
        if attempt < attempts {
            tokio::time::sleep(options.retry_delay).await;
        }
    }

    Err(AalimError::Scraper(format!(
        "{}: {} attempts failed, last error: {}",
        video_id, attempts, last_error
    )))
}

/// Saves transcripts for a list of videos.
pub struct Scraper {
    fetcher: Arc<dyn TranscriptFetcher>,
    options: ScrapeOptions,
}

impl Scraper {
    pub fn new(fetcher: Arc<dyn TranscriptFetcher>, options: ScrapeOptions) -> Self {
        Self { fetcher, options }
    }

    /// Output file for a video.
    pub fn transcript_path(output_dir: &Path, video_id: &str) -> PathBuf {
        output_dir.join(format!("{}.json", video_id))
    }

    pub async fn scrape(
        &self,
        videos: Vec<VideoListing>,
        output_dir: &Path,
        failed_log: &Path,
    ) -> Result<ScrapeReport> {
        self.run(videos, output_dir, failed_log, None).await
    }

    pub async fn scrape_with_progress(
        &self,
        videos: Vec<VideoListing>,
        output_dir: &Path,
        failed_log: &Path,
        progress: &ProgressBar,
    ) -> Result<ScrapeReport> {
        self.run(videos, output_dir, failed_log, Some(progress)).await
    }

    async fn run(
        &self,
        videos: Vec<VideoListing>,
        output_dir: &Path,
        failed_log: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<ScrapeReport> {
        tokio::fs::create_dir_all(output_dir).await?;

        let mut report = ScrapeReport::default();
        let mut failures = FailureLog::new(failed_log);
        let mut pending = Vec::new();

        for video in videos {
            if !is_safe_id(&video.id) {
                warn!("Skipping video with unusable id {:?}", video.id);
                failures.record(&video).await?;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
            } else if Self::transcript_path(output_dir, &video.id).exists() {
                report.skipped += 1;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
            } else {
                pending.push(video);
            }
        }
        info!(
            "{} videos to fetch, {} already saved",
            pending.len(),
            report.skipped
        );

        let mut results = stream::iter(pending.into_iter().map(|video| {
            let fetcher = Arc::clone(&self.fetcher);
            let options = self.options.clone();
            async move {
                let outcome = fetch_with_retry(fetcher.as_ref(), &video.id, &options).await;
                (video, outcome)
            }
        }))
        .buffer_unordered(self.options.workers.max(1));

        while let Some((video, outcome)) = results.next().await {
            match outcome {
                Ok(Some(transcript)) => {
                    let file = TranscriptFile {
                        video_id: video.id.clone(),
                        title: video.title.clone(),
                        transcript,
                    };
                    let path = Self::transcript_path(output_dir, &video.id);
                    tokio::fs::write(&path, serde_json::to_string_pretty(&file)?).await?;
                    debug!("Saved {:?}", path);
                    report.written += 1;
                }
                Ok(None) => {
                    debug!("No transcript for {}", video.id);
                    failures.record(&video).await?;
                }
                Err(e) => {
                    warn!("{}", e);
                    failures.record(&video).await?;
                }
            }
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        report.failed = failures.count;

        info!(
            "Scrape finished: {} written, {} skipped, {} failed",
            report.written, report.skipped, report.failed
        );
        Ok(report)
    }
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Append-only log of `<video_id> - <title>` lines.
///
/// The file is opened on the first failure, so a clean run never creates it.
/// Each line is flushed as it is recorded and survives an aborted run.
struct FailureLog<'a> {
    path: &'a Path,
    file: Option<tokio::fs::File>,
    count: usize,
}

impl<'a> FailureLog<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            file: None,
            count: 0,
        }
    }

    async fn record(&mut self, video: &VideoListing) -> Result<()> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path)
                .await?;
            self.file = Some(file);
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(format!("{} - {}\n", video.id, video.title).as_bytes())
                .await?;
            file.flush().await?;
        }
        self.count += 1;
        Ok(())
    }
}
