//! Channel listing and subtitle download through `yt-dlp`.

use super::{TranscriptFetcher, VideoListing};
use crate::error::{AalimError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::process::Output;
use tracing::{debug, instrument};

/// Transcript fetcher and channel lister backed by the `yt-dlp` binary.
pub struct YtDlp {
    language: String,
    video_id_regex: Regex,
}

impl YtDlp {
    pub fn new(language: &str) -> Result<Self> {
        // Watch, short and embed URLs, or a bare 11 character id.
        let video_id_regex = Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.)?
                (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .map_err(|e| AalimError::Scraper(format!("Invalid video id pattern: {}", e)))?;

        Ok(Self {
            language: language.to_string(),
            video_id_regex,
        })
    }

    /// Extract a video id from a URL or bare id.
    pub fn extract_video_id(&self, input: &str) -> Option<String> {
        let caps = self.video_id_regex.captures(input.trim())?;
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }

    /// List every video on a channel's uploads tab.
    #[instrument(skip(self))]
    pub async fn list_channel_videos(
        &self,
        channel_url: &str,
        limit: Option<usize>,
    ) -> Result<Vec<VideoListing>> {
        let url = videos_tab(channel_url);
        let mut args = vec![
            "--flat-playlist".to_string(),
            "--dump-json".to_string(),
            "--no-warnings".to_string(),
        ];
        if let Some(limit) = limit {
            args.push("--playlist-end".to_string());
            args.push(limit.to_string());
        }
        args.push(url);

        let output = run_ytdlp(&args).await?;
        if !output.status.success() {
            return Err(AalimError::Scraper(format!(
                "Failed to list videos: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let videos = self.parse_listing(&String::from_utf8_lossy(&output.stdout));
        debug!("Listed {} videos", videos.len());
        Ok(videos)
    }

    /// Parse `--dump-json` lines into listings. Unparseable lines are ignored.
    fn parse_listing(&self, stdout: &str) -> Vec<VideoListing> {
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter_map(|json| {
                let id = json["id"]
                    .as_str()
                    .or_else(|| json["url"].as_str())
                    .map(|s| self.extract_video_id(s).unwrap_or_else(|| s.to_string()))?;
                let title = json["title"].as_str().unwrap_or("Unknown Title").to_string();
                Some(VideoListing { id, title })
            })
            .collect()
    }
}

/// Point a channel URL at its uploads tab.
fn videos_tab(channel_url: &str) -> String {
    let trimmed = channel_url.trim().trim_end_matches('/');
    if trimmed.ends_with("/videos") {
        trimmed.to_string()
    } else {
        format!("{}/videos", trimmed)
    }
}

async fn run_ytdlp(args: &[String]) -> Result<Output> {
    tokio::process::Command::new("yt-dlp")
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AalimError::ToolNotFound("yt-dlp".to_string())
            } else {
                AalimError::Scraper(format!("Failed to run yt-dlp: {}", e))
            }
        })
}

#[derive(Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Deserialize)]
struct Json3Event {
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Join the text segments of a `json3` subtitle file with single spaces.
pub fn parse_json3(content: &str) -> Result<String> {
    let subtitles: Json3 = serde_json::from_str(content)?;
    let text = subtitles
        .events
        .iter()
        .flat_map(|event| event.segs.iter())
        .map(|seg| seg.utf8.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(text)
}

#[async_trait]
impl TranscriptFetcher for YtDlp {
    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<Option<String>> {
        let dir = tempfile::tempdir()?;
        let template = dir.path().join("%(id)s.%(ext)s");
        let args = vec![
            "--skip-download".to_string(),
            "--write-subs".to_string(),
            "--write-auto-subs".to_string(),
            "--sub-langs".to_string(),
            self.language.clone(),
            "--sub-format".to_string(),
            "json3".to_string(),
            "--no-warnings".to_string(),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
            format!("https://www.youtube.com/watch?v={}", video_id),
        ];

        let output = run_ytdlp(&args).await?;
        if !output.status.success() {
            return Err(AalimError::Scraper(format!(
                "yt-dlp failed for {}: {}",
                video_id,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut entries = tokio::fs::read_dir(dir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json3") {
                let content = tokio::fs::read_to_string(&path).await?;
                let text = parse_json3(&content)?;
                return Ok(Some(text).filter(|t| !t.is_empty()));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        let ytdlp = YtDlp::new("en").unwrap();
        assert_eq!(
            ytdlp.extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            ytdlp.extract_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(ytdlp.extract_video_id("dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(ytdlp.extract_video_id("not a video"), None);
    }

    #[test]
    fn test_videos_tab() {
        assert_eq!(
            videos_tab("https://www.youtube.com/@channel/"),
            "https://www.youtube.com/@channel/videos"
        );
        assert_eq!(
            videos_tab("https://www.youtube.com/@channel/videos"),
            "https://www.youtube.com/@channel/videos"
        );
    }

    #[test]
    fn test_parse_listing() {
        let ytdlp = YtDlp::new("en").unwrap();
        let stdout = concat!(
            r#"{"id": "dQw4w9WgXcQ", "title": "Pillars of Islam", "_type": "url"}"#,
            "\n\n",
            "garbage\n",
            r#"{"url": "https://www.youtube.com/watch?v=abcdefghijk"}"#,
            "\n"
        );

        let videos = ytdlp.parse_listing(stdout);
        assert_eq!(
            videos,
            vec![
                VideoListing {
                    id: "dQw4w9WgXcQ".to_string(),
                    title: "Pillars of Islam".to_string()
                },
                VideoListing {
                    id: "abcdefghijk".to_string(),
                    title: "Unknown Title".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_json3() {
        let content = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "segs": [{"utf8": "In the name"}, {"utf8": " of Allah"}]},
                {"tStartMs": 1500, "aAppend": 1, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 2000},
                {"tStartMs": 3000, "segs": [{"utf8": "the Most Merciful"}]}
            ]
        }"#;
        assert_eq!(
            parse_json3(content).unwrap(),
            "In the name of Allah the Most Merciful"
        );
        assert!(parse_json3("not json").is_err());
    }
}
