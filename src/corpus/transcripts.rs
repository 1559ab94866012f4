//! Per-video transcript files into video records.

use super::{CorpusReport, JsonlWriter, SourceRecord, SourceType};
use crate::error::{AalimError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Shape of a single scraped transcript file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptFile {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    pub transcript: String,
}

impl From<TranscriptFile> for SourceRecord {
    fn from(file: TranscriptFile) -> Self {
        let mut record = SourceRecord::new(SourceType::Video, &file.title, &file.transcript);
        record.video_id = Some(file.video_id);
        record
    }
}

/// Combine every `*.json` transcript in `dir` into one JSONL file.
pub fn combine_transcripts(dir: &Path, output: &Path) -> Result<CorpusReport> {
    let mut writer = JsonlWriter::create(output)?;
    let mut skipped = 0;

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let parsed = std::fs::read_to_string(&path)
            .map_err(AalimError::from)
            .and_then(|content| {
                serde_json::from_str::<TranscriptFile>(&content).map_err(AalimError::from)
            });

        match parsed {
            Ok(file) => writer.write(&SourceRecord::from(file))?,
            Err(e) => {
                warn!("Skipping transcript {:?}: {}", path, e);
                skipped += 1;
            }
        }
    }

    let written = writer.finish()?;
    info!("Combined {} transcripts into {:?}", written, output);
    Ok(CorpusReport { written, skipped })
}
