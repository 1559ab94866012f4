//! Tafsir CSVs into tafsir records.

use super::{CorpusReport, JsonlWriter, SourceRecord, SourceType};
use crate::error::{AalimError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct TafsirRow {
    #[serde(rename = "Arabic", default)]
    arabic: Option<String>,
    #[serde(rename = "Tafseer", default)]
    tafseer: Option<String>,
}

/// The four tafsir collections scraped by default, as (name, path) pairs under `dir`.
pub fn default_tafsir_sources(dir: &Path) -> Vec<(String, PathBuf)> {
    [
        ("Jalalayn", "tafseer_al-jalalayn.csv"),
        ("Ibn Abbas", "tafseer_Ibn_abbas.csv"),
        ("Qushairi", "tafseer_al_qushairi.csv"),
        ("Kashani", "tafseer_kashani.csv"),
    ]
    .into_iter()
    .map(|(name, file)| (name.to_string(), dir.join(file)))
    .collect()
}

/// Merge tafsir CSVs (columns `Arabic`, `Tafseer`) into one JSONL file.
///
/// A missing or unreadable source file is skipped with a warning; rows with
/// empty commentary are dropped. Fails if no source could be opened.
pub fn combine_tafsirs(sources: &[(String, PathBuf)], output: &Path) -> Result<CorpusReport> {
    let mut writer = JsonlWriter::create(output)?;
    let mut skipped = 0;
    let mut opened = 0;

    for (name, path) in sources {
        let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
            Ok(reader) => reader,
            Err(e) => {
                warn!("Skipping tafsir {} ({:?}): {}", name, path, e);
                continue;
            }
        };
        opened += 1;

        for (i, row) in reader.deserialize::<TafsirRow>().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!("Skipping malformed row {} in {:?}: {}", i + 1, path, e);
                    skipped += 1;
                    continue;
                }
            };

            let text = row.tafseer.unwrap_or_default().trim().to_string();
            if text.is_empty() {
                skipped += 1;
                continue;
            }

            let mut record = SourceRecord::new(SourceType::Tafsir, name, &text);
            record.tafsir_name = Some(name.clone());
            record.arabic = row
                .arabic
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty());
            writer.write(&record)?;
        }
    }

    if opened == 0 {
        return Err(AalimError::Corpus(format!(
            "None of the {} tafsir sources could be read",
            sources.len()
        )));
    }

    let written = writer.finish()?;
    info!("Merged {} tafsir entries into {:?}", written, output);
    Ok(CorpusReport { written, skipped })
}
