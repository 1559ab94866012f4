//! Hadith CSV into hadith records.

use super::{CorpusReport, JsonlWriter, SourceRecord, SourceType};
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

const UNKNOWN_CHAPTER: &str = "Unknown Chapter";

#[derive(Debug, Deserialize)]
struct HadithRow {
    #[serde(default)]
    text_en: Option<String>,
    #[serde(default)]
    chapter: Option<String>,
    #[serde(default)]
    hadith_id: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    chapter_no: Option<String>,
    #[serde(default)]
    hadith_no: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl HadithRow {
    /// None when the English text is missing.
    fn into_record(self) -> Option<SourceRecord> {
        let text = present(self.text_en)?;
        let title = present(self.chapter).unwrap_or_else(|| UNKNOWN_CHAPTER.to_string());

        let mut record = SourceRecord::new(SourceType::Hadith, &title, &text);
        record.hadith_id = present(self.hadith_id);
        record.source = present(self.source);
        record.chapter_no = present(self.chapter_no);
        record.hadith_no = present(self.hadith_no);
        Some(record)
    }
}

/// Convert a hadith CSV (columns `text_en`, `chapter`, `hadith_id`, `source`,
/// `chapter_no`, `hadith_no`) into JSONL. Rows without English text are dropped.
pub fn combine_hadiths(csv_path: &Path, output: &Path) -> Result<CorpusReport> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(csv_path)?;
    let mut writer = JsonlWriter::create(output)?;
    let mut skipped = 0;

    for (i, row) in reader.deserialize::<HadithRow>().enumerate() {
        match row {
            Ok(row) => match row.into_record() {
                Some(record) => writer.write(&record)?,
                None => skipped += 1,
            },
            Err(e) => {
                warn!("Skipping malformed hadith row {}: {}", i + 1, e);
                skipped += 1;
            }
        }
    }

    let written = writer.finish()?;
    info!("Wrote {} hadith records to {:?}", written, output);
    Ok(CorpusReport { written, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::read_jsonl;

    #[test]
    fn test_combine_hadiths() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("hadith.csv");
        std::fs::write(
            &csv_path,
            "hadith_id,source,chapter_no,hadith_no,chapter,text_en\n\
             1,Sahih Bukhari,1,1,Revelation,\"Actions are judged by intentions, so each man will have what he intended.\"\n\
             2,Sahih Bukhari,1,2,,Second hadith\n\
             3,Sahih Bukhari,1,3,Revelation,\n",
        )
        .unwrap();

        let output = dir.path().join("hadith.jsonl");
        let report = combine_hadiths(&csv_path, &output).unwrap();
        assert_eq!(report, CorpusReport { written: 2, skipped: 1 });

        let records = read_jsonl(&output).unwrap();
        assert_eq!(records[0].source_type, SourceType::Hadith);
        assert!(records[0].text.contains("so each man"));
        assert_eq!(records[0].source.as_deref(), Some("Sahih Bukhari"));
        assert_eq!(records[0].hadith_no.as_deref(), Some("1"));
        assert_eq!(records[1].title, UNKNOWN_CHAPTER);
    }
}
