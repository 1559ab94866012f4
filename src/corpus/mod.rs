//! Corpus building: normalize scraped sources into uniform JSONL records.
//!
//! Every builder follows the same failure policy: a malformed input line, row
//! or file is logged and skipped, and the run carries on.

mod hadith;
mod tafsir;
mod transcripts;

pub use hadith::combine_hadiths;
pub use tafsir::{combine_tafsirs, default_tafsir_sources};
pub use transcripts::{combine_transcripts, TranscriptFile};

use crate::error::Result;
use crate::vector_store::Metadata;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Kind of scraped source a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Video,
    Hadith,
    Tafsir,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Video => write!(f, "video"),
            SourceType::Hadith => write!(f, "hadith"),
            SourceType::Tafsir => write!(f, "tafsir"),
        }
    }
}

/// One normalized corpus record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct SourceRecord {
    pub source_type: SourceType,
    pub title: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hadith_id: Option<String>,
    /// Hadith collection (e.g. "Sahih Bukhari").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hadith_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tafsir_name: Option<String>,
    /// Arabic verse text a tafsir entry comments on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arabic: Option<String>,
}

impl SourceRecord {
    /// A record with only the required fields set.
    pub fn new(source_type: SourceType, title: &str, text: &str) -> Self {
        Self {
            source_type,
            title: title.to_string(),
            text: text.to_string(),
            video_id: None,
            hadith_id: None,
            source: None,
            chapter_no: None,
            hadith_no: None,
            tafsir_name: None,
            arabic: None,
        }
    }

    /// Metadata copied onto every chunk of this record.
    ///
    /// The long-form `text` and `arabic` fields are left out.
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("source_type".to_string(), Value::from(self.source_type.to_string()));
        if !self.title.is_empty() {
            metadata.insert("title".to_string(), Value::from(self.title.clone()));
        }

        let optional = [
            ("video_id", &self.video_id),
            ("hadith_id", &self.hadith_id),
            ("source", &self.source),
            ("chapter_no", &self.chapter_no),
            ("hadith_no", &self.hadith_no),
            ("tafsir_name", &self.tafsir_name),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                metadata.insert(key.to_string(), Value::from(v.clone()));
            }
        }

        metadata
    }
}

/// Accepting shape for records on disk. Older datasets use `transcript` for
/// the body, `type` for the kind, and numeric ids.
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default, alias = "type")]
    source_type: Option<SourceType>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, alias = "transcript", deserialize_with = "lenient_string")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    video_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    hadith_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    chapter_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    hadith_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    tafsir_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    arabic: Option<String>,
}

impl From<RawRecord> for SourceRecord {
    fn from(raw: RawRecord) -> Self {
        let source_type = raw.source_type.unwrap_or(if raw.tafsir_name.is_some() {
            SourceType::Tafsir
        } else if raw.hadith_id.is_some() || raw.hadith_no.is_some() {
            SourceType::Hadith
        } else {
            SourceType::Video
        });

        Self {
            source_type,
            title: raw
                .title
                .or_else(|| raw.tafsir_name.clone())
                .unwrap_or_default(),
            text: raw.text.unwrap_or_default(),
            video_id: raw.video_id,
            hadith_id: raw.hadith_id,
            source: raw.source,
            chapter_no: raw.chapter_no,
            hadith_no: raw.hadith_no,
            tafsir_name: raw.tafsir_name,
            arabic: raw.arabic,
        }
    }
}

/// Accept strings, numbers and booleans; map null to None.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Outcome of a corpus build step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CorpusReport {
    /// Records (or lines) written to the output.
    pub written: usize,
    /// Inputs skipped as malformed or empty.
    pub skipped: usize,
}

/// Line-delimited JSON writer.
pub struct JsonlWriter {
    out: BufWriter<File>,
    written: usize,
}

impl JsonlWriter {
    /// Create (truncate) `path`, creating parent directories as needed.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
            written: 0,
        })
    }

    /// Append one record as a single JSON line.
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Append a pre-serialized line verbatim.
    fn write_raw(&mut self, line: &str) -> Result<()> {
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Flush and return the number of lines written.
    pub fn finish(mut self) -> Result<usize> {
        self.out.flush()?;
        Ok(self.written)
    }
}

/// Non-blank lines of `reader` with their 1-based line numbers.
///
/// Lines that are not valid UTF-8 come back as `None` after a warning, so a
/// single corrupt line never aborts a whole file. I/O errors still propagate.
fn utf8_lines<R: BufRead>(
    reader: R,
    path: &Path,
) -> impl Iterator<Item = Result<(usize, Option<String>)>> {
    let path = path.to_path_buf();
    reader
        .split(b'\n')
        .enumerate()
        .filter_map(move |(i, bytes)| {
            let mut bytes = match bytes {
                Ok(bytes) => bytes,
                Err(e) => return Some(Err(e.into())),
            };
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            match String::from_utf8(bytes) {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(Ok((i + 1, Some(line)))),
                Err(e) => {
                    warn!("Skipping line {} in {:?}: {}", i + 1, path, e.utf8_error());
                    Some(Ok((i + 1, None)))
                }
            }
        })
}

/// Load records from a JSONL file, skipping malformed lines.
pub fn read_jsonl(path: &Path) -> Result<Vec<SourceRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for line in utf8_lines(reader, path) {
        let (number, Some(line)) = line? else {
            continue;
        };
        match serde_json::from_str::<SourceRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping malformed record at line {} in {:?}: {}", number, path, e),
        }
    }

    debug!("Loaded {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Copy only the lines of `input` that parse as JSON into `output`.
pub fn clean_jsonl(input: &Path, output: &Path) -> Result<CorpusReport> {
    let reader = BufReader::new(File::open(input)?);
    let mut writer = JsonlWriter::create(output)?;
    let mut skipped = 0;

    for line in utf8_lines(reader, input) {
        let (number, line) = line?;
        match line {
            Some(line) if serde_json::from_str::<Value>(&line).is_ok() => writer.write_raw(&line)?,
            Some(_) => {
                warn!("Skipping bad JSON at line {}", number);
                skipped += 1;
            }
            None => skipped += 1,
        }
    }

    Ok(CorpusReport {
        written: writer.finish()?,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_legacy_transcript_shape() {
        let record: SourceRecord = serde_json::from_str(
            r#"{"video_id": "abc123", "title": "Zakat explained", "transcript": "Zakat is..."}"#,
        )
        .unwrap();

        assert_eq!(record.source_type, SourceType::Video);
        assert_eq!(record.text, "Zakat is...");
        assert_eq!(record.video_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_reads_numeric_hadith_ids() {
        let record: SourceRecord = serde_json::from_str(
            r#"{"transcript": "Actions are by intentions", "title": "Revelation", "hadith_id": 1, "source": "Sahih Bukhari", "chapter_no": 1, "hadith_no": 1.0}"#,
        )
        .unwrap();

        assert_eq!(record.source_type, SourceType::Hadith);
        assert_eq!(record.hadith_id.as_deref(), Some("1"));
        assert_eq!(record.hadith_no.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_reads_legacy_tafsir_shape() {
        let record: SourceRecord = serde_json::from_str(
            r#"{"type": "tafsir", "tafsir_name": "Jalalayn", "arabic": "الحمد لله", "text": "Praise be to God"}"#,
        )
        .unwrap();

        assert_eq!(record.source_type, SourceType::Tafsir);
        assert_eq!(record.title, "Jalalayn");
        assert_eq!(record.arabic.as_deref(), Some("الحمد لله"));
    }

    #[test]
    fn test_metadata_skips_text_and_missing_fields() {
        let mut record = SourceRecord::new(SourceType::Hadith, "Book of Fasting", "long text");
        record.source = Some("Sahih Muslim".to_string());
        record.hadith_no = Some("7".to_string());

        let metadata = record.metadata();
        assert_eq!(metadata["source_type"], "hadith");
        assert_eq!(metadata["title"], "Book of Fasting");
        assert_eq!(metadata["source"], "Sahih Muslim");
        assert_eq!(metadata["hadith_no"], "7");
        assert!(!metadata.contains_key("video_id"));
        assert!(!metadata.contains_key("text"));
    }

    #[test]
    fn test_read_jsonl_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        std::fs::write(
            &path,
            "{\"video_id\": \"a\", \"title\": \"A\", \"transcript\": \"one\"}\n\
             {not json\n\
             \n\
             {\"video_id\": \"b\", \"title\": \"B\", \"transcript\": \"two\"}\n",
        )
        .unwrap();

        let records = read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text, "two");
    }

    #[test]
    fn test_clean_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        let output = dir.path().join("out.jsonl");
        std::fs::write(&input, "{\"a\": 1}\n{\"b\": \ntrailing garbage\n{\"c\": \"ج\"}\n").unwrap();

        let report = clean_jsonl(&input, &output).unwrap();
        assert_eq!(report, CorpusReport { written: 2, skipped: 2 });
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "{\"a\": 1}\n{\"c\": \"ج\"}\n"
        );
    }

    #[test]
    fn test_read_jsonl_skips_invalid_utf8_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        let mut bytes = b"{\"video_id\": \"a\", \"title\": \"A\", \"transcript\": \"one\"}\r\n".to_vec();
        bytes.extend_from_slice(b"\xff\xfe\n");
        bytes.extend_from_slice(b"{\"video_id\": \"b\", \"title\": \"B\", \"transcript\": \"two\"}\n");
        std::fs::write(&path, bytes).unwrap();

        let records = read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].video_id.as_deref(), Some("a"));
        assert_eq!(records[1].text, "two");
    }

    #[test]
    fn test_clean_jsonl_counts_invalid_utf8_as_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        let output = dir.path().join("out.jsonl");
        std::fs::write(&input, b"{\"a\": 1}\n\xc3\x28\n{\"b\": 2}\n").unwrap();

        let report = clean_jsonl(&input, &output).unwrap();
        assert_eq!(report, CorpusReport { written: 2, skipped: 1 });
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "{\"a\": 1}\n{\"b\": 2}\n");
    }

    #[test]
    fn test_writer_keeps_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");
        let mut writer = JsonlWriter::create(&path).unwrap();
        writer
            .write(&SourceRecord::new(SourceType::Tafsir, "Kashani", "بسم الله"))
            .unwrap();
        assert_eq!(writer.finish().unwrap(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("بسم الله"));
        assert!(content.ends_with('\n'));
    }
}
