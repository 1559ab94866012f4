//! Corpus command implementation.

use crate::cli::{CorpusAction, Output};
use crate::corpus::{
    clean_jsonl, combine_hadiths, combine_tafsirs, combine_transcripts, default_tafsir_sources,
    CorpusReport,
};
use anyhow::Result;
use std::path::Path;

/// Run a corpus builder.
pub fn run_corpus(action: &CorpusAction) -> Result<()> {
    let (report, output) = match action {
        CorpusAction::Transcripts { dir, output } => (combine_transcripts(dir, output)?, output),
        CorpusAction::Hadith { csv, output } => (combine_hadiths(csv, output)?, output),
        CorpusAction::Tafsir {
            dir,
            output,
            sources,
        } => {
            let sources = if sources.is_empty() {
                default_tafsir_sources(dir)
            } else {
                sources
                    .iter()
                    .map(|(name, file)| (name.clone(), dir.join(file)))
                    .collect()
            };
            (combine_tafsirs(&sources, output)?, output)
        }
        CorpusAction::Clean { input, output } => (clean_jsonl(input, output)?, output),
    };

    print_report(&report, output);
    Ok(())
}

fn print_report(report: &CorpusReport, output: &Path) {
    Output::success(&format!("Wrote {} records to {}", report.written, output.display()));
    if report.skipped > 0 {
        Output::warning(&format!(
            "Skipped {} malformed or empty inputs (run with -v for details)",
            report.skipped
        ));
    }
}
