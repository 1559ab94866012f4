//! Ask command implementation.

use crate::answer::{AnswerService, QuestionRequest};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, k: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let service = AnswerService::from_settings(&settings)?;
    let spinner = Output::spinner(&format!("Asking {}...", service.model()));

    match service.ask(QuestionRequest::new(question).with_k(k)).await {
        Ok(response) => {
            spinner.finish_and_clear();
            println!("\n{}\n", response.answer);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
