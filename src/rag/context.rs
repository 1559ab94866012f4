//! Prompt context formatting.

use super::RetrievedPassage;
use crate::conversation::{ConversationTurn, Role};

/// Render passages as `Source:`/`Title:`/`Content:` blocks separated by blank lines.
pub fn format_passages_for_prompt(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| {
            format!(
                "Source: {}\nTitle: {}\nContent: {}",
                p.source_label(),
                p.title(),
                p.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render chronological turns as `User:`/`Assistant:` lines, keeping the last `max_lines`.
pub fn format_history_for_prompt(turns: &[ConversationTurn], max_lines: usize) -> String {
    let lines: Vec<String> = turns
        .iter()
        .filter_map(|turn| {
            let label = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::Other => return None,
            };
            Some(format!("{}: {}", label, turn.text.trim()))
        })
        .collect();

    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
