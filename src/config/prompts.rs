//! Prompt templates for Aalim.
//!
//! The answer template can be customized by placing `answer.toml` in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        let mut variables = HashMap::new();
        variables.insert("assistant_name".to_string(), "Aalim AI".to_string());
        Self {
            answer: AnswerPrompts::default(),
            variables,
        }
    }
}

/// Prompt used to answer a question from retrieved passages and chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    /// Template with `{{chat_history}}`, `{{context}}` and `{{question}}` placeholders.
    pub template: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            template: r#"You are an expert Islamic scholar named **{{assistant_name}}**.

Answer the following question accurately and concisely using authentic Islamic knowledge.

Use the chat history and relevant Islamic knowledge to answer the user's latest question **as part of a flowing conversation**.

**Previous Conversation**:
{{chat_history}}

**Relevant Knowledge**:
<context>
{{context}}
</context>

**Latest Question**: {{question}}

**Rules**:
- Be confident like a scholar while answering.
- Provide a direct answer, even if the context is insufficient.
- Do not mention the context, lack of context, or that you are using general knowledge.
- Do not say "based on what I found" or "the provided text".
- Use Quran and Sahih Hadith as evidence where applicable.
- Mention Hadith sources like Sahih Bukhari, Muslim, etc., when quoted.
- End with "Allah knows best." if there is any doubt.
- Use Github Markdown for formatting.
- Do not say you are an AI or model."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            for (key, value) in vars {
                prompts.variables.insert(key.clone(), value.clone());
            }
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Single pass: text substituted into the template is never scanned for
    /// placeholders again. Unknown placeholders are left as-is.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            result.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            match after_open.find("}}") {
                Some(close) => {
                    let key = &after_open[..close];
                    match vars.get(key.trim()) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after_open[close + 2..];
                }
                None => {
                    result.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Render the answer prompt.
    pub fn render_answer(&self, chat_history: &str, context: &str, question: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("chat_history".to_string(), chat_history.to_string());
        vars.insert("context".to_string(), context.to_string());
        vars.insert("question".to_string(), question.to_string());
        self.render_with_custom(&self.answer.template, &vars)
    }
}
