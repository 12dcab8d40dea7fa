//! Subtask generation - turns a task description into suggested subtasks.
//!
//! `SubtaskGenerator` is the seam the store depends on; `LlmSubtaskGenerator`
//! implements it with a chat-completion call in JSON mode.
//!
//! Expected completion shape:
//! ```text
//! {"subtasks": [{"text": "Research options"}, {"text": "Compare prices"}]}
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::llm::{ChatMessage, ChatOptions, LlmClient, LlmError};

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Errors from the completion-generation collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("Completion request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
}

/// Proposes subtask descriptions for a task.
#[async_trait]
pub trait SubtaskGenerator: Send + Sync {
    /// Suggest subtask texts for `description`, in the order they should be done.
    async fn generate_subtasks(
        &self,
        api_key: &str,
        description: &str,
    ) -> Result<Vec<String>, GenerationError>;

    /// Check that `api_key` is accepted by the provider.
    async fn verify_credential(&self, api_key: &str) -> Result<(), GenerationError>;
}

/// `SubtaskGenerator` backed by a chat-completion model.
pub struct LlmSubtaskGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmSubtaskGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SubtaskGenerator for LlmSubtaskGenerator {
    async fn generate_subtasks(
        &self,
        api_key: &str,
        description: &str,
    ) -> Result<Vec<String>, GenerationError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(description)),
        ];
        let options = ChatOptions {
            json_response: true,
            ..ChatOptions::default()
        };
        let response = self
            .client
            .chat_completion(api_key, &self.model, &messages, options)
            .await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = response.model.as_deref().unwrap_or(&self.model),
                total_tokens = usage.total_tokens,
                "Subtask generation completed"
            );
        }

        // A cut-off JSON object may still parse if the cut lands between entries.
        if response.finish_reason.as_deref() == Some("length") {
            return Err(GenerationError::MalformedResponse(
                "completion was truncated".to_string(),
            ));
        }

        let content = response.content.ok_or_else(|| {
            GenerationError::MalformedResponse("completion has no content".to_string())
        })?;
        parse_suggestions(&content)
    }

    async fn verify_credential(&self, api_key: &str) -> Result<(), GenerationError> {
        let messages = [ChatMessage::user(
            "Test connection - respond with just the word \"success\"",
        )];
        let options = ChatOptions {
            max_tokens: Some(10),
            ..ChatOptions::default()
        };
        self.client
            .chat_completion(api_key, &self.model, &messages, options)
            .await?;
        Ok(())
    }
}

const SYSTEM_PROMPT: &str = "You are a helpful task planning assistant.";

/// Prompt asking for 3-5 actionable subtasks as a JSON object.
pub fn build_prompt(description: &str) -> String {
    format!(
        r#"Break down this task into 3-5 specific, actionable subtasks that will help the user complete it effectively.

Task: {description}

Return the result as a JSON object with a single property called "subtasks" that contains an array of subtask objects. Each subtask should have a "text" property with a clear, actionable description.

Example format:
{{
  "subtasks": [
    {{"text": "Research available options online"}},
    {{"text": "Compare prices and features"}},
    {{"text": "Make final decision and purchase"}}
  ]
}}

Keep subtasks concise, specific, and actionable. Focus on logical sequential steps."#
    )
}

#[derive(Debug, Deserialize)]
struct SuggestionEnvelope {
    subtasks: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    text: String,
}

/// Parse a completion into trimmed subtask texts.
///
/// Accepts the JSON object optionally wrapped in a markdown code fence.
/// Any other deviation (missing `subtasks`, non-string `text`, blank `text`)
/// is a `MalformedResponse`.
pub fn parse_suggestions(content: &str) -> Result<Vec<String>, GenerationError> {
    let json = strip_code_fence(content);
    let envelope: SuggestionEnvelope = serde_json::from_str(json)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    envelope
        .subtasks
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let text = s.text.trim();
            if text.is_empty() {
                Err(GenerationError::MalformedResponse(format!(
                    "subtask {} has empty text",
                    i
                )))
            } else {
                Ok(text.to_string())
            }
        })
        .collect()
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
