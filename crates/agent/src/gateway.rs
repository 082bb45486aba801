use async_trait::async_trait;
use naturetalk_core::config::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use naturetalk_core::errors::{LLM_UNAVAILABLE_MESSAGE, NOT_UNDERSTOOD_MESSAGE};
use naturetalk_core::{AssistantReply, ConversationTurn};
use thiserror::Error;
use tracing::{error, info};

use crate::llm::{CompletionRequest, LlmClient};
use crate::prompt::SYSTEM_PROMPT;

#[derive(Debug, Error)]
pub enum ReplyParseError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("reply has an empty `response` field")]
    EmptyResponse,
}

/// Something that answers a user message with a structured reply. Answering
/// never fails; failures come back as fixed apology replies.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn converse(&self, user_message: &str, history: &[ConversationTurn]) -> AssistantReply;
}

pub struct LlmGateway<C> {
    client: C,
    model: String,
    max_tokens: u32,
}

impl<C> LlmGateway<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client, model: DEFAULT_MODEL.to_string(), max_tokens: DEFAULT_MAX_TOKENS }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn request_for(&self, user_message: &str, history: &[ConversationTurn]) -> CompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.extend_from_slice(history);
        messages.push(ConversationTurn::user(user_message));

        CompletionRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT.to_string(),
            messages,
        }
    }
}

#[async_trait]
impl<C> Assistant for LlmGateway<C>
where
    C: LlmClient,
{
    async fn converse(&self, user_message: &str, history: &[ConversationTurn]) -> AssistantReply {
        info!(
            event_name = "llm.request.start",
            model = %self.model,
            history_turns = history.len(),
            user_message,
            "calling llm"
        );

        let request = self.request_for(user_message, history);
        let completion = match self.client.complete(&request).await {
            Ok(completion) => completion,
            Err(llm_error) => {
                error!(
                    event_name = "llm.request.failed",
                    error = %llm_error,
                    error_detail = ?llm_error,
                    "llm call failed; replying with apology"
                );
                return AssistantReply::speech_only(LLM_UNAVAILABLE_MESSAGE);
            }
        };

        if let Some(usage) = completion.usage {
            info!(
                event_name = "llm.request.usage",
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "llm token usage"
            );
        }
        info!(event_name = "llm.reply.raw", raw = %completion.text, "llm replied");

        match parse_reply(&completion.text) {
            Ok(reply) => {
                info!(
                    event_name = "llm.reply.parsed",
                    response = %reply.response,
                    actions = reply.actions.len(),
                    "llm reply parsed"
                );
                reply
            }
            Err(parse_error) => {
                error!(
                    event_name = "llm.reply.parse_failed",
                    raw = %completion.text,
                    error = %parse_error,
                    "llm reply was not the expected json"
                );
                AssistantReply::speech_only(NOT_UNDERSTOOD_MESSAGE)
            }
        }
    }
}

/// Removes one leading ```` ```json ```` or ```` ``` ```` fence and one
/// trailing ```` ``` ```` fence, then trims.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

pub fn parse_reply(raw: &str) -> Result<AssistantReply, ReplyParseError> {
    let reply: AssistantReply = serde_json::from_str(strip_code_fence(raw))?;
    if reply.response.trim().is_empty() {
        return Err(ReplyParseError::EmptyResponse);
    }
    Ok(reply)
}
