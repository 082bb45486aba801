use async_trait::async_trait;
use naturetalk_core::ConversationTurn;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<ConversationTurn>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Text of the first text block in the vendor response.
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Anything that keeps the model from producing text. All variants are
/// recovered the same way by the gateway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm request returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm response contained no text block")]
    EmptyContent,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}
