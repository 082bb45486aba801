//! LLM Gateway - turns a user utterance into a structured assistant reply
//!
//! This crate provides the conversational "brain" of the assistant:
//! - Sends the conversation so far plus the new user message to the LLM
//! - Strips incidental code-fence markup from the model's text
//! - Parses the text as a strict `{response, actions}` JSON object
//! - Recovers every failure into a fixed apology reply
//!
//! # Architecture
//!
//! ```text
//! user message ─┐
//!               ├→ LlmGateway ─→ LlmClient (AnthropicClient) ─→ text
//! history ──────┘        ↓
//!               strip_code_fence → parse_reply → AssistantReply
//! ```
//!
//! # Key Types
//!
//! - `Assistant` - What callers depend on; `converse` never fails
//! - `LlmGateway` - The `Assistant` backed by any `LlmClient`
//! - `LlmClient` - Pluggable transport; `AnthropicClient` talks to the vendor
//!
//! # Failure Handling
//!
//! A transport failure and an unparseable reply produce different fixed
//! messages so the user can tell "try later" from "say that again".

pub mod anthropic;
pub mod gateway;
pub mod llm;
pub mod prompt;

pub use anthropic::AnthropicClient;
pub use gateway::{parse_reply, strip_code_fence, Assistant, LlmGateway, ReplyParseError};
pub use llm::{Completion, CompletionRequest, LlmClient, LlmError, TokenUsage};
