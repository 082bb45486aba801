//! Client for the Anthropic Messages API.

use std::time::Duration;

use async_trait::async_trait;
use naturetalk_core::config::LlmConfig;
use naturetalk_core::ConversationTurn;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::llm::{Completion, CompletionRequest, LlmClient, LlmError, TokenUsage};

/// Holds one pooled HTTP client for the life of the process; the API key is
/// resolved once before construction.
pub struct AnthropicClient {
    http: Client,
    api_key: SecretString,
    endpoint: String,
    api_version: String,
}

impl AnthropicClient {
    pub fn new(api_key: SecretString, config: &LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| LlmError::Transport(format!("could not build http client: {err}")))?;

        Ok(Self {
            http,
            api_key,
            endpoint: messages_endpoint(&config.base_url),
            api_version: config.api_version.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(&MessagesRequest::from(request))
            .send()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(status_error(status, &body));
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|err| LlmError::Decode(err.to_string()))?;
        completion_from(parsed)
    }
}

fn messages_endpoint(base_url: &str) -> String {
    format!("{}/v1/messages", base_url.trim_end_matches('/'))
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ConversationTurn],
}

impl<'a> From<&'a CompletionRequest> for MessagesRequest<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: &request.messages,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn completion_from(response: MessagesResponse) -> Result<Completion, LlmError> {
    let usage = response.usage.map(|usage| TokenUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
    });
    let text = response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .ok_or(LlmError::EmptyContent)?;

    Ok(Completion { text, usage })
}

fn status_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string());

    LlmError::Status { status: status.as_u16(), message }
}

#[cfg(test)]
mod tests {
    use naturetalk_core::ConversationTurn;
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{
        completion_from, messages_endpoint, status_error, MessagesRequest, MessagesResponse,
    };
    use crate::llm::{CompletionRequest, LlmError, TokenUsage};

    #[test]
    fn request_body_carries_model_budget_system_and_messages() {
        let request = CompletionRequest {
            model: "claude-sonnet-4-20250514".to_owned(),
            max_tokens: 1024,
            system: "system prompt".to_owned(),
            messages: vec![ConversationTurn::user("こんにちは")],
        };

        let body = serde_json::to_value(MessagesRequest::from(&request)).expect("serialize");

        assert_eq!(
            body,
            json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 1024,
                "system": "system prompt",
                "messages": [{"role": "user", "content": "こんにちは"}]
            })
        );
    }

    #[test]
    fn first_text_block_is_extracted_with_usage() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "{\"response\": \"ok\", \"actions\": []}"},
                {"type": "text", "text": "ignored"}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 7}
        }))
        .expect("deserialize");

        let completion = completion_from(response).expect("completion");

        assert_eq!(completion.text, "{\"response\": \"ok\", \"actions\": []}");
        assert_eq!(completion.usage, Some(TokenUsage { input_tokens: 12, output_tokens: 7 }));
    }

    #[test]
    fn response_without_text_is_empty_content() {
        let response: MessagesResponse =
            serde_json::from_value(json!({"content": []})).expect("deserialize");

        assert_eq!(completion_from(response), Err(LlmError::EmptyContent));
    }

    #[test]
    fn vendor_error_message_is_extracted_from_status_body() {
        let error = status_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
        );

        assert_eq!(error, LlmError::Status { status: 429, message: "slow down".to_owned() });
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        assert_eq!(
            messages_endpoint("https://api.anthropic.com/"),
            "https://api.anthropic.com/v1/messages"
        );
    }
}
