//! Process entry point. Every inbound event produces an outbound envelope:
//! anything that goes wrong below the router, including a panic inside a
//! handler, is logged and answered with a fixed apology.

use std::any::Any;
use std::sync::Arc;

use naturetalk_core::errors::UNHANDLED_FAULT_MESSAGE;
use naturetalk_core::FailureKind;
use naturetalk_skill::{
    DispatchError, EventContext, RequestEnvelope, ResponseBuilder, ResponseEnvelope, SkillRouter,
};
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, info};
use uuid::Uuid;

/// Longest prefix of a raw inbound event written to the log.
pub const LOGGED_EVENT_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum EntryError {
    #[error("request body is not JSON: {0}")]
    NotJson(#[source] serde_json::Error),
    #[error("event is not a voice-platform request: {0}")]
    Undecodable(#[source] serde_json::Error),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("handler panicked: {0}")]
    Panicked(String),
    #[error("handler task cancelled: {0}")]
    Cancelled(String),
}

impl From<JoinError> for EntryError {
    fn from(join_error: JoinError) -> Self {
        if join_error.is_panic() {
            Self::Panicked(panic_message(join_error.into_panic()))
        } else {
            Self::Cancelled(join_error.to_string())
        }
    }
}

pub struct SkillService {
    router: Arc<SkillRouter>,
}

impl SkillService {
    pub fn new(router: SkillRouter) -> Self {
        Self { router: Arc::new(router) }
    }

    pub fn route_count(&self) -> usize {
        self.router.handler_count()
    }

    pub async fn handle(&self, event: Value, ctx: &EventContext) -> ResponseEnvelope {
        log_received(ctx, &event.to_string());

        match self.try_handle(event, ctx).await {
            Ok(response) => response,
            Err(entry_error) => fault_response(ctx, &entry_error),
        }
    }

    async fn try_handle(
        &self,
        event: Value,
        ctx: &EventContext,
    ) -> Result<ResponseEnvelope, EntryError> {
        let envelope: RequestEnvelope =
            serde_json::from_value(event).map_err(EntryError::Undecodable)?;

        // Dispatch on its own task so a panicking handler surfaces as a JoinError.
        let router = Arc::clone(&self.router);
        let task_ctx = ctx.clone();
        let response =
            tokio::spawn(async move { router.dispatch(&envelope, &task_ctx).await }).await??;
        Ok(response)
    }
}

/// The platform request id when present, otherwise a fresh UUID.
pub fn correlation_id_for(event: &Value) -> String {
    event
        .pointer("/request/requestId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned)
}

pub fn fault_response(ctx: &EventContext, entry_error: &EntryError) -> ResponseEnvelope {
    error!(
        event_name = "skill.entry.fault",
        correlation_id = %ctx.correlation_id,
        failure = FailureKind::UnhandledFault.as_key(),
        error = %entry_error,
        detail = ?entry_error,
        "request handling faulted"
    );
    ResponseBuilder::new().speak(UNHANDLED_FAULT_MESSAGE).build()
}

/// Logs the first [`LOGGED_EVENT_CHARS`] characters of a raw inbound event.
pub fn log_received(ctx: &EventContext, raw: &str) {
    info!(
        event_name = "skill.request.received",
        correlation_id = %ctx.correlation_id,
        event = %logged_prefix(raw),
        "inbound event"
    );
}

fn logged_prefix(raw: &str) -> String {
    raw.chars().take(LOGGED_EVENT_CHARS).collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_owned()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use naturetalk_core::errors::{NOT_SUPPORTED_MESSAGE, UNHANDLED_FAULT_MESSAGE};
    use naturetalk_skill::{
        EventContext, HandlerError, RequestEnvelope, RequestHandler, RequestMatcher,
        ResponseBuilder, ResponseEnvelope, SkillRouter,
    };
    use serde_json::json;

    use super::{correlation_id_for, logged_prefix, SkillService, LOGGED_EVENT_CHARS};

    struct Panicking;

    #[async_trait]
    impl RequestHandler for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn handle(
            &self,
            _envelope: &RequestEnvelope,
            _ctx: &EventContext,
        ) -> Result<ResponseEnvelope, HandlerError> {
            panic!("device table exploded");
        }
    }

    struct Failing;

    #[async_trait]
    impl RequestHandler for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle(
            &self,
            _envelope: &RequestEnvelope,
            _ctx: &EventContext,
        ) -> Result<ResponseEnvelope, HandlerError> {
            Err(HandlerError::SessionAttributes("boom".to_owned()))
        }
    }

    struct Greeting;

    #[async_trait]
    impl RequestHandler for Greeting {
        fn name(&self) -> &'static str {
            "greeting"
        }

        async fn handle(
            &self,
            _envelope: &RequestEnvelope,
            _ctx: &EventContext,
        ) -> Result<ResponseEnvelope, HandlerError> {
            Ok(ResponseBuilder::new().speak("こんにちは").ask("他に何かありますか？").build())
        }
    }

    fn service() -> SkillService {
        let mut router = SkillRouter::new();
        router.register(RequestMatcher::RequestType("LaunchRequest"), Greeting);
        router.register(RequestMatcher::Intent(&["Explode"]), Panicking);
        router.register(RequestMatcher::Intent(&["Fail"]), Failing);
        SkillService::new(router)
    }

    fn intent(name: &str) -> serde_json::Value {
        json!({"request": {"type": "IntentRequest", "requestId": "req-9", "intent": {"name": name}}})
    }

    fn assert_fault(response: &ResponseEnvelope) {
        assert_eq!(response.speech().as_deref(), Some(UNHANDLED_FAULT_MESSAGE));
        assert_eq!(response.response.should_end_session, Some(true));
    }

    #[tokio::test]
    async fn normal_responses_pass_through() {
        let response = service()
            .handle(json!({"request": {"type": "LaunchRequest"}}), &EventContext::default())
            .await;

        assert_eq!(response.speech().as_deref(), Some("こんにちは"));
        assert!(response.keeps_session_open());
    }

    #[tokio::test]
    async fn handler_panic_becomes_fault_response() {
        let response = service().handle(intent("Explode"), &EventContext::default()).await;
        assert_fault(&response);
    }

    #[tokio::test]
    async fn handler_error_becomes_fault_response() {
        let response = service().handle(intent("Fail"), &EventContext::default()).await;
        assert_fault(&response);
    }

    #[tokio::test]
    async fn undecodable_event_becomes_fault_response() {
        let service = service();

        assert_fault(&service.handle(json!({"version": "1.0"}), &EventContext::default()).await);
        assert_fault(&service.handle(json!("not an object"), &EventContext::default()).await);
    }

    #[tokio::test]
    async fn unknown_intent_is_not_a_fault() {
        let response = service().handle(intent("Unknown"), &EventContext::default()).await;

        assert_eq!(response.speech().as_deref(), Some(NOT_SUPPORTED_MESSAGE));
    }

    #[test]
    fn correlation_id_prefers_request_id() {
        assert_eq!(correlation_id_for(&intent("Any")), "req-9");

        let generated = correlation_id_for(&json!({"request": {"type": "LaunchRequest"}}));
        assert_eq!(generated.len(), 36);
        assert_ne!(generated, correlation_id_for(&json!({})));
    }

    #[test]
    fn logged_event_is_truncated_on_char_boundaries() {
        let event = json!({"text": "あ".repeat(LOGGED_EVENT_CHARS * 2)});

        let logged = logged_prefix(&event.to_string());

        assert_eq!(logged.chars().count(), LOGGED_EVENT_CHARS);
        assert!(logged.starts_with("{\"text\":\"あ"));
    }
}
