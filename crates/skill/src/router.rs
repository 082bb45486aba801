use std::sync::Arc;

use async_trait::async_trait;
use naturetalk_agent::Assistant;
use naturetalk_core::DeviceStore;
use thiserror::Error;
use tracing::debug;

use crate::envelope::{
    RequestEnvelope, RequestKind, CANCEL_INTENT, DEVICE_CONTROL_INTENT, FALLBACK_INTENT,
    FREE_TALK_INTENT, HELP_INTENT, LAUNCH_REQUEST, SESSION_ENDED_REQUEST, SIMPLE_PHRASE_INTENT,
    STOP_INTENT, USER_INPUT_SLOT,
};
use crate::handlers::{
    CancelStopHandler, CatchAllHandler, ConversationHandler, HelpHandler, LaunchHandler,
    PromptSource, SessionEndedHandler,
};
use crate::messages::{
    DEVICE_CONTROL_PROMPT, FALLBACK_PROMPT, FREE_TALK_DEFAULT_PROMPT, SIMPLE_PHRASE_PROMPT,
};
use crate::response::ResponseEnvelope;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl EventContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into() }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("session attributes could not be encoded: {0}")]
    SessionAttributes(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

#[async_trait]
pub trait RequestHandler: Send + Sync {
    fn name(&self) -> &'static str;
    async fn handle(
        &self,
        envelope: &RequestEnvelope,
        ctx: &EventContext,
    ) -> Result<ResponseEnvelope, HandlerError>;
}

/// Decides whether a route claims a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestMatcher {
    RequestType(&'static str),
    /// An `IntentRequest` whose intent name is one of these.
    Intent(&'static [&'static str]),
}

impl RequestMatcher {
    pub fn matches(&self, envelope: &RequestEnvelope) -> bool {
        match self {
            Self::RequestType(request_type) => envelope.request_type() == *request_type,
            Self::Intent(names) => {
                envelope.kind() == RequestKind::Intent
                    && envelope
                        .intent_name()
                        .is_some_and(|name| names.iter().any(|candidate| *candidate == name))
            }
        }
    }
}

struct Route {
    matcher: RequestMatcher,
    handler: Arc<dyn RequestHandler>,
}

/// Ordered dispatch table. Routes are tried in registration order and the
/// first match handles the request; anything unmatched goes to the catch-all.
pub struct SkillRouter {
    routes: Vec<Route>,
    catch_all: Arc<dyn RequestHandler>,
}

impl Default for SkillRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillRouter {
    pub fn new() -> Self {
        Self { routes: Vec::new(), catch_all: Arc::new(CatchAllHandler) }
    }

    pub fn register<H>(&mut self, matcher: RequestMatcher, handler: H)
    where
        H: RequestHandler + 'static,
    {
        self.routes.push(Route { matcher, handler: Arc::new(handler) });
    }

    pub fn handler_for(&self, envelope: &RequestEnvelope) -> &dyn RequestHandler {
        self.routes
            .iter()
            .find(|route| route.matcher.matches(envelope))
            .map_or(self.catch_all.as_ref(), |route| route.handler.as_ref())
    }

    pub async fn dispatch(
        &self,
        envelope: &RequestEnvelope,
        ctx: &EventContext,
    ) -> Result<ResponseEnvelope, DispatchError> {
        let handler = self.handler_for(envelope);
        debug!(
            event_name = "skill.router.dispatch",
            correlation_id = %ctx.correlation_id,
            handler = handler.name(),
            request_type = envelope.request_type(),
            "dispatching request"
        );

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.routes.len()
    }
}

/// The assistant's full route table: launch, the four conversational intents,
/// help, cancel/stop and session end.
pub fn default_router(
    assistant: Arc<dyn Assistant>,
    devices: Arc<DeviceStore>,
    history_turns: usize,
) -> SkillRouter {
    let conversation = |name: &'static str, prompt: PromptSource| {
        ConversationHandler::new(name, prompt, Arc::clone(&assistant), Arc::clone(&devices))
            .with_history_turns(history_turns)
    };

    let mut router = SkillRouter::new();
    router.register(RequestMatcher::RequestType(LAUNCH_REQUEST), LaunchHandler);
    router.register(
        RequestMatcher::Intent(&[FREE_TALK_INTENT]),
        conversation(
            "free_talk",
            PromptSource::Slot { slot: USER_INPUT_SLOT, default_prompt: FREE_TALK_DEFAULT_PROMPT },
        ),
    );
    router.register(
        RequestMatcher::Intent(&[SIMPLE_PHRASE_INTENT]),
        conversation("simple_phrase", PromptSource::Fixed(SIMPLE_PHRASE_PROMPT)),
    );
    router.register(
        RequestMatcher::Intent(&[DEVICE_CONTROL_INTENT]),
        conversation("device_control", PromptSource::Fixed(DEVICE_CONTROL_PROMPT)),
    );
    router.register(
        RequestMatcher::Intent(&[FALLBACK_INTENT]),
        conversation("fallback", PromptSource::Fixed(FALLBACK_PROMPT)),
    );
    router.register(RequestMatcher::Intent(&[HELP_INTENT]), HelpHandler);
    router.register(RequestMatcher::Intent(&[CANCEL_INTENT, STOP_INTENT]), CancelStopHandler);
    router.register(RequestMatcher::RequestType(SESSION_ENDED_REQUEST), SessionEndedHandler);
    router
}
