use std::sync::Arc;

use async_trait::async_trait;
use naturetalk_agent::Assistant;
use naturetalk_core::errors::NOT_SUPPORTED_MESSAGE;
use naturetalk_core::{ConversationTurn, DeviceStore, FailureKind};
use tracing::{info, warn};

use crate::envelope::RequestEnvelope;
use crate::messages::{
    ANYTHING_ELSE_REPROMPT, FAREWELL_MESSAGE, HELP_MESSAGE, HELP_REPROMPT, LAUNCH_MESSAGE,
};
use crate::response::{ResponseBuilder, ResponseEnvelope};
use crate::router::{EventContext, HandlerError, RequestHandler};
use crate::session::{read_history, write_history};

pub struct LaunchHandler;

#[async_trait]
impl RequestHandler for LaunchHandler {
    fn name(&self) -> &'static str {
        "launch"
    }

    async fn handle(
        &self,
        _envelope: &RequestEnvelope,
        ctx: &EventContext,
    ) -> Result<ResponseEnvelope, HandlerError> {
        info!(
            event_name = "skill.launch",
            correlation_id = %ctx.correlation_id,
            "session started"
        );
        Ok(ResponseBuilder::new().speak(LAUNCH_MESSAGE).ask(LAUNCH_MESSAGE).build())
    }
}

/// Where a conversational intent gets the text it sends to the assistant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptSource {
    /// The value of `slot`, or `default_prompt` when the slot is unusable.
    Slot { slot: &'static str, default_prompt: &'static str },
    Fixed(&'static str),
}

impl PromptSource {
    fn prompt_for(&self, envelope: &RequestEnvelope, ctx: &EventContext) -> String {
        match self {
            Self::Fixed(prompt) => (*prompt).to_owned(),
            Self::Slot { slot, default_prompt } => match envelope.slot_value(slot) {
                Ok(value) => value.to_owned(),
                Err(slot_error) => {
                    warn!(
                        event_name = "skill.slot.unavailable",
                        correlation_id = %ctx.correlation_id,
                        failure = FailureKind::SlotExtraction.as_key(),
                        slot = *slot,
                        error = %slot_error,
                        "slot unavailable; using synthetic prompt"
                    );
                    (*default_prompt).to_owned()
                }
            },
        }
    }
}

/// Sends a prompt to the assistant, applies the device actions it proposes
/// and speaks its answer with the session left open.
pub struct ConversationHandler {
    name: &'static str,
    prompt: PromptSource,
    assistant: Arc<dyn Assistant>,
    devices: Arc<DeviceStore>,
    history_turns: usize,
}

impl ConversationHandler {
    pub fn new(
        name: &'static str,
        prompt: PromptSource,
        assistant: Arc<dyn Assistant>,
        devices: Arc<DeviceStore>,
    ) -> Self {
        Self { name, prompt, assistant, devices, history_turns: 0 }
    }

    pub fn with_history_turns(mut self, history_turns: usize) -> Self {
        self.history_turns = history_turns;
        self
    }
}

#[async_trait]
impl RequestHandler for ConversationHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(
        &self,
        envelope: &RequestEnvelope,
        ctx: &EventContext,
    ) -> Result<ResponseEnvelope, HandlerError> {
        let prompt = self.prompt.prompt_for(envelope, ctx);
        let mut attributes = envelope.session_attributes();
        let mut history =
            if self.history_turns > 0 { read_history(&attributes) } else { Vec::new() };

        info!(
            event_name = "skill.conversation.start",
            correlation_id = %ctx.correlation_id,
            handler = self.name,
            history_turns = history.len(),
            "forwarding utterance to assistant"
        );
        let reply = self.assistant.converse(&prompt, &history).await;

        if !reply.actions.is_empty() {
            let confirmations = self.devices.apply(&reply.actions);
            info!(
                event_name = "skill.devices.applied",
                correlation_id = %ctx.correlation_id,
                requested = reply.actions.len(),
                confirmations = ?confirmations,
                "device actions applied"
            );
        }

        history.push(ConversationTurn::user(prompt));
        history.push(ConversationTurn::assistant(reply.response.clone()));
        write_history(&mut attributes, &history, self.history_turns)
            .map_err(|err| HandlerError::SessionAttributes(err.to_string()))?;

        Ok(ResponseBuilder::new()
            .speak(reply.response)
            .ask(ANYTHING_ELSE_REPROMPT)
            .session_attributes(attributes)
            .build())
    }
}

pub struct HelpHandler;

#[async_trait]
impl RequestHandler for HelpHandler {
    fn name(&self) -> &'static str {
        "help"
    }

    async fn handle(
        &self,
        envelope: &RequestEnvelope,
        _ctx: &EventContext,
    ) -> Result<ResponseEnvelope, HandlerError> {
        Ok(ResponseBuilder::new()
            .speak(HELP_MESSAGE)
            .ask(HELP_REPROMPT)
            .session_attributes(envelope.session_attributes())
            .build())
    }
}

pub struct CancelStopHandler;

#[async_trait]
impl RequestHandler for CancelStopHandler {
    fn name(&self) -> &'static str {
        "cancel_stop"
    }

    async fn handle(
        &self,
        _envelope: &RequestEnvelope,
        _ctx: &EventContext,
    ) -> Result<ResponseEnvelope, HandlerError> {
        Ok(ResponseBuilder::new().speak(FAREWELL_MESSAGE).build())
    }
}

pub struct SessionEndedHandler;

#[async_trait]
impl RequestHandler for SessionEndedHandler {
    fn name(&self) -> &'static str {
        "session_ended"
    }

    async fn handle(
        &self,
        envelope: &RequestEnvelope,
        ctx: &EventContext,
    ) -> Result<ResponseEnvelope, HandlerError> {
        info!(
            event_name = "skill.session.ended",
            correlation_id = %ctx.correlation_id,
            reason = envelope.request.reason.as_deref().unwrap_or("none"),
            error = ?envelope.request.error,
            "session ended"
        );
        Ok(ResponseBuilder::new().build())
    }
}

/// Answers anything no registered route claimed.
pub struct CatchAllHandler;

#[async_trait]
impl RequestHandler for CatchAllHandler {
    fn name(&self) -> &'static str {
        "catch_all"
    }

    async fn handle(
        &self,
        envelope: &RequestEnvelope,
        ctx: &EventContext,
    ) -> Result<ResponseEnvelope, HandlerError> {
        warn!(
            event_name = "skill.router.unmatched",
            correlation_id = %ctx.correlation_id,
            failure = FailureKind::UnroutableRequest.as_key(),
            request_type = envelope.request_type(),
            intent = envelope.intent_name().unwrap_or("none"),
            "no handler matched request"
        );
        Ok(ResponseBuilder::new().speak(NOT_SUPPORTED_MESSAGE).build())
    }
}
