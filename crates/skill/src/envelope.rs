use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const LAUNCH_REQUEST: &str = "LaunchRequest";
pub const INTENT_REQUEST: &str = "IntentRequest";
pub const SESSION_ENDED_REQUEST: &str = "SessionEndedRequest";

pub const FREE_TALK_INTENT: &str = "FreeTalkIntent";
pub const SIMPLE_PHRASE_INTENT: &str = "SimplePhrase";
pub const DEVICE_CONTROL_INTENT: &str = "DeviceControl";
pub const FALLBACK_INTENT: &str = "AMAZON.FallbackIntent";
pub const HELP_INTENT: &str = "AMAZON.HelpIntent";
pub const CANCEL_INTENT: &str = "AMAZON.CancelIntent";
pub const STOP_INTENT: &str = "AMAZON.StopIntent";

pub const USER_INPUT_SLOT: &str = "UserInput";

/// Inbound voice-platform request. Only the fields routing needs are
/// modelled; everything else in the payload is ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub version: Option<String>,
    pub session: Option<Session>,
    pub context: Option<Value>,
    pub request: Request,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub new: bool,
    pub session_id: Option<String>,
    pub attributes: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(rename = "type")]
    pub request_type: String,
    pub request_id: Option<String>,
    pub timestamp: Option<String>,
    pub locale: Option<String>,
    pub intent: Option<Intent>,
    pub reason: Option<String>,
    pub error: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    pub slots: Option<HashMap<String, Slot>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Launch,
    Intent,
    SessionEnded,
    Other,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("request carries no intent")]
    NoIntent,
    #[error("intent `{0}` carries no slots")]
    NoSlots(String),
    #[error("slot `{0}` is missing")]
    MissingSlot(String),
    #[error("slot `{0}` has no value")]
    EmptyValue(String),
}

impl RequestEnvelope {
    pub fn request_type(&self) -> &str {
        &self.request.request_type
    }

    pub fn kind(&self) -> RequestKind {
        match self.request_type() {
            LAUNCH_REQUEST => RequestKind::Launch,
            INTENT_REQUEST => RequestKind::Intent,
            SESSION_ENDED_REQUEST => RequestKind::SessionEnded,
            _ => RequestKind::Other,
        }
    }

    pub fn intent_name(&self) -> Option<&str> {
        self.request.intent.as_ref().map(|intent| intent.name.as_str())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request.request_id.as_deref()
    }

    /// Value of a named slot, failing when any level of the slot structure is
    /// absent or the value is blank.
    pub fn slot_value(&self, slot: &str) -> Result<&str, SlotError> {
        let intent = self.request.intent.as_ref().ok_or(SlotError::NoIntent)?;
        let slots = intent.slots.as_ref().ok_or_else(|| SlotError::NoSlots(intent.name.clone()))?;
        let entry = slots.get(slot).ok_or_else(|| SlotError::MissingSlot(slot.to_owned()))?;

        entry
            .value
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| SlotError::EmptyValue(slot.to_owned()))
    }

    pub fn session_attributes(&self) -> Map<String, Value> {
        self.session.as_ref().and_then(|session| session.attributes.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RequestEnvelope, RequestKind, SlotError, FREE_TALK_INTENT, USER_INPUT_SLOT};

    fn free_talk(slots: serde_json::Value) -> RequestEnvelope {
        serde_json::from_value(json!({
            "version": "1.0",
            "session": {"new": false, "sessionId": "s-1", "attributes": {"history": []}},
            "request": {
                "type": "IntentRequest",
                "requestId": "req-1",
                "locale": "ja-JP",
                "intent": {"name": FREE_TALK_INTENT, "slots": slots}
            }
        }))
        .expect("envelope")
    }

    #[test]
    fn intent_request_exposes_type_name_and_slot() {
        let envelope = free_talk(json!({"UserInput": {"name": "UserInput", "value": "今日は寒いね"}}));

        assert_eq!(envelope.kind(), RequestKind::Intent);
        assert_eq!(envelope.intent_name(), Some(FREE_TALK_INTENT));
        assert_eq!(envelope.request_id(), Some("req-1"));
        assert_eq!(envelope.slot_value(USER_INPUT_SLOT), Ok("今日は寒いね"));
        assert!(envelope.session_attributes().contains_key("history"));
    }

    #[test]
    fn each_missing_slot_level_is_reported() {
        assert_eq!(
            free_talk(json!(null)).slot_value(USER_INPUT_SLOT),
            Err(SlotError::NoSlots(FREE_TALK_INTENT.to_owned()))
        );
        assert_eq!(
            free_talk(json!({})).slot_value(USER_INPUT_SLOT),
            Err(SlotError::MissingSlot(USER_INPUT_SLOT.to_owned()))
        );
        assert_eq!(
            free_talk(json!({"UserInput": {"name": "UserInput"}})).slot_value(USER_INPUT_SLOT),
            Err(SlotError::EmptyValue(USER_INPUT_SLOT.to_owned()))
        );
        assert_eq!(
            free_talk(json!({"UserInput": {"name": "UserInput", "value": " "}}))
                .slot_value(USER_INPUT_SLOT),
            Err(SlotError::EmptyValue(USER_INPUT_SLOT.to_owned()))
        );
    }

    #[test]
    fn launch_request_has_no_intent() {
        let envelope: RequestEnvelope =
            serde_json::from_value(json!({"request": {"type": "LaunchRequest"}})).expect("envelope");

        assert_eq!(envelope.kind(), RequestKind::Launch);
        assert_eq!(envelope.intent_name(), None);
        assert_eq!(envelope.slot_value(USER_INPUT_SLOT), Err(SlotError::NoIntent));
        assert!(envelope.session_attributes().is_empty());
    }

    #[test]
    fn unknown_request_types_are_other() {
        let envelope: RequestEnvelope = serde_json::from_value(json!({
            "request": {"type": "AudioPlayer.PlaybackStarted"}
        }))
        .expect("envelope");

        assert_eq!(envelope.kind(), RequestKind::Other);
    }
}
