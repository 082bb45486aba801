use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One chronological entry of a conversation. Turns are never edited after
/// they are appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// The structured answer the assistant gives for one user message.
///
/// Deserializing requires both fields with the right JSON types: `response`
/// must be a string and `actions` an array. Individual action entries are
/// accepted whatever their shape; see [`DeviceAction`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub response: String,
    pub actions: Vec<DeviceAction>,
}

impl AssistantReply {
    pub fn new(response: impl Into<String>, actions: Vec<DeviceAction>) -> Self {
        Self { response: response.into(), actions }
    }

    pub fn speech_only(response: impl Into<String>) -> Self {
        Self::new(response, Vec::new())
    }
}

/// A device command proposed by the assistant.
///
/// Entries are not validated: unknown devices, unknown commands and
/// out-of-range values all survive parsing and are judged when applied.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct DeviceAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl DeviceAction {
    pub fn new(device: impl Into<String>) -> Self {
        Self { device: Some(device.into()), ..Self::default() }
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

impl From<Value> for DeviceAction {
    fn from(value: Value) -> Self {
        let field = |key: &str| value.get(key).filter(|entry| !entry.is_null());

        Self {
            device: field("device").and_then(Value::as_str).map(str::to_owned),
            command: field("command").and_then(Value::as_str).map(str::to_owned),
            value: field("value").and_then(|entry| match entry {
                Value::Number(number) => number.as_f64(),
                Value::String(text) => {
                    text.trim().parse::<f64>().ok().filter(|parsed| parsed.is_finite())
                }
                _ => None,
            }),
        }
    }
}
