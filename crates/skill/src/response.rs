use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const RESPONSE_VERSION: &str = "1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub version: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub session_attributes: Map<String, Value>,
    pub response: ResponseBody,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_end_session: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpeech {
    #[serde(rename = "type")]
    pub speech_type: String,
    pub ssml: String,
}

impl OutputSpeech {
    pub fn ssml(text: &str) -> Self {
        Self { speech_type: "SSML".to_owned(), ssml: format!("<speak>{}</speak>", escape(text)) }
    }

    /// The plain text wrapped by [`OutputSpeech::ssml`].
    pub fn text(&self) -> String {
        let inner = self
            .ssml
            .strip_prefix("<speak>")
            .and_then(|rest| rest.strip_suffix("</speak>"))
            .unwrap_or(&self.ssml);
        unescape(inner)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

impl ResponseEnvelope {
    pub fn speech(&self) -> Option<String> {
        self.response.output_speech.as_ref().map(OutputSpeech::text)
    }

    pub fn reprompt(&self) -> Option<String> {
        self.response.reprompt.as_ref().map(|reprompt| reprompt.output_speech.text())
    }

    pub fn keeps_session_open(&self) -> bool {
        self.response.should_end_session == Some(false)
    }
}

/// Assembles a [`ResponseEnvelope`]. Asking a reprompt keeps the session
/// open; speaking without one closes it; a response with neither (session
/// end) carries an empty body.
#[derive(Clone, Debug, Default)]
pub struct ResponseBuilder {
    speech: Option<String>,
    reprompt: Option<String>,
    session_attributes: Map<String, Value>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speak(mut self, text: impl Into<String>) -> Self {
        self.speech = Some(text.into());
        self
    }

    pub fn ask(mut self, reprompt: impl Into<String>) -> Self {
        self.reprompt = Some(reprompt.into());
        self
    }

    pub fn session_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.session_attributes = attributes;
        self
    }

    pub fn build(self) -> ResponseEnvelope {
        let should_end_session = match (&self.speech, &self.reprompt) {
            (None, None) => None,
            (_, Some(_)) => Some(false),
            (Some(_), None) => Some(true),
        };

        ResponseEnvelope {
            version: RESPONSE_VERSION.to_owned(),
            session_attributes: self.session_attributes,
            response: ResponseBody {
                output_speech: self.speech.as_deref().map(OutputSpeech::ssml),
                reprompt: self
                    .reprompt
                    .as_deref()
                    .map(|text| Reprompt { output_speech: OutputSpeech::ssml(text) }),
                should_end_session,
            },
        }
    }
}

fn escape(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            other => output.push(other),
        }
    }
    output
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::ResponseBuilder;

    #[test]
    fn reprompt_keeps_session_open() {
        let envelope = ResponseBuilder::new().speak("こんにちは").ask("他に何かありますか？").build();

        assert!(envelope.keeps_session_open());
        assert_eq!(envelope.speech().as_deref(), Some("こんにちは"));
        assert_eq!(envelope.reprompt().as_deref(), Some("他に何かありますか？"));
        assert_eq!(
            serde_json::to_value(&envelope).expect("serialize"),
            json!({
                "version": "1.0",
                "response": {
                    "outputSpeech": {"type": "SSML", "ssml": "<speak>こんにちは</speak>"},
                    "reprompt": {
                        "outputSpeech": {"type": "SSML", "ssml": "<speak>他に何かありますか？</speak>"}
                    },
                    "shouldEndSession": false
                }
            })
        );
    }

    #[test]
    fn speech_without_reprompt_ends_session() {
        let envelope = ResponseBuilder::new().speak("またお話ししましょう").build();

        assert!(!envelope.keeps_session_open());
        assert_eq!(envelope.response.should_end_session, Some(true));
        assert_eq!(envelope.reprompt(), None);
    }

    #[test]
    fn empty_response_has_empty_body() {
        let envelope = ResponseBuilder::new().build();

        assert_eq!(
            serde_json::to_value(&envelope).expect("serialize"),
            json!({"version": "1.0", "response": {}})
        );
    }

    #[test]
    fn markup_characters_are_escaped_in_ssml() {
        let envelope = ResponseBuilder::new().speak("A & B <tag>").build();

        let ssml = &envelope.response.output_speech.as_ref().expect("speech").ssml;
        assert_eq!(ssml, "<speak>A &amp; B &lt;tag&gt;</speak>");
        assert_eq!(envelope.speech().as_deref(), Some("A & B <tag>"));
    }

    #[test]
    fn session_attributes_are_serialized_when_present() {
        let mut attributes = Map::new();
        attributes.insert("history".to_owned(), Value::Array(Vec::new()));

        let envelope =
            ResponseBuilder::new().speak("はい").ask("?").session_attributes(attributes).build();

        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(value["sessionAttributes"], json!({"history": []}));
    }
}
