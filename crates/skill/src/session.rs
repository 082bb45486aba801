//! Conversation history carried between turns in the platform's session
//! attributes. The platform hands the attributes back on the next request of
//! the same session; nothing is stored on our side.

use naturetalk_core::{ConversationTurn, Role};
use serde_json::{Map, Value};
use tracing::warn;

pub const HISTORY_ATTRIBUTE: &str = "history";

/// Prior turns recorded in `attributes`. A missing entry is an empty history;
/// a malformed one is logged and treated as empty.
pub fn read_history(attributes: &Map<String, Value>) -> Vec<ConversationTurn> {
    let Some(raw) = attributes.get(HISTORY_ATTRIBUTE) else {
        return Vec::new();
    };

    match serde_json::from_value::<Vec<ConversationTurn>>(raw.clone()) {
        Ok(history) => history,
        Err(error) => {
            warn!(
                event_name = "skill.session.history_malformed",
                error = %error,
                "ignoring malformed conversation history"
            );
            Vec::new()
        }
    }
}

/// Stores at most the newest `limit` turns of `history` into `attributes`,
/// starting on a user turn. A zero limit removes the entry.
pub fn write_history(
    attributes: &mut Map<String, Value>,
    history: &[ConversationTurn],
    limit: usize,
) -> Result<(), serde_json::Error> {
    if limit == 0 {
        attributes.remove(HISTORY_ATTRIBUTE);
        return Ok(());
    }

    let mut start = history.len().saturating_sub(limit);
    while history.get(start).is_some_and(|turn| turn.role != Role::User) {
        start += 1;
    }
    let value = serde_json::to_value(&history[start..])?;
    attributes.insert(HISTORY_ATTRIBUTE.to_owned(), value);
    Ok(())
}
