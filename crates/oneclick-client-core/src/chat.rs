use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One transcript entry. `extra` carries whatever additional fields the
/// generation service returned alongside the answer; the client never
/// interprets them, it only stores and forwards them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp_ms: i64,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn user(id: String, content: String, timestamp_ms: i64) -> Self {
        Self {
            id,
            role: ChatRole::User,
            content,
            timestamp_ms,
            extra: Map::new(),
        }
    }

    pub fn assistant(
        id: String,
        content: String,
        timestamp_ms: i64,
        extra: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            role: ChatRole::Assistant,
            content,
            timestamp_ms,
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extra_fields_flatten_into_the_message() {
        let mut extra = Map::new();
        extra.insert("model".to_string(), json!("g-2.0"));
        let msg = ChatMessage::assistant("1-0".to_string(), "done".to_string(), 1, extra);

        let raw = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(raw["model"], json!("g-2.0"));
        assert_eq!(raw["content"], json!("done"));

        let back: ChatMessage = serde_json::from_value(raw).expect("parse");
        assert_eq!(back, msg);
    }
}
