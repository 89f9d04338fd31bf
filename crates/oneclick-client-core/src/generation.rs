//! Contract with the code-generation service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::chat::ChatMessage;
use crate::project::ProjectFileSet;

/// Envelope the generation service answers with. `files` holds only the
/// files it changed or added; untouched files are simply absent. Unknown
/// fields are collected into `extra` and carried onto the assistant message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<ProjectFileSet>,
    #[serde(default)]
    pub answer: String,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service rejected request: {0}")]
    Rejected(String),
    #[error("generation reply was not a valid envelope: {0}")]
    MalformedReply(String),
    #[error("generation transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Runs one generation turn against the current file set and transcript.
    async fn generate(
        &self,
        prompt: &str,
        files: &ProjectFileSet,
        history: &[ChatMessage],
    ) -> Result<GenerationReply, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_keeps_unknown_fields() {
        let raw = json!({
            "answer": "Here you go",
            "files": { "index.html": "<p>hi</p>" },
            "model": "g-2.0",
            "tokens_used": 12
        });
        let reply: GenerationReply = serde_json::from_value(raw).expect("parse");
        assert_eq!(reply.answer, "Here you go");
        assert_eq!(reply.extra.get("model"), Some(&json!("g-2.0")));
        assert_eq!(reply.extra.get("tokens_used"), Some(&json!(12)));
    }

    #[test]
    fn reply_tolerates_missing_files() {
        let reply: GenerationReply =
            serde_json::from_value(json!({ "answer": "Just an answer" })).expect("parse");
        assert!(reply.files.is_none());
        assert!(reply.extra.is_empty());
    }
}
