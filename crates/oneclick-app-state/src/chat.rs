//! Chat-driven generation workflow: transcript, draft input, project files,
//! and the single-generation-at-a-time lock.

use oneclick_client_core::{
    ChatMessage, GenerationError, GenerationReply, ProjectFileSet, default_project_files,
    merge_files,
};
use tracing::warn;

/// Everything the generation service needs for one turn. Snapshotted at
/// submit time so later edits cannot race the in-flight request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub files: ProjectFileSet,
    pub history: Vec<ChatMessage>,
}

#[derive(Debug)]
pub struct GenerationWorkflow {
    messages: Vec<ChatMessage>,
    input: String,
    in_flight: bool,
    files: ProjectFileSet,
    next_seq: u64,
}

impl Default for GenerationWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationWorkflow {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            in_flight: false,
            files: default_project_files(),
            next_seq: 0,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn files(&self) -> &ProjectFileSet {
        &self.files
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight
    }

    /// Starts a generation turn: appends the user message, clears the draft,
    /// and takes the lock. The transcript keeps the draft exactly as typed;
    /// only the request carries the trimmed prompt. A no-op (returns `None`,
    /// everything untouched) when the trimmed draft is empty or a turn is
    /// already in flight.
    pub fn begin_submit(&mut self, now_ms: i64) -> Option<GenerationRequest> {
        if self.in_flight {
            return None;
        }
        let prompt = self.input.trim().to_string();
        if prompt.is_empty() {
            return None;
        }
        let history = self.messages.clone();
        let id = self.next_message_id(now_ms);
        let typed = std::mem::take(&mut self.input);
        self.messages.push(ChatMessage::user(id, typed, now_ms));
        self.in_flight = true;
        Some(GenerationRequest {
            prompt,
            files: self.files.clone(),
            history,
        })
    }

    /// Lands a successful reply: merges changed files key-wise (untouched
    /// files survive), appends the assistant message with the reply's extra
    /// metadata, and releases the lock.
    pub fn complete(&mut self, now_ms: i64, reply: GenerationReply) {
        if let Some(files) = &reply.files {
            merge_files(&mut self.files, files);
        }
        let id = self.next_message_id(now_ms);
        self.messages
            .push(ChatMessage::assistant(id, reply.answer, now_ms, reply.extra));
        self.in_flight = false;
    }

    /// Releases the lock after a failed turn. The transcript and files stay
    /// exactly as they were; the failure is only logged.
    pub fn fail(&mut self, error: &GenerationError) {
        warn!(error = %error, "generation turn failed");
        self.in_flight = false;
    }

    fn next_message_id(&mut self, now_ms: i64) -> String {
        let seq = self.next_seq;
        self.next_seq += 1;
        format!("{now_ms}-{seq}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneclick_client_core::{ChatRole, PREVIEW_DOCUMENT};
    use serde_json::json;

    fn reply_with_files(answer: &str, files: &[(&str, &str)]) -> GenerationReply {
        GenerationReply {
            files: Some(
                files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            answer: answer.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn empty_or_whitespace_prompt_is_a_no_op() {
        let mut chat = GenerationWorkflow::new();
        chat.set_input("   ");
        assert!(chat.begin_submit(1).is_none());
        assert!(chat.messages().is_empty());
        assert!(!chat.is_generating());
        assert_eq!(chat.input(), "   ");
    }

    #[test]
    fn submit_appends_user_message_and_locks() {
        let mut chat = GenerationWorkflow::new();
        chat.set_input("  make a todo app  ");
        let request = chat.begin_submit(100).expect("request");

        assert_eq!(request.prompt, "make a todo app");
        assert!(request.history.is_empty());
        assert!(request.files.contains_key(PREVIEW_DOCUMENT));

        // The transcript shows the message as typed; trimming is only for
        // the generation service.
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].role, ChatRole::User);
        assert_eq!(chat.messages()[0].content, "  make a todo app  ");
        assert_eq!(chat.input(), "");
        assert!(chat.is_generating());
    }

    #[test]
    fn submit_while_in_flight_changes_nothing() {
        let mut chat = GenerationWorkflow::new();
        chat.set_input("first");
        chat.begin_submit(1).expect("request");

        chat.set_input("second");
        assert!(chat.begin_submit(2).is_none());
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.input(), "second");
    }

    #[test]
    fn complete_merges_files_instead_of_replacing() {
        let mut chat = GenerationWorkflow::new();
        chat.set_input("add a page");
        chat.begin_submit(1).expect("request");
        chat.complete(2, reply_with_files("added", &[("a.html", "A")]));

        chat.set_input("tweak the index");
        chat.begin_submit(3).expect("request");
        chat.complete(4, reply_with_files("tweaked", &[(PREVIEW_DOCUMENT, "Y")]));

        assert_eq!(chat.files().get("a.html").map(String::as_str), Some("A"));
        assert_eq!(
            chat.files().get(PREVIEW_DOCUMENT).map(String::as_str),
            Some("Y")
        );
        assert!(!chat.is_generating());
    }

    #[test]
    fn assistant_message_carries_reply_metadata() {
        let mut chat = GenerationWorkflow::new();
        chat.set_input("hello");
        chat.begin_submit(1).expect("request");

        let mut extra = serde_json::Map::new();
        extra.insert("model".to_string(), json!("g-2.0"));
        chat.complete(
            2,
            GenerationReply {
                files: None,
                answer: "hi".to_string(),
                extra,
            },
        );

        let last = chat.messages().last().expect("assistant message");
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.extra.get("model"), Some(&json!("g-2.0")));
    }

    #[test]
    fn failure_releases_lock_and_keeps_transcript() {
        let mut chat = GenerationWorkflow::new();
        chat.set_input("hello");
        chat.begin_submit(1).expect("request");
        let files_before = chat.files().clone();

        chat.fail(&GenerationError::Transport("timeout".to_string()));
        assert!(!chat.is_generating());
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.files(), &files_before);

        // A new turn is possible immediately.
        chat.set_input("retry");
        assert!(chat.begin_submit(2).is_some());
    }

    #[test]
    fn message_ids_are_unique_within_one_instant() {
        let mut chat = GenerationWorkflow::new();
        chat.set_input("a");
        chat.begin_submit(5).expect("request");
        chat.complete(5, reply_with_files("done", &[]));
        let ids: Vec<_> = chat.messages().iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec!["5-0".to_string(), "5-1".to_string()]);
    }
}
