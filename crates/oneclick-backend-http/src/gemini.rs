//! Generation-service transport.
//!
//! The service is asked to answer with a JSON envelope
//! `{ "files": {..}, "answer": ".." }`; models wrap it in a fenced code
//! block often enough that the parser tolerates both shapes.

use async_trait::async_trait;
use oneclick_client_core::{
    ChatMessage, ChatRole, GenerationApi, GenerationError, GenerationReply, ProjectFileSet,
};
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::BackendConfig;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const ENVELOPE_INSTRUCTION: &str = "You are a single-page web app generator. \
Reply with a JSON object of the form {\"files\": {\"<filename>\": \"<content>\", ...}, \
\"answer\": \"<short message for the user>\"}. Include only the files you changed or added.";

pub struct GeminiGenerator {
    http: Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.gemini_api_key, &config.gemini_model)
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/models/{}:generateContent", self.model)
    }
}

fn role_label(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

fn build_request(prompt: &str, files: &ProjectFileSet, history: &[ChatMessage]) -> Value {
    let mut contents: Vec<Value> = history
        .iter()
        .map(|message| {
            json!({
                "role": role_label(message.role),
                "parts": [{ "text": message.content }]
            })
        })
        .collect();
    let files_json = serde_json::to_string(files).unwrap_or_else(|_| "{}".to_string());
    contents.push(json!({
        "role": "user",
        "parts": [{
            "text": format!("{prompt}\n\nCurrent project files:\n{files_json}")
        }]
    }));
    json!({
        "systemInstruction": { "parts": [{ "text": ENVELOPE_INSTRUCTION }] },
        "contents": contents,
        "generationConfig": { "responseMimeType": "application/json" }
    })
}

fn strip_fences(raw: &str) -> &str {
    let text = raw.trim();
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") up to the first newline.
    let body = body.split_once('\n').map_or(body, |(_, rest)| rest);
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn parse_reply(raw: &str) -> Result<GenerationReply, GenerationError> {
    serde_json::from_str(strip_fences(raw))
        .map_err(|err| GenerationError::MalformedReply(err.to_string()))
}

fn extract_text(response: &Value) -> Option<&str> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}

#[async_trait]
impl GenerationApi for GeminiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        files: &ProjectFileSet,
        history: &[ChatMessage],
    ) -> Result<GenerationReply, GenerationError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(prompt, files, history))
            .send()
            .await
            .map_err(|err| GenerationError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Rejected(format!("{status}: {body}")));
        }
        let value: Value = response
            .json()
            .await
            .map_err(|err| GenerationError::Transport(err.to_string()))?;
        let text = extract_text(&value).ok_or_else(|| {
            GenerationError::MalformedReply("response carried no candidate text".to_string())
        })?;
        parse_reply(text)
    }
}
