use serde_json::{json, Value};
use tracing::debug;

use crate::sse;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Anything the streamed-reply exchange can raise. Not retried; the caller
/// surfaces it to the transcript.
#[derive(Debug, thiserror::Error)]
pub enum RemoteServiceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("chat endpoint returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("reply stream failed: {0}")]
    Stream(String),
}

/// Fixed sampling parameters the session is created with.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

/// One turn of the replayed conversation history.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
            base_url: API_BASE.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            generation: GenerationConfig::default(),
        }
    }

    /// Point the client at a different endpoint (config override).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn request_body(&self, system_instruction: &str, turns: &[Turn]) -> Value {
        let contents: Vec<Value> = turns
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Model => "model",
                };
                json!({
                    "role": role,
                    "parts": [{ "text": turn.text }]
                })
            })
            .collect();

        json!({
            "contents": contents,
            "systemInstruction": {
                "parts": [{ "text": system_instruction }]
            },
            "generationConfig": {
                "temperature": self.generation.temperature,
                "topP": self.generation.top_p,
                "topK": self.generation.top_k,
                "maxOutputTokens": self.generation.max_output_tokens,
            }
        })
    }

    /// Send the conversation and stream the reply, invoking `on_fragment`
    /// for every non-empty text fragment as it arrives. Returns the full
    /// concatenated reply.
    pub async fn stream_reply(
        &self,
        system_instruction: &str,
        turns: &[Turn],
        mut on_fragment: impl FnMut(String),
    ) -> Result<String, RemoteServiceError> {
        let body = self.request_body(system_instruction, turns);

        debug!(model = %self.model, turns = turns.len(), "chat endpoint streaming request");

        let response = self
            .client
            .post(self.stream_url())
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteServiceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut full_reply = String::new();
        let mut parse_error: Option<RemoteServiceError> = None;

        sse::read_events(sse::response_reader(response), |event| {
            if parse_error.is_some() {
                return;
            }
            match serde_json::from_str::<Value>(&event.data) {
                Ok(chunk) => {
                    let fragment = extract_fragment(&chunk);
                    // Empty fragments are skipped, never yielded.
                    if !fragment.is_empty() {
                        full_reply.push_str(&fragment);
                        on_fragment(fragment);
                    }
                }
                Err(e) => {
                    parse_error = Some(RemoteServiceError::Parse(e.to_string()));
                }
            }
        })
        .await
        .map_err(|e| RemoteServiceError::Stream(e.to_string()))?;

        if let Some(error) = parse_error {
            return Err(error);
        }

        debug!(chars = full_reply.len(), "reply stream finished");
        Ok(full_reply)
    }
}

/// Pull the text out of one streamed chunk. Chunks without text (safety
/// metadata, usage counts) yield an empty string.
fn extract_fragment(chunk: &Value) -> String {
    let mut fragment = String::new();
    if let Some(candidates) = chunk["candidates"].as_array() {
        for candidate in candidates {
            if let Some(parts) = candidate["content"]["parts"].as_array() {
                for part in parts {
                    if let Some(text) = part["text"].as_str() {
                        fragment.push_str(text);
                    }
                }
            }
        }
    }
    fragment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> GeminiClient {
        GeminiClient::new("test-key", "gemini-2.0-flash")
    }

    #[test]
    fn test_request_body_carries_system_instruction_and_sampling() {
        let client = test_client();
        let body = client.request_body("You are a store assistant.", &[]);

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are a store assistant."
        );
        assert_eq!(body["generationConfig"]["temperature"], 0.8);
        assert_eq!(body["generationConfig"]["topP"], 0.95);
        assert_eq!(body["generationConfig"]["topK"], 40);
    }

    #[test]
    fn test_request_body_maps_roles() {
        let client = test_client();
        let turns = vec![
            Turn {
                role: TurnRole::User,
                text: "hi".to_string(),
            },
            Turn {
                role: TurnRole::Model,
                text: "hello".to_string(),
            },
        ];
        let body = client.request_body("sys", &turns);

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_stream_url_includes_model_and_sse() {
        let client = test_client().with_base_url("http://localhost:9999/models/");
        assert_eq!(
            client.stream_url(),
            "http://localhost:9999/models/gemini-2.0-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_extract_fragment_concatenates_parts() {
        let chunk = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hel" }, { "text": "lo" }] }
            }]
        });
        assert_eq!(extract_fragment(&chunk), "Hello");
    }

    #[test]
    fn test_extract_fragment_empty_for_metadata_chunks() {
        let chunk = json!({ "usageMetadata": { "promptTokenCount": 12 } });
        assert_eq!(extract_fragment(&chunk), "");

        let chunk = json!({
            "candidates": [{ "finishReason": "STOP" }]
        });
        assert_eq!(extract_fragment(&chunk), "");
    }
}
