use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::error::GenerationError;
use crate::model::config::GeneratorSettings;
use crate::services::ai_types::GenerationRequest;

const TIMEOUT_SECS: u64 = 60;

/// External text generation. The response shape is up to the backend;
/// callers coerce it themselves.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError>;
}

pub fn endpoint_for(provider: &str) -> Result<&'static str, GenerationError> {
    match provider {
        "openai" => Ok("https://api.openai.com/v1/chat/completions"),
        "deepseek" => Ok("https://api.deepseek.com/v1/chat/completions"),
        _ => Err(GenerationError::UnsupportedProvider(provider.to_string())),
    }
}

/// OpenAI-compatible chat completions backend. One request per call, no
/// retries.
pub struct ChatCompletionsGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsGenerator {
    pub fn new(settings: &GeneratorSettings, api_key: String) -> Result<Self, GenerationError> {
        let endpoint = match &settings.endpoint {
            Some(url) => url.clone(),
            None => endpoint_for(&settings.provider)?.to_string(),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: settings.model.clone(),
        })
    }

    /// Build from settings, reading the key from the configured environment
    /// variable. `None` when no key is set.
    pub fn from_env(settings: &GeneratorSettings) -> Result<Option<Self>, GenerationError> {
        match std::env::var(&settings.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Self::new(settings, key.trim().to_string()).map(Some),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        let model = request.target.as_deref().unwrap_or(&self.model);

        let body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": "You are a professional translator." },
                { "role": "user", "content": request.instructions }
            ],
            "temperature": 0.3
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        // Read as text first so error bodies that are not JSON are kept.
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message: extract_error_message(status, &text),
            });
        }

        let json: Value = serde_json::from_str(&text).map_err(|_| GenerationError::MissingContent)?;
        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|content| Value::String(content.trim().to_string()))
            .ok_or(GenerationError::MissingContent)
    }
}

fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    // Common shapes: { "error": { "message": "..." } } or { "message": "..." }
    if let Ok(v) = serde_json::from_str::<Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }

    let trimmed = body_text.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }

    match trimmed.char_indices().nth(400) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_fields() {
        let msg = extract_error_message(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"bad key"}}"#,
        );
        assert_eq!(msg, "bad key");
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, r#"{"message":"nope"}"#),
            "nope"
        );
    }

    #[test]
    fn error_message_truncates_raw_bodies() {
        let body = "x".repeat(1000);
        let msg = extract_error_message(StatusCode::BAD_GATEWAY, &body);
        assert_eq!(msg.len(), 403);
        assert_eq!(
            extract_error_message(StatusCode::BAD_GATEWAY, "  "),
            "Bad Gateway"
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let settings = GeneratorSettings {
            provider: "nobody".into(),
            model: "m".into(),
            api_key_env: "UNUSED".into(),
            endpoint: None,
        };
        assert!(matches!(
            ChatCompletionsGenerator::new(&settings, "k".into()),
            Err(GenerationError::UnsupportedProvider(_))
        ));
    }
}
