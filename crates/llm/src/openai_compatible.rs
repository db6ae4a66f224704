//! Chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{CompletionRequest, LlmError, LlmProvider, ModelName};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// DashScope's OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

pub const DEFAULT_MODEL: &str = "qwen-plus";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for [`OpenAiCompatibleProvider`].
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    /// Bearer key. A missing key is reported on the first call, not here.
    pub api_key: Option<String>,
    pub model: ModelName,
    pub timeout: Duration,
}

impl LlmConfig {
    /// Settings for `model` on the default endpoint and timeout.
    pub fn new(model: ModelName, api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key,
            model,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// [`LlmProvider`] backed by an OpenAI-compatible HTTP API.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a ModelName, request: &'a CompletionRequest) -> Self {
        Self {
            model: model.as_str(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Pulls the first choice's content out of a response body.
fn parse_chat_response(body: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_owned()))
}

/// Maps a non-success status to an [`LlmError`].
fn classify_failure(status: u16, retry_after: Option<u64>, body: String) -> LlmError {
    if status == 429 {
        LlmError::RateLimited { retry_after }
    } else {
        LlmError::Api {
            status,
            message: body,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LlmError::MissingApiKey("ALIYUN_API_KEY is not set".to_owned()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| LlmError::Http(e.to_string()))?,
        );

        let body = ChatRequest::new(&self.config.model, &request);
        debug!(
            model = %self.config.model,
            temperature = request.temperature,
            user_chars = request.user.chars().count(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion rejected");
            return Err(classify_failure(status.as_u16(), retry_after, text));
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        parse_chat_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(api_key: Option<String>) -> LlmConfig {
        LlmConfig::new(ModelName::new(DEFAULT_MODEL).unwrap(), api_key)
    }

    #[test]
    fn request_body_carries_model_messages_and_temperature() {
        let model = ModelName::new("qwen-plus").unwrap();
        let request = CompletionRequest::deterministic("sys", "我在北京想吃川菜");

        let body = serde_json::to_value(ChatRequest::new(&model, &request)).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "qwen-plus",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "我在北京想吃川菜"}
                ],
                "temperature": 0.0
            })
        );
    }

    #[test]
    fn first_choice_content_is_returned() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"steps\":[]}"}},{"message":{"content":"second"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), r#"{"steps":[]}"#);
    }

    #[test]
    fn empty_choices_is_an_invalid_response() {
        assert!(matches!(
            parse_chat_response(r#"{"choices":[]}"#),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_chat_response("not json"),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn status_classification() {
        assert_eq!(
            classify_failure(429, Some(7), String::new()),
            LlmError::RateLimited {
                retry_after: Some(7)
            }
        );
        assert_eq!(
            classify_failure(401, None, "bad key".to_owned()),
            LlmError::Api {
                status: 401,
                message: "bad key".to_owned()
            }
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let provider = OpenAiCompatibleProvider::new(LlmConfig {
            base_url: "http://localhost:8080/v1/".to_owned(),
            ..config(None)
        })
        .unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let provider = OpenAiCompatibleProvider::new(config(Some(String::new()))).unwrap();
        let err = provider
            .complete(CompletionRequest::deterministic("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey(_)));
    }
}
