use crate::error::check_status;
use crate::evaluator::encode_base64;
use crate::{ApiError, ApiResult, Evaluator};
use async_trait::async_trait;
use bon::bon;
use common_types::{ApiBackend, PreparedImage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const USER_INSTRUCTION: &str = "Please evaluate this photo.";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum MessagePart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
pub struct ChatFullResponse {
    pub choices: Vec<FullChoice>,
}

#[derive(Deserialize)]
pub struct FullChoice {
    pub message: FullMessage,
}

#[derive(Deserialize)]
pub struct FullMessage {
    pub content: Option<String>,
}

/// Hosted backend speaking the OpenAI chat completions protocol.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

#[bon]
impl OpenAiClient {
    #[builder(start_fn = with_api_key)]
    #[must_use]
    pub fn new(
        #[builder(start_fn)] api_key: &str,
        base_url: Option<&str>,
        model: Option<String>,
        max_tokens: Option<u32>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_OPENAI_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            max_tokens: max_tokens.unwrap_or(1000),
            timeout: timeout.unwrap_or(Duration::from_secs(120)),
        }
    }

    /// The rubric goes in as the system message, the image as an inline data URL.
    #[must_use]
    pub fn prepare_messages(&self, prompt: &str, image: &PreparedImage) -> Vec<Message> {
        let b64 = encode_base64(image);
        vec![
            Message {
                role: "system".to_string(),
                content: MessageContent::Text(prompt.to_string()),
            },
            Message {
                role: "user".to_string(),
                content: MessageContent::Parts(vec![
                    MessagePart::Text {
                        text: USER_INSTRUCTION.to_string(),
                    },
                    MessagePart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{};base64,{b64}", image.mime_type),
                        },
                    },
                ]),
            },
        ]
    }

    pub async fn call(&self, messages: Vec<Message>) -> ApiResult<String> {
        let req_body = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&req_body)
            .send()
            .await?;
        let full: ChatFullResponse = check_status(response).await?.json().await?;
        full.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ApiError::EmptyResponse)
    }
}

#[async_trait]
impl Evaluator for OpenAiClient {
    fn backend(&self) -> ApiBackend {
        ApiBackend::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn evaluate(&self, image: &PreparedImage, prompt: &str) -> ApiResult<String> {
        debug!(
            "Sending {}x{} image ({} bytes) to {}",
            image.width,
            image.height,
            image.bytes.len(),
            self.model
        );
        self.call(self.prepare_messages(prompt, image)).await
    }
}
