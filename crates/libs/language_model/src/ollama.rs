use crate::error::check_status;
use crate::evaluator::encode_base64;
use crate::{ApiError, ApiResult, Evaluator};
use async_trait::async_trait;
use bon::bon;
use common_types::{ApiBackend, ParsePolicy, PreparedImage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llava";

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Local backend posting to an Ollama server's `/api/generate` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
    model: String,
    timeout: Duration,
}

#[bon]
impl OllamaClient {
    #[builder(start_fn = with_host)]
    #[must_use]
    pub fn new(
        #[builder(start_fn)] host: &str,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            model: model.unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            timeout: timeout.unwrap_or(Duration::from_secs(120)),
        }
    }

    pub async fn generate(&self, prompt: &str, image: &PreparedImage) -> ApiResult<String> {
        let req_body = GenerateRequest {
            model: self.model.clone(),
            prompt: format!("{prompt}\n\nPlease evaluate this photo:"),
            images: vec![encode_base64(image)],
            stream: false,
            format: "json",
        };
        let url = format!("{}/api/generate", self.host);
        let response = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(&req_body)
            .send()
            .await?;
        let generated: GenerateResponse = check_status(response).await?.json().await?;
        debug!("Raw {} response: {}", self.model, generated.response);
        if generated.response.trim().is_empty() {
            return Err(ApiError::EmptyResponse);
        }
        Ok(generated.response)
    }
}

#[async_trait]
impl Evaluator for OllamaClient {
    fn backend(&self) -> ApiBackend {
        ApiBackend::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }

    /// Local models drift from the requested JSON more often, e.g. answering on a
    /// 100-point scale.
    fn parse_policy(&self) -> ParsePolicy {
        ParsePolicy::local()
    }

    async fn evaluate(&self, image: &PreparedImage, prompt: &str) -> ApiResult<String> {
        self.generate(prompt, image).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn image() -> PreparedImage {
        PreparedImage {
            bytes: b"jpeg".to_vec(),
            mime_type: "image/jpeg",
            width: 1,
            height: 1,
        }
    }

    #[tokio::test]
    async fn posts_image_to_generate_endpoint() -> Result<(), ApiError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "llava:13b",
                "images": ["anBlZw=="],
                "stream": false,
                "format": "json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llava:13b",
                "response": "Sure! {\"total_score\": 6}",
                "done": true
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::with_host(&format!("{}/", server.uri()))
            .model("llava:13b".to_string())
            .build();
        let text = client.evaluate(&image(), "rubric").await?;

        assert_eq!(text, "Sure! {\"total_score\": 6}");
        assert_eq!(client.parse_policy(), ParsePolicy::local());
        Ok(())
    }

    #[tokio::test]
    async fn server_error_is_reported_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{\"error\":\"model not found\"}"))
            .mount(&server)
            .await;

        let client = OllamaClient::with_host(&server.uri()).build();
        let err = client.evaluate(&image(), "rubric").await.unwrap_err();
        assert!(err.to_string().contains("model not found"), "got {err}");
    }

    #[tokio::test]
    async fn blank_generation_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "  " })))
            .mount(&server)
            .await;

        let client = OllamaClient::with_host(&server.uri()).build();
        let err = client.evaluate(&image(), "rubric").await.unwrap_err();
        assert!(matches!(err, ApiError::EmptyResponse));
    }
}
