use crate::ApiResult;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use common_types::{ApiBackend, ParsePolicy, PreparedImage};

/// A vision backend that scores one image against a prompt.
///
/// Implementations make exactly one outbound request per call and never retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn backend(&self) -> ApiBackend;

    fn model(&self) -> &str;

    /// How forgiving score parsing should be for this backend's output.
    fn parse_policy(&self) -> ParsePolicy {
        ParsePolicy::hosted()
    }

    /// Sends the image and prompt, returns the raw text the model produced.
    async fn evaluate(&self, image: &PreparedImage, prompt: &str) -> ApiResult<String>;
}

pub(crate) fn encode_base64(image: &PreparedImage) -> String {
    general_purpose::STANDARD.encode(&image.bytes)
}
