use thiserror::Error;

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error (status {status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("model returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Turns a non-success response into [`ApiError::Api`], passes successful ones through.
pub(crate) async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        body.truncate(cut);
        body.push('…');
    }
    Err(ApiError::Api { status, body })
}
