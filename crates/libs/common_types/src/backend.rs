use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which vision model service scores the images.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiBackend {
    /// Hosted OpenAI-style chat completions API.
    #[default]
    OpenAi,
    /// Locally running Ollama server.
    Ollama,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown backend '{0}', expected 'openai' or 'ollama'")]
pub struct UnknownBackend(pub String);

impl ApiBackend {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ApiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiBackend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}
