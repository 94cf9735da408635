#![allow(clippy::missing_errors_doc)]

use color_eyre::eyre::{Result, eyre};
use common_types::PreparedImage;
use language_model::{Evaluator, OllamaClient, OpenAiClient};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const PROMPT: &str = "Rate the photo from 1 to 10. Respond with JSON: {\"total_score\": number}";

pub async fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| eyre!("usage: evaluate_photo <image> [openai|ollama]"))?;
    let backend = std::env::args().nth(2).unwrap_or_else(|| "ollama".to_string());

    let bytes = tokio::fs::read(&path).await?;
    let mime_type = infer::get(&bytes).map_or("image/jpeg", |kind| kind.mime_type());
    let image = PreparedImage {
        bytes,
        mime_type,
        width: 0,
        height: 0,
    };

    let evaluator: Box<dyn Evaluator> = if backend == "openai" {
        let key = std::env::var("OPENAI_API_KEY")?;
        Box::new(OpenAiClient::with_api_key(&key).build())
    } else {
        Box::new(OllamaClient::with_host("http://localhost:11434").build())
    };

    let now = Instant::now();
    let text = evaluator.evaluate(&image, PROMPT).await?;
    info!("{} answered in {:?}: {}", evaluator.model(), now.elapsed(), text);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    color_eyre::install()?;

    run().await?;

    Ok(())
}
