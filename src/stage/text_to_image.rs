//! Text-to-image generation stage.
//!
//! Talks to a DashScope-style multimodal generation endpoint: one POST with
//! the prompt, then a second GET to download the hosted image URL the
//! response points at.

use super::{Stage, StageError, StageKind, StageParams};
use crate::config::GenerationConfig;
use async_trait::async_trait;
use clipforge_av::{Artifact, ScratchDir};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
    parameters: GenerationParameters<'a>,
}

#[derive(Serialize)]
struct GenerationInput<'a> {
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<MessageContent<'a>>,
}

#[derive(Serialize)]
struct MessageContent<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationParameters<'a> {
    negative_prompt: &'a str,
    prompt_extend: bool,
    watermark: bool,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    output: Option<GenerationOutput>,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    results: Vec<GenerationResult>,
}

#[derive(Debug, Deserialize)]
struct GenerationResult {
    url: Option<String>,
}

#[derive(Debug)]
pub struct TextToImage {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    size: String,
}

impl TextToImage {
    /// Build the stage from config. Fails when no API key is configured.
    pub fn new(config: &GenerationConfig) -> Result<Self, StageError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(StageError::MissingParam("generation.api_key"))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| StageError::ExternalCall(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.text_to_image_url.clone(),
            api_key,
            model: config.image_model.clone(),
            size: config.image_size.clone(),
        })
    }

    async fn request_image_url(&self, prompt: &str) -> Result<String, StageError> {
        let payload = GenerationRequest {
            model: &self.model,
            input: GenerationInput {
                messages: vec![Message {
                    role: "user",
                    content: vec![MessageContent { text: prompt }],
                }],
            },
            parameters: GenerationParameters {
                negative_prompt: "",
                prompt_extend: true,
                watermark: true,
                size: &self.size,
            },
        };

        debug!(endpoint = %self.endpoint, "requesting image generation");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StageError::ExternalCall(format!("image generation request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::ExternalCall(format!(
                "image generation returned {}: {}",
                status, body
            )));
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| StageError::ExternalCall(format!("unparseable generation response: {}", e)))?;

        body.output
            .and_then(|o| o.results.into_iter().next())
            .and_then(|r| r.url)
            .ok_or_else(|| StageError::ExternalCall("response carries no image URL".into()))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, StageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StageError::ExternalCall(format!("image download: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StageError::ExternalCall(format!(
                "image download returned {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StageError::ExternalCall(format!("image download body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Stage for TextToImage {
    fn kind(&self) -> StageKind {
        StageKind::TextToImage
    }

    async fn invoke(
        &self,
        store: &ScratchDir,
        _inputs: &[Artifact],
        params: &StageParams,
    ) -> Result<Artifact, StageError> {
        let prompt = params.require_prompt()?;

        let url = self.request_image_url(prompt).await?;
        let bytes = self.download(&url).await?;

        let name = params.out_name.as_deref().unwrap_or("frame.png");
        let artifact = store.allocate(self.kind().output_kind(), name, self.kind().name())?;
        std::fs::write(artifact.path(), &bytes)?;

        debug!(path = ?artifact.path(), bytes = bytes.len(), "image artifact written");
        Ok(artifact)
    }
}
