//! Image-to-video generation stage.
//!
//! Posts the source still plus the animation prompt to a configurable
//! endpoint and writes the returned video bytes as the output artifact. For
//! offline validation the deterministic [`crate::routing::RouteMock`] stands
//! in for this stage.

use super::{expect_input, Stage, StageError, StageKind, StageParams};
use crate::config::GenerationConfig;
use async_trait::async_trait;
use base64::Engine;
use clipforge_av::{Artifact, ArtifactKind, ScratchDir};
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct VideoRequest<'a> {
    prompt: &'a str,
    duration_secs: u32,
    /// Source still, base64-encoded.
    image: String,
}

pub struct ImageToVideo {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    default_duration_secs: u32,
}

impl ImageToVideo {
    pub fn new(config: &GenerationConfig, default_duration_secs: u32) -> Result<Self, StageError> {
        let endpoint = config
            .image_to_video_url
            .clone()
            .ok_or(StageError::MissingParam("generation.image_to_video_url"))?;
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
            endpoint,
            api_key,
            default_duration_secs,
        })
    }
}

#[async_trait]
impl Stage for ImageToVideo {
    fn kind(&self) -> StageKind {
        StageKind::ImageToVideo
    }

    async fn invoke(
        &self,
        store: &ScratchDir,
        inputs: &[Artifact],
        params: &StageParams,
    ) -> Result<Artifact, StageError> {
        let image = expect_input(inputs, ArtifactKind::Image)?;
        let image_bytes = std::fs::read(image.path())?;

        let payload = VideoRequest {
            prompt: params.prompt.as_deref().unwrap_or(""),
            duration_secs: params.duration_secs.unwrap_or(self.default_duration_secs),
            image: base64::engine::general_purpose::STANDARD.encode(&image_bytes),
        };

        debug!(endpoint = %self.endpoint, source = ?image.path(), "requesting video generation");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StageError::ExternalCall(format!("video generation request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::ExternalCall(format!(
                "video generation returned {}: {}",
                status, body
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StageError::ExternalCall(format!("video generation body: {}", e)))?;

        let name = params.out_name.as_deref().unwrap_or("anim.mp4");
        let artifact = store.allocate(self.kind().output_kind(), name, self.kind().name())?;
        std::fs::write(artifact.path(), &bytes)?;

        debug!(path = ?artifact.path(), bytes = bytes.len(), "video artifact written");
        Ok(artifact)
    }
}
