//! Video-to-music generation stage.
//!
//! The music service works from a reference image, so this stage extracts
//! the clip's first frame, posts it to the image-to-music endpoint, and
//! writes the returned audio bytes. The reference frame is scratch-local and
//! removed once the request is done.

use super::{expect_input, Stage, StageError, StageKind, StageParams};
use crate::config::GenerationConfig;
use async_trait::async_trait;
use base64::Engine;
use clipforge_av::{actions, Artifact, ArtifactKind, ScratchDir};
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct MusicRequest<'a> {
    /// Reference frame, base64-encoded.
    image: String,
    mood: &'a str,
    length_secs: u32,
}

pub struct VideoToMusic {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    mood: String,
}

impl VideoToMusic {
    pub fn new(config: &GenerationConfig, mood: impl Into<String>) -> Result<Self, StageError> {
        let endpoint = config
            .video_to_music_url
            .clone()
            .ok_or(StageError::MissingParam("generation.video_to_music_url"))?;
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
            mood: mood.into(),
        })
    }
}

#[async_trait]
impl Stage for VideoToMusic {
    fn kind(&self) -> StageKind {
        StageKind::VideoToMusic
    }

    async fn invoke(
        &self,
        store: &ScratchDir,
        inputs: &[Artifact],
        params: &StageParams,
    ) -> Result<Artifact, StageError> {
        let video = expect_input(inputs, ArtifactKind::Video)?;

        let frame = store.allocate(
            ArtifactKind::Image,
            "reference_frame.jpg",
            self.kind().name(),
        )?;
        actions::extract_first_frame(video.path(), frame.path())?;
        let frame_bytes = std::fs::read(frame.path());
        store.cleanup(&frame);
        let frame_bytes = frame_bytes?;

        let payload = MusicRequest {
            image: base64::engine::general_purpose::STANDARD.encode(&frame_bytes),
            mood: &self.mood,
            length_secs: params.duration_secs.unwrap_or(8),
        };

        debug!(endpoint = %self.endpoint, source = ?video.path(), "requesting music generation");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StageError::ExternalCall(format!("music generation request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::ExternalCall(format!(
                "music generation returned {}: {}",
                status, body
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StageError::ExternalCall(format!("music generation body: {}", e)))?;

        let name = params.out_name.as_deref().unwrap_or("bgm.mp3");
        let artifact = store.allocate(self.kind().output_kind(), name, self.kind().name())?;
        std::fs::write(artifact.path(), &bytes)?;

        debug!(path = ?artifact.path(), bytes = bytes.len(), "audio artifact written");
        Ok(artifact)
    }
}
