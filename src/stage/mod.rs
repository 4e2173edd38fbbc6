//! The stage contract: every generation or transformation step in a run
//! implements [`Stage`].
//!
//! Stages are stateless between invocations; all state lives in the scratch
//! store. A stage either produces a complete output artifact or none at all,
//! and it never swallows an error: failures surface as a typed
//! [`StageError`] for the orchestrator to act on.

mod image_to_video;
mod merge;
mod text_to_image;
mod video_to_music;

pub use image_to_video::ImageToVideo;
pub use merge::MergeAudioVideo;
pub use text_to_image::TextToImage;
pub use video_to_music::VideoToMusic;

use async_trait::async_trait;
use clipforge_av::{Artifact, ArtifactKind, ScratchDir};
use std::time::Duration;

/// The closed set of stages the orchestrator can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    TextToImage,
    ImageToVideo,
    VideoToMusic,
    MergeAudioVideo,
    /// Deterministic catalog-backed substitute for the video generation
    /// service, used to validate orchestration without live calls.
    RouteMock,
}

impl StageKind {
    /// Stable identifier, also recorded as `produced_by` on output artifacts.
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::TextToImage => "text_to_image",
            StageKind::ImageToVideo => "image_to_video",
            StageKind::VideoToMusic => "video_to_music",
            StageKind::MergeAudioVideo => "merge_audio_video",
            StageKind::RouteMock => "route_mock",
        }
    }

    /// Kind of artifact this stage produces.
    pub fn output_kind(&self) -> ArtifactKind {
        match self {
            StageKind::TextToImage => ArtifactKind::Image,
            StageKind::ImageToVideo => ArtifactKind::Video,
            StageKind::VideoToMusic => ArtifactKind::Audio,
            StageKind::MergeAudioVideo => ArtifactKind::Video,
            StageKind::RouteMock => ArtifactKind::Video,
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors a stage can surface to the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Probing, seeking, trimming, or merging failed in the media toolchain.
    #[error(transparent)]
    Av(#[from] clipforge_av::Error),

    /// A generation API returned a non-success status or an unusable body.
    #[error("external call failed: {0}")]
    ExternalCall(String),

    /// The stage did not finish within the caller-imposed timeout.
    #[error("stage timed out after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled before this stage started.
    #[error("run cancelled")]
    Cancelled,

    /// The stage was not given the input artifact kind it consumes.
    #[error("missing input: expected a {expected} artifact")]
    MissingInput { expected: ArtifactKind },

    /// A required parameter was not supplied.
    #[error("missing parameter: {0}")]
    MissingParam(&'static str),

    /// The step sequence itself is malformed (empty, or wired to a later
    /// step's output).
    #[error("invalid plan: {0}")]
    InvalidPlan(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-invocation parameters.
///
/// Each stage documents which fields it reads; unknown fields are ignored,
/// missing required ones fail with [`StageError::MissingParam`].
#[derive(Debug, Clone, Default)]
pub struct StageParams {
    pub prompt: Option<String>,
    pub duration_secs: Option<u32>,
    pub out_name: Option<String>,
    pub turn: Option<i64>,
}

impl StageParams {
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_duration_secs(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_out_name(mut self, name: impl Into<String>) -> Self {
        self.out_name = Some(name.into());
        self
    }

    pub fn with_turn(mut self, turn: i64) -> Self {
        self.turn = Some(turn);
        self
    }

    pub(crate) fn require_prompt(&self) -> Result<&str, StageError> {
        self.prompt
            .as_deref()
            .ok_or(StageError::MissingParam("prompt"))
    }
}

/// One generation or transformation step.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Run the stage: consume input artifacts, write one output artifact
    /// under the store, and return it. On failure the declared output path
    /// must not exist half-written.
    async fn invoke(
        &self,
        store: &ScratchDir,
        inputs: &[Artifact],
        params: &StageParams,
    ) -> Result<Artifact, StageError>;
}

/// Find the first input of the given kind, or fail.
pub(crate) fn expect_input(inputs: &[Artifact], kind: ArtifactKind) -> Result<&Artifact, StageError> {
    inputs
        .iter()
        .find(|a| a.kind() == kind)
        .ok_or(StageError::MissingInput { expected: kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_av::ScratchDir;

    #[test]
    fn test_stage_kind_names() {
        assert_eq!(StageKind::TextToImage.name(), "text_to_image");
        assert_eq!(StageKind::MergeAudioVideo.name(), "merge_audio_video");
        assert_eq!(StageKind::RouteMock.to_string(), "route_mock");
    }

    #[test]
    fn test_output_kinds() {
        assert_eq!(StageKind::TextToImage.output_kind(), ArtifactKind::Image);
        assert_eq!(StageKind::ImageToVideo.output_kind(), ArtifactKind::Video);
        assert_eq!(StageKind::VideoToMusic.output_kind(), ArtifactKind::Audio);
        assert_eq!(
            StageKind::MergeAudioVideo.output_kind(),
            ArtifactKind::Video
        );
    }

    #[test]
    fn test_expect_input() {
        let video = ScratchDir::adopt("/tmp/a.mp4", ArtifactKind::Video, "source");
        let audio = ScratchDir::adopt("/tmp/a.mp3", ArtifactKind::Audio, "source");
        let inputs = vec![video.clone(), audio];

        assert_eq!(expect_input(&inputs, ArtifactKind::Video).unwrap(), &video);
        assert!(matches!(
            expect_input(&inputs, ArtifactKind::Image),
            Err(StageError::MissingInput {
                expected: ArtifactKind::Image
            })
        ));
    }

    #[test]
    fn test_require_prompt() {
        let params = StageParams::default();
        assert!(matches!(
            params.require_prompt(),
            Err(StageError::MissingParam("prompt"))
        ));

        let params = params.with_prompt("neon city at night");
        assert_eq!(params.require_prompt().unwrap(), "neon city at night");
    }
}
