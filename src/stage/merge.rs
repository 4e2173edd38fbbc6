//! Audio/video merge stage.

use super::{expect_input, Stage, StageError, StageKind, StageParams};
use async_trait::async_trait;
use clipforge_av::{actions, Artifact, ArtifactKind, ScratchDir};

/// Lays the generated music bed under the clip, looping and truncating per
/// the duration plan in [`clipforge_av::actions::plan_loop`].
#[derive(Debug, Default)]
pub struct MergeAudioVideo;

#[async_trait]
impl Stage for MergeAudioVideo {
    fn kind(&self) -> StageKind {
        StageKind::MergeAudioVideo
    }

    async fn invoke(
        &self,
        store: &ScratchDir,
        inputs: &[Artifact],
        params: &StageParams,
    ) -> Result<Artifact, StageError> {
        let video = expect_input(inputs, ArtifactKind::Video)?;
        let audio = expect_input(inputs, ArtifactKind::Audio)?;

        let name = params.out_name.as_deref().unwrap_or("final_with_music.mp4");
        let artifact = store.allocate(self.kind().output_kind(), name, self.kind().name())?;

        // Either the output exists complete or not at all; a failed merge
        // must not leave a truncated file behind.
        if let Err(e) = actions::merge_audio_video(video.path(), audio.path(), artifact.path()) {
            store.cleanup(&artifact);
            return Err(e.into());
        }

        Ok(artifact)
    }
}
