//! Pipeline orchestration.
//!
//! A [`PipelineRun`] owns one scratch store and executes its steps strictly
//! in sequence: each step consumes artifacts produced by earlier steps (or
//! externally supplied ones), and the next step never starts before the
//! previous artifact exists. The first failure aborts the run with the
//! failing stage identified; artifacts already on disk are kept for
//! inspection, cleanup being the caller's choice.

use crate::stage::{Stage, StageError, StageKind, StageParams};
use clipforge_av::{Artifact, ScratchDir};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Where a step's input artifact comes from.
#[derive(Debug, Clone)]
pub enum StageInput {
    /// Output of an earlier step, by step index.
    Output(usize),
    /// Artifact the run does not own (user-supplied source media).
    External(Artifact),
}

/// One planned stage invocation.
pub struct PipelineStep {
    pub stage: Box<dyn Stage>,
    pub params: StageParams,
    pub inputs: Vec<StageInput>,
}

impl PipelineStep {
    pub fn new(stage: Box<dyn Stage>, params: StageParams, inputs: Vec<StageInput>) -> Self {
        Self {
            stage,
            params,
            inputs,
        }
    }
}

/// Error of a failed run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A stage failed; which one and why.
    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: StageKind,
        #[source]
        source: StageError,
    },
    /// The plan had no steps.
    #[error("pipeline has no steps to execute")]
    EmptyPlan,
}

/// One sequential pipeline run over a dedicated scratch store.
pub struct PipelineRun {
    store: ScratchDir,
    cancel: CancellationToken,
    stage_timeout: Option<Duration>,
}

impl PipelineRun {
    pub fn new(store: ScratchDir) -> Self {
        Self {
            store,
            cancel: CancellationToken::new(),
            stage_timeout: None,
        }
    }

    /// Impose a timeout on every stage invocation. Expiry surfaces as
    /// [`StageError::Timeout`] for the stage that overran; the external
    /// process behind it is not killed here.
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &ScratchDir {
        &self.store
    }

    /// Token for cooperative cancellation. Takes effect at stage
    /// boundaries only; a stage already running finishes (or times out).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute the steps in order and return the final stage's artifact
    /// path.
    pub async fn execute(&self, steps: &[PipelineStep]) -> Result<PathBuf, PipelineError> {
        if steps.is_empty() {
            return Err(PipelineError::EmptyPlan);
        }

        let mut outputs: Vec<Artifact> = Vec::with_capacity(steps.len());

        for (i, step) in steps.iter().enumerate() {
            let kind = step.stage.kind();

            if self.cancel.is_cancelled() {
                tracing::info!("run cancelled before stage {}", kind);
                return Err(PipelineError::Stage {
                    stage: kind,
                    source: StageError::Cancelled,
                });
            }

            let inputs = self
                .resolve_inputs(&step.inputs, &outputs, i)
                .map_err(|source| PipelineError::Stage {
                    stage: kind,
                    source,
                })?;

            tracing::info!("stage {}/{}: {}", i + 1, steps.len(), kind);

            let invocation = step.stage.invoke(&self.store, &inputs, &step.params);
            let result = match self.stage_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, invocation).await {
                    Ok(result) => result,
                    Err(_) => Err(StageError::Timeout(timeout)),
                },
                None => invocation.await,
            };

            match result {
                Ok(artifact) => {
                    tracing::info!("stage {} produced {:?}", kind, artifact.path());
                    outputs.push(artifact);
                }
                Err(source) => {
                    tracing::error!("stage {} failed: {}", kind, source);
                    return Err(PipelineError::Stage {
                        stage: kind,
                        source,
                    });
                }
            }
        }

        // Non-empty plan, so the last output exists.
        let last = outputs.last().ok_or(PipelineError::EmptyPlan)?;
        Ok(last.path().to_path_buf())
    }

    fn resolve_inputs(
        &self,
        refs: &[StageInput],
        outputs: &[Artifact],
        step_index: usize,
    ) -> Result<Vec<Artifact>, StageError> {
        refs.iter()
            .map(|input| match input {
                StageInput::Output(j) => {
                    if *j >= step_index {
                        return Err(StageError::InvalidPlan("inputs reference a later step"));
                    }
                    Ok(outputs[*j].clone())
                }
                StageInput::External(artifact) => Ok(artifact.clone()),
            })
            .collect()
    }
}

/// Plan the standard four-stage generation run:
/// text→image, image→video, video→music, then merge.
pub fn generation_steps(
    config: &crate::config::Config,
    prompt: &str,
) -> Result<Vec<PipelineStep>, StageError> {
    use crate::stage::{ImageToVideo, MergeAudioVideo, TextToImage, VideoToMusic};

    let clip_secs = config.pipeline.clip_duration_secs;
    Ok(vec![
        PipelineStep::new(
            Box::new(TextToImage::new(&config.generation)?),
            StageParams::default()
                .with_prompt(prompt)
                .with_out_name("frame.png"),
            vec![],
        ),
        PipelineStep::new(
            Box::new(ImageToVideo::new(&config.generation, clip_secs)?),
            StageParams::default()
                .with_prompt(prompt)
                .with_out_name("anim.mp4"),
            vec![StageInput::Output(0)],
        ),
        PipelineStep::new(
            Box::new(VideoToMusic::new(&config.generation, "ambient")?),
            StageParams::default()
                .with_duration_secs(clip_secs)
                .with_out_name("bgm.mp3"),
            vec![StageInput::Output(1)],
        ),
        PipelineStep::new(
            Box::new(MergeAudioVideo),
            StageParams::default().with_out_name("final_with_music.mp4"),
            vec![StageInput::Output(1), StageInput::Output(2)],
        ),
    ])
}
