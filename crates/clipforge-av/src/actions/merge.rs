//! Audio/video merging with duration-aware audio looping.
//!
//! A generated music bed is usually shorter than the clip it backs, so the
//! audio is repeated until it covers the video and the merge is cut at the
//! shortest stream. The video is always stream-copied; the audio timeline is
//! re-encoded to AAC because looping plus the shortest-cut requires it.

use crate::probe::probe_duration;
use crate::{Error, Result};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// How many times the audio must play to cover the video.
///
/// Recomputed per merge call, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopPlan {
    /// `round(video / audio)` with round-half-up semantics. Can be 0 when
    /// the audio is much longer than the video.
    pub loop_count: u32,
    /// Duration the merged output must not exceed (the video's).
    pub target_duration: f64,
}

impl LoopPlan {
    /// The `-stream_loop` value: extra repeats after the first play-through.
    ///
    /// A computed loop count of 0 is treated as a single play-through, so
    /// this never underflows; `-shortest` then bounds the output by the
    /// video regardless.
    pub fn repeat_count(&self) -> u32 {
        self.loop_count.max(1) - 1
    }
}

/// Plan how often to loop an `audio_duration`-second track under a
/// `video_duration`-second clip.
pub fn plan_loop(video_duration: f64, audio_duration: f64) -> Result<LoopPlan> {
    if video_duration <= 0.0 || audio_duration <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "durations must be positive, got video {:.2}s audio {:.2}s",
            video_duration, audio_duration
        )));
    }

    // Round half up, matching int(x + 0.5) truncation.
    let loop_count = (video_duration / audio_duration + 0.5) as u32;

    Ok(LoopPlan {
        loop_count,
        target_duration: video_duration,
    })
}

/// Build the ffmpeg argument list for a looped merge.
///
/// Video is mapped from the first input and stream-copied; audio comes from
/// the second input, looped per the plan, re-encoded to AAC, and the whole
/// output stops at the shortest stream.
fn merge_args(video: &Path, audio: &Path, output: &Path, plan: &LoopPlan) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    args.push("-y".into());
    args.push("-i".into());
    args.push(video.into());
    args.push("-stream_loop".into());
    args.push(plan.repeat_count().to_string().into());
    args.push("-i".into());
    args.push(audio.into());
    for arg in [
        "-c:v", "copy", "-c:a", "aac", "-map", "0:v:0", "-map", "1:a:0", "-shortest",
    ] {
        args.push(arg.into());
    }
    args.push(output.into());
    args
}

/// Merge `audio` onto `video`, looping the audio as needed, and write the
/// result to `output`.
pub fn merge_audio_video(video: &Path, audio: &Path, output: &Path) -> Result<()> {
    if !video.exists() {
        return Err(Error::file_not_found(video));
    }
    if !audio.exists() {
        return Err(Error::file_not_found(audio));
    }

    let video_duration = probe_duration(video)?;
    let audio_duration = probe_duration(audio)?;
    let plan = plan_loop(video_duration, audio_duration)?;

    tracing::info!(
        "merging {:?} ({:.2}s) with {:?} ({:.2}s), audio plays {} time(s)",
        video,
        video_duration,
        audio,
        audio_duration,
        plan.repeat_count() + 1
    );

    let result = Command::new("ffmpeg")
        .args(merge_args(video, audio, output, &plan))
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffmpeg")
            } else {
                Error::Io(e)
            }
        })?;

    if !result.status.success() {
        // ffmpeg may have opened the muxer and flushed packets before
        // failing; a truncated output must not survive the error.
        let _ = std::fs::remove_file(output);
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(Error::tool_failed("ffmpeg", stderr.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_plan_loop_exact_multiple() {
        let plan = plan_loop(32.0, 8.0).unwrap();
        assert_eq!(plan.loop_count, 4);
        assert_eq!(plan.repeat_count(), 3);
        assert_eq!(plan.target_duration, 32.0);
    }

    #[test]
    fn test_plan_loop_rounds_half_up() {
        // 10 / 4 = 2.5 rounds up to 3
        assert_eq!(plan_loop(10.0, 4.0).unwrap().loop_count, 3);
        // 9 / 4 = 2.25 rounds down to 2
        assert_eq!(plan_loop(9.0, 4.0).unwrap().loop_count, 2);
        // audio slightly shorter than video
        assert_eq!(plan_loop(8.2, 8.0).unwrap().loop_count, 1);
    }

    #[test]
    fn test_plan_loop_long_audio_clamps_to_one_play() {
        // Audio more than twice the video: the rounded count is 0, but the
        // merge still plays the track once and relies on -shortest.
        let plan = plan_loop(3.0, 10.0).unwrap();
        assert_eq!(plan.loop_count, 0);
        assert_eq!(plan.repeat_count(), 0);
    }

    #[test]
    fn test_plan_loop_rejects_non_positive() {
        assert!(plan_loop(0.0, 8.0).is_err());
        assert!(plan_loop(32.0, 0.0).is_err());
        assert!(plan_loop(-1.0, 8.0).is_err());
    }

    #[test]
    fn test_merge_args_shape() {
        let plan = plan_loop(32.0, 8.0).unwrap();
        let args = merge_args(
            &PathBuf::from("anim.mp4"),
            &PathBuf::from("bgm.mp3"),
            &PathBuf::from("final.mp4"),
            &plan,
        );

        let strs: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        // Loop count 4 means 3 extra repeats.
        let loop_idx = strs.iter().position(|s| s == "-stream_loop").unwrap();
        assert_eq!(strs[loop_idx + 1], "3");

        // The loop flag must precede the audio input it applies to.
        let audio_idx = strs.iter().position(|s| s == "bgm.mp3").unwrap();
        assert!(loop_idx < audio_idx);

        // Video is copied, audio normalized, output bounded by -shortest.
        assert!(strs.windows(2).any(|w| w == ["-c:v", "copy"]));
        assert!(strs.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(strs.iter().any(|s| s == "-shortest"));
    }
}
