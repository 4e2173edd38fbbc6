//! Single-frame extraction.

use crate::probe::probe_duration;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Margin subtracted from the duration when seeking to the final frame, so
/// the decoder never seeks past end-of-stream.
pub const SEEK_EPSILON: f64 = 0.1;

/// Compute the seek offset for the last frame of a clip of `duration` seconds.
///
/// Clips no longer than the epsilon are degenerate: there is no offset that
/// is both non-negative and inside the stream.
pub fn last_frame_seek_offset(duration: f64) -> Result<f64> {
    if duration <= SEEK_EPSILON {
        return Err(Error::InvalidRange(format!(
            "duration {:.3}s is too short to seek to a last frame",
            duration
        )));
    }
    Ok(duration - SEEK_EPSILON)
}

/// Extract the last frame of a video as a JPEG still.
///
/// If `output` is not given, the image is written next to the video as
/// `<stem>_last_frame.jpg`. Returns the output path.
pub fn extract_last_frame(video: &Path, output: Option<&Path>) -> Result<PathBuf> {
    if !video.exists() {
        return Err(Error::file_not_found(video));
    }

    let output = match output {
        Some(p) => p.to_path_buf(),
        None => {
            let stem = video
                .file_stem()
                .ok_or_else(|| Error::InvalidInput(format!("invalid video path: {:?}", video)))?
                .to_string_lossy();
            video.with_file_name(format!("{}_last_frame.jpg", stem))
        }
    };

    let duration = probe_duration(video)?;
    let offset = last_frame_seek_offset(duration)?;

    tracing::debug!(
        "extracting last frame of {:?} at {:.2}s (duration {:.2}s)",
        video,
        offset,
        duration
    );
    extract_frame_at(video, &output, offset)?;

    Ok(output)
}

/// Extract the first frame of a video, e.g. as a reference image for the
/// music generation service.
pub fn extract_first_frame(video: &Path, output: &Path) -> Result<()> {
    if !video.exists() {
        return Err(Error::file_not_found(video));
    }
    extract_frame_at(video, output, 0.0)
}

fn extract_frame_at(video: &Path, output: &Path, offset: f64) -> Result<()> {
    let offset_arg = format!("{}", offset);
    let result = Command::new("ffmpeg")
        .args(["-y", "-ss", offset_arg.as_str(), "-i"])
        .arg(video)
        .args(["-vframes", "1", "-q:v", "2"])
        .arg(output)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffmpeg")
            } else {
                Error::Io(e)
            }
        })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(Error::tool_failed("ffmpeg", stderr.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_offset() {
        assert!((last_frame_seek_offset(9.95).unwrap() - 9.85).abs() < 1e-9);
        assert!((last_frame_seek_offset(32.0).unwrap() - 31.9).abs() < 1e-9);
    }

    #[test]
    fn test_seek_offset_never_negative() {
        // A 0.05s clip must be rejected, not seeked to a negative offset.
        assert!(matches!(
            last_frame_seek_offset(0.05),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            last_frame_seek_offset(0.1),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            last_frame_seek_offset(0.0),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_extract_missing_file() {
        let err = extract_last_frame(Path::new("/no/such/clip.mp4"), None).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
