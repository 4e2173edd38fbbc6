//! Trailing-trim operations.
//!
//! Trimming stream-copies only (`-c copy`), so the output container and
//! codecs match the source exactly and cut precision is bounded by keyframe
//! granularity rather than being frame-exact.

use crate::probe::probe_duration;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Compute the duration left after cutting `trim_seconds` off the end.
///
/// Fails with an invalid-range error when nothing (or less) would remain.
pub fn trimmed_duration(duration: f64, trim_seconds: f64) -> Result<f64> {
    let remaining = duration - trim_seconds;
    if remaining <= 0.0 {
        return Err(Error::InvalidRange(format!(
            "cannot trim {:.2}s from a {:.2}s clip",
            trim_seconds, duration
        )));
    }
    Ok(remaining)
}

/// Cut `trim_seconds` off the end of `input`, writing the result to `output`.
pub fn trim_trailing(input: &Path, output: &Path, trim_seconds: f64) -> Result<()> {
    if !input.exists() {
        return Err(Error::file_not_found(input));
    }

    let duration = probe_duration(input)?;
    let new_duration = trimmed_duration(duration, trim_seconds)?;

    tracing::debug!(
        "trimming {:?}: {:.2}s -> {:.2}s",
        input,
        duration,
        new_duration
    );

    let duration_arg = format!("{}", new_duration);
    let result = Command::new("ffmpeg")
        .arg("-i")
        .arg(input)
        .args(["-t", duration_arg.as_str(), "-c", "copy", "-y"])
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

/// Trim every `.mp4` in `input_dir`, writing `trimmed_<name>` files into
/// `output_dir`.
///
/// A clip shorter than the requested trim is reported and skipped; it does
/// not fail the batch. Returns the paths that were written.
pub fn trim_all(input_dir: &Path, output_dir: &Path, trim_seconds: f64) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let mut inputs: Vec<PathBuf> = std::fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map(|e| e == "mp4").unwrap_or(false))
        .collect();
    inputs.sort();

    let mut written = Vec::new();
    for input in inputs {
        let name = match input.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => continue,
        };
        let output = output_dir.join(format!("trimmed_{}", name));

        match trim_trailing(&input, &output, trim_seconds) {
            Ok(()) => written.push(output),
            Err(Error::InvalidRange(msg)) => {
                tracing::warn!("skipping {:?}: {}", input, msg);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_duration() {
        assert_eq!(trimmed_duration(30.0, 10.0).unwrap(), 20.0);
    }

    #[test]
    fn test_trim_longer_than_source() {
        assert!(matches!(
            trimmed_duration(5.0, 10.0),
            Err(Error::InvalidRange(_))
        ));
        // Trimming the whole clip leaves nothing.
        assert!(matches!(
            trimmed_duration(10.0, 10.0),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_trim_missing_file() {
        let err = trim_trailing(
            Path::new("/no/such/clip.mp4"),
            Path::new("/tmp/out.mp4"),
            10.0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
