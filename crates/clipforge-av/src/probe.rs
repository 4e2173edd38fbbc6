//! FFprobe-based duration probing.
//!
//! The pipeline only needs a file's duration in seconds, read from the
//! `format.duration` field of `ffprobe -print_format json -show_format`.
//! Probing is read-only and never retried; a failure here is fatal to the
//! stage that asked for it.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a media file and return its duration in seconds.
///
/// A valid media artifact always has `duration > 0`; a zero or missing
/// duration marks the file invalid and is reported as a parse error.
pub fn probe_duration<P: AsRef<Path>>(path: P) -> Result<f64> {
    let path = path.as_ref();
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffprobe")
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed("ffprobe", stderr.to_string()));
    }

    let json_str = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

    parse_duration(&json_str)
}

/// Extract the duration from ffprobe JSON output.
fn parse_duration(json_str: &str) -> Result<f64> {
    let output: FfprobeOutput = serde_json::from_str(json_str)?;

    let duration = output
        .format
        .duration
        .ok_or_else(|| Error::parse_error("ffprobe", "missing format.duration field"))?
        .parse::<f64>()
        .map_err(|e| Error::parse_error("ffprobe", format!("non-numeric duration: {}", e)))?;

    if duration <= 0.0 {
        return Err(Error::parse_error(
            "ffprobe",
            format!("non-positive duration: {}", duration),
        ));
    }

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let json = r#"{"format": {"filename": "anim.mp4", "duration": "9.95"}}"#;
        assert_eq!(parse_duration(json).unwrap(), 9.95);
    }

    #[test]
    fn test_parse_duration_missing_field() {
        let json = r#"{"format": {"filename": "anim.mp4"}}"#;
        let err = parse_duration(json).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn test_parse_duration_non_numeric() {
        let json = r#"{"format": {"duration": "N/A"}}"#;
        let err = parse_duration(json).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn test_parse_duration_zero_is_invalid() {
        let json = r#"{"format": {"duration": "0.0"}}"#;
        let err = parse_duration(json).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn test_parse_duration_not_json() {
        assert!(parse_duration("not json at all").is_err());
    }
}
