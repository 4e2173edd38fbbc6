//! Concat-demuxer stitching for audio and video files.

use crate::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Concatenate media files in order using the concat demuxer, stream-copying
/// the result to `output`.
///
/// All inputs must share container and codecs; nothing is re-encoded.
pub fn concat_files(inputs: &[PathBuf], output: &Path) -> Result<()> {
    if inputs.is_empty() {
        return Err(Error::InvalidInput("no input files to concatenate".into()));
    }
    for input in inputs {
        if !input.exists() {
            return Err(Error::file_not_found(input));
        }
    }

    let list_path = output.with_extension("ffconcat");
    {
        let mut list = std::fs::File::create(&list_path)?;
        for input in inputs {
            // Single quotes in the path would break the quoting below.
            let display = input.display().to_string();
            if display.contains('\'') {
                return Err(Error::InvalidInput(format!(
                    "input path contains a quote: {:?}",
                    input
                )));
            }
            writeln!(list, "file '{}'", display)?;
        }
    }

    let result = Command::new("ffmpeg")
        .args(["-y", "-f", "concat", "-safe", "0", "-i"])
        .arg(&list_path)
        .args(["-c", "copy"])
        .arg(output)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffmpeg")
            } else {
                Error::Io(e)
            }
        });

    // The list file is transient either way.
    let _ = std::fs::remove_file(&list_path);

    let result = result?;
    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(Error::tool_failed("ffmpeg", stderr.to_string()));
    }

    Ok(())
}

/// Concatenate every file in `dir` with the given extension, in file name
/// order, writing the stitched result to `output`.
pub fn concat_directory(dir: &Path, extension: &str, output: &Path) -> Result<()> {
    let mut inputs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map(|e| e == extension).unwrap_or(false))
        .collect();
    inputs.sort();

    if inputs.is_empty() {
        return Err(Error::InvalidInput(format!(
            "no .{} files found in {:?}",
            extension, dir
        )));
    }

    concat_files(&inputs, output)
}
