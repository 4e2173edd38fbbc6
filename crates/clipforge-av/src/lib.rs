//! # clipforge-av
//!
//! Media toolchain for the clipforge generation pipeline.
//!
//! This crate provides functionality for:
//! - Probing media files for their duration via ffprobe
//! - Extracting first/last frames with duration-aware seeking
//! - Trimming trailing seconds off a clip (stream copy only)
//! - Merging an audio bed onto a video with duration-aware looping
//! - Stitching media files with the concat demuxer
//! - Managing the scratch directory and artifacts of a pipeline run
//!
//! All external work shells out to the ffmpeg/ffprobe CLI; calls are
//! synchronous and are never retried here.
//!
//! ## Example
//!
//! ```no_run
//! use clipforge_av::probe_duration;
//!
//! let duration = probe_duration("/path/to/anim.mp4")?;
//! println!("clip runs {:.2}s", duration);
//! # Ok::<(), clipforge_av::Error>(())
//! ```

pub mod actions;
mod error;
pub mod probe;
pub mod scratch;
pub mod tools;

// Re-exports
pub use error::{Error, Result};
pub use probe::probe_duration;
pub use scratch::{Artifact, ArtifactKind, ScratchDir};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
