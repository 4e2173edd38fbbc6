//! FFmpeg-backed media actions: frame extraction, trailing trim, looped
//! audio/video merge, and concat stitching.

mod concat;
mod frame;
mod merge;
mod trim;

pub use concat::{concat_directory, concat_files};
pub use frame::{extract_first_frame, extract_last_frame, last_frame_seek_offset, SEEK_EPSILON};
pub use merge::{merge_audio_video, plan_loop, LoopPlan};
pub use trim::{trim_all, trim_trailing, trimmed_duration};
