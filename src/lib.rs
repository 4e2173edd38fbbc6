//! Clipforge - generative short-clip pipeline
//!
//! Chains independent generation services (text to image, image to video,
//! video to music, audio/video merge) into one sequential run, passing each
//! stage's artifact to the next and aligning the music bed to the clip's
//! measured duration. The media toolchain itself lives in `clipforge-av`.

pub mod config;
pub mod pipeline;
pub mod routing;
pub mod stage;
