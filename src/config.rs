//! Configuration for the generation pipeline.
//!
//! Everything a run needs (API key, service endpoints, scratch root, stage
//! timeout) is carried explicitly in [`Config`] and handed to stages at
//! construction. Stages never read process-wide state themselves; the CLI is
//! the only place the environment is consulted.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Generation service endpoints and credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Bearer token for the generation APIs.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_text_to_image_url")]
    pub text_to_image_url: String,

    #[serde(default)]
    pub image_to_video_url: Option<String>,

    #[serde(default)]
    pub video_to_music_url: Option<String>,

    /// Model name sent with text-to-image requests.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Output resolution requested from the image service.
    #[serde(default = "default_image_size")]
    pub image_size: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Scratch root for intermediate artifacts. One run owns it exclusively;
    /// concurrent runs need distinct roots.
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,

    /// Per-stage timeout in seconds. Unset means a stage may run forever.
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,

    /// Requested clip length for the image-to-video stage.
    #[serde(default = "default_clip_duration")]
    pub clip_duration_secs: u32,
}

fn default_text_to_image_url() -> String {
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/multimodal-generation/generation"
        .to_string()
}

fn default_image_model() -> String {
    "qwen-image".to_string()
}

fn default_image_size() -> String {
    "1328*1328".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_scratch_root() -> PathBuf {
    PathBuf::from("./tmp")
}

fn default_clip_duration() -> u32 {
    8
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            text_to_image_url: default_text_to_image_url(),
            image_to_video_url: None,
            video_to_music_url: None,
            image_model: default_image_model(),
            image_size: default_image_size(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_root: default_scratch_root(),
            stage_timeout_secs: None,
            clip_duration_secs: default_clip_duration(),
        }
    }
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs.map(Duration::from_secs)
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Load config from default locations or return a default config.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./clipforge.toml", "~/.config/clipforge/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}
