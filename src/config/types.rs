use clipforge_av::QualityTier;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Quality tier requested when none is given on the command line
    #[serde(default)]
    pub default_tier: QualityTier,

    /// Maximum output size in bytes (no limit when unset)
    #[serde(default)]
    pub size_limit_bytes: Option<u64>,

    /// Remove the source after a successful conversion (default: true)
    #[serde(default = "default_delete_source")]
    pub delete_source: bool,

    /// Directory converted files are written to (default: system temp dir)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_delete_source() -> bool {
    true
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            default_tier: QualityTier::default(),
            size_limit_bytes: None,
            delete_source: default_delete_source(),
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Maximum run time of a single export in seconds (default: 1800)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    1800
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ToolsConfig {
    pub fn tool_config(&self) -> clipforge_av::ToolConfig {
        clipforge_av::ToolConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
            ffprobe_path: self.ffprobe_path.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
