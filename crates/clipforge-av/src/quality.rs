//! The quality ladder and the encoder presets behind each rung.

use crate::asset::NaturalSize;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest natural dimension accepted at [`QualityTier::Highest`].
pub const MAX_HIGHEST_DIMENSION: u32 = 1920;

/// A rung on the quality ladder.
///
/// Variants are declared lowest first so the derived ordering follows
/// expected output size: `Low < Medium < Capped1080p < Highest`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Smallest output; the floor of the ladder.
    Low,
    /// Standard-definition output.
    Medium,
    /// Source quality, scaled to fit a 1920x1080 box.
    #[serde(rename = "1080p")]
    Capped1080p,
    /// Source quality at source geometry.
    #[default]
    Highest,
}

impl QualityTier {
    /// All tiers, highest first.
    pub const LADDER: [QualityTier; 4] = [
        QualityTier::Highest,
        QualityTier::Capped1080p,
        QualityTier::Medium,
        QualityTier::Low,
    ];

    /// The next rung down, or `None` at the floor.
    ///
    /// The top two rungs both collapse straight to `Medium`.
    pub fn step_down(self) -> Option<QualityTier> {
        match self {
            QualityTier::Highest | QualityTier::Capped1080p => Some(QualityTier::Medium),
            QualityTier::Medium => Some(QualityTier::Low),
            QualityTier::Low => None,
        }
    }

    /// Whether this tier is the bottom of the ladder.
    pub fn is_floor(self) -> bool {
        self == QualityTier::Low
    }

    /// Clamp the tier for a source of the given natural size.
    ///
    /// Sources wider or taller than [`MAX_HIGHEST_DIMENSION`] are never
    /// encoded above `Capped1080p`. Lower requests pass through untouched.
    pub fn clamp_for(self, size: NaturalSize) -> QualityTier {
        if size.exceeds(MAX_HIGHEST_DIMENSION) {
            self.min(QualityTier::Capped1080p)
        } else {
            self
        }
    }

    /// The encoder preset used for this tier.
    pub fn preset(self) -> Preset {
        match self {
            QualityTier::Highest => Preset::HighestQuality,
            QualityTier::Capped1080p => Preset::Hd1920x1080,
            QualityTier::Medium => Preset::MediumQuality,
            QualityTier::Low => Preset::LowQuality,
        }
    }

    /// Short name used in config files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Highest => "highest",
            QualityTier::Capped1080p => "1080p",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highest" | "high" => Ok(QualityTier::Highest),
            "1080p" | "1920x1080" => Ok(QualityTier::Capped1080p),
            "medium" => Ok(QualityTier::Medium),
            "low" => Ok(QualityTier::Low),
            other => Err(Error::InvalidInput(format!("unknown quality tier: {other}"))),
        }
    }
}

/// How a preset controls the video bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoRate {
    /// Constant rate factor (libx264 `-crf`).
    Crf(u8),
    /// Target bitrate in bits per second.
    Bitrate(u64),
}

/// Encoder presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    HighestQuality,
    Hd1920x1080,
    MediumQuality,
    LowQuality,
    /// Audio-only AAC in an M4A container.
    AppleM4a,
}

impl Preset {
    /// Preset identifier.
    pub fn name(&self) -> &'static str {
        match self {
            Preset::HighestQuality => "highest-quality",
            Preset::Hd1920x1080 => "1920x1080",
            Preset::MediumQuality => "medium-quality",
            Preset::LowQuality => "low-quality",
            Preset::AppleM4a => "apple-m4a",
        }
    }

    /// Whether the preset produces a video stream.
    pub fn has_video(&self) -> bool {
        !matches!(self, Preset::AppleM4a)
    }

    /// Box the output frame is scaled down to fit, if any.
    pub fn frame_box(&self) -> Option<(u32, u32)> {
        match self {
            Preset::HighestQuality | Preset::AppleM4a => None,
            Preset::Hd1920x1080 => Some((1920, 1080)),
            Preset::MediumQuality => Some((480, 360)),
            Preset::LowQuality => Some((192, 144)),
        }
    }

    /// Video rate control, `None` for audio-only presets.
    pub fn video_rate(&self) -> Option<VideoRate> {
        match self {
            Preset::HighestQuality => Some(VideoRate::Crf(18)),
            Preset::Hd1920x1080 => Some(VideoRate::Crf(20)),
            Preset::MediumQuality => Some(VideoRate::Bitrate(700_000)),
            Preset::LowQuality => Some(VideoRate::Bitrate(150_000)),
            Preset::AppleM4a => None,
        }
    }

    /// Upper bound of the video bitrate this preset is expected to produce.
    pub fn video_ceiling_bps(&self) -> u64 {
        match self {
            Preset::HighestQuality => 40_000_000,
            Preset::Hd1920x1080 => 10_000_000,
            Preset::MediumQuality => 700_000,
            Preset::LowQuality => 150_000,
            Preset::AppleM4a => 0,
        }
    }

    /// AAC bitrate in bits per second.
    pub fn audio_bitrate_bps(&self) -> u64 {
        match self {
            Preset::HighestQuality => 192_000,
            Preset::Hd1920x1080 => 160_000,
            Preset::MediumQuality => 128_000,
            Preset::LowQuality => 64_000,
            Preset::AppleM4a => 128_000,
        }
    }

    /// Output channel count.
    pub fn audio_channels(&self) -> u8 {
        match self {
            Preset::LowQuality => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Mp4,
    M4a,
}

impl Container {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::M4a => "m4a",
        }
    }

    /// ffmpeg muxer name.
    pub fn muxer(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::M4a => "ipod",
        }
    }
}
