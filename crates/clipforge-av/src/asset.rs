//! Source asset description.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Untransformed pixel dimensions of a video track as stored in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalSize {
    pub width: u32,
    pub height: u32,
}

impl NaturalSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is larger than `limit`.
    pub fn exceeds(&self, limit: u32) -> bool {
        self.width > limit || self.height > limit
    }

    /// Pixel count.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Size after scaling down to fit inside `(max_w, max_h)`, preserving aspect.
    pub fn fit_within(&self, max_w: u32, max_h: u32) -> NaturalSize {
        if self.width <= max_w && self.height <= max_h {
            return *self;
        }
        let scale = f64::min(
            f64::from(max_w) / f64::from(self.width),
            f64::from(max_h) / f64::from(self.height),
        );
        NaturalSize::new(
            (f64::from(self.width) * scale).round() as u32,
            (f64::from(self.height) * scale).round() as u32,
        )
    }
}

/// Information about a video track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Track index.
    pub index: u32,
    /// Video codec (e.g., "hevc", "h264").
    pub codec: String,
    /// Natural size of the track.
    pub natural_size: NaturalSize,
    /// Frame rate in FPS.
    pub frame_rate: Option<f64>,
}

/// A decodable media asset read by the transcoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Path to the media file.
    pub path: PathBuf,
    /// File size in bytes.
    pub file_size: u64,
    /// Container format as reported by the prober.
    pub container: String,
    /// Duration of the media.
    pub duration: Option<Duration>,
    /// Video tracks in the file.
    pub video_tracks: Vec<VideoTrack>,
    /// Whether at least one audio track is present.
    pub has_audio: bool,
}

impl Asset {
    /// Create an asset description with no tracks.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_size: 0,
            container: String::new(),
            duration: None,
            video_tracks: Vec::new(),
            has_audio: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the primary (first) video track.
    pub fn primary_video(&self) -> Option<&VideoTrack> {
        self.video_tracks.first()
    }

    /// Natural size of the primary video track.
    pub fn natural_size(&self) -> Option<NaturalSize> {
        self.primary_video().map(|v| v.natural_size)
    }

    /// Average bitrate of the whole file in bits per second.
    ///
    /// `None` when the file size or duration is unknown.
    pub fn overall_bitrate(&self) -> Option<u64> {
        let secs = self.duration?.as_secs_f64();
        if secs <= 0.0 || self.file_size == 0 {
            return None;
        }
        Some((self.file_size as f64 * 8.0 / secs) as u64)
    }
}
