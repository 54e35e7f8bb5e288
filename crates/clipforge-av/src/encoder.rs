//! The seam between the transcoder and the machinery that actually encodes.
//!
//! An [`Encoder`] reads assets, builds [`ExportSession`]s for a preset,
//! estimates their output size without encoding, and runs the export.
//! [`FfmpegEncoder`](crate::FfmpegEncoder) is the production implementation.

use crate::asset::Asset;
use crate::quality::{Container, Preset};
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A span of source media to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Duration,
    pub duration: Duration,
}

impl TimeRange {
    /// `[0, duration)`.
    pub fn from_zero(duration: Duration) -> Self {
        Self {
            start: Duration::ZERO,
            duration,
        }
    }
}

/// Where and how the export is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub path: PathBuf,
    pub container: Container,
    /// Move the index to the front of the file for progressive download.
    pub optimize_for_network: bool,
    /// Drop all container and stream metadata.
    pub strip_metadata: bool,
}

impl OutputSettings {
    /// Upload output: network optimized with metadata stripped.
    pub fn for_upload(path: impl Into<PathBuf>, container: Container) -> Self {
        Self {
            path: path.into(),
            container,
            optimize_for_network: true,
            strip_metadata: true,
        }
    }
}

/// One unit of export work: a source asset under a preset and constraints.
#[derive(Debug, Clone)]
pub struct ExportSession {
    asset: Asset,
    preset: Preset,
    time_range: Option<TimeRange>,
    file_length_limit: Option<u64>,
    output: Option<OutputSettings>,
}

impl ExportSession {
    pub fn new(asset: Asset, preset: Preset) -> Self {
        Self {
            asset,
            preset,
            time_range: None,
            file_length_limit: None,
            output: None,
        }
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn time_range(&self) -> Option<TimeRange> {
        self.time_range
    }

    pub fn set_time_range(&mut self, range: TimeRange) {
        self.time_range = Some(range);
    }

    /// Length of media the session will export.
    ///
    /// Falls back to the asset duration when no range was set.
    pub fn export_duration(&self) -> Option<Duration> {
        self.time_range
            .map(|r| r.duration)
            .or(self.asset.duration)
    }

    pub fn file_length_limit(&self) -> Option<u64> {
        self.file_length_limit
    }

    /// Hard ceiling on output bytes, enforced by the encoder.
    pub fn set_file_length_limit(&mut self, limit: u64) {
        self.file_length_limit = Some(limit);
    }

    pub fn output(&self) -> Option<&OutputSettings> {
        self.output.as_ref()
    }

    pub fn set_output(&mut self, output: OutputSettings) {
        self.output = Some(output);
    }
}

/// Media encoder backend.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Read the asset at `path`.
    async fn load_asset(&self, path: &Path) -> Result<Asset>;

    /// Build an export session for `asset` at `preset`.
    ///
    /// Fails with [`Error::SessionConstruction`](crate::Error::SessionConstruction)
    /// when the combination is not exportable.
    fn create_session(&self, asset: &Asset, preset: Preset) -> Result<ExportSession>;

    /// Estimated output size in bytes. No encoding takes place.
    fn estimate_output_len(&self, session: &ExportSession) -> u64;

    /// Run the export described by `session`.
    ///
    /// The session must have output settings.
    async fn export(&self, session: &ExportSession) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_duration_prefers_range() {
        let mut asset = Asset::new("a.mov");
        asset.duration = Some(Duration::from_secs(10));
        let mut session = ExportSession::new(asset, Preset::MediumQuality);
        assert_eq!(session.export_duration(), Some(Duration::from_secs(10)));

        session.set_time_range(TimeRange::from_zero(Duration::from_secs(4)));
        assert_eq!(session.export_duration(), Some(Duration::from_secs(4)));
    }

    #[test]
    fn test_upload_output_settings() {
        let output = OutputSettings::for_upload("/tmp/a.mp4", Container::Mp4);
        assert!(output.optimize_for_network);
        assert!(output.strip_metadata);
    }
}
