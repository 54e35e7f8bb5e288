//! Shared test harness for transcoder integration tests.
//!
//! Provides [`MockEncoder`], a scripted [`Encoder`] with per-preset size
//! estimates and injectable failures, and [`TestHarness`] which wires it
//! into a [`Transcoder`] with a temporary workspace and a memory sink.

#![allow(dead_code)]

use async_trait::async_trait;
use clipforge_av::{
    Asset, Diagnostic, Encoder, Error, ExportSession, MemorySink, NaturalSize, Preset, Result,
    Transcoder, VideoTrack, Workspace,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Encoder whose behaviour is scripted by the test.
#[derive(Default)]
pub struct MockEncoder {
    assets: Mutex<HashMap<PathBuf, Asset>>,
    estimates: Mutex<HashMap<Preset, u64>>,
    failing_presets: Mutex<HashSet<Preset>>,
    export_error: Mutex<Option<String>>,
    export_delay: Mutex<Option<Duration>>,
    created: Mutex<Vec<Preset>>,
    exported: Mutex<Vec<ExportSession>>,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a video asset with the given natural size.
    pub fn add_video(&self, path: &Path, width: u32, height: u32) {
        let mut asset = Asset::new(path);
        asset.file_size = 10_000_000;
        asset.container = "mov,mp4,m4a,3gp,3g2,mj2".to_string();
        asset.duration = Some(Duration::from_secs(30));
        asset.has_audio = true;
        asset.video_tracks.push(VideoTrack {
            index: 0,
            codec: "h264".to_string(),
            natural_size: NaturalSize::new(width, height),
            frame_rate: Some(30.0),
        });
        self.assets.lock().insert(path.to_path_buf(), asset);
    }

    /// Register an audio-only asset.
    pub fn add_audio(&self, path: &Path) {
        let mut asset = Asset::new(path);
        asset.duration = Some(Duration::from_secs(5));
        asset.has_audio = true;
        self.assets.lock().insert(path.to_path_buf(), asset);
    }

    pub fn set_estimate(&self, preset: Preset, bytes: u64) {
        self.estimates.lock().insert(preset, bytes);
    }

    pub fn fail_session(&self, preset: Preset) {
        self.failing_presets.lock().insert(preset);
    }

    pub fn fail_export(&self, message: &str) {
        *self.export_error.lock() = Some(message.to_string());
    }

    pub fn delay_export(&self, delay: Duration) {
        *self.export_delay.lock() = Some(delay);
    }

    /// Presets of every session successfully created, in order.
    pub fn created(&self) -> Vec<Preset> {
        self.created.lock().clone()
    }

    /// Sessions handed to `export`, in order.
    pub fn exported(&self) -> Vec<ExportSession> {
        self.exported.lock().clone()
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    async fn load_asset(&self, path: &Path) -> Result<Asset> {
        self.assets
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::file_not_found(path))
    }

    fn create_session(&self, asset: &Asset, preset: Preset) -> Result<ExportSession> {
        if self.failing_presets.lock().contains(&preset) {
            return Err(Error::session(&asset.path, preset, "preset not compatible"));
        }
        self.created.lock().push(preset);
        Ok(ExportSession::new(asset.clone(), preset))
    }

    fn estimate_output_len(&self, session: &ExportSession) -> u64 {
        self.estimates
            .lock()
            .get(&session.preset())
            .copied()
            .unwrap_or(1_000)
    }

    async fn export(&self, session: &ExportSession) -> Result<()> {
        let delay = *self.export_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.exported.lock().push(session.clone());

        let error = self.export_error.lock().clone();
        if let Some(message) = error {
            return Err(Error::export("failed", message));
        }

        let output = session
            .output()
            .ok_or_else(|| Error::InvalidInput("no output".to_string()))?;
        tokio::fs::write(&output.path, format!("mock {}", session.preset())).await?;
        Ok(())
    }
}

/// Transcoder over a [`MockEncoder`] writing into a temporary workspace.
pub struct TestHarness {
    pub encoder: Arc<MockEncoder>,
    pub sink: Arc<MemorySink>,
    pub transcoder: Transcoder,
    pub sources: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let encoder = Arc::new(MockEncoder::new());
        let sink = Arc::new(MemorySink::new());
        let workspace = Workspace::temporary().expect("failed to create workspace");
        let transcoder =
            Transcoder::new(encoder.clone(), workspace).with_sink(sink.clone());
        let sources = tempfile::tempdir().expect("failed to create source dir");

        Self {
            encoder,
            sink,
            transcoder,
            sources,
        }
    }

    /// Create a source file on disk and register it as a video.
    pub fn video_source(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.sources.path().join(name);
        std::fs::write(&path, b"source").expect("failed to write source");
        self.encoder.add_video(&path, width, height);
        path
    }

    /// Create a source file on disk and register it as audio only.
    pub fn audio_source(&self, name: &str) -> PathBuf {
        let path = self.sources.path().join(name);
        std::fs::write(&path, b"source").expect("failed to write source");
        self.encoder.add_audio(&path);
        path
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.sink.events()
    }

    pub fn reductions(&self) -> usize {
        self.diagnostics()
            .iter()
            .filter(|d| matches!(d, Diagnostic::TierReduced { .. }))
            .count()
    }
}
