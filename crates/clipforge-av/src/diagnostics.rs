//! Diagnostics emitted by the transcoder.
//!
//! The transcoder reports through an injected [`DiagnosticSink`] instead of
//! logging directly, so callers can route or capture what happened during a
//! conversion. [`TracingSink`] forwards everything to `tracing`.

use crate::quality::{Preset, QualityTier};
use parking_lot::Mutex;
use std::path::PathBuf;

/// Something worth recording during a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The requested tier was lowered because the source is too large.
    TierClamped {
        requested: QualityTier,
        selected: QualityTier,
        width: u32,
        height: u32,
    },
    /// The size-reduction loop stepped down one rung.
    TierReduced {
        from: QualityTier,
        to: QualityTier,
        estimate: u64,
        limit: u64,
    },
    /// The encoder could not build a session for a preset.
    SessionConstructionFailed {
        source: PathBuf,
        preset: Preset,
        reason: String,
    },
    /// The export finished with a failure status.
    ExportFailed {
        status: String,
        error: String,
        source: PathBuf,
        output: PathBuf,
    },
    /// A leftover output or the source file could not be removed.
    CleanupFailed { path: PathBuf, error: String },
    /// The source has no video track.
    NoVideoTrack { source: PathBuf },
}

/// Receiver for transcoder diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::TierClamped {
                requested,
                selected,
                width,
                height,
            } => {
                tracing::debug!("Source is {width}x{height}, using {selected} instead of {requested}");
            }
            Diagnostic::TierReduced {
                from,
                to,
                estimate,
                limit,
            } => {
                tracing::info!(
                    "Estimated {estimate} bytes at {from} exceeds limit of {limit}, reducing to {to}"
                );
            }
            Diagnostic::SessionConstructionFailed {
                source,
                preset,
                reason,
            } => {
                tracing::error!(
                    "Failed to create export session with asset {:?} ({}): {}",
                    source,
                    preset,
                    reason
                );
            }
            Diagnostic::ExportFailed {
                status,
                error,
                source,
                output,
            } => {
                tracing::error!(
                    "Export session error: status={} error={} source={:?} output={:?}",
                    status,
                    error,
                    source,
                    output
                );
            }
            Diagnostic::CleanupFailed { path, error } => {
                tracing::error!("Cannot delete file: {:?} ({})", path, error);
            }
            Diagnostic::NoVideoTrack { source } => {
                tracing::warn!("No video track found in {:?}", source);
            }
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded diagnostics, oldest first.
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, diagnostic: Diagnostic) {
        self.events.lock().push(diagnostic);
    }
}
