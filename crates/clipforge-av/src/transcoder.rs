//! Adaptive video transcoding for upload.
//!
//! A conversion loads the source, clamps the requested [`QualityTier`] for
//! oversized sources, then walks down the quality ladder while the
//! encoder's size estimate is over the caller's limit. The limit is also
//! handed to the encoder as a hard ceiling, since estimates can be off.
//!
//! Two entry points exist:
//!
//! - [`Transcoder::convert`] returns a [`ConvertTask`] that resolves to the
//!   outcome. Every failure is explicit.
//! - [`Transcoder::convert_with_completion`] delivers the outcome to a
//!   handler through a [`CompletionContext`]. It keeps the historical
//!   contract: when the source has no video track, or the first export
//!   session cannot be built, the handler is never called.

use crate::asset::Asset;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::dispatch::CompletionContext;
use crate::encoder::{Encoder, ExportSession, OutputSettings, TimeRange};
use crate::quality::{Container, Preset, QualityTier};
use crate::workspace::{output_filename, remove_if_exists, remove_if_exists_blocking, Workspace};
use crate::{Error, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// A request to convert one source video for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    /// Source media file.
    pub source: PathBuf,
    /// Requested quality tier, before clamping.
    pub tier: QualityTier,
    /// Maximum output size in bytes.
    pub size_limit: Option<u64>,
    /// Remove the source once the conversion succeeded.
    pub delete_source_on_success: bool,
}

impl TranscodeRequest {
    /// Request at the highest tier with no limit, deleting the source on success.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            tier: QualityTier::default(),
            size_limit: None,
            delete_source_on_success: true,
        }
    }

    pub fn with_tier(mut self, tier: QualityTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_size_limit(mut self, bytes: u64) -> Self {
        self.size_limit = Some(bytes);
        self
    }

    pub fn keep_source(mut self) -> Self {
        self.delete_source_on_success = false;
        self
    }
}

/// Result of one conversion.
///
/// `error` is set when the export failed; `output` is still reported in
/// that case even though the file may be missing or partial.
#[derive(Debug)]
pub struct TranscodeOutcome {
    /// Where the converted file was written.
    pub output: PathBuf,
    /// The source asset that was converted.
    pub asset: Asset,
    /// Final position on the quality ladder.
    pub tier: QualityTier,
    /// Preset of the session that was exported.
    ///
    /// Differs from `tier.preset()` only when building a reduced session
    /// failed and the previous one was kept.
    pub preset: Preset,
    /// Encoder estimate for the exported session, in bytes.
    pub estimated_len: u64,
    /// Export failure, if any.
    pub error: Option<Error>,
}

impl TranscodeOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Working state of one conversion.
#[derive(Debug)]
struct TranscodeSession {
    tier: QualityTier,
    estimated_len: u64,
    output: PathBuf,
    export: ExportSession,
}

/// An in-flight conversion.
///
/// Resolves to the conversion result. [`cancel`](Self::cancel) aborts the
/// background task and stops the encoder; the task then resolves to
/// [`Error::Cancelled`].
#[derive(Debug)]
pub struct ConvertTask {
    handle: JoinHandle<Result<TranscodeOutcome>>,
}

impl ConvertTask {
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Future for ConvertTask {
    type Output = Result<TranscodeOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_cancelled() => Poll::Ready(Err(Error::Cancelled)),
            Poll::Ready(Err(e)) => std::panic::resume_unwind(e.into_panic()),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Converts media for upload on top of an [`Encoder`].
///
/// Conversions run on Tokio tasks, so the conversion methods must be called
/// from within a Tokio runtime.
#[derive(Clone)]
pub struct Transcoder {
    encoder: Arc<dyn Encoder>,
    workspace: Arc<Workspace>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Transcoder {
    /// Create a transcoder writing into `workspace` and logging through `tracing`.
    pub fn new(encoder: Arc<dyn Encoder>, workspace: Workspace) -> Self {
        Self {
            encoder,
            workspace: Arc::new(workspace),
            sink: Arc::new(TracingSink),
        }
    }

    /// Route diagnostics to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub(crate) fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    pub(crate) fn sink(&self) -> &dyn DiagnosticSink {
        self.sink.as_ref()
    }

    /// Convert a video, returning a task that resolves to the outcome.
    ///
    /// The source is removed before the task resolves when the request
    /// asks for it and the export succeeded.
    pub fn convert(&self, request: TranscodeRequest) -> ConvertTask {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let outcome = this.convert_video(&request).await?;
            if request.delete_source_on_success && outcome.is_success() {
                remove_if_exists(&request.source, this.sink()).await;
            }
            Ok::<_, Error>(outcome)
        });
        ConvertTask { handle }
    }

    /// Convert a video and hand the outcome to `completion` on `context`.
    ///
    /// Returns immediately. The handler always runs through `context`,
    /// whichever thread finished the export. When the request asks for it,
    /// the source is removed after the handler returned, provided the
    /// export succeeded.
    ///
    /// The handler is never called when the source cannot be read, has no
    /// video track, or the initial export session cannot be built. Those
    /// cases are only visible through diagnostics.
    pub fn convert_with_completion<F>(
        &self,
        request: TranscodeRequest,
        context: Arc<dyn CompletionContext>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(TranscodeOutcome) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            let outcome = match this.convert_video(&request).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::debug!("Conversion of {:?} dropped: {}", request.source, e);
                    return;
                }
            };

            let sink = Arc::clone(&this.sink);
            context.dispatch(Box::new(move || {
                let succeeded = outcome.is_success();
                completion(outcome);

                if request.delete_source_on_success && succeeded {
                    remove_if_exists_blocking(&request.source, sink.as_ref());
                }
            }));
        })
    }

    /// Load, clamp and convert the source of `request`.
    async fn convert_video(&self, request: &TranscodeRequest) -> Result<TranscodeOutcome> {
        let asset = self.encoder.load_asset(&request.source).await?;

        let Some(size) = asset.natural_size() else {
            self.sink.record(Diagnostic::NoVideoTrack {
                source: request.source.clone(),
            });
            return Err(Error::NoVideoTrack {
                path: request.source.clone(),
            });
        };

        let tier = request.tier.clamp_for(size);
        if tier != request.tier {
            self.sink.record(Diagnostic::TierClamped {
                requested: request.tier,
                selected: tier,
                width: size.width,
                height: size.height,
            });
        }

        let filename = output_filename(&request.source, Container::Mp4)?;
        self.convert_asset(asset, &filename, tier, request.size_limit)
            .await
    }

    /// Convert an already loaded asset into `filename` inside the workspace.
    ///
    /// Unlike [`convert`](Self::convert) this applies no clamping and never
    /// touches the source. Fails only when the initial export session cannot
    /// be built; export failures are reported in the outcome.
    pub async fn convert_asset(
        &self,
        asset: Asset,
        filename: &str,
        tier: QualityTier,
        size_limit: Option<u64>,
    ) -> Result<TranscodeOutcome> {
        let output = self.workspace.file(filename);
        remove_if_exists(&output, self.sink()).await;

        let session = self.open_session(&asset, tier, size_limit, output)?;
        Ok(self.export(session).await)
    }

    /// Build the export session, stepping down the ladder to fit `size_limit`.
    fn open_session(
        &self,
        asset: &Asset,
        tier: QualityTier,
        size_limit: Option<u64>,
        output: PathBuf,
    ) -> Result<TranscodeSession> {
        let range = TimeRange::from_zero(asset.duration.unwrap_or_default());

        let mut export = self.create_session(asset, tier.preset())?;
        export.set_time_range(range);
        let mut estimated_len = self.encoder.estimate_output_len(&export);
        let mut tier = tier;

        while let Some(limit) = size_limit {
            if estimated_len <= limit {
                break;
            }
            let Some(reduced) = tier.step_down() else {
                break;
            };

            self.sink.record(Diagnostic::TierReduced {
                from: tier,
                to: reduced,
                estimate: estimated_len,
                limit,
            });
            tier = reduced;

            // Keep the previous session if the reduced one cannot be built.
            if let Ok(session) = self.create_session(asset, reduced.preset()) {
                export = session;
            }
            export.set_time_range(range);
            estimated_len = self.encoder.estimate_output_len(&export);
        }

        if let Some(limit) = size_limit {
            export.set_file_length_limit(limit);
        }
        export.set_output(OutputSettings::for_upload(&output, Container::Mp4));

        Ok(TranscodeSession {
            tier,
            estimated_len,
            output,
            export,
        })
    }

    /// Ask the encoder for a session, recording construction failures.
    pub(crate) fn create_session(&self, asset: &Asset, preset: Preset) -> Result<ExportSession> {
        self.encoder.create_session(asset, preset).map_err(|e| {
            self.sink.record(Diagnostic::SessionConstructionFailed {
                source: asset.path.clone(),
                preset,
                reason: e.to_string(),
            });
            e
        })
    }

    async fn export(&self, session: TranscodeSession) -> TranscodeOutcome {
        remove_if_exists(&session.output, self.sink()).await;

        let error = match self.encoder.export(&session.export).await {
            Ok(()) => None,
            Err(e) => {
                self.record_export_failure(&e, session.export.asset().path(), &session.output);
                Some(e)
            }
        };

        TranscodeOutcome {
            preset: session.export.preset(),
            asset: session.export.asset().clone(),
            output: session.output,
            tier: session.tier,
            estimated_len: session.estimated_len,
            error,
        }
    }

    pub(crate) fn record_export_failure(&self, error: &Error, source: &Path, output: &Path) {
        let status = match error {
            Error::Export { status, .. } => status.clone(),
            _ => "failed".to_string(),
        };
        self.sink.record(Diagnostic::ExportFailed {
            status,
            error: error.to_string(),
            source: source.to_path_buf(),
            output: output.to_path_buf(),
        });
    }
}
