//! Audio conversion for upload.
//!
//! Audio has no quality ladder: the source is exported once with the
//! [`Preset::AppleM4a`] preset into an M4A container.

use crate::diagnostics::Diagnostic;
use crate::dispatch::CompletionContext;
use crate::encoder::OutputSettings;
use crate::quality::{Container, Preset};
use crate::transcoder::Transcoder;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

impl Transcoder {
    /// Export `input` as AAC/M4A to `output`.
    ///
    /// An unreadable source is reported as a session construction failure.
    pub async fn export_audio(&self, input: &Path, output: &Path) -> Result<()> {
        let asset = match self.encoder().load_asset(input).await {
            Ok(asset) => asset,
            Err(e) => {
                self.sink().record(Diagnostic::SessionConstructionFailed {
                    source: input.to_path_buf(),
                    preset: Preset::AppleM4a,
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let mut session = self.create_session(&asset, Preset::AppleM4a)?;
        session.set_output(OutputSettings {
            path: output.to_path_buf(),
            container: Container::M4a,
            optimize_for_network: false,
            strip_metadata: false,
        });

        self.encoder().export(&session).await.map_err(|e| {
            self.record_export_failure(&e, input, output);
            e
        })
    }

    /// Convert audio and report success to `completion` on `context`.
    ///
    /// Every outcome, including a session that could not be built, is
    /// delivered through `context`.
    pub fn convert_audio<F>(
        &self,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        context: Arc<dyn CompletionContext>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let this = self.clone();
        let input = input.into();
        let output = output.into();
        tokio::spawn(async move {
            let success = this.export_audio(&input, &output).await.is_ok();
            context.dispatch(Box::new(move || completion(success)));
        })
    }
}
