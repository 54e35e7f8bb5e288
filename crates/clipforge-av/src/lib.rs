//! # clipforge-av
//!
//! Adaptive media conversion for uploads.
//!
//! This crate provides:
//!
//! - **Adaptive video transcoding** ([`Transcoder`]) -- convert a source video
//!   to MP4 at the highest [`QualityTier`] whose estimated size fits a byte
//!   limit, with the limit also enforced as a hard ceiling.
//! - **Audio conversion** -- single-shot AAC/M4A export.
//! - **Encoder seam** ([`Encoder`]) -- asset loading, export sessions and
//!   size estimation, with an ffmpeg/ffprobe implementation
//!   ([`FfmpegEncoder`]).
//! - **Workspace management** ([`Workspace`]) -- scoped output storage.
//! - **Diagnostics** ([`DiagnosticSink`]) and **completion contexts**
//!   ([`CompletionContext`]) injected into the transcoder.
//!
//! ## Example
//!
//! ```no_run
//! use clipforge_av::{FfmpegEncoder, QualityTier, ToolConfig, TranscodeRequest, Transcoder, Workspace};
//! use std::sync::Arc;
//!
//! # async fn example() -> clipforge_av::Result<()> {
//! let encoder = FfmpegEncoder::new(&ToolConfig::default())?;
//! let transcoder = Transcoder::new(Arc::new(encoder), Workspace::system_temp());
//!
//! let request = TranscodeRequest::new("/videos/IMG_0001.MOV")
//!     .with_tier(QualityTier::Highest)
//!     .with_size_limit(25 * 1024 * 1024)
//!     .keep_source();
//!
//! let outcome = transcoder.convert(request).await?;
//! println!("{} at {}", outcome.output.display(), outcome.tier);
//! # Ok(())
//! # }
//! ```

mod audio;
mod error;

pub mod asset;
pub mod command;
pub mod diagnostics;
pub mod dispatch;
pub mod encoder;
pub mod ffmpeg;
pub mod probe;
pub mod quality;
pub mod tools;
pub mod transcoder;
pub mod workspace;

// Re-exports
pub use asset::{Asset, NaturalSize, VideoTrack};
pub use command::{ToolCommand, ToolOutput};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, TracingSink};
pub use dispatch::{CompletionContext, Inline, Job, MainQueue, MainQueueHandle};
pub use encoder::{Encoder, ExportSession, OutputSettings, TimeRange};
pub use error::{Error, Result};
pub use ffmpeg::FfmpegEncoder;
pub use quality::{Container, Preset, QualityTier, VideoRate, MAX_HIGHEST_DIMENSION};
pub use tools::{check_tool, check_tools, require_tool, ToolConfig, ToolInfo};
pub use transcoder::{ConvertTask, TranscodeOutcome, TranscodeRequest, Transcoder};
pub use workspace::Workspace;
