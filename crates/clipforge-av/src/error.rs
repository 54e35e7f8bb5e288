//! Error types for clipforge-av.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting media for upload.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool failed to execute.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// Failed to parse tool output.
    #[error("failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// The specified file was not found.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The source has no video track to convert.
    #[error("no video track in {}", path.display())]
    NoVideoTrack { path: PathBuf },

    /// The encoder could not build an export session for the asset/preset pair.
    #[error("cannot create export session for {} with preset {preset}: {reason}", path.display())]
    SessionConstruction {
        path: PathBuf,
        preset: String,
        reason: String,
    },

    /// The encoder reported a failed export.
    #[error("export failed ({status}): {message}")]
    Export { status: String, message: String },

    /// The conversion task was cancelled before it completed.
    #[error("conversion cancelled")]
    Cancelled,

    /// Workspace error.
    #[error("workspace error: {0}")]
    Workspace(String),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a session construction error.
    pub fn session(
        path: impl Into<PathBuf>,
        preset: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::SessionConstruction {
            path: path.into(),
            preset: preset.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an export failure.
    pub fn export(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Export {
            status: status.into(),
            message: message.into(),
        }
    }
}
