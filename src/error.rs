//! Error types for the preview pipeline

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that abort a whole run
#[derive(Error, Debug)]
pub enum Error {
    /// File discovery failed (bad pattern, missing or unreadable base directory)
    #[error("File discovery failed: {0}")]
    Discovery(String),

    /// The static file server could not bind its port
    #[error("Failed to start static server on port {port}: {message}")]
    ServerStart { port: u16, message: String },

    /// The browser could not be launched
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// The step of a single file's render that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Navigate,
    Select,
    Capture,
    PostProcess,
    Write,
    Remove,
    /// The worker task itself panicked or was cancelled
    Worker,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RenderStage::Navigate => "navigation",
            RenderStage::Select => "element selection",
            RenderStage::Capture => "capture",
            RenderStage::PostProcess => "post-processing",
            RenderStage::Write => "write",
            RenderStage::Remove => "source removal",
            RenderStage::Worker => "worker",
        };
        f.write_str(s)
    }
}

/// A failure confined to one discovered file
#[derive(Error, Debug, Clone)]
#[error("{stage} failed for {}: {message}", .file.display())]
pub struct RenderError {
    /// Path of the source document, relative to the base directory
    pub file: PathBuf,
    pub stage: RenderStage,
    pub message: String,
}

impl RenderError {
    pub fn new(file: impl Into<PathBuf>, stage: RenderStage, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            stage,
            message: message.into(),
        }
    }
}

/// Error returned by a browser backend for one capture request.
///
/// The backend does not know which discovered file it is rendering, so the
/// worker attaches the file when turning this into a [`RenderError`].
#[derive(Error, Debug, Clone)]
#[error("{stage} failed: {message}")]
pub struct CaptureError {
    pub stage: RenderStage,
    pub message: String,
}

impl CaptureError {
    pub fn new(stage: RenderStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    pub fn into_render_error(self, file: impl Into<PathBuf>) -> RenderError {
        RenderError::new(file, self.stage, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_names_file_and_stage() {
        let err = CaptureError::new(RenderStage::Select, "no element matches `#card`")
            .into_render_error("cards/a.html");
        assert_eq!(err.stage, RenderStage::Select);
        assert_eq!(
            err.to_string(),
            "element selection failed for cards/a.html: no element matches `#card`"
        );
    }

    #[test]
    fn fatal_errors_name_the_failed_step() {
        let err = Error::ServerStart {
            port: 3000,
            message: "address in use".into(),
        };
        assert_eq!(err.to_string(), "Failed to start static server on port 3000: address in use");
        assert_eq!(Error::BrowserLaunch("no chrome".into()).to_string(), "Browser launch failed: no chrome");
    }
}
