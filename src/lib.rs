//! pagesnap
//!
//! Batch-renders HTML documents to preview images with headless Chrome.
//!
//! A run discovers documents under a base directory by glob pattern, serves
//! that directory over a local HTTP server so relative links resolve, renders
//! every document in its own browser context and writes a screenshot next to
//! it (or wherever the [`OutputPath`] policy says).
//!
//! # Features
//!
//! - **CDP Backend**: headless Chrome through the `headless_chrome` crate
//! - **Pluggable Backends**: the pipeline only sees the [`BrowserLauncher`] and
//!   [`BrowserSession`] traits
//! - **Bounded Concurrency**: renders fan out with a configurable cap
//!
//! # Example
//!
//! ```no_run
//! use pagesnap::{OptionOverrides, ScreenshotOverrides};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let overrides = OptionOverrides {
//!     selector: Some("#email".into()),
//!     screenshot: ScreenshotOverrides {
//!         full_page: Some(true),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! for outcome in pagesnap::generate_previews("templates", overrides).await? {
//!     match outcome {
//!         Ok(res) => println!("{} -> {:?}", res.file.display(), res.output),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{CaptureError, Error, RenderError, RenderStage, Result};

pub mod config;
pub use config::{
    ImageFormat, OptionOverrides, Options, Readiness, ScreenshotOptions, ScreenshotOverrides, Viewport,
};

pub mod paths;
pub use paths::{swap_extension, OutputPath};

pub mod postprocess;
pub use postprocess::PostProcess;

pub mod discover;
pub mod server;

// Browser seam and the Chrome DevTools Protocol backend
pub mod browser;
pub use browser::{BrowserLauncher, BrowserSession, CaptureRequest};
pub mod cdp;
pub use cdp::CdpLauncher;

pub mod render;
pub use render::{RenderOutcome, RenderResult};

pub mod pipeline;
pub use pipeline::{generate_previews, generate_previews_with};
