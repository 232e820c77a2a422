//! Run configuration and the override merge

use crate::paths::OutputPath;
use crate::postprocess::PostProcess;
use std::time::Duration;

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Encoded image format of the capture, with its format-specific parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    /// `quality` is 0-100
    Jpeg { quality: Option<u32> },
    /// `quality` is 0-100
    Webp { quality: Option<u32> },
}

impl ImageFormat {
    /// File extension used by the default output-path policies
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg { .. } => "jpg",
            ImageFormat::Webp { .. } => "webp",
        }
    }

    pub fn quality(&self) -> Option<u32> {
        match self {
            ImageFormat::Png => None,
            ImageFormat::Jpeg { quality } | ImageFormat::Webp { quality } => *quality,
        }
    }
}

/// Screenshot parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenshotOptions {
    pub format: ImageFormat,
    /// Capture the whole scrollable page instead of the viewport
    pub full_page: bool,
}

/// When a navigated page counts as ready for capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// The `load` event fired
    Load,
    /// `load` fired and no new resources were fetched for `idle`
    NetworkIdle { idle: Duration },
    /// An element matching the selector exists
    Selector(String),
    /// `load` fired, then a fixed delay
    Delay(Duration),
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::NetworkIdle {
            idle: Duration::from_millis(500),
        }
    }
}

/// Fully resolved configuration for one run
///
/// Construct it with `..Default::default()` or resolve it from an
/// [`OptionOverrides`] record.
///
/// ```
/// let opts = pagesnap::Options {
///     port: 0,
///     remove_originals: true,
///     ..Default::default()
/// };
/// assert_eq!(opts.viewport.width, 1920);
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    /// Glob patterns matched against paths relative to the base directory
    pub patterns: Vec<String>,
    /// Port for the static server; 0 lets the OS pick one
    pub port: u16,
    pub viewport: Viewport,
    pub screenshot: ScreenshotOptions,
    /// Restrict the capture to the first element matching this CSS selector
    pub selector: Option<String>,
    pub readiness: Readiness,
    /// Upper bound for navigation and the readiness wait
    pub timeout: Duration,
    pub output: OutputPath,
    pub post_process: Option<PostProcess>,
    /// Delete each source document once its image was written
    pub remove_originals: bool,
    /// Keep the encoded image in each result
    pub include_buffer: bool,
    /// Maximum number of renders in flight
    pub concurrency: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            port: 3000,
            viewport: Viewport::default(),
            screenshot: ScreenshotOptions::default(),
            selector: None,
            readiness: Readiness::default(),
            timeout: Duration::from_secs(30),
            output: OutputPath::default(),
            post_process: None,
            remove_originals: false,
            include_buffer: true,
            concurrency: num_cpus::get(),
        }
    }
}

fn default_patterns() -> Vec<String> {
    vec!["**/*.html".to_string(), "**/*.htm".to_string()]
}

/// Field-by-field overrides for [`ScreenshotOptions`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenshotOverrides {
    /// Replaces the format together with its parameters
    pub format: Option<ImageFormat>,
    pub full_page: Option<bool>,
}

/// Caller-supplied partial configuration.
///
/// Every `None` takes the documented default on [`resolve`](Self::resolve).
/// `screenshot` merges per field, all other fields replace wholesale.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub patterns: Option<Vec<String>>,
    pub port: Option<u16>,
    pub viewport: Option<Viewport>,
    pub screenshot: ScreenshotOverrides,
    pub selector: Option<String>,
    pub readiness: Option<Readiness>,
    pub timeout: Option<Duration>,
    pub output: Option<OutputPath>,
    pub post_process: Option<PostProcess>,
    pub remove_originals: Option<bool>,
    pub include_buffer: Option<bool>,
    pub concurrency: Option<usize>,
}

impl OptionOverrides {
    pub fn resolve(self) -> Options {
        let d = Options::default();
        Options {
            patterns: self.patterns.unwrap_or(d.patterns),
            port: self.port.unwrap_or(d.port),
            viewport: self.viewport.unwrap_or(d.viewport),
            screenshot: ScreenshotOptions {
                format: self.screenshot.format.unwrap_or(d.screenshot.format),
                full_page: self.screenshot.full_page.unwrap_or(d.screenshot.full_page),
            },
            selector: self.selector.or(d.selector),
            readiness: self.readiness.unwrap_or(d.readiness),
            timeout: self.timeout.unwrap_or(d.timeout),
            output: self.output.unwrap_or(d.output),
            post_process: self.post_process.or(d.post_process),
            remove_originals: self.remove_originals.unwrap_or(d.remove_originals),
            include_buffer: self.include_buffer.unwrap_or(d.include_buffer),
            concurrency: self.concurrency.unwrap_or(d.concurrency),
        }
    }
}

impl From<OptionOverrides> for Options {
    fn from(overrides: OptionOverrides) -> Self {
        overrides.resolve()
    }
}
