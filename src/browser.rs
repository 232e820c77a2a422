//! Browser backend seam
//!
//! The pipeline only talks to a browser through these traits so that the
//! orchestration can run against headless Chrome ([`crate::cdp`]) or any other
//! implementation, such as the in-memory fakes used by the tests.

use crate::config::{Options, Readiness, ScreenshotOptions, Viewport};
use crate::error::CaptureError;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Everything a backend needs to capture one document
#[derive(Debug, Clone)]
pub struct CaptureRequest<'a> {
    pub url: &'a str,
    pub viewport: Viewport,
    pub screenshot: ScreenshotOptions,
    pub selector: Option<&'a str>,
    pub readiness: &'a Readiness,
    pub timeout: Duration,
}

impl<'a> CaptureRequest<'a> {
    pub fn new(url: &'a str, options: &'a Options) -> Self {
        Self {
            url,
            viewport: options.viewport,
            screenshot: options.screenshot,
            selector: options.selector.as_deref(),
            readiness: &options.readiness,
            timeout: options.timeout,
        }
    }
}

/// A running browser shared by every render of one run.
///
/// Each [`capture`](Self::capture) must use its own isolated browsing
/// context and release it before returning. Implementations shut the browser
/// down when dropped, so only whoever holds the last reference ends it.
pub trait BrowserSession: Send + Sync {
    fn capture(&self, request: &CaptureRequest<'_>) -> std::result::Result<Vec<u8>, CaptureError>;
}

/// Starts a [`BrowserSession`] for a run
pub trait BrowserLauncher: Send + Sync {
    fn launch(&self, options: &Options) -> Result<Arc<dyn BrowserSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageFormat;

    #[test]
    fn request_borrows_run_options() {
        let opts = Options {
            selector: Some(".card".into()),
            screenshot: ScreenshotOptions {
                format: ImageFormat::Webp { quality: Some(70) },
                full_page: true,
            },
            ..Default::default()
        };
        let req = CaptureRequest::new("http://127.0.0.1:3000/a.html", &opts);
        assert_eq!(req.selector, Some(".card"));
        assert!(req.screenshot.full_page);
        assert_eq!(req.viewport.width, 1920);
        assert_eq!(req.timeout, Duration::from_secs(30));
    }
}
