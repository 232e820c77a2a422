//! Chrome DevTools Protocol backend (uses the `headless_chrome` crate)

use crate::browser::{BrowserLauncher, BrowserSession, CaptureRequest};
use crate::config::{ImageFormat, Options, Readiness};
use crate::error::{CaptureError, RenderStage};
use crate::{Error, Result};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);
const RESOURCE_TIMING_BUFFER: u32 = 100_000;

/// Launches headless Chrome
#[derive(Debug, Clone)]
pub struct CdpLauncher {
    pub headless: bool,
    /// Chrome's sandbox does not start as root inside most containers
    pub sandbox: bool,
    /// Chrome binary; autodetected when `None`
    pub chrome_path: Option<PathBuf>,
}

impl Default for CdpLauncher {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            chrome_path: None,
        }
    }
}

impl BrowserLauncher for CdpLauncher {
    fn launch(&self, options: &Options) -> Result<Arc<dyn BrowserSession>> {
        let launch_options = LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(self.sandbox)
            .path(self.chrome_path.clone())
            .window_size(Some((options.viewport.width, options.viewport.height)))
            // Keep the connection alive through long readiness waits
            .idle_browser_timeout(options.timeout + Duration::from_secs(30))
            .build()
            .map_err(|e| Error::BrowserLaunch(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::BrowserLaunch(format!("Failed to launch browser: {}", e)))?;

        debug!("headless chrome launched");
        Ok(Arc::new(CdpBrowser { browser }))
    }
}

/// A launched Chrome instance. The process is killed when this is dropped.
pub struct CdpBrowser {
    browser: Browser,
}

impl BrowserSession for CdpBrowser {
    fn capture(&self, request: &CaptureRequest<'_>) -> std::result::Result<Vec<u8>, CaptureError> {
        // A fresh browser context keeps cookies, storage and cache per document.
        let context = self.browser.new_context().map_err(|e| {
            CaptureError::new(RenderStage::Navigate, format!("Failed to create browser context: {}", e))
        })?;
        let tab = context
            .new_tab()
            .map_err(|e| CaptureError::new(RenderStage::Navigate, format!("Failed to create tab: {}", e)))?;

        let result = capture_in_tab(&tab, request);

        if let Err(e) = tab.close(true) {
            warn!("Failed to close tab for {}: {}", request.url, e);
        }
        result
    }
}

impl Drop for CdpBrowser {
    fn drop(&mut self) {
        debug!("shutting down headless chrome");
    }
}

fn capture_in_tab(tab: &Tab, req: &CaptureRequest<'_>) -> std::result::Result<Vec<u8>, CaptureError> {
    tab.set_default_timeout(req.timeout);
    resize(tab, req.viewport.width, req.viewport.height)?;

    tab.navigate_to(req.url)
        .map_err(|e| CaptureError::new(RenderStage::Navigate, format!("Navigation failed: {}", e)))?;
    tab.wait_until_navigated()
        .map_err(|e| CaptureError::new(RenderStage::Navigate, format!("Wait for navigation failed: {}", e)))?;

    wait_until_ready(tab, req.readiness, req.timeout)?;

    let (format, quality) = capture_format(&req.screenshot.format);

    if let Some(selector) = req.selector {
        let element = tab.find_element(selector).map_err(|e| {
            CaptureError::new(RenderStage::Select, format!("No element matches `{}`: {}", selector, e))
        })?;
        element
            .scroll_into_view()
            .map_err(|e| CaptureError::new(RenderStage::Capture, format!("Failed to scroll to element: {}", e)))?;
        let clip = element
            .get_box_model()
            .map_err(|e| CaptureError::new(RenderStage::Capture, format!("Failed to measure element: {}", e)))?
            .border_viewport();
        return tab
            .capture_screenshot(format, quality, Some(clip), true)
            .map_err(|e| CaptureError::new(RenderStage::Capture, format!("Element screenshot failed: {}", e)));
    }

    if req.screenshot.full_page {
        let height = page_height(tab)?;
        if height > req.viewport.height {
            resize(tab, req.viewport.width, height)?;
        }
    }

    tab.capture_screenshot(format, quality, None, true)
        .map_err(|e| CaptureError::new(RenderStage::Capture, format!("Screenshot failed: {}", e)))
}

fn capture_format(format: &ImageFormat) -> (CaptureScreenshotFormatOption, Option<u32>) {
    let option = match format {
        ImageFormat::Png => CaptureScreenshotFormatOption::Png,
        ImageFormat::Jpeg { .. } => CaptureScreenshotFormatOption::Jpeg,
        ImageFormat::Webp { .. } => CaptureScreenshotFormatOption::Webp,
    };
    (option, format.quality())
}

fn resize(tab: &Tab, width: u32, height: u32) -> std::result::Result<(), CaptureError> {
    tab.set_bounds(Bounds::Normal {
        left: Some(0),
        top: Some(0),
        width: Some(width as f64),
        height: Some(height as f64),
    })
    .map_err(|e| CaptureError::new(RenderStage::Navigate, format!("Failed to set viewport: {}", e)))?;
    Ok(())
}

fn wait_until_ready(tab: &Tab, readiness: &Readiness, timeout: Duration) -> std::result::Result<(), CaptureError> {
    match readiness {
        Readiness::Load => Ok(()),
        Readiness::Delay(delay) => {
            std::thread::sleep(*delay);
            Ok(())
        }
        Readiness::Selector(selector) => tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| {
                CaptureError::new(RenderStage::Navigate, format!("Waiting for `{}` failed: {}", selector, e))
            }),
        Readiness::NetworkIdle { idle } => wait_for_network_idle(tab, *idle, timeout),
    }
}

/// Poll the resource timing buffer until no new entry appeared for `idle`.
fn wait_for_network_idle(tab: &Tab, idle: Duration, timeout: Duration) -> std::result::Result<(), CaptureError> {
    // The default buffer stops recording after 250 entries, which would look idle.
    tab.evaluate(
        &format!("performance.setResourceTimingBufferSize({})", RESOURCE_TIMING_BUFFER),
        false,
    )
    .map_err(|e| CaptureError::new(RenderStage::Navigate, format!("Failed to grow resource timing buffer: {}", e)))?;

    let deadline = Instant::now() + timeout;
    let mut last: Option<i64> = None;
    let mut quiet_since = Instant::now();

    loop {
        let count = eval_number(
            tab,
            "document.readyState === 'complete' ? performance.getEntriesByType('resource').length : -1",
        )? as i64;

        if count < 0 || last != Some(count) {
            last = Some(count);
            quiet_since = Instant::now();
        } else if quiet_since.elapsed() >= idle {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(CaptureError::new(
                RenderStage::Navigate,
                format!("Network did not become idle within {}ms", timeout.as_millis()),
            ));
        }
        std::thread::sleep(IDLE_POLL_INTERVAL);
    }
}

fn page_height(tab: &Tab) -> std::result::Result<u32, CaptureError> {
    let h = eval_number(
        tab,
        "Math.ceil(Math.max(document.documentElement.scrollHeight, document.body ? document.body.scrollHeight : 0))",
    )?;
    Ok(h.max(0.0) as u32)
}

fn eval_number(tab: &Tab, expression: &str) -> std::result::Result<f64, CaptureError> {
    let eval = tab
        .evaluate(expression, false)
        .map_err(|e| CaptureError::new(RenderStage::Navigate, format!("Evaluation failed: {}", e)))?;
    eval.value
        .as_ref()
        .and_then(|v| v.as_f64())
        .ok_or_else(|| CaptureError::new(RenderStage::Navigate, "No value returned from evaluation"))
}
