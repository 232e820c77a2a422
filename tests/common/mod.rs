//! Shared helpers: a browser backend that "renders" a page by fetching it
//! from the static server and returning the response body.

#![allow(dead_code)]

use pagesnap::{BrowserLauncher, BrowserSession, CaptureError, CaptureRequest, Error, Options, RenderStage};
use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct FakeState {
    pub launches: AtomicUsize,
    pub closed: AtomicBool,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

#[derive(Default, Clone)]
pub struct FakeLauncher {
    pub state: Arc<FakeState>,
    pub fail_launch: bool,
    pub delay: Duration,
}

impl BrowserLauncher for FakeLauncher {
    fn launch(&self, _options: &Options) -> pagesnap::Result<Arc<dyn BrowserSession>> {
        if self.fail_launch {
            return Err(Error::BrowserLaunch("no chrome here".into()));
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeSession {
            state: self.state.clone(),
            delay: self.delay,
        }))
    }
}

pub struct FakeSession {
    state: Arc<FakeState>,
    delay: Duration,
}

impl BrowserSession for FakeSession {
    fn capture(&self, request: &CaptureRequest<'_>) -> Result<Vec<u8>, CaptureError> {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);

        let result = if request.url.contains("broken") {
            Err(CaptureError::new(RenderStage::Capture, "simulated renderer crash"))
        } else {
            http_get(request.url).map_err(|e| CaptureError::new(RenderStage::Navigate, e))
        };

        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

/// Body of a successful GET
pub fn http_get(url: &str) -> Result<Vec<u8>, String> {
    let resp = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| e.to_string())?;
    resp.bytes().map(|b| b.to_vec()).map_err(|e| e.to_string())
}

/// A port that was free a moment ago
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

/// Wait until `port` can be bound again
pub fn assert_port_released(port: u16) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(_) => return,
            Err(e) if Instant::now() > deadline => panic!("port {} still bound: {}", port, e),
            Err(_) => std::thread::sleep(Duration::from_millis(50)),
        }
    }
}

pub fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}
