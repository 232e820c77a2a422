//! Run coordination: discovery, infrastructure lifecycle and fan-out

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::cdp::CdpLauncher;
use crate::config::{OptionOverrides, Options};
use crate::discover::discover_files;
use crate::error::{RenderError, RenderStage};
use crate::render::{render_file, RenderOutcome};
use crate::server::StaticServer;
use crate::{Error, Result};
use futures::future::join_all;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Render every document under `base_dir` with headless Chrome.
///
/// Fatal problems (discovery, server bind, browser launch) fail the whole
/// call. Per-file failures do not: the returned list holds exactly one
/// outcome per discovered file, in discovery order.
pub async fn generate_previews(
    base_dir: impl AsRef<Path>,
    overrides: OptionOverrides,
) -> Result<Vec<RenderOutcome>> {
    generate_previews_with(base_dir, overrides.resolve(), &CdpLauncher::default()).await
}

/// Like [`generate_previews`] with resolved options and a chosen browser backend
pub async fn generate_previews_with(
    base_dir: impl AsRef<Path>,
    options: Options,
    launcher: &dyn BrowserLauncher,
) -> Result<Vec<RenderOutcome>> {
    let base_dir = base_dir.as_ref();
    let base_dir = std::fs::canonicalize(base_dir)
        .map_err(|e| Error::Discovery(format!("{}: {}", base_dir.display(), e)))?;

    let files = {
        let dir = base_dir.clone();
        let patterns = options.patterns.clone();
        tokio::task::spawn_blocking(move || discover_files(&dir, &patterns))
            .await
            .map_err(|e| Error::Other(format!("Discovery task failed: {}", e)))??
    };
    if files.is_empty() {
        info!("no documents matched {:?} under {}", options.patterns, base_dir.display());
        return Ok(Vec::new());
    }
    info!("found {} document(s) under {}", files.len(), base_dir.display());

    // Both resources are released on drop, so early returns clean up too.
    let server = StaticServer::start(&base_dir, options.port)?;
    let browser = launcher.launch(&options)?;

    let port = server.port();
    let outcomes = fan_out(base_dir, files, options, port, browser.clone()).await;

    drop(browser);
    server.shutdown();

    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    if failed > 0 {
        warn!("{} of {} document(s) failed to render", failed, outcomes.len());
    } else {
        info!("rendered {} document(s)", outcomes.len());
    }
    Ok(outcomes)
}

/// Render all files concurrently, at most `options.concurrency` at a time.
async fn fan_out(
    base_dir: PathBuf,
    files: Vec<PathBuf>,
    options: Options,
    port: u16,
    browser: Arc<dyn BrowserSession>,
) -> Vec<RenderOutcome> {
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let base_dir = Arc::new(base_dir);
    let options = Arc::new(options);

    let tasks = files.into_iter().map(|file| {
        let semaphore = semaphore.clone();
        let base_dir = base_dir.clone();
        let options = options.clone();
        let browser = browser.clone();

        async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(e) => return Err(RenderError::new(file, RenderStage::Worker, e.to_string())),
            };

            let task_file = file.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                render_file(&base_dir, &task_file, &options, port, browser.as_ref())
            })
            .await
            .unwrap_or_else(|e| Err(RenderError::new(file, RenderStage::Worker, e.to_string())));

            if let Err(e) = &outcome {
                warn!("{}", e);
            }
            outcome
        }
    });

    join_all(tasks).await
}
