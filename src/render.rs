//! Rendering of a single discovered document

use crate::browser::{BrowserSession, CaptureRequest};
use crate::config::Options;
use crate::error::{RenderError, RenderStage};
use crate::server;
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of rendering one document
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// Source document, relative to the base directory
    pub file: PathBuf,
    /// Where the image was written; `None` when the output policy skipped it
    pub output: Option<PathBuf>,
    /// Encoded image, present when `include_buffer` is set
    pub buffer: Option<Vec<u8>>,
}

pub type RenderOutcome = std::result::Result<RenderResult, RenderError>;

/// URL under which the static server exposes `relative`
pub fn page_url(port: u16, relative: &Path) -> String {
    let segments: Vec<String> = relative
        .iter()
        .map(|s| urlencoding::encode(&s.to_string_lossy()).into_owned())
        .collect();
    format!("{}{}", server::base_url(port), segments.join("/"))
}

/// Render `file` through the shared browser and write the image.
///
/// The source is only removed after the image was written. When the output
/// policy skips the write, or any earlier step fails, it stays in place.
pub fn render_file(
    base_dir: &Path,
    file: &Path,
    options: &Options,
    port: u16,
    browser: &dyn BrowserSession,
) -> RenderOutcome {
    info!("rendering {}", file.display());

    let url = page_url(port, file);
    let request = CaptureRequest::new(&url, options);
    let mut buffer = browser
        .capture(&request)
        .map_err(|e| e.into_render_error(file))?;

    if let Some(post) = &options.post_process {
        buffer = post
            .apply(buffer)
            .map_err(|e| RenderError::new(file, RenderStage::PostProcess, format!("{:#}", e)))?;
    }

    let output = options
        .output
        .resolve(base_dir, file, options.screenshot.format.extension());
    match &output {
        Some(path) => {
            write_image(path, &buffer).map_err(|e| {
                RenderError::new(file, RenderStage::Write, format!("{}: {}", path.display(), e))
            })?;
            debug!("wrote {} ({} bytes)", path.display(), buffer.len());

            if options.remove_originals {
                remove_source(base_dir, file, path)?;
            }
        }
        None => debug!("output skipped for {}, source kept", file.display()),
    }

    Ok(RenderResult {
        file: file.to_path_buf(),
        output,
        buffer: options.include_buffer.then_some(buffer),
    })
}

fn remove_source(base_dir: &Path, file: &Path, written: &Path) -> Result<(), RenderError> {
    let source = base_dir.join(file);
    if written == source {
        debug!("image replaced {}, nothing to remove", source.display());
        return Ok(());
    }
    fs::remove_file(&source)
        .map_err(|e| RenderError::new(file, RenderStage::Remove, format!("{}: {}", source.display(), e)))
}

fn write_image(path: &Path, buffer: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, buffer)
}
