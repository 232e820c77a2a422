//! Buffer post-processing applied between capture and write

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use std::fmt;
use std::sync::Arc;

/// Caller-supplied transform. An `Err` fails the file it was applied to.
pub type PostProcessFn = Arc<dyn Fn(Vec<u8>) -> anyhow::Result<Vec<u8>> + Send + Sync>;

/// Transform applied to each captured image before it is written
#[derive(Clone)]
pub enum PostProcess {
    /// Lossless PNG recompression; other formats pass through untouched
    OptimizePng,
    Custom(PostProcessFn),
}

impl fmt::Debug for PostProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostProcess::OptimizePng => f.write_str("OptimizePng"),
            PostProcess::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PostProcess {
    pub fn apply(&self, buffer: Vec<u8>) -> anyhow::Result<Vec<u8>> {
        match self {
            PostProcess::OptimizePng => optimize_png(buffer),
            PostProcess::Custom(f) => f(buffer),
        }
    }
}

/// Re-encode a PNG with maximum compression and adaptive filtering.
///
/// Pixels are unchanged. The original buffer is kept when re-encoding does
/// not make it smaller.
pub fn optimize_png(buffer: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    if image::guess_format(&buffer).ok() != Some(image::ImageFormat::Png) {
        return Ok(buffer);
    }

    let img = image::load_from_memory_with_format(&buffer, image::ImageFormat::Png)?;
    let mut out = Vec::with_capacity(buffer.len());
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;

    log::debug!("png recompressed {} -> {} bytes", buffer.len(), out.len());
    if out.len() < buffer.len() {
        Ok(out)
    } else {
        Ok(buffer)
    }
}
