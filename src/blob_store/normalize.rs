/// Canonicalization of uploaded images
///
/// The store depends only on the [`Normalizer`] trait. [`ImageNormalizer`] is
/// the production implementation backed by the `image` crate; tests inject
/// their own.
use crate::blob_store::OutputFormat;
use image::DynamicImage;
use std::io::Cursor;
use thiserror::Error;

/// Failure to turn an upload into canonical bytes
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Converts arbitrary input bytes into the canonical encoding
///
/// Implementations must be deterministic: byte-identical input yields
/// byte-identical output, or deduplication silently stops working.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, data: &[u8]) -> Result<Vec<u8>, NormalizeError>;
}

/// Decode with the `image` crate and re-encode into one output format
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    format: OutputFormat,
}

impl ImageNormalizer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Normalizer for ImageNormalizer {
    fn normalize(&self, data: &[u8]) -> Result<Vec<u8>, NormalizeError> {
        let img =
            image::load_from_memory(data).map_err(|e| NormalizeError::Decode(e.to_string()))?;

        // The WebP encoder only takes 8-bit RGB/RGBA
        let img = match self.format {
            OutputFormat::WebP if img.color().has_alpha() => {
                DynamicImage::ImageRgba8(img.to_rgba8())
            }
            OutputFormat::WebP => DynamicImage::ImageRgb8(img.to_rgb8()),
            OutputFormat::Png => img,
        };

        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), self.format.image_format())
            .map_err(|e| NormalizeError::Encode(e.to_string()))?;

        Ok(buf)
    }
}

/// Stores input bytes unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughNormalizer;

impl Normalizer for PassthroughNormalizer {
    fn normalize(&self, data: &[u8]) -> Result<Vec<u8>, NormalizeError> {
        Ok(data.to_vec())
    }
}
