//! Raster validation and bounded re-encoding of stored images

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_QUALITY: u8 = 85;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageProcessingError {
    #[error("Arquivo não existe ou não é uma imagem válida")]
    NotAnImage,

    #[error("Tipo de imagem não suportado para redimensionamento")]
    UnsupportedFormat,

    #[error("Erro ao criar imagem de origem")]
    Decode,

    #[error("Erro ao salvar imagem redimensionada")]
    Save,
}

/// Bounds for the optional resize pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeOptions {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// 0-100, mapped onto each encoder's own scale
    pub quality: u8,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            max_width: None,
            max_height: None,
            quality: DEFAULT_QUALITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProcessing {
    Unchanged { width: u32, height: u32 },
    Resized { width: u32, height: u32 },
}

/// Formats accepted as a valid raster upload
fn is_supported_raster(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif | ImageFormat::Bmp | ImageFormat::WebP
    )
}

/// Header-level check: a known raster format with readable dimensions
pub fn is_valid_image(path: &Path) -> bool {
    let Ok(reader) = ImageReader::open(path).and_then(|r| r.with_guessed_format()) else {
        return false;
    };
    match reader.format() {
        Some(format) if is_supported_raster(format) => reader.into_dimensions().is_ok(),
        _ => false,
    }
}

/// Target size preserving aspect ratio, or `None` when the image already fits.
///
/// With both bounds, the axis that overshoots proportionally more is pinned
/// to its bound and the other is derived (rounded down, at least 1).
pub fn fit_dimensions(
    width: u32,
    height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Option<(u32, u32)> {
    let too_wide = max_width.is_some_and(|max| width > max);
    let too_tall = max_height.is_some_and(|max| height > max);
    if !(too_wide || too_tall) || width == 0 || height == 0 {
        return None;
    }

    let ratio = f64::from(width) / f64::from(height);
    let from_width = |w: u32| (w, ((f64::from(w) / ratio).floor() as u32).max(1));
    let from_height = |h: u32| (((f64::from(h) * ratio).floor() as u32).max(1), h);

    let dims = match (max_width, max_height) {
        (Some(mw), Some(mh)) => {
            if f64::from(width) / f64::from(mw) > f64::from(height) / f64::from(mh) {
                from_width(mw)
            } else {
                from_height(mh)
            }
        }
        (Some(mw), None) => from_width(mw),
        (None, Some(mh)) => from_height(mh),
        (None, None) => return None,
    };
    Some(dims)
}

/// PNG quality maps to zlib level `9 - round(quality * 9 / 100)`
fn png_compression(quality: u8) -> CompressionType {
    let level = 9 - (f64::from(quality.min(100)) / 100.0 * 9.0).round() as u8;
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn select_filter(width: u32, height: u32, new_width: u32, new_height: u32) -> FilterType {
    let ratio = (width as f32 / new_width as f32).max(height as f32 / new_height as f32);
    if ratio > 2.0 {
        FilterType::Triangle
    } else if ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

fn encode(img: &DynamicImage, format: ImageFormat, quality: u8) -> image::ImageResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
        }
        ImageFormat::Png => {
            // keep alpha
            let encoder =
                PngEncoder::new_with_quality(&mut out, png_compression(quality), PngFilter::Adaptive);
            DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(encoder)?;
        }
        other => img.write_to(&mut out, other)?,
    }
    Ok(out.into_inner())
}

/// Shrink the image at `path` in place when it exceeds the bounds.
///
/// Only JPEG, PNG and GIF are re-encoded; other raster formats are refused
/// when a resize is needed.
pub fn process_image(path: &Path, options: &ResizeOptions) -> Result<ImageProcessing, ImageProcessingError> {
    if !is_valid_image(path) {
        return Err(ImageProcessingError::NotAnImage);
    }
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|_| ImageProcessingError::NotAnImage)?;
    let format = reader.format().ok_or(ImageProcessingError::NotAnImage)?;
    let img = reader.decode().map_err(|_| ImageProcessingError::Decode)?;
    let (width, height) = img.dimensions();

    let Some((new_width, new_height)) =
        fit_dimensions(width, height, options.max_width, options.max_height)
    else {
        return Ok(ImageProcessing::Unchanged { width, height });
    };
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif) {
        return Err(ImageProcessingError::UnsupportedFormat);
    }

    let filter = select_filter(width, height, new_width, new_height);
    let resized = img.resize_exact(new_width, new_height, filter);
    let bytes = encode(&resized, format, options.quality).map_err(|_| ImageProcessingError::Save)?;
    std::fs::write(path, bytes).map_err(|_| ImageProcessingError::Save)?;

    debug!(width, height, new_width, new_height, ?format, "Image resized");
    Ok(ImageProcessing::Resized {
        width: new_width,
        height: new_height,
    })
}
