//! QR code rasterization.
//!
//! Encoding policy is fixed: error correction level M, smallest version that
//! fits the data. Only the module scale and quiet zone are configurable.

use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

const DARK: u8 = 0;
const LIGHT: u8 = 255;

pub const MAX_MODULE_SCALE: u32 = 64;
pub const MAX_QUIET_ZONE: u32 = 16;
/// Largest raster edge, in pixels, that `encode` will allocate.
pub const MAX_RASTER_SIDE: u32 = 4096;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("cannot encode an empty QR payload")]
    Empty,
    #[error("payload of {len} bytes cannot be encoded as a QR symbol: {reason}")]
    Unencodable { len: usize, reason: String },
    #[error("QR raster of {modules} modules at scale {scale} with quiet zone {quiet_zone} exceeds {max}px")]
    RasterTooLarge {
        modules: u32,
        scale: u32,
        quiet_zone: u32,
        max: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    /// Pixels per module edge.
    pub module_scale: u32,
    /// Light border, in modules.
    pub quiet_zone: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            module_scale: 10,
            quiet_zone: 2,
        }
    }
}

/// Two-tone grayscale raster of an encoded symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct QrRaster {
    image: GrayImage,
    modules: u32,
}

impl QrRaster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Modules per side of the symbol, quiet zone excluded.
    pub fn modules(&self) -> u32 {
        self.modules
    }

    /// Row-major 8-bit luma samples, top row first.
    pub fn luma(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }
}

/// Encode `text` into a raster using `options`.
pub fn encode(text: &str, options: QrOptions) -> Result<QrRaster, QrError> {
    if text.is_empty() {
        return Err(QrError::Empty);
    }

    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M).map_err(|e| {
        QrError::Unencodable {
            len: text.len(),
            reason: e.to_string(),
        }
    })?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let scale = options.module_scale.max(1);
    let border = options.quiet_zone;
    let side = border
        .checked_mul(2)
        .and_then(|quiet| quiet.checked_add(modules))
        .and_then(|edge| edge.checked_mul(scale))
        .filter(|side| *side <= MAX_RASTER_SIDE)
        .ok_or(QrError::RasterTooLarge {
            modules,
            scale,
            quiet_zone: border,
            max: MAX_RASTER_SIDE,
        })?;

    let image = GrayImage::from_fn(side, side, |px, py| {
        let mx = (px / scale) as i64 - border as i64;
        let my = (py / scale) as i64 - border as i64;
        let inside = (0..modules as i64).contains(&mx) && (0..modules as i64).contains(&my);
        if inside && colors[(my * modules as i64 + mx) as usize] == Color::Dark {
            Luma([DARK])
        } else {
            Luma([LIGHT])
        }
    });

    log::debug!(
        "Encoded {} byte QR payload as {}x{} modules ({}px)",
        text.len(),
        modules,
        modules,
        side
    );

    Ok(QrRaster { image, modules })
}
