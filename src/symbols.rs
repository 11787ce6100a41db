//! Barcode and QR code rasterization.
//!
//! Both symbols are turned into plain RGB images so they go through the same image element as the
//! logo.  Code 128 bars come from `barcoders`, QR modules from `qrcode`.

use barcoders::sym::code128::Code128;
use genpdf::error::{Error, ErrorKind};
use image::{DynamicImage, ImageBuffer, Rgb};
use qrcode::QrCode;

use crate::model::Proportion;

/// Code 128 character set B selector; covers printable ASCII such as URLs.
const CODE128_SET_B: char = '\u{0181}';

const BAR_MODULE_PX: u32 = 2;
const QR_MODULE_PX: u32 = 8;
const QR_QUIET_ZONE_MODULES: u32 = 4;

const DARK: Rgb<u8> = Rgb([0, 0, 0]);
const LIGHT: Rgb<u8> = Rgb([255, 255, 255]);

/// Encodes `data` as a Code 128 barcode image with the given width/height proportion.
pub fn barcode_image(data: &str, proportion: Proportion) -> Result<DynamicImage, Error> {
    let barcode = Code128::new(format!("{}{}", CODE128_SET_B, data)).map_err(|err| {
        Error::new(
            format!("Failed to encode '{}' as a Code 128 barcode: {}", data, err),
            ErrorKind::InvalidData,
        )
    })?;
    let bars = barcode.encode();
    if bars.is_empty() {
        return Err(Error::new(
            format!("Barcode for '{}' has no modules", data),
            ErrorKind::InvalidData,
        ));
    }

    let width = bars.len() as u32 * BAR_MODULE_PX;
    let ratio = if proportion.width > 0.0 {
        proportion.height / proportion.width
    } else {
        0.2
    };
    let height = ((width as f64) * ratio).round().max(1.0) as u32;

    let buffer = ImageBuffer::from_fn(width, height, |x, _| {
        if bars[(x / BAR_MODULE_PX) as usize] == 1 {
            DARK
        } else {
            LIGHT
        }
    });
    Ok(DynamicImage::ImageRgb8(buffer))
}

/// Encodes `data` as a square QR code image including a quiet zone.
pub fn qr_image(data: &str) -> Result<DynamicImage, Error> {
    let code = QrCode::new(data.as_bytes()).map_err(|err| {
        Error::new(
            format!("Failed to encode '{}' as a QR code: {}", data, err),
            ErrorKind::InvalidData,
        )
    })?;
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let side = (modules + 2 * QR_QUIET_ZONE_MODULES) * QR_MODULE_PX;
    let buffer = ImageBuffer::from_fn(side, side, |x, y| {
        let mx = (x / QR_MODULE_PX) as i64 - QR_QUIET_ZONE_MODULES as i64;
        let my = (y / QR_MODULE_PX) as i64 - QR_QUIET_ZONE_MODULES as i64;
        if mx < 0 || my < 0 || mx >= modules as i64 || my >= modules as i64 {
            return LIGHT;
        }
        match colors[(my as usize) * (modules as usize) + mx as usize] {
            qrcode::Color::Dark => DARK,
            qrcode::Color::Light => LIGHT,
        }
    });
    Ok(DynamicImage::ImageRgb8(buffer))
}
