//! Raster images for the print converter.
//!
//! Only `data:` URLs are decoded; this crate does no network I/O, so remote
//! sources fall back to a text placeholder. Decoded images are flattened onto
//! white and re-encoded as baseline JPEG at the configured quality, which the
//! PDF writer embeds with the DCT filter.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use tracing::debug;

/// CSS pixels are 1/96 in, PDF points 1/72 in.
const POINTS_PER_PIXEL: f32 = 0.75;

/// A JPEG-encoded image ready to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub jpeg: Vec<u8>,
}

impl RasterImage {
    /// Size in points at 96 dpi.
    pub fn natural_size(&self) -> (f32, f32) {
        (
            self.pixel_width as f32 * POINTS_PER_PIXEL,
            self.pixel_height as f32 * POINTS_PER_PIXEL,
        )
    }
}

/// JPEG quality (1..=100) for a factor in (0, 1].
pub fn jpeg_quality(factor: f32) -> u8 {
    if factor.is_nan() {
        return 100;
    }
    (factor * 100.0).round().clamp(1.0, 100.0) as u8
}

fn data_url_payload(source: &str) -> Option<Vec<u8>> {
    let rest = source.trim().strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mut parts = meta.split(';');
    let mime = parts.next()?;
    if !mime.trim().to_ascii_lowercase().starts_with("image/") {
        return None;
    }
    if !parts.any(|part| part.trim().eq_ignore_ascii_case("base64")) {
        return None;
    }
    let cleaned: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
    STANDARD.decode(cleaned).ok()
}

fn blend_on_white(channel: u8, alpha: u8) -> u8 {
    let (channel, alpha) = (u16::from(channel), u16::from(alpha));
    ((channel * alpha + 255 * (255 - alpha) + 127) / 255) as u8
}

/// Decode an image embed source and re-encode it at `quality`.
///
/// Returns `None` for sources that are not base64 `data:` image URLs or do
/// not decode as PNG or JPEG.
pub fn decode_image(source: &str, quality: f32) -> Option<RasterImage> {
    let bytes = data_url_payload(source)?;
    let decoded = match image::load_from_memory(&bytes) {
        Ok(decoded) => decoded,
        Err(err) => {
            debug!(error = %err, "image embed could not be decoded");
            return None;
        }
    };
    let rgba = decoded.to_rgba8();
    let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([
            blend_on_white(r, a),
            blend_on_white(g, a),
            blend_on_white(b, a),
        ])
    });

    let mut jpeg = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality(quality));
        if let Err(err) = encoder.encode_image(&flattened) {
            debug!(error = %err, "image embed could not be re-encoded");
            return None;
        }
    }
    Some(RasterImage {
        pixel_width: flattened.width(),
        pixel_height: flattened.height(),
        jpeg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_factor_maps_onto_jpeg_scale() {
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(0.95), 95);
        assert_eq!(jpeg_quality(0.001), 1);
        assert_eq!(jpeg_quality(f32::NAN), 100);
    }

    #[test]
    fn only_base64_image_data_urls_are_read() {
        assert_eq!(
            data_url_payload("data:image/png;base64,aGk="),
            Some(b"hi".to_vec())
        );
        assert_eq!(
            data_url_payload(" data:image/jpeg;BASE64,aG\nk= "),
            Some(b"hi".to_vec())
        );
        assert_eq!(data_url_payload("data:text/plain;base64,aGk="), None);
        assert_eq!(data_url_payload("data:image/svg+xml,<svg/>"), None);
        assert_eq!(data_url_payload("https://example.com/cat.png"), None);
        assert!(decode_image("data:image/png;base64,aGk=", 0.9).is_none());
    }

    #[test]
    fn transparency_is_flattened_onto_white() {
        assert_eq!(blend_on_white(0, 0), 255);
        assert_eq!(blend_on_white(0, 255), 0);
        assert_eq!(blend_on_white(200, 255), 200);
    }
}
