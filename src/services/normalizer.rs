use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

/// Pixel budget for images sent to the vision model.
const MAX_PIXELS: u64 = 300_000;

/// JPEG quality factor for the encoded payload.
const JPEG_QUALITY: u8 = 80;

/// Hard ceiling on the encoded payload size.
const MAX_ENCODED_BYTES: usize = 15 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum NormalizerError {
    #[error("image compression failed: {0}")]
    Compression(#[from] image::ImageError),

    #[error("image too large after compression ({0} bytes)")]
    TooLarge(usize),
}

/// Normalize an arbitrary raster image into a bounded JPEG payload.
///
/// Downscales uniformly to the pixel budget (never upscales), flattens
/// any transparency over a white background, and encodes at a fixed
/// quality. Fails rather than truncating if the encoded result still
/// exceeds the byte ceiling.
pub fn normalize(input: &[u8]) -> Result<Vec<u8>, NormalizerError> {
    let decoded = image::load_from_memory(input)?;
    let (width, height) = scaled_dimensions(decoded.width(), decoded.height());

    let resized = if (width, height) != (decoded.width(), decoded.height()) {
        decoded.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        decoded
    };

    let flattened = flatten_to_rgb(resized);

    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut encoded), JPEG_QUALITY);
    flattened.write_with_encoder(encoder)?;

    if encoded.len() > MAX_ENCODED_BYTES {
        return Err(NormalizerError::TooLarge(encoded.len()));
    }

    Ok(encoded)
}

/// Target dimensions under the pixel budget, preserving aspect ratio.
/// Dimensions round down; an image already under budget is untouched.
fn scaled_dimensions(width: u32, height: u32) -> (u32, u32) {
    let total = width as u64 * height as u64;
    if total <= MAX_PIXELS {
        return (width, height);
    }

    let scale = (MAX_PIXELS as f64 / total as f64).sqrt();
    let new_width = ((width as f64 * scale) as u32).max(1);
    let new_height = ((height as f64 * scale) as u32).max(1);
    (new_width, new_height)
}

/// Collapse any color mode to opaque truecolor. Alpha channels are
/// composited over white rather than dropped.
fn flatten_to_rgb(image: DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return DynamicImage::ImageRgb8(image.to_rgb8());
    }

    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        let blend = |c: u8| (((c as u16 * alpha) + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    fn encode_png(image: &DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn image_under_budget_keeps_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([200, 30, 30])));
        let jpeg = normalize(&encode_png(&img)).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 100));
    }

    #[test]
    fn oversized_image_is_downscaled_under_budget() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1200, 900, Rgb([10, 10, 10])));
        let jpeg = normalize(&encode_png(&img)).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        let pixels = decoded.width() as u64 * decoded.height() as u64;
        assert!(pixels <= MAX_PIXELS, "still {} pixels", pixels);
        // Aspect ratio preserved within rounding.
        let ratio = decoded.width() as f64 / decoded.height() as f64;
        assert!((ratio - 1200.0 / 900.0).abs() < 0.02);
    }

    #[test]
    fn never_upscales() {
        let (w, h) = scaled_dimensions(10, 10);
        assert_eq!((w, h), (10, 10));
    }

    #[test]
    fn scaled_dimensions_round_down() {
        let (w, h) = scaled_dimensions(1000, 1000);
        assert!(w as u64 * h as u64 <= MAX_PIXELS);
        assert!(w < 1000 && h < 1000);
    }

    #[test]
    fn transparency_is_composited_over_white() {
        // Fully transparent pixels must come out white, not black.
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 0])));
        let jpeg = normalize(&encode_png(&img)).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let pixel = decoded.get_pixel(25, 25);
        assert!(pixel.0.iter().all(|&c| c > 240), "got {:?}", pixel);
    }

    #[test]
    fn garbage_input_is_a_compression_error() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, NormalizerError::Compression(_)));
    }
}
