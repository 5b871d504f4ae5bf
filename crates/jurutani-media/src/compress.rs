//! Image downscaling and JPEG re-encoding.
//!
//! The bound is applied to the dominant dimension only, aspect ratio
//! preserved: a landscape image is capped at the max width, a portrait or
//! square one at the max height.  Output is always JPEG, regardless of the
//! input format.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::error::Result;

/// A re-encoded image ready for upload.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    /// JPEG bytes.
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Decode `data`, scale it into the `max_width`/`max_height` bound and
/// re-encode as JPEG at `quality`.
pub fn compress(data: &[u8], max_width: u32, max_height: u32, quality: u8) -> Result<CompressedImage> {
    let img = image::load_from_memory(data)?;
    let (width, height) = img.dimensions();
    let (target_w, target_h) = bounded_dimensions(width, height, max_width, max_height);

    let img = if (target_w, target_h) == (width, height) {
        img
    } else {
        img.resize_exact(target_w, target_h, FilterType::Triangle)
    };

    // JPEG has no alpha channel; flatten before encoding.
    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    img.write_with_encoder(encoder)?;

    Ok(CompressedImage {
        data: out.into(),
        width: target_w,
        height: target_h,
    })
}

/// Scale `(w, h)` so the dominant dimension fits its bound.
fn bounded_dimensions(w: u32, h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if w > h {
        if w > max_w {
            let scaled = (h as f64 * max_w as f64 / w as f64).round() as u32;
            return (max_w, scaled.max(1));
        }
    } else if h > max_h {
        let scaled = (w as f64 * max_h as f64 / h as f64).round() as u32;
        return (scaled.max(1), max_h);
    }
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jurutani_shared::constants::{JPEG_QUALITY, MAX_IMAGE_HEIGHT, MAX_IMAGE_WIDTH};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 120, 60]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn landscape_is_capped_at_max_width() {
        let input = png_bytes(3000, 2000);
        let compressed =
            compress(&input, MAX_IMAGE_WIDTH, MAX_IMAGE_HEIGHT, JPEG_QUALITY).unwrap();

        assert_eq!(compressed.width, 800);
        assert_eq!(compressed.height, 533);

        // The output really is a decodable JPEG at the reported size.
        let decoded = image::load_from_memory(&compressed.data).unwrap();
        assert_eq!(decoded.dimensions(), (800, 533));
        assert_eq!(
            image::guess_format(&compressed.data).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn portrait_is_capped_at_max_height() {
        let input = png_bytes(1000, 2400);
        let compressed =
            compress(&input, MAX_IMAGE_WIDTH, MAX_IMAGE_HEIGHT, JPEG_QUALITY).unwrap();

        assert_eq!(compressed.height, 600);
        assert_eq!(compressed.width, 250);
    }

    #[test]
    fn small_images_keep_their_dimensions() {
        let input = png_bytes(320, 240);
        let compressed =
            compress(&input, MAX_IMAGE_WIDTH, MAX_IMAGE_HEIGHT, JPEG_QUALITY).unwrap();

        assert_eq!((compressed.width, compressed.height), (320, 240));
    }

    #[test]
    fn garbage_input_is_an_image_error() {
        let result = compress(b"not an image", MAX_IMAGE_WIDTH, MAX_IMAGE_HEIGHT, JPEG_QUALITY);
        assert!(matches!(result, Err(crate::MediaError::Image(_))));
    }
}
