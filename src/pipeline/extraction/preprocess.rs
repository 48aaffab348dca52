use std::io::Cursor;

use image::{imageops::FilterType, ImageOutputFormat};

use super::ExtractionError;

/// Smallest long edge Tesseract handles well; smaller scans get upscaled.
const MIN_LONG_EDGE: u32 = 1000;
/// Cap to keep giant camera photos from blowing up OCR memory and time.
const MAX_LONG_EDGE: u32 = 3000;

/// Prepare an image for OCR: grayscale, scale into the usable range,
/// re-encode as PNG. The OCR engine receives only preprocessed bytes.
pub fn preprocess_image(image_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let img = image::load_from_memory(image_bytes)
        .map_err(|e| ExtractionError::ImageProcessing(e.to_string()))?;

    let gray = img.grayscale();
    let (w, h) = (gray.width(), gray.height());
    let long_edge = w.max(h);

    let scaled = if long_edge < MIN_LONG_EDGE {
        let factor = MIN_LONG_EDGE as f32 / long_edge as f32;
        gray.resize(
            (w as f32 * factor) as u32,
            (h as f32 * factor) as u32,
            FilterType::CatmullRom,
        )
    } else if long_edge > MAX_LONG_EDGE {
        gray.resize(MAX_LONG_EDGE, MAX_LONG_EDGE, FilterType::CatmullRom)
    } else {
        gray
    };

    let mut out = Cursor::new(Vec::new());
    scaled
        .write_to(&mut out, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(e.to_string()))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn small_image_is_upscaled() {
        let src = DynamicImage::ImageRgb8(RgbImage::new(200, 100));
        let processed = preprocess_image(&encode_png(src)).unwrap();
        let result = image::load_from_memory(&processed).unwrap();
        assert!(result.width() >= MIN_LONG_EDGE);
    }

    #[test]
    fn oversized_image_is_capped() {
        let src = DynamicImage::ImageRgb8(RgbImage::new(4000, 100));
        let processed = preprocess_image(&encode_png(src)).unwrap();
        let result = image::load_from_memory(&processed).unwrap();
        assert!(result.width() <= MAX_LONG_EDGE);
    }

    #[test]
    fn garbage_bytes_rejected() {
        assert!(matches!(
            preprocess_image(b"not an image"),
            Err(ExtractionError::ImageProcessing(_))
        ));
    }
}
