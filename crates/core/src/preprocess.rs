//! Converts an uploaded artifact (PDF or raster image) into an ordered
//! sequence of page images ready for vision input.

use crate::config::ProcessingConfig;
use crate::error::{CoreError, CoreResult};
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::Path;

const SUPPORTED_IMAGE_MIME: &[&str] = &["image/png", "image/jpeg", "image/tiff", "image/webp"];

/// One normalized page, ready to be base64-encoded for a vision call.
#[derive(Debug)]
pub struct PageImage {
    /// 1-indexed source page number.
    pub page_number: u32,
    pub width: u32,
    pub height: u32,
    pub png_bytes: Vec<u8>,
}

impl PageImage {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.png_bytes)
    }
}

/// Preprocess an artifact into an ordered list of page images.
///
/// Fails completely (no partial output) on unsupported mime, oversize
/// content, or a corrupt artifact — page order is never silently
/// dropped.
pub async fn preprocess(
    path: &Path,
    mime: &str,
    config: &ProcessingConfig,
) -> CoreResult<Vec<PageImage>> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > config.max_upload_size_bytes {
        return Err(CoreError::InputRejected(format!(
            "artifact is {} bytes, exceeds limit of {} bytes",
            metadata.len(),
            config.max_upload_size_bytes
        )));
    }

    let path = path.to_path_buf();
    let config = config.clone();
    let mime = mime.to_string();

    tokio::task::spawn_blocking(move || preprocess_blocking(&path, &mime, &config))
        .await
        .map_err(|e| CoreError::Pdf(format!("preprocessing task panicked: {e}")))?
}

fn preprocess_blocking(path: &Path, mime: &str, config: &ProcessingConfig) -> CoreResult<Vec<PageImage>> {
    match mime {
        "application/pdf" => preprocess_pdf(path, config),
        m if SUPPORTED_IMAGE_MIME.contains(&m) => preprocess_image(path, config),
        other => Err(CoreError::InputRejected(format!("unsupported mime type: {other}"))),
    }
}

fn preprocess_pdf(path: &Path, config: &ProcessingConfig) -> CoreResult<Vec<PageImage>> {
    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        CoreError::Pdfium(format!(
            "failed to load pdfium library: {e}. install libpdfium and place it on the system path."
        ))
    })?;
    let pdfium = Pdfium::new(bindings);
    let doc = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| CoreError::Pdf(format!("failed to open PDF '{}': {e}", path.display())))?;

    let total_pages = doc.pages().len();
    let mut pages = Vec::with_capacity(total_pages as usize);

    for page_num in 0..total_pages {
        let page = doc
            .pages()
            .get(page_num)
            .map_err(|e| CoreError::Pdf(format!("failed to get page {}: {e}", page_num + 1)))?;

        let scale = config.image_dpi as f32 / 72.0;
        let width = (page.width().value * scale) as i32;
        let height = (page.height().value * scale) as i32;
        let render_config = PdfRenderConfig::new().set_target_width(width).set_target_height(height);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| CoreError::Image(format!("failed to render page {}: {e}", page_num + 1)))?;

        let img = apply_enhancements(bitmap.as_image(), config);
        let png_bytes = encode_png(&img)?;

        pages.push(PageImage {
            page_number: (page_num + 1) as u32,
            width: img.width(),
            height: img.height(),
            png_bytes,
        });
    }

    Ok(pages)
}

fn preprocess_image(path: &Path, config: &ProcessingConfig) -> CoreResult<Vec<PageImage>> {
    let img = image::open(path).map_err(|e| CoreError::Image(format!("failed to decode image: {e}")))?;
    let img = apply_enhancements(img, config);
    let (width, height) = (img.width(), img.height());
    let png_bytes = encode_png(&img)?;

    Ok(vec![PageImage { page_number: 1, width, height, png_bytes }])
}

fn apply_enhancements(mut img: DynamicImage, config: &ProcessingConfig) -> DynamicImage {
    if config.enable_greyscale {
        img = DynamicImage::ImageLuma8(img.to_luma8());
    }
    if config.enable_contrast {
        img = img.adjust_contrast(15.0);
    }
    if config.enable_deskew {
        if let Some(angle) = estimate_skew_angle(&img) {
            if angle.abs() > 0.2 {
                img = rotate_nearest(&img, -angle);
            }
        }
    }
    img
}

const SKEW_CANDIDATE_DEGREES: [f64; 17] = [
    -4.0, -3.5, -3.0, -2.5, -2.0, -1.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0,
];

/// Estimate skew in degrees by rotating a downsampled copy through a small
/// bounded set of candidate angles and picking the one whose horizontal
/// ink-projection has the sharpest peaks (well-aligned text rows produce
/// high-variance projections; a skewed page smears ink across rows).
///
/// Bounded to a handful of candidates around zero — this corrects the
/// few-degree tilt typical of a handheld photo, not severe rotation.
fn estimate_skew_angle(img: &DynamicImage) -> Option<f64> {
    let small = img.thumbnail(300, 300).to_luma8();
    let (w, h) = small.dimensions();
    if w < 20 || h < 20 {
        return None;
    }

    let mut best_angle = 0.0;
    let mut best_score = f64::MIN;

    for &angle in &SKEW_CANDIDATE_DEGREES {
        let rotated = rotate_luma_nearest(&small, angle);
        let score = row_projection_variance(&rotated);
        if score > best_score {
            best_score = score;
            best_angle = angle;
        }
    }

    if best_score <= 0.0 {
        None
    } else {
        Some(best_angle)
    }
}

fn row_projection_variance(img: &image::GrayImage) -> f64 {
    let (w, h) = img.dimensions();
    if h == 0 {
        return 0.0;
    }
    let row_sums: Vec<f64> = (0..h)
        .map(|y| (0..w).map(|x| 255.0 - img.get_pixel(x, y).0[0] as f64).sum::<f64>())
        .collect();
    let mean = row_sums.iter().sum::<f64>() / row_sums.len() as f64;
    row_sums.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / row_sums.len() as f64
}

fn rotate_luma_nearest(img: &image::GrayImage, degrees: f64) -> image::GrayImage {
    if degrees == 0.0 {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin(), theta.cos());
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);

    image::GrayImage::from_fn(w, h, |x, y| {
        let (dx, dy) = (x as f64 - cx, y as f64 - cy);
        let src_x = cx + dx * cos + dy * sin;
        let src_y = cy - dx * sin + dy * cos;
        if src_x >= 0.0 && src_y >= 0.0 && (src_x as u32) < w && (src_y as u32) < h {
            *img.get_pixel(src_x as u32, src_y as u32)
        } else {
            image::Luma([255])
        }
    })
}

/// Rotate `img` by `degrees`, preserving its color channels. Greyscale
/// conversion is `enable_greyscale`'s decision, made earlier in
/// `apply_enhancements`; deskew must not force it by routing every
/// rotation through a luma buffer.
fn rotate_nearest(img: &DynamicImage, degrees: f64) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(rotate_luma_nearest(gray, degrees)),
        other => DynamicImage::ImageRgba8(rotate_rgba_nearest(&other.to_rgba8(), degrees)),
    }
}

fn rotate_rgba_nearest(img: &image::RgbaImage, degrees: f64) -> image::RgbaImage {
    if degrees == 0.0 {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin(), theta.cos());
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);

    image::RgbaImage::from_fn(w, h, |x, y| {
        let (dx, dy) = (x as f64 - cx, y as f64 - cy);
        let src_x = cx + dx * cos + dy * sin;
        let src_y = cy - dx * sin + dy * cos;
        if src_x >= 0.0 && src_y >= 0.0 && (src_x as u32) < w && (src_y as u32) < h {
            *img.get_pixel(src_x as u32, src_y as u32)
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    })
}

fn encode_png(img: &DynamicImage) -> CoreResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut bytes);
    img.write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| CoreError::Image(format!("failed to encode PNG: {e}")))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_mime() {
        let config = ProcessingConfig::default();
        let result = preprocess_blocking(Path::new("/nonexistent"), "application/zip", &config);
        assert!(matches!(result, Err(CoreError::InputRejected(_))));
    }

    #[test]
    fn rotate_nearest_preserves_color_channels() {
        let mut img = image::RgbaImage::new(20, 20);
        for x in 0..20 {
            for y in 0..20 {
                img.put_pixel(x, y, image::Rgba([200, 30, 40, 255]));
            }
        }
        let rotated = rotate_nearest(&DynamicImage::ImageRgba8(img), 2.0);
        assert!(matches!(rotated, DynamicImage::ImageRgba8(_)));
        let px = rotated.to_rgba8().get_pixel(10, 10).0;
        assert_eq!(px, [200, 30, 40, 255]);
    }

    #[test]
    fn rotate_nearest_keeps_greyscale_when_already_luma() {
        let img = image::GrayImage::from_pixel(20, 20, image::Luma([128]));
        let rotated = rotate_nearest(&DynamicImage::ImageLuma8(img), 2.0);
        assert!(matches!(rotated, DynamicImage::ImageLuma8(_)));
    }
}
