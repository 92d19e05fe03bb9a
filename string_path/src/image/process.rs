use image::{imageops::FilterType, DynamicImage, GenericImageView, RgbaImage};

use super::PixelData;
use crate::{params::TableShape, Grid};

/// Shortest accepted side of a source image, in pixels.
pub const MIN_SOURCE_DIMENSION: u32 = 100;
/// Longest accepted side divided by the shortest one.
pub const MAX_ASPECT_RATIO: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("Image is too small ({width}x{height}), both sides must be at least {min} pixels", min = MIN_SOURCE_DIMENSION)]
    TooSmall { width: u32, height: u32 },
    #[error("Image aspect ratio {ratio:.2}:1 is too extreme, at most {max}:1 is supported", max = MAX_ASPECT_RATIO)]
    AspectRatio { ratio: f64 },
}

/// Checks a source image before processing. An empty list means it is usable.
pub fn check_source(width: u32, height: u32) -> Vec<SourceError> {
    let mut errors = Vec::new();
    let (short, long) = (width.min(height), width.max(height));
    if short < MIN_SOURCE_DIMENSION {
        errors.push(SourceError::TooSmall { width, height });
    }
    if short > 0 {
        let ratio = long as f64 / short as f64;
        if ratio > MAX_ASPECT_RATIO {
            errors.push(SourceError::AspectRatio { ratio });
        }
    }
    errors
}

/// Center crop keeping as much of the source as fits `aspect` (width / height).
pub fn crop_to_aspect(image: &DynamicImage, aspect: f64) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let source = width as f64 / height as f64;
    let (crop_width, crop_height) = if source > aspect {
        (((height as f64 * aspect).round() as u32).clamp(1, width), height)
    } else {
        (width, ((width as f64 / aspect).round() as u32).clamp(1, height))
    };
    image.crop_imm(
        (width - crop_width) / 2,
        (height - crop_height) / 2,
        crop_width,
        crop_height,
    )
}

/// Weighted luma written back to the three color channels. Alpha is kept.
pub fn grayscale(image: &RgbaImage) -> RgbaImage {
    let mut gray = image.clone();
    for pixel in gray.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let luma = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round() as u8;
        pixel.0 = [luma, luma, luma, a];
    }
    gray
}

/// Makes every pixel whose center lies outside the inscribed circle transparent.
pub fn mask_circle(image: &mut RgbaImage) {
    let (width, height) = image.dimensions();
    let center = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = width.min(height) as f64 / 2.0;
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - center.0;
        let dy = y as f64 + 0.5 - center.1;
        if dx * dx + dy * dy > radius * radius {
            pixel.0[3] = 0;
        }
    }
}

/// Composites the red channel over white into a single channel buffer.
/// Transparent pixels become white and therefore ask for no thread.
pub fn flatten(image: &RgbaImage) -> PixelData<u8> {
    let grid = Grid {
        height: image.height() as usize,
        width: image.width() as usize,
    };
    let pixels = image
        .pixels()
        .map(|pixel| {
            let [value, _, _, alpha] = pixel.0;
            let (value, alpha) = (value as u32, alpha as u32);
            ((value * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        })
        .collect();
    PixelData { pixels, grid }
}

/// Full pipeline: crop to the table aspect, resize to `grid`, grayscale,
/// mask circles and flatten.
pub fn process(source: &DynamicImage, shape: &TableShape, grid: Grid) -> PixelData<u8> {
    let resized = crop_to_aspect(source, shape.aspect_ratio()).resize_exact(
        grid.width as u32,
        grid.height as u32,
        FilterType::Lanczos3,
    );
    let mut gray = grayscale(&resized.to_rgba8());
    if let TableShape::Circle { .. } = shape {
        mask_circle(&mut gray);
    }
    flatten(&gray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn white_stays_white() {
        let white = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        let gray = grayscale(&white);
        assert!(gray.pixels().all(|p| p.0 == [255, 255, 255, 255]));
        assert!(flatten(&gray).pixels().iter().all(|&v| v == 255));
    }

    #[test]
    fn grayscale_uses_luma_weights_and_keeps_alpha() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 42]));
        assert_eq!(grayscale(&image).get_pixel(0, 0).0, [76, 76, 76, 42]);
        let image = RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 255]));
        assert_eq!(grayscale(&image).get_pixel(0, 0).0, [150, 150, 150, 255]);
    }

    #[test]
    fn circle_mask_clears_corners_only() {
        let mut image = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        mask_circle(&mut image);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(19, 19).0[3], 0);
        assert_eq!(image.get_pixel(10, 10).0[3], 255);
        assert_eq!(image.get_pixel(0, 10).0[3], 255);
        let flat = flatten(&image);
        assert_eq!(flat.pixels()[0], 255);
        assert_eq!(flat.pixels()[10 * 20 + 10], 0);
    }

    #[test]
    fn crop_is_centered() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(300, 100, |x, _| {
            Rgba([if (100..200).contains(&x) { 0 } else { 255 }, 0, 0, 255])
        }));
        let cropped = crop_to_aspect(&image, 1.0);
        assert_eq!(cropped.dimensions(), (100, 100));
        assert_eq!(cropped.get_pixel(0, 0).0[0], 0);
        assert_eq!(cropped.get_pixel(99, 99).0[0], 0);

        let tall = crop_to_aspect(&image, 0.5);
        assert_eq!(tall.dimensions(), (50, 100));

        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        assert_eq!(crop_to_aspect(&empty, 1.0).dimensions(), (0, 0));
    }

    #[test]
    fn process_produces_grid_sized_buffer() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            640,
            480,
            Rgba([0, 0, 0, 255]),
        ));
        let shape = TableShape::Rectangle {
            width: 400.0,
            height: 200.0,
        };
        let grid = Grid::new(100, 200);
        let pixels = process(&image, &shape, grid);
        assert_eq!(*pixels.grid(), grid);
        assert!(pixels.pixels().iter().all(|&v| v == 0));
    }

    #[test]
    fn source_preconditions() {
        assert!(check_source(500, 400).is_empty());
        assert_eq!(
            check_source(99, 400),
            vec![SourceError::TooSmall {
                width: 99,
                height: 400
            }]
        );
        assert!(matches!(
            check_source(3000, 500)[..],
            [SourceError::AspectRatio { .. }]
        ));
    }
}
