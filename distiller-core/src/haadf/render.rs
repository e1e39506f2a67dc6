//! False-color rendering of HAADF intensity data.
//!
//! Intensities are min-max normalized and mapped through a fixed
//! perceptually-uniform lookup table (a piecewise-linear viridis
//! approximation). The table is part of the crate's contract: equal inputs
//! render byte-identical previews across runs of the same release.

use std::path::Path;

use image::{ImageBuffer, Rgb};

use crate::error::Result;

use super::dm4::Dm4Image;

/// Anchor colors, evenly spaced over [0, 1].
const LUT_ANCHORS: [[f32; 3]; 9] = [
    [68.0, 1.0, 84.0],
    [71.0, 44.0, 122.0],
    [59.0, 81.0, 139.0],
    [44.0, 113.0, 142.0],
    [33.0, 144.0, 141.0],
    [39.0, 173.0, 129.0],
    [92.0, 200.0, 99.0],
    [170.0, 220.0, 50.0],
    [253.0, 231.0, 37.0],
];

/// Map a normalized intensity in [0, 1] to an RGB color.
pub fn colorize(value: f32) -> Rgb<u8> {
    let clamped = value.clamp(0.0, 1.0);
    let scaled = clamped * (LUT_ANCHORS.len() - 1) as f32;
    let low = scaled.floor() as usize;
    let high = (low + 1).min(LUT_ANCHORS.len() - 1);
    let t = scaled - low as f32;

    let mut channels = [0u8; 3];
    for (i, channel) in channels.iter_mut().enumerate() {
        let blended = LUT_ANCHORS[low][i] + (LUT_ANCHORS[high][i] - LUT_ANCHORS[low][i]) * t;
        *channel = blended.round() as u8;
    }
    Rgb(channels)
}

/// Render the image as a false-color PNG at `path`.
pub fn render_png(image: &Dm4Image, path: &Path) -> Result<()> {
    let (min, max) = image
        .data
        .iter()
        .filter(|value| value.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &value| {
            (min.min(value), max.max(value))
        });
    let range = if max > min { max - min } else { 1.0 };

    let buffer = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_fn(
        image.width as u32,
        image.height as u32,
        |x, y| {
            let value = image.data[y as usize * image.width + x as usize];
            if value.is_finite() {
                colorize((value - min) / range)
            } else {
                colorize(0.0)
            }
        },
    );
    buffer.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lut_endpoints() {
        assert_eq!(colorize(0.0), Rgb([68, 1, 84]));
        assert_eq!(colorize(1.0), Rgb([253, 231, 37]));
        // Out-of-range values clamp instead of wrapping.
        assert_eq!(colorize(-1.0), colorize(0.0));
        assert_eq!(colorize(2.0), colorize(1.0));
    }

    #[test]
    fn renders_a_decodable_png() {
        let image = Dm4Image {
            width: 3,
            height: 2,
            data: vec![0.0, 100.0, 200.0, 300.0, 400.0, 500.0],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("42.png");

        render_png(&image, &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(*decoded.get_pixel(0, 0), colorize(0.0));
        assert_eq!(*decoded.get_pixel(2, 1), colorize(1.0));
    }

    #[test]
    fn flat_images_do_not_divide_by_zero() {
        let image = Dm4Image {
            width: 2,
            height: 1,
            data: vec![7.0, 7.0],
        };
        let dir = tempfile::tempdir().unwrap();
        render_png(&image, &dir.path().join("flat.png")).unwrap();
    }
}
