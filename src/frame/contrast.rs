use crate::frame::clahe::clahe;
use crate::utils::process_img::{lab_to_rgb, rgb_to_lab, saturate_u8};
use image::{GrayImage, Luma, RgbImage};

/// Local contrast normalisation of the lightness channel.
///
/// Chroma is carried through untouched; only L goes through CLAHE.
pub fn equalize_lightness(frame: &RgbImage, tiles: u32, clip_limit: f32) -> RgbImage {
    let mut planes = rgb_to_lab(frame);
    let lightness = GrayImage::from_fn(planes.width, planes.height, |x, y| {
        Luma([saturate_u8(planes.lightness[(y * planes.width + x) as usize])])
    });

    let equalized = clahe(&lightness, tiles, tiles, clip_limit);
    planes.lightness = equalized.pixels().map(|p| p.0[0] as f32).collect();

    lab_to_rgb(&planes)
}

/// `out = in * alpha + beta` on every channel, saturated to 0..=255.
pub fn apply_gain(frame: &RgbImage, alpha: f32, beta: f32) -> RgbImage {
    let mut out = frame.clone();
    for pixel in out.pixels_mut() {
        pixel.0 = pixel.0.map(|c| saturate_u8(c as f32 * alpha + beta));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn gain_clips_high_values() {
        let frame = RgbImage::from_pixel(2, 1, Rgb([250, 200, 0]));
        let out = apply_gain(&frame, 1.2, 10.0);
        assert_eq!(out.get_pixel(0, 0).0, [255, 250, 10]);
    }

    #[test]
    fn negative_bias_clips_to_zero() {
        let frame = RgbImage::from_pixel(1, 1, Rgb([5, 100, 255]));
        let out = apply_gain(&frame, 1.0, -50.0);
        assert_eq!(out.get_pixel(0, 0).0, [0, 50, 205]);
    }

    #[test]
    fn unit_gain_is_identity() {
        let frame = RgbImage::from_fn(5, 5, |x, y| Rgb([(x * 50) as u8, (y * 50) as u8, 77]));
        assert_eq!(apply_gain(&frame, 1.0, 0.0), frame);
    }

    #[test]
    fn equalization_leaves_grey_neutral() {
        let frame = RgbImage::from_fn(32, 32, |x, _| {
            let v = 90 + x as u8;
            Rgb([v, v, v])
        });
        let out = equalize_lightness(&frame, 8, 2.0);
        assert_eq!(out.dimensions(), frame.dimensions());
        for p in out.pixels() {
            let [r, g, b] = p.0;
            assert!((r as i16 - g as i16).abs() <= 1 && (g as i16 - b as i16).abs() <= 1, "{p:?}");
        }
    }
}
