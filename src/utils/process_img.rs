use image::{Rgb, RgbImage};
use palette::{FromColor, Lab, Srgb};

const L_SCALE: f32 = 255.0 / 100.0;
const AB_OFFSET: f32 = 128.0;

/// A frame split into 8-bit-scaled L*a*b* planes.
///
/// Lightness is stretched to 0..255 and a/b are offset by 128, the same
/// ranges an 8-bit Lab image uses, so filter strengths are expressed in
/// 8-bit units. Values stay in f32 so untouched planes survive a round
/// trip without quantisation.
#[derive(Debug, Clone)]
pub struct LabPlanes {
    pub width: u32,
    pub height: u32,
    pub lightness: Vec<f32>,
    /// a and b interleaved, two values per pixel.
    pub chroma: Vec<f32>,
}

pub fn rgb_to_lab(img: &RgbImage) -> LabPlanes {
    let len = (img.width() * img.height()) as usize;
    let mut lightness = Vec::with_capacity(len);
    let mut chroma = Vec::with_capacity(len * 2);

    for pixel in img.pixels() {
        let [r, g, b] = pixel.0;
        let lab: Lab = Lab::from_color(Srgb::new(r, g, b).into_format::<f32>());
        lightness.push(lab.l * L_SCALE);
        chroma.push(lab.a + AB_OFFSET);
        chroma.push(lab.b + AB_OFFSET);
    }

    LabPlanes {
        width: img.width(),
        height: img.height(),
        lightness,
        chroma,
    }
}

pub fn lab_to_rgb(planes: &LabPlanes) -> RgbImage {
    RgbImage::from_fn(planes.width, planes.height, |x, y| {
        let i = (y * planes.width + x) as usize;
        let lab: Lab = Lab::new(
            planes.lightness[i] / L_SCALE,
            planes.chroma[i * 2] - AB_OFFSET,
            planes.chroma[i * 2 + 1] - AB_OFFSET,
        );
        let rgb: Srgb = Srgb::from_color(lab);
        Rgb([unit_to_u8(rgb.red), unit_to_u8(rgb.green), unit_to_u8(rgb.blue)])
    })
}

/// Rounds and clamps a value onto the 0..=255 range.
pub fn saturate_u8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

fn unit_to_u8(value: f32) -> u8 {
    saturate_u8(value * 255.0)
}

/// Maps a possibly out-of-range index onto `0..n` by mirroring without
/// repeating the edge sample (`dcb|abcd|cba`).
pub fn reflect_101(index: i64, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n as i64 - 1);
    let m = index.rem_euclid(period);
    if m >= n as i64 {
        (period - m) as usize
    } else {
        m as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_101_mirrors_without_edge_repeat() {
        let mapped: Vec<usize> = (-3..7).map(|i| reflect_101(i, 4)).collect();
        assert_eq!(mapped, vec![3, 2, 1, 0, 1, 2, 3, 2, 1, 0]);
        assert_eq!(reflect_101(-5, 1), 0);
        assert_eq!(reflect_101(9, 2), 1);
    }

    #[test]
    fn lab_round_trip_keeps_pixels() {
        let img = RgbImage::from_fn(16, 4, |x, y| {
            Rgb([(x * 16) as u8, (y * 60) as u8, (255 - x * 10) as u8])
        });
        let back = lab_to_rgb(&rgb_to_lab(&img));
        for (a, b) in img.pixels().zip(back.pixels()) {
            for c in 0..3 {
                assert!((a[c] as i16 - b[c] as i16).abs() <= 1, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn lightness_uses_8_bit_range() {
        let white = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        let planes = rgb_to_lab(&white);
        assert!((planes.lightness[0] - 255.0).abs() < 0.5);
        assert!((planes.chroma[0] - 128.0).abs() < 0.5);
        assert!((planes.chroma[1] - 128.0).abs() < 0.5);
    }
}
