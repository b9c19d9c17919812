use crate::utils::process_img::{lab_to_rgb, reflect_101, rgb_to_lab};
use image::RgbImage;
use rayon::prelude::*;

// Neighbours whose weight falls below this contribute nothing.
const WEIGHT_THRESHOLD: f32 = 0.001;

/// Non-local-means denoising of a colour frame.
///
/// The frame is filtered in Lab space: lightness on its own and the two
/// chroma channels together, both with strength `h` (8-bit units). Each
/// output pixel is the weighted mean of the pixels in its
/// `search_window`, weighted by how similar their `template_window`
/// neighbourhoods are. `h <= 0` returns an unmodified copy.
pub fn denoise_colored(
    frame: &RgbImage,
    h: f32,
    template_window: usize,
    search_window: usize,
) -> RgbImage {
    if h <= 0.0 || frame.width() == 0 || frame.height() == 0 {
        return frame.clone();
    }

    let mut planes = rgb_to_lab(frame);
    let (width, height) = (planes.width as usize, planes.height as usize);
    let window = Window::new(template_window, search_window);

    planes.lightness = nl_means(&planes.lightness, 1, width, height, h, window);
    planes.chroma = nl_means(&planes.chroma, 2, width, height, h, window);

    lab_to_rgb(&planes)
}

#[derive(Debug, Clone, Copy)]
struct Window {
    template_radius: usize,
    search_radius: usize,
}

impl Window {
    fn new(template_window: usize, search_window: usize) -> Self {
        Self {
            template_radius: template_window / 2,
            search_radius: search_window / 2,
        }
    }

    fn template_size(&self) -> usize {
        self.template_radius * 2 + 1
    }

    fn border(&self) -> usize {
        self.template_radius + self.search_radius
    }
}

/// Filters one interleaved plane with `channels` values per pixel.
fn nl_means(
    src: &[f32],
    channels: usize,
    width: usize,
    height: usize,
    h: f32,
    window: Window,
) -> Vec<f32> {
    let border = window.border();
    let sr = window.search_radius as i64;
    let tsize = window.template_size();

    let padded_width = width + 2 * border;
    let padded = pad_reflect(src, channels, width, height, border);

    // Template sums are taken over this region, which is the frame grown
    // by the template radius on every side.
    let region_width = width + 2 * window.template_radius;
    let region_height = height + 2 * window.template_radius;
    let region_origin = window.search_radius;
    let integral_width = region_width + 1;

    let norm = 1.0 / ((tsize * tsize * channels) as f32 * h * h);

    let mut sums = vec![0f32; width * height * channels];
    let mut weights = vec![0f32; width * height];
    let mut diff = vec![0f64; region_width * region_height];
    let mut integral = vec![0f64; integral_width * (region_height + 1)];

    for dy in -sr..=sr {
        for dx in -sr..=sr {
            // 1. squared difference between the region and its shifted copy
            diff.par_chunks_mut(region_width)
                .enumerate()
                .for_each(|(ry, row)| {
                    let py = region_origin + ry;
                    let qy = (py as i64 + dy) as usize;
                    for (rx, d) in row.iter_mut().enumerate() {
                        let px = region_origin + rx;
                        let qx = (px as i64 + dx) as usize;
                        let a = (py * padded_width + px) * channels;
                        let b = (qy * padded_width + qx) * channels;
                        let mut acc = 0f64;
                        for c in 0..channels {
                            let t = (padded[a + c] - padded[b + c]) as f64;
                            acc += t * t;
                        }
                        *d = acc;
                    }
                });

            // 2. box sums over the template via a summed-area table
            summed_area(&diff, region_width, region_height, &mut integral);

            // 3. accumulate the weighted neighbour into every output pixel
            sums.par_chunks_mut(width * channels)
                .zip(weights.par_chunks_mut(width))
                .enumerate()
                .for_each(|(y, (sum_row, weight_row))| {
                    let top = y * integral_width;
                    let bottom = (y + tsize) * integral_width;
                    let qy = ((y + border) as i64 + dy) as usize;
                    for x in 0..width {
                        let ssd = integral[bottom + x + tsize] - integral[top + x + tsize]
                            - integral[bottom + x]
                            + integral[top + x];
                        let weight = (-(ssd.max(0.0) as f32) * norm).exp();
                        if weight < WEIGHT_THRESHOLD {
                            continue;
                        }
                        let qx = ((x + border) as i64 + dx) as usize;
                        let q = (qy * padded_width + qx) * channels;
                        for c in 0..channels {
                            sum_row[x * channels + c] += weight * padded[q + c];
                        }
                        weight_row[x] += weight;
                    }
                });
        }
    }

    // The centre offset always contributes weight 1, so no division by zero.
    sums.par_chunks_mut(channels)
        .zip(weights.par_iter())
        .for_each(|(pixel, &weight)| {
            for value in pixel.iter_mut() {
                *value /= weight;
            }
        });
    sums
}

fn pad_reflect(
    src: &[f32],
    channels: usize,
    width: usize,
    height: usize,
    border: usize,
) -> Vec<f32> {
    let padded_width = width + 2 * border;
    let padded_height = height + 2 * border;
    let mut padded = Vec::with_capacity(padded_width * padded_height * channels);
    for py in 0..padded_height {
        let sy = reflect_101(py as i64 - border as i64, height);
        for px in 0..padded_width {
            let sx = reflect_101(px as i64 - border as i64, width);
            let s = (sy * width + sx) * channels;
            padded.extend_from_slice(&src[s..s + channels]);
        }
    }
    padded
}

/// Fills `dst` (one row and column larger than `src`) with the running 2D sum.
/// Row 0 and column 0 of `dst` stay zero.
fn summed_area(src: &[f64], width: usize, height: usize, dst: &mut [f64]) {
    let stride = width + 1;
    for y in 0..height {
        let mut row = 0f64;
        for x in 0..width {
            row += src[y * width + x];
            dst[(y + 1) * stride + x + 1] = dst[y * stride + x + 1] + row;
        }
    }
}
