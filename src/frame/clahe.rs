use crate::utils::process_img::{reflect_101, saturate_u8};
use image::{GrayImage, ImageBuffer, Luma};

const HIST_SIZE: usize = 256;

/// Contrast-limited adaptive histogram equalisation of an 8-bit plane.
///
/// The image is split into `tiles_x` by `tiles_y` tiles; each tile gets a
/// clipped-histogram lookup table and every pixel is bilinearly blended
/// between the four nearest tile tables. A `clip_limit` of zero or less
/// disables clipping.
pub fn clahe(input: &GrayImage, tiles_x: u32, tiles_y: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = input.dimensions();
    if width == 0 || height == 0 {
        return input.clone();
    }
    let tiles_x = tiles_x.max(1);
    let tiles_y = tiles_y.max(1);

    // Histograms need whole tiles, so ragged edges are padded bottom/right.
    let padded;
    let src_for_lut = if width % tiles_x == 0 && height % tiles_y == 0 {
        input
    } else {
        let new_width = width.div_ceil(tiles_x) * tiles_x;
        let new_height = height.div_ceil(tiles_y) * tiles_y;
        padded = ImageBuffer::from_fn(new_width, new_height, |x, y| {
            let sx = reflect_101(x as i64, width as usize) as u32;
            let sy = reflect_101(y as i64, height as usize) as u32;
            *input.get_pixel(sx, sy)
        });
        &padded
    };

    let tile_width = src_for_lut.width() / tiles_x;
    let tile_height = src_for_lut.height() / tiles_y;
    let tile_area = (tile_width * tile_height) as usize;
    let lut_scale = (HIST_SIZE - 1) as f32 / tile_area as f32;

    let clip = if clip_limit > 0.0 {
        ((clip_limit * tile_area as f32 / HIST_SIZE as f32) as u32).max(1)
    } else {
        0
    };

    let mut luts = vec![[0u8; HIST_SIZE]; (tiles_x * tiles_y) as usize];
    for tile_y in 0..tiles_y {
        for tile_x in 0..tiles_x {
            let (x0, y0) = (tile_x * tile_width, tile_y * tile_height);
            let mut hist = tile_histogram(src_for_lut, x0, y0, tile_width, tile_height);
            if clip > 0 {
                clip_histogram(&mut hist, clip);
            }
            let lut = &mut luts[(tile_y * tiles_x + tile_x) as usize];
            let mut sum = 0u32;
            for (i, count) in hist.iter().enumerate() {
                sum += count;
                lut[i] = saturate_u8(sum as f32 * lut_scale);
            }
        }
    }

    interpolate(input, &luts, (tile_width, tile_height), (tiles_x, tiles_y))
}

fn tile_histogram(src: &GrayImage, x0: u32, y0: u32, w: u32, h: u32) -> [u32; HIST_SIZE] {
    let mut hist = [0u32; HIST_SIZE];
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            hist[src.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    hist
}

/// Caps every bin at `limit` and hands the excess back evenly.
fn clip_histogram(hist: &mut [u32; HIST_SIZE], limit: u32) {
    let mut clipped = 0usize;
    for bin in hist.iter_mut() {
        if *bin > limit {
            clipped += (*bin - limit) as usize;
            *bin = limit;
        }
    }

    let batch = clipped / HIST_SIZE;
    let mut residual = clipped - batch * HIST_SIZE;
    for bin in hist.iter_mut() {
        *bin += batch as u32;
    }

    if residual != 0 {
        let step = (HIST_SIZE / residual).max(1);
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }
}

fn interpolate(
    input: &GrayImage,
    luts: &[[u8; HIST_SIZE]],
    tile_size: (u32, u32),
    tiles: (u32, u32),
) -> GrayImage {
    let inv_tw = 1.0 / tile_size.0 as f32;
    let inv_th = 1.0 / tile_size.1 as f32;
    let (tiles_x, tiles_y) = (tiles.0 as i64, tiles.1 as i64);

    // Horizontal neighbours and weights only depend on the column.
    let columns: Vec<(usize, usize, f32)> = (0..input.width())
        .map(|x| {
            let txf = x as f32 * inv_tw - 0.5;
            let tx1 = txf.floor() as i64;
            let xa = txf - tx1 as f32;
            let left = tx1.max(0) as usize;
            let right = (tx1 + 1).min(tiles_x - 1) as usize;
            (left, right, xa)
        })
        .collect();

    ImageBuffer::from_fn(input.width(), input.height(), |x, y| {
        let tyf = y as f32 * inv_th - 0.5;
        let ty1 = tyf.floor() as i64;
        let ya = tyf - ty1 as f32;
        let top = ty1.max(0) as usize * tiles.0 as usize;
        let bottom = (ty1 + 1).min(tiles_y - 1) as usize * tiles.0 as usize;

        let (left, right, xa) = columns[x as usize];
        let p = input.get_pixel(x, y).0[0] as usize;

        let blend = |row: usize| {
            luts[row + left][p] as f32 * (1.0 - xa) + luts[row + right][p] as f32 * xa
        };
        let upper = blend(top);
        let lower = blend(bottom);
        Luma([saturate_u8(upper * (1.0 - ya) + lower * ya)])
    })
}
