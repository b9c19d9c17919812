use crate::utils::mat::{mat_to_rgb, rgb_to_mat};
use anyhow::Result;
use image::RgbImage;
use opencv::core::{self, Mat, Size, Vector};
use opencv::prelude::*;
use opencv::{imgproc, photo};

/// OpenCV's colour non-local means, with the same `h` on lightness and chroma.
pub fn denoise_colored(
    frame: &RgbImage,
    h: f32,
    template_window: usize,
    search_window: usize,
) -> Result<RgbImage> {
    if h <= 0.0 {
        return Ok(frame.clone());
    }
    let src = rgb_to_mat(frame)?;
    let mut dst = Mat::default();
    photo::fast_nl_means_denoising_colored(
        &src,
        &mut dst,
        h,
        h,
        template_window as i32,
        search_window as i32,
    )?;
    mat_to_rgb(&dst)
}

/// CLAHE on the L plane of OpenCV's 8-bit Lab, chroma untouched.
pub fn equalize_lightness(frame: &RgbImage, tiles: u32, clip_limit: f32) -> Result<RgbImage> {
    let src = rgb_to_mat(frame)?;
    let mut lab = Mat::default();
    imgproc::cvt_color_def(&src, &mut lab, imgproc::COLOR_BGR2Lab)?;

    let mut planes = Vector::<Mat>::new();
    core::split(&lab, &mut planes)?;

    let grid = Size::new(tiles as i32, tiles as i32);
    let mut clahe = imgproc::create_clahe(clip_limit as f64, grid)?;
    let mut equalized = Mat::default();
    clahe.apply(&planes.get(0)?, &mut equalized)?;
    planes.set(0, equalized)?;

    let mut merged = Mat::default();
    core::merge(&planes, &mut merged)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&merged, &mut bgr, imgproc::COLOR_Lab2BGR)?;
    mat_to_rgb(&bgr)
}
