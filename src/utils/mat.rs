use anyhow::{bail, Context, Result};
use image::RgbImage;
use opencv::core::{Mat, CV_8UC3};
use opencv::prelude::*;

// OpenCV works in BGR; frames are RGB everywhere else.

pub fn mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    if mat.typ() != CV_8UC3 {
        bail!("unsupported frame type {}", mat.typ());
    }
    let continuous;
    let mat = if mat.is_continuous() {
        mat
    } else {
        continuous = mat.try_clone()?;
        &continuous
    };

    let rgb: Vec<u8> = mat
        .data_bytes()?
        .chunks_exact(3)
        .flat_map(|bgr| [bgr[2], bgr[1], bgr[0]])
        .collect();
    RgbImage::from_raw(mat.cols() as u32, mat.rows() as u32, rgb)
        .context("decoded frame does not match its reported size")
}

pub fn rgb_to_mat(frame: &RgbImage) -> Result<Mat> {
    let bgr: Vec<u8> = frame
        .pixels()
        .flat_map(|p| [p[2], p[1], p[0]])
        .collect();
    let mat = Mat::from_slice(&bgr)?
        .reshape(3, frame.height() as i32)?
        .clone_pointee();
    Ok(mat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn rgb_pixels_are_stored_as_bgr() {
        let frame = RgbImage::from_pixel(2, 1, Rgb([1, 2, 3]));
        let mat = rgb_to_mat(&frame).unwrap();
        assert_eq!(mat.typ(), CV_8UC3);
        assert_eq!((mat.cols(), mat.rows()), (2, 1));
        assert_eq!(mat.data_bytes().unwrap(), &[3, 2, 1, 3, 2, 1]);
    }

    #[test]
    fn conversion_round_trips() {
        let frame = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8 * 10, 200]));
        let back = mat_to_rgb(&rgb_to_mat(&frame).unwrap()).unwrap();
        assert_eq!(back, frame);
        assert_eq!(back.get_pixel(0, 0).0, [0, 0, 200]);
    }

    #[test]
    fn single_channel_mats_are_refused() {
        let grey = Mat::from_slice(&[1u8, 2, 3, 4]).unwrap().clone_pointee();
        assert!(mat_to_rgb(&grey).is_err());
    }
}
