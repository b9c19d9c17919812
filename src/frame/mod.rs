use image::RgbImage;

pub mod clahe;
pub mod contrast;
pub mod denoise;
pub mod enhance;
#[cfg(feature = "opencv")]
pub mod opencv_stages;

pub trait ProcessFrame {
    fn process_image(&mut self, frame: &RgbImage) -> anyhow::Result<RgbImage>;
}
