#[cfg(feature = "opencv")]
pub mod mat;
pub mod process_img;
