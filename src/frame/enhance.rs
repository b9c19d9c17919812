use crate::frame::contrast::{apply_gain, equalize_lightness};
use crate::frame::denoise::denoise_colored;
#[cfg(feature = "opencv")]
use crate::frame::opencv_stages;
use crate::frame::ProcessFrame;
use anyhow::Result;
use image::RgbImage;

pub const TEMPLATE_WINDOW_SIZE: usize = 7;
pub const SEARCH_WINDOW_SIZE: usize = 21;
pub const CLAHE_TILE_GRID: u32 = 8;
pub const CLAHE_CLIP_LIMIT: f32 = 2.0;

pub const DEFAULT_STRENGTH: f32 = 10.0;
pub const DEFAULT_ALPHA: f32 = 1.2;
pub const DEFAULT_BETA: f32 = 10.0;

/// Filter settings shared by every frame of a run.
///
/// Only `h`, `alpha` and `beta` can be changed; window sizes and the
/// CLAHE grid are fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhancementParameters {
    pub h: f32,
    pub template_window: usize,
    pub search_window: usize,
    pub tile_grid: u32,
    pub clip_limit: f32,
    pub alpha: f32,
    pub beta: f32,
}

impl Default for EnhancementParameters {
    fn default() -> Self {
        Self {
            h: DEFAULT_STRENGTH,
            template_window: TEMPLATE_WINDOW_SIZE,
            search_window: SEARCH_WINDOW_SIZE,
            tile_grid: CLAHE_TILE_GRID,
            clip_limit: CLAHE_CLIP_LIMIT,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
        }
    }
}

impl EnhancementParameters {
    pub fn with_overrides(h: f32, alpha: f32, beta: f32) -> Self {
        Self {
            h,
            alpha,
            beta,
            ..Self::default()
        }
    }
}

/// Which implementation runs the denoise and CLAHE stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StageBackend {
    /// The Rust filters in `frame::denoise` and `frame::clahe`.
    #[default]
    Native,
    /// `photo::fast_nl_means_denoising_colored` and `imgproc::create_clahe`.
    #[cfg(feature = "opencv")]
    OpenCv,
}

/// Denoise followed by contrast enhancement, one frame at a time.
#[derive(Debug, Clone, Default)]
pub struct FrameEnhancer {
    params: EnhancementParameters,
    backend: StageBackend,
}

impl ProcessFrame for FrameEnhancer {
    fn process_image(&mut self, frame: &RgbImage) -> Result<RgbImage> {
        let denoised = self.denoise(frame)?;
        self.enhance_contrast(&denoised)
    }
}

impl FrameEnhancer {
    pub fn new(params: EnhancementParameters) -> Self {
        Self {
            params,
            backend: StageBackend::Native,
        }
    }

    pub fn with_backend(mut self, backend: StageBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn backend(&self) -> StageBackend {
        self.backend
    }

    pub fn params(&self) -> &EnhancementParameters {
        &self.params
    }

    pub fn set_params(&mut self, h: f32, alpha: f32, beta: f32) {
        self.params = EnhancementParameters {
            h,
            alpha,
            beta,
            ..self.params
        };
    }

    /// Non-local-means noise reduction. No state carries over between frames.
    pub fn denoise(&self, frame: &RgbImage) -> Result<RgbImage> {
        let EnhancementParameters {
            h,
            template_window,
            search_window,
            ..
        } = self.params;
        match self.backend {
            StageBackend::Native => Ok(denoise_colored(frame, h, template_window, search_window)),
            #[cfg(feature = "opencv")]
            StageBackend::OpenCv => {
                opencv_stages::denoise_colored(frame, h, template_window, search_window)
            }
        }
    }

    /// Lightness CLAHE, then the global gain and bias.
    pub fn enhance_contrast(&self, frame: &RgbImage) -> Result<RgbImage> {
        let (tiles, clip) = (self.params.tile_grid, self.params.clip_limit);
        let equalized = match self.backend {
            StageBackend::Native => equalize_lightness(frame, tiles, clip),
            #[cfg(feature = "opencv")]
            StageBackend::OpenCv => opencv_stages::equalize_lightness(frame, tiles, clip)?,
        };
        Ok(apply_gain(&equalized, self.params.alpha, self.params.beta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(30 + x * 5) as u8, (40 + y * 4) as u8, (60 + (x + y) * 2) as u8])
        })
    }

    #[test]
    fn contrast_enhancement_is_not_idempotent() {
        let enhancer = FrameEnhancer::default();
        let once = enhancer.enhance_contrast(&gradient(16, 16)).unwrap();
        let twice = enhancer.enhance_contrast(&once).unwrap();
        assert_ne!(once, twice);
    }

    #[test]
    fn neutral_params_leave_only_clahe() {
        let mut enhancer = FrameEnhancer::default();
        enhancer.set_params(0.0, 1.0, 0.0);
        let frame = gradient(16, 12);

        let out = enhancer.process_image(&frame).unwrap();
        let expected = equalize_lightness(&frame, CLAHE_TILE_GRID, CLAHE_CLIP_LIMIT);
        assert_eq!(out, expected);
    }

    #[test]
    fn set_params_keeps_fixed_settings() {
        let mut enhancer = FrameEnhancer::default();
        enhancer.set_params(3.0, 0.5, -4.0);
        let params = enhancer.params();
        assert_eq!(params.h, 3.0);
        assert_eq!(params.alpha, 0.5);
        assert_eq!(params.beta, -4.0);
        assert_eq!(params.template_window, TEMPLATE_WINDOW_SIZE);
        assert_eq!(params.search_window, SEARCH_WINDOW_SIZE);
        assert_eq!(params.tile_grid, CLAHE_TILE_GRID);
        assert_eq!(params.clip_limit, CLAHE_CLIP_LIMIT);
    }

    #[test]
    fn process_keeps_frame_size() {
        let mut enhancer = FrameEnhancer::default();
        let out = enhancer.process_image(&gradient(10, 7)).unwrap();
        assert_eq!(out.dimensions(), (10, 7));
    }

    #[test]
    fn with_overrides_matches_set_params() {
        let mut enhancer = FrameEnhancer::default();
        enhancer.set_params(5.0, 1.1, 2.0);
        assert_eq!(*enhancer.params(), EnhancementParameters::with_overrides(5.0, 1.1, 2.0));
    }

    #[test]
    fn native_backend_is_the_default() {
        assert_eq!(FrameEnhancer::default().backend(), StageBackend::Native);
        let enhancer = FrameEnhancer::new(EnhancementParameters::default());
        assert_eq!(enhancer.backend(), StageBackend::Native);
    }

    #[cfg(feature = "opencv")]
    #[test]
    fn opencv_backend_tracks_native_output() {
        let frame = gradient(32, 24);
        let mut native = FrameEnhancer::default();
        let mut cv = FrameEnhancer::default().with_backend(StageBackend::OpenCv);
        assert_eq!(cv.backend(), StageBackend::OpenCv);

        let a = native.process_image(&frame).unwrap();
        let b = cv.process_image(&frame).unwrap();
        let total: u64 = a
            .as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs() as u64)
            .sum();
        let mean = total as f64 / a.as_raw().len() as f64;
        assert!(mean < 4.0, "mean difference {mean}");
    }
}
