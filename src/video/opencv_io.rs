use crate::utils::mat::{mat_to_rgb, rgb_to_mat};
use crate::video::{FourCc, StreamInfo, VideoBackend, VideoSink, VideoSource};
use anyhow::{bail, Context, Result};
use image::RgbImage;
use log::debug;
use opencv::core::{Mat, Size};
use opencv::prelude::*;
use opencv::videoio;

/// Reads and writes files through OpenCV's `videoio`.
pub struct OpenCvBackend;

impl VideoBackend for OpenCvBackend {
    fn open_source(&self, path: &str) -> Result<Box<dyn VideoSource>> {
        Ok(Box::new(CaptureSource::open(path)?))
    }

    fn open_sink(
        &self,
        path: &str,
        codec: FourCc,
        info: &StreamInfo,
    ) -> Result<Box<dyn VideoSink>> {
        Ok(Box::new(WriterSink::open(path, codec, info)?))
    }
}

pub struct CaptureSource {
    cap: videoio::VideoCapture,
    info: StreamInfo,
}

impl CaptureSource {
    pub fn open(path: &str) -> Result<Self> {
        let cap = videoio::VideoCapture::from_file(path, videoio::CAP_ANY)
            .with_context(|| format!("VideoCapture failed for {path}"))?;
        if !cap.is_opened()? {
            bail!("VideoCapture did not open {path}");
        }

        let info = StreamInfo {
            width: cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
            height: cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
            fps: cap.get(videoio::CAP_PROP_FPS)?,
        };
        debug!("opened {path}: {}x{} @ {} fps", info.width, info.height, info.fps);

        Ok(Self { cap, info })
    }
}

impl VideoSource for CaptureSource {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let mut mat = Mat::default();
        if !self.cap.read(&mut mat)? || mat.empty() {
            return Ok(None);
        }
        mat_to_rgb(&mat).map(Some)
    }

    fn is_opened(&self) -> bool {
        self.cap.is_opened().unwrap_or(false)
    }

    fn release(&mut self) -> Result<()> {
        if self.is_opened() {
            self.cap.release()?;
        }
        Ok(())
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

pub struct WriterSink {
    writer: videoio::VideoWriter,
}

impl WriterSink {
    pub fn open(path: &str, codec: FourCc, info: &StreamInfo) -> Result<Self> {
        let [c1, c2, c3, c4] = codec.chars();
        let fourcc = videoio::VideoWriter::fourcc(c1, c2, c3, c4)?;
        let size = Size::new(info.width as i32, info.height as i32);

        let writer = videoio::VideoWriter::new(path, fourcc, info.fps, size, true)
            .with_context(|| format!("VideoWriter failed for {path}"))?;
        if !writer.is_opened()? {
            bail!("VideoWriter did not open {path} with codec {codec}");
        }
        debug!("writing {path} as {codec}, {}x{} @ {} fps", info.width, info.height, info.fps);

        Ok(Self { writer })
    }
}

impl VideoSink for WriterSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let mat = rgb_to_mat(frame)?;
        self.writer.write(&mat)?;
        Ok(())
    }

    fn is_opened(&self) -> bool {
        self.writer.is_opened().unwrap_or(false)
    }

    fn release(&mut self) -> Result<()> {
        if self.is_opened() {
            self.writer.release()?;
        }
        Ok(())
    }
}

impl Drop for WriterSink {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
