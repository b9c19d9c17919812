use crate::error::EnhanceError;
use crate::video::{FourCc, StreamInfo, VideoBackend, VideoSink, VideoSource};
use anyhow::Result;
use image::RgbImage;
use log::{debug, warn};

/// Owns the reader and writer of one run.
///
/// Both are released when the session is dropped, whichever way the run
/// ends. Releasing an already closed stream is a no-op.
pub struct StreamSession {
    source: Box<dyn VideoSource>,
    sink: Box<dyn VideoSink>,
    info: StreamInfo,
}

impl StreamSession {
    /// Opens `input`, then `output` with the input's size and frame rate.
    ///
    /// The first failure ends the attempt; nothing is retried. If the output
    /// cannot be opened the input is released before returning.
    pub fn open(
        backend: &dyn VideoBackend,
        input: &str,
        output: &str,
        codec: FourCc,
    ) -> Result<Self, EnhanceError> {
        let source = backend.open_source(input).map_err(|e| {
            debug!("input open failed: {e:#}");
            EnhanceError::InputOpen(input.to_string())
        })?;
        let info = source.info();

        let sink = backend.open_sink(output, codec, &info).map_err(|e| {
            debug!("output open failed: {e:#}");
            EnhanceError::OutputOpen(output.to_string())
        })?;

        Ok(Self::from_parts(source, sink))
    }

    pub fn from_parts(source: Box<dyn VideoSource>, sink: Box<dyn VideoSink>) -> Self {
        let info = source.info();
        Self { source, sink, info }
    }

    pub fn info(&self) -> StreamInfo {
        self.info
    }

    pub fn is_open(&self) -> bool {
        self.source.is_opened() || self.sink.is_opened()
    }

    pub fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        self.source.read_frame()
    }

    /// Appends a frame; frames whose size differs from the stream are refused.
    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.info.width, self.info.height) {
            return Err(EnhanceError::FrameSize {
                width: self.info.width,
                height: self.info.height,
                got_width: frame.width(),
                got_height: frame.height(),
            }
            .into());
        }
        self.sink.write_frame(frame)
    }

    pub fn release(&mut self) {
        if self.source.is_opened() {
            if let Err(e) = self.source.release() {
                warn!("failed to release input: {e:#}");
            }
        }
        if self.sink.is_opened() {
            if let Err(e) = self.sink.release() {
                warn!("failed to release output: {e:#}");
            }
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.release();
    }
}
