use anyhow::Result;
use image::RgbImage;
use std::fmt;

pub mod memory;
#[cfg(feature = "opencv")]
pub mod opencv_io;

/// Frame size and rate of a stream. Fixed for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Four-character codec identifier handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const XVID: FourCc = FourCc(*b"XVID");

    pub fn chars(&self) -> [char; 4] {
        self.0.map(char::from)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.chars() {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Sequential, read-only frame access.
pub trait VideoSource {
    fn info(&self) -> StreamInfo;

    /// `Ok(None)` once the stream is exhausted.
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;

    fn is_opened(&self) -> bool;

    /// Safe to call more than once.
    fn release(&mut self) -> Result<()>;
}

/// Sequential frame writer.
pub trait VideoSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    fn is_opened(&self) -> bool;

    /// Flushes and closes. Safe to call more than once.
    fn release(&mut self) -> Result<()>;
}

/// Opens readers and writers by path.
pub trait VideoBackend {
    fn open_source(&self, path: &str) -> Result<Box<dyn VideoSource>>;

    fn open_sink(&self, path: &str, codec: FourCc, info: &StreamInfo) -> Result<Box<dyn VideoSink>>;
}
