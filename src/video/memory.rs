use crate::video::{FourCc, StreamInfo, VideoBackend, VideoSink, VideoSource};
use anyhow::{anyhow, bail, Result};
use image::RgbImage;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Frames plus the stream properties a reader reports for them.
#[derive(Debug, Clone)]
pub struct MemoryClip {
    pub info: StreamInfo,
    pub frames: Vec<RgbImage>,
    /// Reads fail with an error once this many frames have been handed out.
    pub fail_after: Option<usize>,
}

impl MemoryClip {
    pub fn new(info: StreamInfo, frames: Vec<RgbImage>) -> Self {
        Self {
            info,
            frames,
            fail_after: None,
        }
    }

    pub fn failing_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }
}

/// What a [`MemorySink`] received.
#[derive(Debug, Clone)]
pub struct RecordedClip {
    pub info: StreamInfo,
    pub codec: FourCc,
    pub frames: Vec<RgbImage>,
    /// Times the sink actually closed. Repeated releases do not count.
    pub closes: u32,
}

pub type Recording = Arc<Mutex<RecordedClip>>;

fn lock(recording: &Recording) -> Result<MutexGuard<'_, RecordedClip>> {
    recording
        .lock()
        .map_err(|_| anyhow!("recorded clip lock poisoned"))
}

pub struct MemorySource {
    info: StreamInfo,
    frames: VecDeque<RgbImage>,
    fail_after: Option<usize>,
    read: usize,
    opened: bool,
}

impl MemorySource {
    pub fn new(clip: MemoryClip) -> Self {
        Self {
            info: clip.info,
            frames: clip.frames.into(),
            fail_after: clip.fail_after,
            read: 0,
            opened: true,
        }
    }
}

impl VideoSource for MemorySource {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if !self.opened {
            bail!("read from a released source");
        }
        if self.fail_after.is_some_and(|n| self.read >= n) {
            bail!("decoder error after {} frames", self.read);
        }
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.read += 1;
        }
        Ok(frame)
    }

    fn is_opened(&self) -> bool {
        self.opened
    }

    fn release(&mut self) -> Result<()> {
        self.opened = false;
        self.frames.clear();
        Ok(())
    }
}

pub struct MemorySink {
    recording: Recording,
    opened: bool,
}

impl MemorySink {
    pub fn new(codec: FourCc, info: StreamInfo) -> (Self, Recording) {
        let recording = Arc::new(Mutex::new(RecordedClip {
            info,
            codec,
            frames: Vec::new(),
            closes: 0,
        }));
        let sink = Self {
            recording: Arc::clone(&recording),
            opened: true,
        };
        (sink, recording)
    }
}

impl VideoSink for MemorySink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if !self.opened {
            bail!("write to a released sink");
        }
        lock(&self.recording)?.frames.push(frame.clone());
        Ok(())
    }

    fn is_opened(&self) -> bool {
        self.opened
    }

    fn release(&mut self) -> Result<()> {
        if self.opened {
            self.opened = false;
            lock(&self.recording)?.closes += 1;
        }
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Path-addressed in-memory backend.
///
/// Inputs are registered up front; every opened output is kept as a
/// [`Recording`] that can be inspected after the run.
pub struct MemoryBackend {
    inputs: HashMap<String, MemoryClip>,
    outputs: Mutex<HashMap<String, Recording>>,
    unwritable: HashSet<String>,
    codecs: HashSet<FourCc>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            inputs: HashMap::new(),
            outputs: Mutex::new(HashMap::new()),
            unwritable: HashSet::new(),
            codecs: HashSet::from([FourCc::XVID]),
        }
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, path: &str, clip: MemoryClip) -> Self {
        self.inputs.insert(path.to_string(), clip);
        self
    }

    /// Makes opening `path` for writing fail.
    pub fn with_unwritable(mut self, path: &str) -> Self {
        self.unwritable.insert(path.to_string());
        self
    }

    pub fn with_codec(mut self, codec: FourCc) -> Self {
        self.codecs.insert(codec);
        self
    }

    pub fn without_codec(mut self, codec: FourCc) -> Self {
        self.codecs.remove(&codec);
        self
    }

    /// Snapshot of what was written to `path`, if it was ever opened.
    pub fn recorded(&self, path: &str) -> Option<RecordedClip> {
        let outputs = self.outputs.lock().ok()?;
        let recording = outputs.get(path)?;
        let clip = recording.lock().ok()?.clone();
        Some(clip)
    }
}

impl VideoBackend for MemoryBackend {
    fn open_source(&self, path: &str) -> Result<Box<dyn VideoSource>> {
        let clip = self
            .inputs
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no clip registered at {path}"))?;
        Ok(Box::new(MemorySource::new(clip)))
    }

    fn open_sink(
        &self,
        path: &str,
        codec: FourCc,
        info: &StreamInfo,
    ) -> Result<Box<dyn VideoSink>> {
        if self.unwritable.contains(path) {
            bail!("{path} is not writable");
        }
        if !self.codecs.contains(&codec) {
            bail!("codec {codec} is not supported");
        }
        let (sink, recording) = MemorySink::new(codec, *info);
        self.outputs
            .lock()
            .map_err(|_| anyhow!("output table lock poisoned"))?
            .insert(path.to_string(), recording);
        Ok(Box::new(sink))
    }
}
