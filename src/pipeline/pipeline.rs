use crate::error::EnhanceError;
use crate::frame::enhance::{EnhancementParameters, FrameEnhancer, StageBackend};
use crate::frame::ProcessFrame;
use crate::pipeline::progress::ProgressObserver;
use crate::pipeline::session::StreamSession;
use anyhow::{bail, Result};
use log::{debug, trace, warn};
use std::time::{Duration, Instant};

pub const REPORT_INTERVAL: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Reading,
    Processing,
    Writing,
    Draining,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    pub frames: u64,
    pub elapsed: Duration,
}

/// Reads, enhances and writes every frame of a session, in order.
pub struct EnhancePipeline {
    session: StreamSession,
    enhancer: FrameEnhancer,
    observer: Box<dyn ProgressObserver>,
    state: PipelineState,
    started: bool,
    report_interval: u64,
}

impl EnhancePipeline {
    pub fn new(session: StreamSession, observer: Box<dyn ProgressObserver>) -> Self {
        Self {
            session,
            enhancer: FrameEnhancer::default(),
            observer,
            state: PipelineState::Idle,
            started: false,
            report_interval: REPORT_INTERVAL,
        }
    }

    /// Picks the denoise and CLAHE implementation. Parameters are kept.
    pub fn with_backend(mut self, backend: StageBackend) -> Self {
        self.enhancer = self.enhancer.with_backend(backend);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn params(&self) -> &EnhancementParameters {
        self.enhancer.params()
    }

    /// Overrides strength, gain and bias. Refused once `process` has begun.
    pub fn set_params(&mut self, h: f32, alpha: f32, beta: f32) -> Result<(), EnhanceError> {
        if self.started {
            warn!("ignoring parameter change after processing started");
            return Err(EnhanceError::ParamsLocked);
        }
        self.enhancer.set_params(h, alpha, beta);
        Ok(())
    }

    /// Runs the loop until the input is exhausted, then releases both streams.
    ///
    /// A read error ends the stream the same way exhaustion does. Errors from
    /// the write side are returned; the session is still released on drop.
    pub fn process(&mut self) -> Result<PipelineSummary> {
        if self.started {
            bail!("pipeline has already processed its session");
        }
        self.started = true;

        let start = Instant::now();
        let mut frame_count: u64 = 0;

        loop {
            self.transition(PipelineState::Reading);
            let frame = match self.session.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!("read failed after {frame_count} frames, ending stream: {e:#}");
                    break;
                }
            };

            self.transition(PipelineState::Processing);
            let enhanced = self.enhancer.process_image(&frame)?;

            self.transition(PipelineState::Writing);
            self.session.write_frame(&enhanced)?;
            frame_count += 1;

            if frame_count % self.report_interval == 0 {
                self.observer.on_progress(frame_count, start.elapsed());
            }
            self.transition(PipelineState::Idle);
        }

        self.transition(PipelineState::Draining);
        let elapsed = start.elapsed();
        self.observer.on_complete(frame_count, elapsed);

        self.session.release();
        self.transition(PipelineState::Finalized);
        debug!("finalized after {frame_count} frames in {elapsed:?}");

        Ok(PipelineSummary {
            frames: frame_count,
            elapsed,
        })
    }

    fn transition(&mut self, next: PipelineState) {
        trace!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
