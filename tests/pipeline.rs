use enhancer_rs::frame::contrast::equalize_lightness;
use enhancer_rs::frame::enhance::{FrameEnhancer, CLAHE_CLIP_LIMIT, CLAHE_TILE_GRID};
use enhancer_rs::frame::ProcessFrame;
use enhancer_rs::pipeline::progress::{progress_line, summary_line};
use enhancer_rs::pipeline::{EnhancePipeline, PipelineState, ProgressObserver, StreamSession};
use enhancer_rs::video::memory::{MemoryBackend, MemoryClip};
use enhancer_rs::video::{FourCc, StreamInfo};
use image::{Rgb, RgbImage};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default, Clone)]
struct RecordingProgress {
    lines: Rc<RefCell<Vec<String>>>,
    progress_counts: Rc<RefCell<Vec<u64>>>,
}

impl ProgressObserver for RecordingProgress {
    fn on_progress(&mut self, frames: u64, elapsed: Duration) {
        self.progress_counts.borrow_mut().push(frames);
        self.lines.borrow_mut().push(progress_line(frames, elapsed));
    }

    fn on_complete(&mut self, frames: u64, elapsed: Duration) {
        self.lines.borrow_mut().push(summary_line(frames, elapsed));
    }
}

fn synthetic_clip(count: usize, width: u32, height: u32, fps: f64) -> MemoryClip {
    let info = StreamInfo { width, height, fps };
    let frames = (0..count)
        .map(|i| {
            RgbImage::from_fn(width, height, |x, y| {
                Rgb([
                    (i * 37 % 256) as u8,
                    (x * 60 + 40) as u8,
                    (y * 70 + 20) as u8,
                ])
            })
        })
        .collect();
    MemoryClip::new(info, frames)
}

fn run(backend: &MemoryBackend, params: Option<(f32, f32, f32)>) -> RecordingProgress {
    let observer = RecordingProgress::default();
    let session = StreamSession::open(backend, "input.mp4", "output.avi", FourCc::XVID).unwrap();
    let mut pipeline = EnhancePipeline::new(session, Box::new(observer.clone()));
    if let Some((h, alpha, beta)) = params {
        pipeline.set_params(h, alpha, beta).unwrap();
    }
    pipeline.process().unwrap();
    assert_eq!(pipeline.state(), PipelineState::Finalized);
    observer
}

#[test]
fn three_frame_clip_round_trips_with_summary() {
    let backend = MemoryBackend::new().with_input("input.mp4", synthetic_clip(3, 2, 2, 30.0));
    let observer = run(&backend, None);

    let recorded = backend.recorded("output.avi").unwrap();
    assert_eq!(recorded.frames.len(), 3);
    assert_eq!(recorded.codec, FourCc::XVID);
    assert_eq!(recorded.info.width, 2);
    assert_eq!(recorded.info.height, 2);
    assert_eq!(recorded.info.fps, 30.0);
    for frame in &recorded.frames {
        assert_eq!(frame.dimensions(), (2, 2));
    }

    let lines = observer.lines.borrow();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("Completed 3 frames"), "{}", lines[0]);
}

#[test]
fn frames_come_out_in_input_order() {
    let clip = synthetic_clip(5, 4, 3, 25.0);
    let backend = MemoryBackend::new().with_input("input.mp4", clip.clone());
    run(&backend, None);

    let recorded = backend.recorded("output.avi").unwrap();
    let mut enhancer = FrameEnhancer::default();
    assert_eq!(recorded.frames.len(), clip.frames.len());
    for (input, output) in clip.frames.iter().zip(&recorded.frames) {
        assert_eq!(&enhancer.process_image(input).unwrap(), output);
    }
}

#[test]
fn progress_reported_every_hundred_frames() {
    let backend = MemoryBackend::new().with_input("input.mp4", synthetic_clip(250, 1, 1, 60.0));
    let observer = run(&backend, Some((0.0, 1.0, 0.0)));

    assert_eq!(*observer.progress_counts.borrow(), vec![100, 200]);
    let lines = observer.lines.borrow();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Processed 100 frames in "));
    assert!(lines[2].starts_with("Completed 250 frames in "));
    assert_eq!(backend.recorded("output.avi").unwrap().frames.len(), 250);
}

#[test]
fn neutral_params_reduce_to_lightness_equalisation() {
    let clip = synthetic_clip(2, 16, 16, 30.0);
    let backend = MemoryBackend::new().with_input("input.mp4", clip.clone());
    run(&backend, Some((0.0, 1.0, 0.0)));

    let recorded = backend.recorded("output.avi").unwrap();
    for (input, output) in clip.frames.iter().zip(&recorded.frames) {
        let expected = equalize_lightness(input, CLAHE_TILE_GRID, CLAHE_CLIP_LIMIT);
        assert_eq!(&expected, output);
    }
}

#[test]
fn empty_input_still_reports_a_summary() {
    let backend = MemoryBackend::new().with_input("input.mp4", synthetic_clip(0, 8, 8, 30.0));
    let observer = run(&backend, None);

    assert_eq!(*observer.lines.borrow(), vec!["Completed 0 frames in 0 seconds".to_string()]);
    let recorded = backend.recorded("output.avi").unwrap();
    assert!(recorded.frames.is_empty());
    assert_eq!(recorded.closes, 1);
}

#[test]
fn decoder_failure_mid_stream_ends_cleanly() {
    let clip = synthetic_clip(6, 2, 2, 30.0).failing_after(4);
    let backend = MemoryBackend::new().with_input("input.mp4", clip);
    let observer = run(&backend, None);

    let recorded = backend.recorded("output.avi").unwrap();
    assert_eq!(recorded.frames.len(), 4);
    assert_eq!(recorded.closes, 1);
    let lines = observer.lines.borrow();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Completed 4 frames in "), "{}", lines[0]);
}
