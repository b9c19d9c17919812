use std::time::Duration;

/// Receives throughput reports from the frame loop.
pub trait ProgressObserver {
    /// Called every report interval with the running totals.
    fn on_progress(&mut self, frames: u64, elapsed: Duration);

    /// Called once when the stream is exhausted.
    fn on_complete(&mut self, frames: u64, elapsed: Duration);
}

pub fn progress_line(frames: u64, elapsed: Duration) -> String {
    format!("Processed {} frames in {}s", frames, elapsed.as_secs())
}

pub fn summary_line(frames: u64, elapsed: Duration) -> String {
    format!("Completed {} frames in {} seconds", frames, elapsed.as_secs())
}

/// Prints progress and the final summary to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&mut self, frames: u64, elapsed: Duration) {
        println!("{}", progress_line(frames, elapsed));
    }

    fn on_complete(&mut self, frames: u64, elapsed: Duration) {
        println!("{}", summary_line(frames, elapsed));
    }
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressObserver for SilentProgress {
    fn on_progress(&mut self, _frames: u64, _elapsed: Duration) {}

    fn on_complete(&mut self, _frames: u64, _elapsed: Duration) {}
}
