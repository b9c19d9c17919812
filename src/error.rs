use thiserror::Error;

/// Failures the pipeline reports with a dedicated kind.
#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("Cannot open input: {0}")]
    InputOpen(String),

    #[error("Cannot open output: {0}")]
    OutputOpen(String),

    #[error("enhancement parameters are locked once processing has started")]
    ParamsLocked,

    #[error("frame is {got_width}x{got_height}, stream expects {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },
}

impl EnhanceError {
    /// True for the two session-opening failures that end the program with status -1.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, EnhanceError::InputOpen(_) | EnhanceError::OutputOpen(_))
    }
}
