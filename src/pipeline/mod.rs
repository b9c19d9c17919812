pub mod pipeline;
pub mod progress;
pub mod session;

pub use pipeline::{EnhancePipeline, PipelineState, PipelineSummary};
pub use progress::{ConsoleProgress, ProgressObserver};
pub use session::StreamSession;
