pub mod benchmark;
pub mod cli;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod utils;
pub mod video;

pub use error::EnhanceError;
