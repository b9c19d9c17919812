use crate::error::EnhanceError;
use clap::Parser;

pub const DEFAULT_INPUT: &str = "input.mp4";
pub const DEFAULT_OUTPUT: &str = "output.avi";

/// `enhancer [input_path] [output_path]`. Every argument is taken as a path.
#[derive(Parser, Debug)]
#[command(name = "enhancer", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    #[arg(default_value = DEFAULT_INPUT, allow_hyphen_values = true)]
    pub input: String,

    #[arg(default_value = DEFAULT_OUTPUT, allow_hyphen_values = true)]
    pub output: String,

    // anything past the two paths is ignored
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

/// Process status for a failed run: -1 when a stream could not be opened, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<EnhanceError>() {
        Some(e) if e.is_open_failure() => -1,
        _ => 1,
    }
}
