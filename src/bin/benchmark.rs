use anyhow::Result;
use clap::Parser;
use enhancer_rs::benchmark::{CodecBenchmark, FfmpegEncoder};
use ffmpeg_sidecar::command::ffmpeg_is_installed;
use std::io;
use std::path::Path;
use std::process::ExitCode;

/// Compare h264, h265 and AV1 encodes of one file.
#[derive(Parser, Debug)]
#[command(name = "benchmark")]
struct Args {
    #[arg(default_value = "input.mp4")]
    input: String,

    /// Write the results to results.json
    #[arg(long)]
    save: bool,
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if !ffmpeg_is_installed() {
        println!("FFmpeg not found");
        return Ok(ExitCode::FAILURE);
    }

    let mut stdout = io::stdout().lock();
    let mut benchmark = CodecBenchmark::new(&args.input, ".", FfmpegEncoder);
    benchmark.run(&mut stdout)?;
    benchmark.print_summary(&mut stdout)?;

    if args.save {
        benchmark.save_results(Path::new("results.json"), &mut stdout)?;
    }

    Ok(ExitCode::SUCCESS)
}
