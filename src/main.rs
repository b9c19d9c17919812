use anyhow::Result;
use clap::Parser;
use enhancer_rs::cli::{exit_code, Cli};
use enhancer_rs::frame::enhance::{StageBackend, DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_STRENGTH};
use enhancer_rs::pipeline::{ConsoleProgress, EnhancePipeline, StreamSession};
use enhancer_rs::video::opencv_io::OpenCvBackend;
use enhancer_rs::video::FourCc;
use log::{debug, info};

fn run(cli: &Cli) -> Result<()> {
    let session = StreamSession::open(&OpenCvBackend, &cli.input, &cli.output, FourCc::XVID)?;
    info!("{} -> {} ({:?})", cli.input, cli.output, session.info());

    let mut pipeline = EnhancePipeline::new(session, Box::new(ConsoleProgress))
        .with_backend(StageBackend::OpenCv);
    pipeline.set_params(DEFAULT_STRENGTH, DEFAULT_ALPHA, DEFAULT_BETA)?;
    pipeline.process()?;

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    if !cli.rest.is_empty() {
        debug!("ignoring extra arguments: {:?}", cli.rest);
    }

    if let Err(e) = run(&cli) {
        eprintln!("{e}");
        std::process::exit(exit_code(&e));
    }
}
