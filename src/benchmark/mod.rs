//! Encodes one input with several ffmpeg codecs and compares time and size.

use anyhow::{bail, Context, Result};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use log::debug;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// An ffmpeg video encoder and the arguments that follow `-c:v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecPreset {
    pub name: &'static str,
    pub args: &'static [&'static str],
}

pub const CODECS: [CodecPreset; 3] = [
    CodecPreset {
        name: "h264",
        args: &["libx264", "-preset", "medium", "-crf", "23"],
    },
    CodecPreset {
        name: "h265",
        args: &["libx265", "-preset", "medium", "-crf", "28"],
    },
    CodecPreset {
        name: "av1",
        args: &["libaom-av1", "-cpu-used", "4", "-crf", "30", "-b:v", "0"],
    },
];

/// Runs a single encode. An `Err` marks the codec as failed.
pub trait Encoder {
    fn encode(&self, input: &Path, codec_args: &[&str], output: &Path) -> Result<()>;
}

/// Spawns `ffmpeg -y -i <input> -c:v <args> <output>` through ffmpeg-sidecar.
pub struct FfmpegEncoder;

impl Encoder for FfmpegEncoder {
    fn encode(&self, input: &Path, codec_args: &[&str], output: &Path) -> Result<()> {
        let mut cmd = FfmpegCommand::new();
        cmd.arg("-y")
            .input(input.to_string_lossy().as_ref())
            .arg("-c:v")
            .args(codec_args)
            .output(output.to_string_lossy().as_ref());
        debug!("running {cmd:?}");

        let mut child = cmd.spawn().context("failed to start ffmpeg")?;
        let mut stderr = String::new();
        for event in child.iter().context("failed to read ffmpeg events")? {
            match event {
                FfmpegEvent::Error(line)
                | FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) => {
                    stderr.push_str(&line);
                    stderr.push('\n');
                }
                _ => {}
            }
        }

        let status = child.wait().context("ffmpeg did not exit cleanly")?;
        if !status.success() {
            bail!("{}", stderr.trim());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodecResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CodecResult {
    pub fn encoded(time: f64, input_bytes: u64, output_bytes: u64) -> Self {
        let ratio = if output_bytes > 0 {
            input_bytes as f64 / output_bytes as f64
        } else {
            0.0
        };
        Self {
            time: Some(time),
            input_mb: Some(input_bytes as f64 / BYTES_PER_MB),
            output_mb: Some(output_bytes as f64 / BYTES_PER_MB),
            ratio: Some(ratio),
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            time: None,
            input_mb: None,
            output_mb: None,
            ratio: None,
            success: false,
            error: Some(error.into()),
        }
    }

    fn stats(&self) -> Option<Stats> {
        match (self.success, self.time, self.output_mb, self.ratio) {
            (true, Some(time), Some(output_mb), Some(ratio)) => Some(Stats {
                time,
                output_mb,
                ratio,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Stats {
    time: f64,
    output_mb: f64,
    ratio: f64,
}

/// Results keyed by codec name, serialized in the order they ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkResults(pub Vec<(String, CodecResult)>);

impl BenchmarkResults {
    pub fn get(&self, codec: &str) -> Option<&CodecResult> {
        self.0.iter().find(|(name, _)| name == codec).map(|(_, r)| r)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn successful(&self) -> Vec<(&str, Stats)> {
        self.0
            .iter()
            .filter_map(|(name, result)| result.stats().map(|s| (name.as_str(), s)))
            .collect()
    }
}

impl Serialize for BenchmarkResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, result)| (name, result)))
    }
}

pub struct CodecBenchmark<E: Encoder> {
    input: PathBuf,
    output_dir: PathBuf,
    codecs: Vec<CodecPreset>,
    encoder: E,
    results: BenchmarkResults,
}

impl<E: Encoder> CodecBenchmark<E> {
    /// Encodes are written to `output_dir/output_<codec>.mp4`.
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, encoder: E) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            codecs: CODECS.to_vec(),
            encoder,
            results: BenchmarkResults::default(),
        }
    }

    pub fn with_codecs(mut self, codecs: Vec<CodecPreset>) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn results(&self) -> &BenchmarkResults {
        &self.results
    }

    pub fn output_path(&self, codec: &str) -> PathBuf {
        self.output_dir.join(format!("output_{codec}.mp4"))
    }

    /// Runs every codec in turn, printing one line per codec.
    ///
    /// A missing input prints a notice and leaves the results empty.
    pub fn run(&mut self, out: &mut impl Write) -> Result<&BenchmarkResults> {
        if !self.input.exists() {
            writeln!(out, "Input file not found: {}", self.input.display())?;
            return Ok(&self.results);
        }

        for preset in self.codecs.clone() {
            let result = self.encode(&preset, out)?;
            match result.stats() {
                Some(s) => writeln!(
                    out,
                    "{}: {:.1}s, {:.1}MB, {:.2}x compression",
                    preset.name, s.time, s.output_mb, s.ratio
                )?,
                None => writeln!(out, "{}: failed", preset.name)?,
            }
            self.results.0.push((preset.name.to_string(), result));
        }
        Ok(&self.results)
    }

    fn encode(&self, preset: &CodecPreset, out: &mut impl Write) -> Result<CodecResult> {
        let output = self.output_path(preset.name);
        writeln!(out, "Testing {}...", preset.name)?;

        let start = Instant::now();
        let encoded = self.encoder.encode(&self.input, preset.args, &output);
        let elapsed = start.elapsed().as_secs_f64();

        Ok(match encoded {
            Ok(()) => CodecResult::encoded(elapsed, file_size(&self.input), file_size(&output)),
            Err(e) => {
                debug!("{} failed: {e:#}", preset.name);
                CodecResult::failed(format!("{e:#}"))
            }
        })
    }

    pub fn print_summary(&self, out: &mut impl Write) -> Result<()> {
        write_summary(&self.results, out)
    }

    pub fn save_results(&self, path: &Path, out: &mut impl Write) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.results)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        writeln!(out, "Results saved to {}", path.display())?;
        Ok(())
    }
}

/// Table of successful encodes followed by the fastest, smallest and
/// best-compressing codec. Ties go to the codec that ran first.
pub fn write_summary(results: &BenchmarkResults, out: &mut impl Write) -> Result<()> {
    let successful = results.successful();
    if successful.is_empty() {
        writeln!(out, "No successful encodings")?;
        return Ok(());
    }

    writeln!(out, "\nSummary:")?;
    writeln!(out, "{:<8} {:<8} {:<10} {:<6}", "Codec", "Time(s)", "Size(MB)", "Ratio")?;
    writeln!(out, "{}", "-".repeat(40))?;
    for (name, s) in &successful {
        writeln!(out, "{name:<8} {:<8.1} {:<10.1} {:<6.2}", s.time, s.output_mb, s.ratio)?;
    }

    let first_best = |cmp: fn(&Stats, &Stats) -> Ordering| {
        successful
            .iter()
            .min_by(|a, b| cmp(&a.1, &b.1))
            .map(|(name, _)| *name)
            .unwrap_or_default()
    };
    let fastest = first_best(|a, b| a.time.total_cmp(&b.time));
    let smallest = first_best(|a, b| a.output_mb.total_cmp(&b.output_mb));
    let best_ratio = first_best(|a, b| b.ratio.total_cmp(&a.ratio));

    writeln!(out, "\nFastest: {fastest}")?;
    writeln!(out, "Smallest: {smallest}")?;
    writeln!(out, "Best compression: {best_ratio}")?;
    Ok(())
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
