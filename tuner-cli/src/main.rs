//! # tuner-cli - Guitar Tuner Command Line Host
//!
//! Feeds a WAV recording through the tuner core and prints one line per
//! analysis cycle, the way a live tuner would refresh its display.
//!
//! ## Architecture
//! - **Offline mode** (default): every period, analyse the newest buffer of
//!   the recording, as fast as possible
//! - **Realtime mode**: a feeder thread streams buffers at wall-clock speed
//!   into the core's cycle driver
//! - **Output**: human-readable lines, or JSON lines with `--json`

mod session;
mod wav;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tuner_core::driver::{CycleUpdate, DEFAULT_PERIOD};
use tuner_core::reading::Display;
use tuner_core::{Analyzer, DetectorConfig, GateMode};

use session::Schedule;

/// Samples per analysis buffer.
const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Detect guitar strings and their pitch in a WAV recording
#[derive(Parser, Debug)]
#[command(name = "tuner-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// WAV file to analyse
    input: PathBuf,

    /// Samples per analysis buffer
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Milliseconds between analysis cycles
    #[arg(long, default_value_t = DEFAULT_PERIOD.as_millis() as u64)]
    period_ms: u64,

    /// JSON file with detector settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Level measure used by the silence gate
    #[arg(long, value_enum)]
    gate: Option<GateArg>,

    /// Gate threshold
    #[arg(long)]
    threshold: Option<f32>,

    /// Enable the sub-harmonic guard with this tolerance (e.g. 0.05)
    #[arg(long)]
    subharmonic_tolerance: Option<f32>,

    /// Print one JSON object per cycle
    #[arg(long)]
    json: bool,

    /// Stream the file at wall-clock speed through the cycle driver
    #[arg(long)]
    realtime: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GateArg {
    SignedMean,
    MeanAbsolute,
    Rms,
}

impl From<GateArg> for GateMode {
    fn from(arg: GateArg) -> Self {
        match arg {
            GateArg::SignedMean => GateMode::SignedMean,
            GateArg::MeanAbsolute => GateMode::MeanAbsolute,
            GateArg::Rms => GateMode::Rms,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let analyzer = Analyzer::with_config(config).context("invalid detector settings")?;
    let audio = wav::load_wav(&cli.input)?;
    let schedule = Schedule {
        buffer_size: cli.buffer_size,
        period: Duration::from_millis(cli.period_ms),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let json = cli.json;

    if cli.realtime {
        session::run_realtime(analyzer, audio.samples, audio.sample_rate, schedule, |update| {
            print_update(&mut out, update, schedule.period, json)
        })?;
    } else {
        let updates = session::run_offline(&analyzer, &audio.samples, audio.sample_rate, schedule)?;
        log::info!("Analysed {} cycles", updates.len());
        for update in &updates {
            print_update(&mut out, update, schedule.period, json)?;
        }
    }
    Ok(())
}

/// Default config, then the JSON file, then individual flags.
fn build_config(cli: &Cli) -> Result<DetectorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            DetectorConfig::from_json_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => DetectorConfig::default(),
    };
    if let Some(gate) = cli.gate {
        config.gate_mode = gate.into();
    }
    if let Some(threshold) = cli.threshold {
        config.amplitude_threshold = threshold;
    }
    if cli.subharmonic_tolerance.is_some() {
        config.subharmonic_tolerance = cli.subharmonic_tolerance;
    }
    Ok(config)
}

fn print_update(
    out: &mut impl Write,
    update: &CycleUpdate,
    period: Duration,
    json: bool,
) -> Result<()> {
    if json {
        serde_json::to_writer(&mut *out, update)?;
        writeln!(out)?;
        return Ok(());
    }
    writeln!(out, "{}", format_update(update, period))?;
    Ok(())
}

/// One human-readable line: cycle time, what was heard, what is displayed.
fn format_update(update: &CycleUpdate, period: Duration) -> String {
    let seconds = period.as_secs_f64() * (update.cycle + 1) as f64;
    let heard = match update.outcome.detection.frequency_hz() {
        Some(freq) => format!("{:>6.1} Hz", freq),
        None => "     - Hz".to_string(),
    };
    let shown = match &update.display {
        Display::Idle => "waiting for a string".to_string(),
        Display::Tuning(reading) => format!(
            "{} of {:.1} Hz  {:5.1}%  {:+6.1} cents",
            reading.label, reading.reference_hz, reading.percent_in_tune, reading.cents_deviation
        ),
    };
    format!("{:7.2}s  {}  {}", seconds, heard, shown)
}
