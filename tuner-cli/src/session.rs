//! Runs a decoded recording through the analyzer the way a live host would:
//! once per period, analyse the most recent `buffer_size` samples.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tuner_core::driver::{CycleDriver, CycleUpdate};
use tuner_core::reading::Display;
use tuner_core::Analyzer;

/// Cadence and buffer length shared by both run modes.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub buffer_size: usize,
    pub period: Duration,
}

/// Checks that every buffer the schedule cuts can be analysed.
///
/// # Errors
/// * The period is zero
/// * `buffer_size` does not exceed the lowest string's lag at `sample_rate`
pub fn check_schedule(analyzer: &Analyzer, sample_rate: u32, schedule: Schedule) -> Result<()> {
    anyhow::ensure!(!schedule.period.is_zero(), "analysis period must be non-zero");
    let required = analyzer.tuning().max_lag(sample_rate as f32);
    anyhow::ensure!(
        schedule.buffer_size > required,
        "buffer size {} is too short at {} Hz, need more than {} samples",
        schedule.buffer_size,
        sample_rate,
        required
    );
    Ok(())
}

/// End offsets (exclusive) of the buffers analysed at each period tick.
///
/// Ticks before a full buffer has been "recorded" are skipped, as are ticks
/// past the end of the recording.
pub fn cycle_ends(total_samples: usize, sample_rate: u32, schedule: Schedule) -> Vec<usize> {
    let hop = (schedule.period.as_secs_f64() * sample_rate as f64).round() as usize;
    if hop == 0 {
        return Vec::new();
    }
    (1..)
        .map(|tick| tick * hop)
        .take_while(|&end| end <= total_samples)
        .filter(|&end| end >= schedule.buffer_size)
        .collect()
}

/// Analyses the whole recording without waiting, in cycle order.
pub fn run_offline(
    analyzer: &Analyzer,
    samples: &[f32],
    sample_rate: u32,
    schedule: Schedule,
) -> Result<Vec<CycleUpdate>> {
    check_schedule(analyzer, sample_rate, schedule)?;
    let mut current_string = None;
    let mut display = Display::Idle;
    let mut updates = Vec::new();

    for (cycle, end) in cycle_ends(samples.len(), sample_rate, schedule)
        .into_iter()
        .enumerate()
    {
        let frame = &samples[end - schedule.buffer_size..end];
        let outcome = analyzer
            .analyze_cycle(frame, sample_rate as f32, current_string)
            .with_context(|| format!("analysis failed at sample {}", end))?;
        current_string = outcome.current_string;
        display.update(analyzer.tuning(), &outcome.detection);
        updates.push(CycleUpdate {
            cycle: cycle as u64,
            outcome,
            display: display.clone(),
        });
    }
    Ok(updates)
}

/// Streams the recording into a [`CycleDriver`] at wall-clock speed and
/// hands every update to `on_update` as it arrives.
pub fn run_realtime(
    analyzer: Analyzer,
    samples: Vec<f32>,
    sample_rate: u32,
    schedule: Schedule,
    mut on_update: impl FnMut(&CycleUpdate) -> Result<()>,
) -> Result<()> {
    check_schedule(&analyzer, sample_rate, schedule)?;
    let (frames_tx, frames_rx) = crossbeam_channel::bounded::<Vec<f32>>(4);
    let (driver, updates) =
        CycleDriver::spawn(analyzer, sample_rate as f32, schedule.period, frames_rx);

    let feeder = std::thread::spawn(move || {
        let frame_time = Duration::from_secs_f64(schedule.buffer_size as f64 / sample_rate as f64);
        let start = Instant::now();
        for (i, frame) in samples.chunks_exact(schedule.buffer_size).enumerate() {
            let due = start + frame_time * (i as u32 + 1);
            if let Some(wait) = due.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
            // The driver only wants the newest frame; dropping one is fine.
            if frames_tx.try_send(frame.to_vec()).is_err() {
                log::debug!("[FEEDER] Driver busy, dropped frame {}", i);
            }
        }
        log::info!("[FEEDER] End of recording");
    });

    for update in updates.iter() {
        on_update(&update)?;
    }

    driver.join();
    if feeder.join().is_err() {
        log::error!("[FEEDER] Feeder thread panicked");
        anyhow::bail!("feeder thread panicked");
    }
    Ok(())
}
