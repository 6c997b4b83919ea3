//! # Cycle Driver
//!
//! Optional host-side loop that runs the analyzer on a fixed cadence. The
//! analysis itself stays a plain function call; this module only owns the
//! timing and the "current string" carried between cycles.
//!
//! ## Architecture
//! - **Input**: frames arrive on a crossbeam channel; only the newest is kept
//! - **Worker thread**: analyses the newest frame once per period
//! - **Output**: one [`CycleUpdate`] per analysed frame on an unbounded channel
//! - **Shutdown**: explicit, on drop, or when the input channel disconnects

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::reading::Display;
use crate::{Analyzer, CycleOutcome};

/// Default analysis cadence.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(250);

/// Published after every analysed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleUpdate {
    /// Sequence number of the cycle, starting at 0.
    pub cycle: u64,
    /// Raw outcome of the analysis.
    pub outcome: CycleOutcome,
    /// Display state after applying the outcome.
    pub display: Display,
}

/// Handle to the driver's worker thread.
#[derive(Debug)]
pub struct CycleDriver {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

/// State carried from one cycle to the next.
struct CycleState {
    cycle: u64,
    current_string: Option<usize>,
    display: Display,
}

impl CycleDriver {
    /// Spawns the worker thread.
    ///
    /// # Arguments
    /// * `analyzer` - Analyzer to run each cycle
    /// * `sample_rate` - Sample rate of the incoming frames in Hz
    /// * `period` - Time between cycles
    /// * `frames` - Source of sample buffers
    ///
    /// # Returns
    /// * The driver handle and the receiver for cycle updates
    pub fn spawn(
        analyzer: Analyzer,
        sample_rate: f32,
        period: Duration,
        frames: Receiver<Vec<f32>>,
    ) -> (Self, Receiver<CycleUpdate>) {
        let (updates_tx, updates_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let thread_handle = thread::spawn(move || {
            log::info!("[DRIVER] Starting, period {:?} at {} Hz", period, sample_rate);
            let ticker = crossbeam_channel::tick(period);
            let mut latest: Option<Vec<f32>> = None;
            let mut state = CycleState {
                cycle: 0,
                current_string: None,
                display: Display::Idle,
            };

            loop {
                crossbeam_channel::select! {
                    recv(frames) -> msg => match msg {
                        Ok(frame) => latest = Some(frame),
                        Err(_) => {
                            log::info!("[DRIVER] Input channel closed");
                            // Flush the frame that arrived after the last tick.
                            if let Some(frame) = latest.take() {
                                run_cycle(&analyzer, &frame, sample_rate, &mut state, &updates_tx);
                            }
                            break;
                        }
                    },
                    recv(ticker) -> _ => {
                        let Some(frame) = latest.take() else {
                            continue;
                        };
                        if !run_cycle(&analyzer, &frame, sample_rate, &mut state, &updates_tx) {
                            log::info!("[DRIVER] Update receiver dropped");
                            break;
                        }
                    },
                    recv(shutdown_rx) -> _ => {
                        log::info!("[DRIVER] Received shutdown signal");
                        break;
                    },
                }
            }
            log::info!("[DRIVER] Finished after {} cycles", state.cycle);
        });

        (
            Self {
                shutdown_tx,
                thread_handle: Some(thread_handle),
            },
            updates_rx,
        )
    }

    /// Stops the worker and waits for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    /// Waits for the worker to exit on its own, e.g. after the input closed.
    pub fn join(mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[DRIVER] Worker thread panicked");
            }
        }
    }

    fn stop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            // The worker may already be gone; then there is nobody to signal.
            let _ = self.shutdown_tx.try_send(());
            if handle.join().is_err() {
                log::error!("[DRIVER] Worker thread panicked");
            }
        }
    }
}

impl Drop for CycleDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Analyses one frame and publishes the update.
///
/// Returns false once nobody is listening for updates. Invalid frames are
/// logged and skipped without advancing the cycle counter.
fn run_cycle(
    analyzer: &Analyzer,
    frame: &[f32],
    sample_rate: f32,
    state: &mut CycleState,
    updates_tx: &Sender<CycleUpdate>,
) -> bool {
    let outcome = match analyzer.analyze_cycle(frame, sample_rate, state.current_string) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("[DRIVER] Skipping frame of {} samples: {}", frame.len(), e);
            return true;
        }
    };
    state.current_string = outcome.current_string;
    state.display.update(analyzer.tuning(), &outcome.detection);

    let update = CycleUpdate {
        cycle: state.cycle,
        outcome,
        display: state.display.clone(),
    };
    state.cycle += 1;
    updates_tx.send(update).is_ok()
}
