//! Cycle driver tests: frames in over a channel, updates out

use std::time::Duration;

use tuner_core::driver::{CycleDriver, CycleUpdate};
use tuner_core::reading::Display;
use tuner_core::{Analyzer, Detection};

const PERIOD: Duration = Duration::from_millis(5);
const WAIT: Duration = Duration::from_secs(5);

fn a_string_frame() -> Vec<f32> {
    (0..2048)
        .map(|i| 0.1 + 0.5 * (2.0 * std::f32::consts::PI * 110.0 * i as f32 / 44_100.0).sin())
        .collect()
}

#[test]
fn last_frame_is_flushed_when_input_closes() {
    let (frames_tx, frames_rx) = crossbeam_channel::unbounded();
    let (driver, updates) = CycleDriver::spawn(Analyzer::default(), 44_100.0, PERIOD, frames_rx);

    frames_tx.send(a_string_frame()).unwrap();
    drop(frames_tx);
    driver.join();

    let received: Vec<CycleUpdate> = updates.iter().collect();
    assert_eq!(received.len(), 1);
    let update = &received[0];
    assert_eq!(update.cycle, 0);
    assert_eq!(update.outcome.detection.string_index(), Some(1));
    match &update.display {
        Display::Tuning(reading) => assert_eq!(reading.label, "A"),
        Display::Idle => panic!("expected a reading"),
    }
}

#[test]
fn silence_keeps_string_and_display() {
    let (frames_tx, frames_rx) = crossbeam_channel::unbounded();
    let (driver, updates) = CycleDriver::spawn(Analyzer::default(), 44_100.0, PERIOD, frames_rx);

    frames_tx.send(a_string_frame()).unwrap();
    let first = updates.recv_timeout(WAIT).unwrap();

    frames_tx.send(vec![0.0; 2048]).unwrap();
    let second = updates.recv_timeout(WAIT).unwrap();

    assert_eq!(second.cycle, first.cycle + 1);
    assert_eq!(second.outcome.detection, Detection::NoSignal);
    assert_eq!(second.outcome.current_string, Some(1));
    assert_eq!(second.display, first.display);

    driver.shutdown();
}

#[test]
fn invalid_frames_are_skipped() {
    let (frames_tx, frames_rx) = crossbeam_channel::unbounded();
    let (driver, updates) = CycleDriver::spawn(Analyzer::default(), 44_100.0, PERIOD, frames_rx);

    frames_tx.send(vec![0.5; 16]).unwrap();
    frames_tx.send(a_string_frame()).unwrap();
    drop(frames_tx);
    driver.join();

    let received: Vec<CycleUpdate> = updates.iter().collect();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].cycle, 0);
    assert_eq!(received[0].outcome.detection.string_index(), Some(1));
}

#[test]
fn shutdown_stops_an_idle_driver() {
    let (_frames_tx, frames_rx) = crossbeam_channel::unbounded::<Vec<f32>>();
    let (driver, updates) = CycleDriver::spawn(Analyzer::default(), 44_100.0, PERIOD, frames_rx);

    driver.shutdown();
    assert!(updates.recv_timeout(WAIT).is_err());
}
