//! # Reading Module
//!
//! Turns detections into what a tuner display shows: the string label, the
//! measured and target frequencies and how close the two are.

use serde::Serialize;

use crate::tuning::{self, Tuning};
use crate::Detection;

/// Everything a renderer needs for one update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Index of the matched string.
    pub string_index: usize,
    /// Label of the matched string (e.g. "A").
    pub label: String,
    /// Measured frequency in Hz.
    pub frequency_hz: f32,
    /// Target frequency of the matched string in Hz.
    pub reference_hz: f32,
    /// `100 - |f - f_ref| * 100 / f_ref`
    pub percent_in_tune: f32,
    /// Deviation in cents, positive when sharp.
    pub cents_deviation: f32,
}

impl Reading {
    /// Builds a reading for a detected string.
    ///
    /// # Returns
    /// * `None` - `detection` is `NoSignal`, or its index is not in `tuning`
    pub fn from_detection(tuning: &Tuning, detection: &Detection) -> Option<Self> {
        let Detection::Detected {
            string_index,
            frequency_hz,
        } = *detection
        else {
            return None;
        };
        let reference = tuning.get(string_index)?;
        Some(Self {
            string_index,
            label: reference.label.clone(),
            frequency_hz,
            reference_hz: reference.frequency,
            percent_in_tune: tuning::percent_in_tune(frequency_hz, reference.frequency),
            cents_deviation: tuning::calculate_cents_deviation(frequency_hz, reference.frequency),
        })
    }
}

/// What the display is currently showing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Display {
    /// Nothing detected yet; the gauge is drawn full with a placeholder.
    #[default]
    Idle,
    /// The most recent accepted reading.
    Tuning(Reading),
}

impl Display {
    /// Gauge fill for the display, in percent.
    pub fn percent(&self) -> f32 {
        match self {
            Display::Idle => 100.0,
            Display::Tuning(reading) => reading.percent_in_tune,
        }
    }

    /// Applies a detection. A new reading replaces the old one; `NoSignal`
    /// leaves the display as it was.
    pub fn update(&mut self, tuning: &Tuning, detection: &Detection) -> bool {
        match Reading::from_detection(tuning, detection) {
            Some(reading) => {
                *self = Display::Tuning(reading);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::STANDARD;

    #[test]
    fn reading_for_slightly_flat_a() {
        let detection = Detection::Detected {
            string_index: 1,
            frequency_hz: 108.0,
        };
        let reading = Reading::from_detection(&STANDARD, &detection).unwrap();
        assert_eq!(reading.label, "A");
        assert_eq!(reading.reference_hz, 110.0);
        assert!((reading.percent_in_tune - (100.0 - 200.0 / 110.0)).abs() < 1e-4);
        assert!(reading.cents_deviation < -30.0 && reading.cents_deviation > -33.0);
    }

    #[test]
    fn no_reading_without_detection() {
        assert_eq!(Reading::from_detection(&STANDARD, &Detection::NoSignal), None);
        let out_of_range = Detection::Detected {
            string_index: 6,
            frequency_hz: 100.0,
        };
        assert_eq!(Reading::from_detection(&STANDARD, &out_of_range), None);
    }

    #[test]
    fn display_keeps_last_reading_through_silence() {
        let mut display = Display::default();
        assert_eq!(display.percent(), 100.0);

        assert!(!display.update(&STANDARD, &Detection::NoSignal));
        assert_eq!(display, Display::Idle);

        let detection = Detection::Detected {
            string_index: 5,
            frequency_hz: 329.0,
        };
        assert!(display.update(&STANDARD, &detection));
        assert!(!display.update(&STANDARD, &Detection::NoSignal));
        match &display {
            Display::Tuning(reading) => assert_eq!(reading.frequency_hz, 329.0),
            Display::Idle => panic!("display should hold the last reading"),
        }
        assert!(display.percent() > 99.0);
    }
}
