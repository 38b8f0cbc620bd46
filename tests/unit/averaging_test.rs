//! Unit tests for the moving average and the cycling data model.

use ridebridge::metrics::{CyclingDataModel, MovingAverage, MOVING_AVG_SIZE};

/// Truncating mean of the last `MOVING_AVG_SIZE` values.
fn reference_mean(history: &[u16]) -> u16 {
    let window = &history[history.len() - MOVING_AVG_SIZE..];
    (window.iter().map(|&v| v as u32).sum::<u32>() / MOVING_AVG_SIZE as u32) as u16
}

#[test]
fn test_average_matches_window_mean_over_long_run() {
    let mut avg: MovingAverage<MOVING_AVG_SIZE> = MovingAverage::new();
    let mut history = Vec::new();

    // deterministic but irregular sequence
    let mut x: u32 = 17;
    for _ in 0..200 {
        x = (x * 1103 + 12345) % 1500;
        let value = x as u16;
        history.push(value);
        let out = avg.add(value);

        if history.len() < MOVING_AVG_SIZE {
            assert_eq!(out, value);
        } else {
            assert_eq!(out, reference_mean(&history));
        }
    }
}

#[test]
fn test_large_values_do_not_overflow() {
    let mut avg: MovingAverage<MOVING_AVG_SIZE> = MovingAverage::new();
    for _ in 0..MOVING_AVG_SIZE {
        avg.add(u16::MAX);
    }
    assert_eq!(avg.average(), u16::MAX);
}

#[test]
fn test_six_sample_scenario() {
    let mut model = CyclingDataModel::new();
    let samples = [(100, 80), (110, 82), (120, 84), (130, 86), (140, 88), (150, 90)];

    let mut last = None;
    for (p, c) in samples {
        last = Some(model.update(p, c));
    }

    let data = last.unwrap();
    assert_eq!(data.average_power, 125);
    assert_eq!(data.average_cadence, 85);
    assert_eq!(data.instantaneous_power, 150);
    assert_eq!(data.instantaneous_cadence, 90);
}

#[test]
fn test_reset_is_idempotent() {
    let mut model = CyclingDataModel::new();
    model.update(250, 95);
    model.reset();
    let once = model.get();
    model.reset();
    assert_eq!(model.get(), once);
    assert!(!once.data_available);
    assert_eq!(once.average_power, 0);
}
