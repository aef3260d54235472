pub mod config;
pub mod deflation;
pub mod display;
pub mod envelope;
pub mod filter;
pub mod output;
pub mod runner;
pub mod sensor;
pub mod stages;

use serde::Serialize;

/// Calibrated cuff pressure in mmHg-equivalent units, valid range [0, 300].
/// Out-of-range transport readings never reach the core; they surface as
/// `sensor::SensorFault` instead.
pub type PressureSample = f32;

/// The three protocol-visible values of one measurement cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MeasurementResult {
    pub systolic: f32,
    pub diastolic: f32,
    pub heart_rate_bpm: f32,
}

/// Diagnostic counters carried alongside a result for tracing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BeatSummary {
    pub beat_count: u32,
    pub ticks_elapsed: u32,
    pub strongest_amplitude: f32,
    pub strongest_peak_pressure: f32,
}
