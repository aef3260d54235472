use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Decode systolic/diastolic pressure and heart rate from an oscillometric cuff
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Replay a recorded pressure trace from a CSV file instead of the simulated cuff
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// CSV file to stream per-tick diagnostics into (tick, stage, smoothed, slope, fault)
    #[arg(long)]
    pub trace_output: Option<PathBuf>,

    /// Also emit each final measurement as a JSON line
    #[arg(long)]
    pub json: bool,

    /// Number of measurement cycles to complete before exiting
    #[arg(long, default_value = "1")]
    pub cycles: u32,

    /// Skip the inter-tick delay and report dwell (replay and testing)
    #[arg(long)]
    pub no_sleep: bool,

    /// Suppress indicator panel output
    #[arg(long)]
    pub quiet: bool,

    /// Sampling tick duration in seconds
    #[arg(long, default_value = "0.1")]
    pub tick_seconds: f32,

    /// Smoothed pressure that ends the inflation stage
    #[arg(long, default_value = "170.0")]
    pub inflate_target: f32,

    /// Smoothed pressure below which deflation analysis ends
    #[arg(long, default_value = "50.0")]
    pub deflate_floor: f32,

    /// Seconds to dwell on the report before the next cycle starts
    #[arg(long, default_value = "10.0")]
    pub report_dwell_seconds: f32,
}

impl Args {
    pub fn protocol(&self) -> ProtocolConfig {
        ProtocolConfig {
            tick_seconds: self.tick_seconds,
            inflate_exit: self.inflate_target,
            deflate_exit: self.deflate_floor,
            ..ProtocolConfig::default()
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f32(self.tick_seconds)
    }

    pub fn report_dwell(&self) -> Duration {
        Duration::from_secs_f32(self.report_dwell_seconds)
    }
}

/// Thresholds and timing of the five-stage inflate/hold/deflate protocol.
///
/// All pressures are smoothed mmHg-equivalent values; the state machine is
/// level-triggered on the filtered signal, never on raw samples.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Fixed sampling period in seconds.
    pub tick_seconds: f32,
    /// Idle exits (cuff is being pumped) above this pressure.
    pub idle_exit: f32,
    /// Inflating exits into Hold above this pressure.
    pub inflate_exit: f32,
    /// Inflation progress segments light up as these are crossed.
    pub inflate_thresholds: [f32; 5],
    /// Hold exits once its tick counter passes this value.
    pub hold_ticks: u32,
    /// Deflating exits into Report below this pressure.
    pub deflate_exit: f32,
    /// Deflation rate above this (mmHg per second) is too fast.
    pub rate_too_fast: f32,
    /// Deflation rate below this is too slow.
    pub rate_too_slow: f32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 0.1,
            idle_exit: 30.0,
            inflate_exit: 170.0,
            inflate_thresholds: [30.0, 70.0, 100.0, 130.0, 160.0],
            hold_ticks: 20,
            deflate_exit: 50.0,
            rate_too_fast: 5.0,
            rate_too_slow: 1.0,
        }
    }
}

impl ProtocolConfig {
    /// Number of inflation progress segments lit at a given smoothed pressure.
    pub fn progress_segments(&self, smoothed: f32) -> u8 {
        self.inflate_thresholds
            .iter()
            .filter(|&&t| smoothed > t)
            .count() as u8
    }

    pub fn total_segments(&self) -> u8 {
        self.inflate_thresholds.len() as u8
    }
}
