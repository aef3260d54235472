use crate::sensor::SensorFault;
use crate::stages::TickOutcome;
use crate::{BeatSummary, MeasurementResult};
use anyhow::{Context, Result};
use chrono::Utc;
use log::trace;
use std::path::Path;

/// Receives each cycle's final values plus optional per-tick diagnostics.
pub trait MeasurementSink {
    fn report(&mut self, result: &MeasurementResult, summary: &BeatSummary);
    fn trace(&mut self, label: &str, value: f32);
}

/// Prints the three values to stdout, optionally followed by the result as
/// one JSON line for downstream tooling.
pub struct ConsoleReporter {
    json: bool,
}

impl ConsoleReporter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl MeasurementSink for ConsoleReporter {
    fn report(&mut self, result: &MeasurementResult, summary: &BeatSummary) {
        println!(
            "[{}] Measurement complete",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        );
        println!("  Systolic:   {:.1}", result.systolic);
        println!("  Diastolic:  {:.1}", result.diastolic);
        println!("  Heart rate: {:.1} bpm", result.heart_rate_bpm);
        println!(
            "  ({} beats over {} ticks, strongest swing {:.1})",
            summary.beat_count, summary.ticks_elapsed, summary.strongest_amplitude
        );
        if self.json {
            // Result shape is stable; serialization of three floats can't fail.
            if let Ok(line) = serde_json::to_string(result) {
                println!("{}", line);
            }
        }
    }

    fn trace(&mut self, label: &str, value: f32) {
        trace!("{} -> {:.3}", label, value);
    }
}

/// Collects reports in memory; test collaborator.
#[derive(Default)]
pub struct RecordingSink {
    pub results: Vec<(MeasurementResult, BeatSummary)>,
}

impl MeasurementSink for RecordingSink {
    fn report(&mut self, result: &MeasurementResult, summary: &BeatSummary) {
        self.results.push((*result, *summary));
    }

    fn trace(&mut self, _label: &str, _value: f32) {}
}

/// Streams one CSV row per tick for offline inspection of a run.
pub struct TraceWriter {
    writer: csv::Writer<std::fs::File>,
}

impl TraceWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating trace directory {}", dir.display()))?;
        }
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating trace file {}", path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(["tick", "stage", "smoothed", "slope", "fault"])?;
        Ok(Self { writer })
    }

    pub fn write_tick(&mut self, tick: u64, outcome: &TickOutcome) -> Result<()> {
        self.writer.write_record(&[
            tick.to_string(),
            format!("{:?}", outcome.stage),
            format!("{:.2}", outcome.smoothed),
            outcome
                .slope
                .map(|s| format!("{:.3}", s))
                .unwrap_or_default(),
            outcome
                .fault
                .map(|f: SensorFault| f.to_string())
                .unwrap_or_default(),
        ])?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
