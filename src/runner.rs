use crate::display::IndicatorPanel;
use crate::output::{MeasurementSink, TraceWriter};
use crate::sensor::PressureSensor;
use crate::stages::MeasurementSession;
use anyhow::Result;
use log::info;
use std::time::Duration;

/// Host-supplied blocking waits: the 100 ms sampling cadence and the report
/// dwell. The session itself never sleeps.
pub trait TickClock {
    fn sleep_until_next_tick(&mut self);
    fn dwell(&mut self, duration: Duration);
}

/// Wall-clock waits via thread sleep.
pub struct StdClock {
    period: Duration,
}

impl StdClock {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl TickClock for StdClock {
    fn sleep_until_next_tick(&mut self) {
        std::thread::sleep(self.period);
    }

    fn dwell(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Never waits; replay and test runs.
pub struct NoopClock;

impl TickClock for NoopClock {
    fn sleep_until_next_tick(&mut self) {}
    fn dwell(&mut self, _duration: Duration) {}
}

/// Stop conditions and report dwell for one run.
pub struct RunLimits {
    /// Stop after this many completed cycles.
    pub cycles: u32,
    /// Hard tick cap, for bounded inputs like replay traces.
    pub max_ticks: Option<u64>,
    /// How long the report stays up before the next cycle.
    pub report_dwell: Duration,
}

pub struct RunStats {
    pub ticks: u64,
    pub cycles_completed: u32,
}

/// The single-threaded measurement loop: one sensor read, one session tick,
/// then collaborator I/O, once per sampling period.
pub fn run_loop(
    sensor: &mut dyn PressureSensor,
    session: &mut MeasurementSession,
    panel: &mut dyn IndicatorPanel,
    sink: &mut dyn MeasurementSink,
    clock: &mut dyn TickClock,
    mut trace: Option<&mut TraceWriter>,
    limits: RunLimits,
) -> Result<RunStats> {
    let mut ticks = 0u64;
    let mut cycles_completed = 0u32;

    loop {
        if let Some(cap) = limits.max_ticks {
            if ticks >= cap {
                break;
            }
        }

        let reading = sensor.read_pressure();
        let outcome = session.tick(reading);
        ticks += 1;

        if let Some(visual) = outcome.visual {
            panel.set_pattern(visual);
        }
        if let Some(slope) = outcome.slope {
            sink.trace("slope", slope);
        }
        if let Some(writer) = trace.as_deref_mut() {
            writer.write_tick(ticks, &outcome)?;
        }

        if let (Some(result), Some(summary)) = (outcome.result, outcome.summary) {
            sink.report(&result, &summary);
            cycles_completed += 1;
            if cycles_completed >= limits.cycles {
                break;
            }
            // The report stays visible for the dwell before the cycle wraps.
            clock.dwell(limits.report_dwell);
        }

        clock.sleep_until_next_tick();
    }

    if let Some(writer) = trace.as_deref_mut() {
        writer.flush()?;
    }
    info!("run finished: {} ticks, {} cycles", ticks, cycles_completed);
    Ok(RunStats {
        ticks,
        cycles_completed,
    })
}
