use anyhow::Result;
use clap::Parser;
use cuff_decoder::config::Args;
use cuff_decoder::display::{ConsolePanel, IndicatorPanel, NullPanel};
use cuff_decoder::output::{ConsoleReporter, TraceWriter};
use cuff_decoder::runner::{run_loop, NoopClock, RunLimits, StdClock, TickClock};
use cuff_decoder::sensor::{PressureSensor, ReplaySensor, SyntheticCuff};
use cuff_decoder::stages::MeasurementSession;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();

    let mut max_ticks = None;
    let mut sensor: Box<dyn PressureSensor> = match &args.replay {
        Some(path) => {
            let replay = ReplaySensor::from_path(path)?;
            println!(
                "Replaying {} readings from {}",
                replay.len(),
                path.display()
            );
            max_ticks = Some(replay.len() as u64);
            Box::new(replay)
        }
        None => Box::new(SyntheticCuff::new()),
    };

    let mut session = MeasurementSession::new(args.protocol());
    let mut panel: Box<dyn IndicatorPanel> = if args.quiet {
        Box::new(NullPanel)
    } else {
        Box::new(ConsolePanel)
    };
    let mut sink = ConsoleReporter::new(args.json);
    let mut trace = match &args.trace_output {
        Some(path) => Some(TraceWriter::create(path)?),
        None => None,
    };
    let mut clock: Box<dyn TickClock> = if args.no_sleep || args.replay.is_some() {
        Box::new(NoopClock)
    } else {
        Box::new(StdClock::new(args.tick_period()))
    };

    let stats = run_loop(
        sensor.as_mut(),
        &mut session,
        panel.as_mut(),
        &mut sink,
        clock.as_mut(),
        trace.as_mut(),
        RunLimits {
            cycles: args.cycles,
            max_ticks,
            report_dwell: args.report_dwell(),
        },
    )?;

    println!(
        "Completed {} measurement cycle(s) in {} ticks",
        stats.cycles_completed, stats.ticks
    );
    Ok(())
}
