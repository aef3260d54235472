use crate::PressureSample;
use anyhow::Context;
use std::path::Path;

/// Calibration span of the reference transducer: a 24-bit count in
/// [OUTPUT_MIN, OUTPUT_MAX] maps linearly onto [0, 300] mmHg-equivalent.
pub const OUTPUT_MIN: u32 = 419_430;
pub const OUTPUT_MAX: u32 = 3_774_873;
pub const PRESSURE_MIN: f32 = 0.0;
pub const PRESSURE_MAX: f32 = 300.0;

/// Transient per-tick sensor faults. None is fatal: the tick's sample is
/// skipped and the next tick is a fresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SensorFault {
    #[error("device is busy")]
    Busy,
    #[error("bad memory")]
    MemoryFault,
    #[error("saturated")]
    Saturated,
}

/// One validated pressure reading per tick, or the fault that replaced it.
pub trait PressureSensor {
    fn read_pressure(&mut self) -> Result<PressureSample, SensorFault>;
}

/// Map a raw transducer count onto the calibrated pressure span. The count
/// must lie within [OUTPUT_MIN, OUTPUT_MAX]; `decode_frame` guarantees that.
pub fn counts_to_pressure(counts: u32) -> f32 {
    (counts - OUTPUT_MIN) as f32 * (PRESSURE_MAX - PRESSURE_MIN)
        / (OUTPUT_MAX - OUTPUT_MIN) as f32
        + PRESSURE_MIN
}

/// Decode one reference transport frame: a status byte followed by a 24-bit
/// big-endian compensated pressure count. Status bit 5 is busy, bit 2 a
/// memory fault, bit 0 saturation. Counts outside the calibrated span are
/// reported as `Saturated` (the sensing element pegged), so an out-of-range
/// sample can never reach the state machine.
pub fn decode_frame(frame: &[u8; 4]) -> Result<PressureSample, SensorFault> {
    let status = frame[0];
    if status & (1 << 5) != 0 {
        return Err(SensorFault::Busy);
    }
    if status & (1 << 2) != 0 {
        return Err(SensorFault::MemoryFault);
    }
    if status & 1 != 0 {
        return Err(SensorFault::Saturated);
    }
    let counts = u32::from(frame[1]) << 16 | u32::from(frame[2]) << 8 | u32::from(frame[3]);
    if !(OUTPUT_MIN..=OUTPUT_MAX).contains(&counts) {
        return Err(SensorFault::Saturated);
    }
    Ok(counts_to_pressure(counts))
}

/// Deterministic simulated cuff: ramps up under "pumping", holds, then
/// deflates with heartbeat oscillations riding on the decline, and rests
/// before the next cycle. Stands in for hardware exactly like a recorded
/// patient would.
#[derive(Debug)]
pub struct SyntheticCuff {
    tick: u32,
}

impl SyntheticCuff {
    const INFLATE_TICKS: u32 = 95; // 0 -> ~190 at 2 mmHg per tick
    const HOLD_TICKS: u32 = 30;
    const DEFLATE_TICKS: u32 = 500; // ~190 -> ~20 at 0.34 mmHg per tick
    const REST_TICKS: u32 = 40;
    const BEAT_PERIOD: u32 = 8; // 8 ticks per beat = 75 bpm at 100 ms

    pub fn new() -> Self {
        Self { tick: 0 }
    }

    fn pressure_at(tick: u32) -> f32 {
        let inflate_end = Self::INFLATE_TICKS;
        let hold_end = inflate_end + Self::HOLD_TICKS;
        let deflate_end = hold_end + Self::DEFLATE_TICKS;

        if tick < inflate_end {
            2.0 * tick as f32
        } else if tick < hold_end {
            190.0
        } else if tick < deflate_end {
            let t = tick - hold_end;
            let base = 190.0 - 0.34 * t as f32;
            // Oscillation envelope rises then fades across the deflation,
            // peaking near the middle the way a real pulse envelope does.
            let progress = t as f32 / Self::DEFLATE_TICKS as f32;
            let envelope = 6.0 * (1.0 - (2.0 * progress - 1.0).abs());
            let phase = 2.0 * std::f32::consts::PI * t as f32 / Self::BEAT_PERIOD as f32;
            base + envelope * phase.sin()
        } else {
            5.0
        }
    }
}

impl Default for SyntheticCuff {
    fn default() -> Self {
        Self::new()
    }
}

impl PressureSensor for SyntheticCuff {
    fn read_pressure(&mut self) -> Result<PressureSample, SensorFault> {
        let cycle = Self::INFLATE_TICKS + Self::HOLD_TICKS + Self::DEFLATE_TICKS + Self::REST_TICKS;
        let pressure = Self::pressure_at(self.tick % cycle);
        self.tick += 1;
        Ok(pressure)
    }
}

/// Replays a recorded pressure trace from a CSV file, one reading per row.
/// The first column is either a pressure value or a fault marker
/// (`busy` / `memory` / `saturated`; a blank cell reads as busy). Values
/// outside [0, 300] become `Saturated`, keeping the transport invariant.
pub struct ReplaySensor {
    readings: Vec<Result<PressureSample, SensorFault>>,
    position: usize,
}

impl ReplaySensor {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening replay trace {}", path.display()))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> anyhow::Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut readings = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("reading replay row {}", row + 1))?;
            let cell = record.get(0).unwrap_or("").trim();
            readings.push(Self::parse_cell(cell, row + 1)?);
        }
        Ok(Self {
            readings,
            position: 0,
        })
    }

    fn parse_cell(cell: &str, row: usize) -> anyhow::Result<Result<PressureSample, SensorFault>> {
        let reading = match cell {
            "" | "busy" => Err(SensorFault::Busy),
            "memory" => Err(SensorFault::MemoryFault),
            "saturated" => Err(SensorFault::Saturated),
            value => {
                let pressure: f32 = value
                    .parse()
                    .with_context(|| format!("replay row {}: bad pressure {:?}", row, value))?;
                if (PRESSURE_MIN..=PRESSURE_MAX).contains(&pressure) {
                    Ok(pressure)
                } else {
                    Err(SensorFault::Saturated)
                }
            }
        };
        Ok(reading)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl PressureSensor for ReplaySensor {
    fn read_pressure(&mut self) -> Result<PressureSample, SensorFault> {
        // Past the end of the trace every tick reads as busy; the runner
        // bounds replay runs by the trace length.
        let reading = self
            .readings
            .get(self.position)
            .copied()
            .unwrap_or(Err(SensorFault::Busy));
        self.position += 1;
        reading
    }
}

/// Feeds an explicit list of readings; test harness transport.
pub struct ScriptedSensor {
    readings: std::vec::IntoIter<Result<PressureSample, SensorFault>>,
}

impl ScriptedSensor {
    pub fn new(readings: Vec<Result<PressureSample, SensorFault>>) -> Self {
        Self {
            readings: readings.into_iter(),
        }
    }
}

impl PressureSensor for ScriptedSensor {
    fn read_pressure(&mut self) -> Result<PressureSample, SensorFault> {
        self.readings.next().unwrap_or(Err(SensorFault::Busy))
    }
}
