use crate::config::ProtocolConfig;
use crate::deflation::{DeflationClassifier, RateClass};
use crate::display::StageVisual;
use crate::envelope::BeatTracker;
use crate::filter::MovingAverageFilter;
use crate::sensor::SensorFault;
use crate::{BeatSummary, MeasurementResult, PressureSample};
use log::{debug, info, warn};

/// The five stages of a measurement cycle, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle = 1,
    Inflating = 2,
    Hold = 3,
    Deflating = 4,
    Report = 5,
}

/// Everything one tick produced. `visual` is present only when the pattern
/// differs from the last one emitted; `result` and `summary` appear together
/// on the single tick that enters Report.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub stage: Stage,
    pub smoothed: f32,
    pub slope: Option<f32>,
    pub visual: Option<StageVisual>,
    pub result: Option<MeasurementResult>,
    pub summary: Option<BeatSummary>,
    pub fault: Option<SensorFault>,
}

/// One measurement cycle's worth of state: the stage, the signal filter, the
/// deflation-rate history, and the beat tracker. Single owner of all of it;
/// one `tick` call per 100 ms sample, no other entry points mutate state.
pub struct MeasurementSession {
    config: ProtocolConfig,
    stage: Stage,
    filter: MovingAverageFilter,
    deflation: DeflationClassifier,
    tracker: BeatTracker,
    smoothed: f32,
    previous_pressure: f32,
    hold_ticks: u32,
    flash_on: bool,
    progress_lit: u8,
    last_visual: Option<StageVisual>,
}

impl MeasurementSession {
    pub fn new(config: ProtocolConfig) -> Self {
        let deflation = DeflationClassifier::new(config.rate_too_fast, config.rate_too_slow);
        Self {
            config,
            stage: Stage::Idle,
            filter: MovingAverageFilter::new(),
            deflation,
            tracker: BeatTracker::new(),
            smoothed: 0.0,
            previous_pressure: 0.0,
            hold_ticks: 0,
            flash_on: false,
            progress_lit: 0,
            last_visual: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    /// Advance the cycle by one sampling tick. A faulted reading skips the
    /// tick entirely: filter, history, counters, and stage are untouched.
    pub fn tick(&mut self, reading: Result<PressureSample, SensorFault>) -> TickOutcome {
        let raw = match reading {
            Ok(sample) => sample,
            Err(fault) => {
                warn!("sensor fault, skipping tick: {}", fault);
                return TickOutcome {
                    stage: self.stage,
                    smoothed: self.smoothed,
                    slope: None,
                    visual: None,
                    result: None,
                    summary: None,
                    fault: Some(fault),
                };
            }
        };

        let smoothed = self.filter.push(raw);
        self.smoothed = smoothed;
        let mut visual = None;
        let mut slope = None;
        let mut result = None;
        let mut summary = None;

        match self.stage {
            Stage::Idle => {
                visual = self.emit(StageVisual::Standby);
                if smoothed > self.config.idle_exit {
                    self.advance(Stage::Inflating);
                    self.progress_lit = 1;
                    visual = self.emit(StageVisual::InflateProgress {
                        lit: 1,
                        total: self.config.total_segments(),
                    });
                }
            }
            Stage::Inflating => {
                // Progress only reveals; dipping back under a threshold
                // never turns a segment off within the stage.
                let lit = self.config.progress_segments(smoothed);
                if lit > self.progress_lit {
                    self.progress_lit = lit;
                    visual = self.emit(StageVisual::InflateProgress {
                        lit,
                        total: self.config.total_segments(),
                    });
                }
                if smoothed > self.config.inflate_exit {
                    self.advance(Stage::Hold);
                    self.hold_ticks = 0;
                    self.flash_on = false;
                }
            }
            Stage::Hold => {
                self.flash_on = !self.flash_on;
                visual = self.emit(StageVisual::HoldFlash { on: self.flash_on });
                // Seed the rate classifier with ~1 s of pre-deflation history.
                self.deflation.record(smoothed);
                if self.hold_ticks > self.config.hold_ticks {
                    self.advance(Stage::Deflating);
                    self.tracker.reset();
                    self.previous_pressure = smoothed;
                    visual = self.emit(StageVisual::DeflateRate(RateClass::Good));
                } else {
                    self.hold_ticks += 1;
                }
            }
            Stage::Deflating => {
                let class = self.deflation.classify(smoothed);
                visual = self.emit(StageVisual::DeflateRate(class));
                let s = smoothed - self.previous_pressure;
                slope = Some(s);
                if let Some(event) = self.tracker.observe(smoothed, self.previous_pressure) {
                    debug!("beat event at {:.1}: {:?}", smoothed, event);
                }
                self.previous_pressure = smoothed;
                if smoothed < self.config.deflate_exit {
                    self.advance(Stage::Report);
                    let (r, sum) = self.finish();
                    info!(
                        "cycle complete: systolic {:.1}, diastolic {:.1}, {:.1} bpm over {} beats",
                        r.systolic, r.diastolic, r.heart_rate_bpm, sum.beat_count
                    );
                    result = Some(r);
                    summary = Some(sum);
                    visual = self.emit(StageVisual::ReportReady);
                }
            }
            Stage::Report => {
                // One pass only: the next tick wraps the cycle around.
                self.reset_cycle();
                self.advance(Stage::Idle);
                visual = self.emit(StageVisual::Standby);
            }
        }

        TickOutcome {
            stage: self.stage,
            smoothed,
            slope,
            visual,
            result,
            summary,
            fault: None,
        }
    }

    fn finish(&self) -> (MeasurementResult, BeatSummary) {
        let summary = self.tracker.summary();
        let systolic = self.tracker.systolic().unwrap_or(0.0);
        let result = MeasurementResult {
            systolic,
            diastolic: systolic - summary.strongest_amplitude,
            heart_rate_bpm: self.tracker.heart_rate_bpm(self.config.tick_seconds),
        };
        (result, summary)
    }

    fn advance(&mut self, next: Stage) {
        info!("stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    /// Stage 5 -> 1 wraparound: every owned buffer starts the next cycle
    /// clean instead of carrying the previous cycle's tail.
    fn reset_cycle(&mut self) {
        self.filter.reset();
        self.deflation.reset();
        self.tracker.reset();
        self.smoothed = 0.0;
        self.previous_pressure = 0.0;
        self.hold_ticks = 0;
        self.flash_on = false;
        self.progress_lit = 0;
    }

    /// Suppress a pattern identical to the last one emitted. Flash patterns
    /// alternate, so Hold re-fires every tick by construction.
    fn emit(&mut self, visual: StageVisual) -> Option<StageVisual> {
        if self.last_visual == Some(visual) {
            None
        } else {
            self.last_visual = Some(visual);
            Some(visual)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> MeasurementSession {
        MeasurementSession::new(ProtocolConfig::default())
    }

    /// Drive the session with raw samples, returning one outcome per tick.
    fn drive(session: &mut MeasurementSession, raws: &[f32]) -> Vec<TickOutcome> {
        raws.iter().map(|&raw| session.tick(Ok(raw))).collect()
    }

    #[test]
    fn idle_holds_below_threshold_and_exits_above() {
        let mut s = session();
        // Constant 30 raw: smoothed climbs 6, 12, 18, 24, 30 and never
        // crosses the strict > 30 exit.
        for _ in 0..10 {
            let outcome = s.tick(Ok(30.0));
            assert_eq!(outcome.stage, Stage::Idle);
        }
        let outcome = s.tick(Ok(200.0));
        assert_eq!(outcome.stage, Stage::Inflating);
        assert_eq!(
            outcome.visual,
            Some(StageVisual::InflateProgress { lit: 1, total: 5 })
        );
    }

    #[test]
    fn first_idle_tick_shows_standby_once() {
        let mut s = session();
        let first = s.tick(Ok(0.0));
        assert_eq!(first.visual, Some(StageVisual::Standby));
        let second = s.tick(Ok(0.0));
        assert_eq!(second.visual, None);
    }

    #[test]
    fn inflation_progress_is_monotonic() {
        let mut s = session();
        // Pump fast, dip, pump again; lit segments must never decrease.
        let raws = [
            200.0, 200.0, // smoothed 40, 80: enters Inflating, then 2 segments
            0.0, 0.0, // smoothed dips back to 80, 80
            200.0, 200.0, 200.0, 250.0, 250.0,
        ];
        let outcomes = drive(&mut s, &raws);
        let mut lit_seen = 0;
        for outcome in &outcomes {
            if let Some(StageVisual::InflateProgress { lit, .. }) = outcome.visual {
                assert!(lit > lit_seen, "segments went backwards");
                lit_seen = lit;
            }
        }
        assert!(lit_seen >= 2);
    }

    #[test]
    fn hold_lasts_twenty_two_ticks() {
        let mut s = session();
        // Saturating the filter at 200 walks Idle -> Inflating -> Hold.
        while s.stage() != Stage::Hold {
            s.tick(Ok(200.0));
        }
        let mut hold_ticks = 0;
        while s.stage() == Stage::Hold {
            let outcome = s.tick(Ok(200.0));
            hold_ticks += 1;
            if outcome.stage == Stage::Hold {
                // Flash alternates, so every Hold tick re-emits a visual.
                assert!(matches!(outcome.visual, Some(StageVisual::HoldFlash { .. })));
            }
        }
        assert_eq!(hold_ticks, 22);
        assert_eq!(s.stage(), Stage::Deflating);
    }

    #[test]
    fn stages_advance_in_protocol_order_only() {
        let mut s = session();
        let mut raws: Vec<f32> = Vec::new();
        // Ramp up, sit, ramp down past the deflation floor, then rest.
        for i in 0..60 {
            raws.push(4.0 * i as f32);
        }
        for _ in 0..30 {
            raws.push(220.0);
        }
        let mut p = 220.0;
        while p > 10.0 {
            raws.push(p);
            p -= 6.0;
        }
        for _ in 0..20 {
            raws.push(10.0);
        }
        let outcomes = drive(&mut s, &raws);
        let mut order: Vec<Stage> = Vec::new();
        for outcome in &outcomes {
            if order.last() != Some(&outcome.stage) {
                order.push(outcome.stage);
            }
        }
        assert_eq!(
            order,
            vec![
                Stage::Idle,
                Stage::Inflating,
                Stage::Hold,
                Stage::Deflating,
                Stage::Report,
                Stage::Idle,
            ]
        );
    }

    #[test]
    fn fault_tick_changes_nothing() {
        let mut s = session();
        for _ in 0..4 {
            s.tick(Ok(180.0));
        }
        let stage_before = s.stage();
        let smoothed_before = s.smoothed();
        let outcome = s.tick(Err(SensorFault::Busy));
        assert_eq!(outcome.fault, Some(SensorFault::Busy));
        assert_eq!(outcome.stage, stage_before);
        assert_eq!(outcome.smoothed, smoothed_before);
        assert_eq!(outcome.visual, None);
        // The next good tick resumes exactly where the window left off.
        let resumed = s.tick(Ok(180.0));
        assert_eq!(resumed.smoothed, 180.0);
    }

    #[test]
    fn report_wraps_to_a_clean_idle() {
        let mut s = session();
        // Walk a full cycle quickly.
        while s.stage() != Stage::Deflating {
            s.tick(Ok(200.0));
        }
        let mut p = 200.0;
        while s.stage() == Stage::Deflating {
            s.tick(Ok(p));
            p -= 6.0;
        }
        assert_eq!(s.stage(), Stage::Report);
        let wrap = s.tick(Ok(0.0));
        assert_eq!(wrap.stage, Stage::Idle);
        assert_eq!(wrap.visual, Some(StageVisual::Standby));
        // Filter was zero-filled: a fresh 50 raw smooths to 10.
        let next = s.tick(Ok(50.0));
        assert_eq!(next.smoothed, 10.0);
        assert_eq!(next.stage, Stage::Idle);
    }

    #[test]
    fn deflation_with_no_oscillation_reports_zeroes() {
        let mut s = session();
        while s.stage() != Stage::Deflating {
            s.tick(Ok(200.0));
        }
        let mut result = None;
        let mut p = 198.0;
        while s.stage() == Stage::Deflating {
            let outcome = s.tick(Ok(p));
            p -= 3.0;
            if outcome.result.is_some() {
                result = outcome.result;
            }
        }
        let result = result.unwrap();
        assert_eq!(result.systolic, 0.0);
        assert_eq!(result.diastolic, 0.0);
        assert_eq!(result.heart_rate_bpm, 0.0);
    }
}
