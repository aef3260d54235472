use crate::BeatSummary;
use log::debug;

/// Where the tracker is within the current oscillation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BeatPhase {
    /// No pulsation observed yet; waiting for the first rising slope.
    NotArmed,
    Rising,
    Falling,
}

/// What a single tick's slope observation meant, for tracing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeatEvent {
    /// First rising slope of the deflation: the systolic estimate.
    SystolicDetected { pressure: f32 },
    /// Top of a beat; `new_strongest` when this beat's swing is the largest so far.
    PeakFound { amplitude: f32, new_strongest: bool },
    /// Bottom of a new beat.
    BeatStarted { trough: f32 },
}

/// Tracks heartbeat-induced pressure oscillations during deflation by the
/// sign of the tick-to-tick slope, retaining the strongest peak-to-trough
/// amplitude seen. The peak is taken at the first declining sample after a
/// rise, the trough at the first rising sample after a fall.
#[derive(Debug, Clone)]
pub struct BeatTracker {
    phase: BeatPhase,
    systolic: f32,
    trough_pressure: f32,
    peak_pressure: f32,
    strongest_amplitude: f32,
    strongest_peak_pressure: f32,
    beat_count: u32,
    ticks_elapsed: u32,
}

impl BeatTracker {
    pub fn new() -> Self {
        Self {
            phase: BeatPhase::NotArmed,
            systolic: 0.0,
            trough_pressure: 0.0,
            peak_pressure: 0.0,
            strongest_amplitude: 0.0,
            strongest_peak_pressure: 0.0,
            beat_count: 0,
            ticks_elapsed: 0,
        }
    }

    /// Feed one deflation tick. The elapsed-tick counter advances on every
    /// call after the systolic arming tick, so heart rate spans exactly the
    /// interval in which beats were being counted.
    pub fn observe(&mut self, pressure: f32, previous_pressure: f32) -> Option<BeatEvent> {
        let slope = pressure - previous_pressure;

        if self.phase == BeatPhase::NotArmed {
            if slope > 0.0 {
                self.systolic = pressure;
                self.trough_pressure = pressure;
                self.beat_count = 1;
                self.phase = BeatPhase::Rising;
                debug!("systolic candidate at {:.1}", pressure);
                return Some(BeatEvent::SystolicDetected { pressure });
            }
            return None;
        }

        self.ticks_elapsed += 1;

        match self.phase {
            BeatPhase::Rising if slope < 0.0 => {
                self.peak_pressure = pressure;
                let amplitude = self.peak_pressure - self.trough_pressure;
                // Strict comparison: the first beat to reach an amplitude
                // keeps its peak over any later tie.
                let new_strongest = amplitude > self.strongest_amplitude;
                if new_strongest {
                    self.strongest_amplitude = amplitude;
                    self.strongest_peak_pressure = self.peak_pressure;
                }
                self.phase = BeatPhase::Falling;
                Some(BeatEvent::PeakFound {
                    amplitude,
                    new_strongest,
                })
            }
            BeatPhase::Falling if slope > 0.0 => {
                self.trough_pressure = pressure;
                self.beat_count += 1;
                self.phase = BeatPhase::Rising;
                Some(BeatEvent::BeatStarted { trough: pressure })
            }
            _ => None,
        }
    }

    /// Systolic estimate, once the first beat has been observed.
    pub fn systolic(&self) -> Option<f32> {
        if self.phase == BeatPhase::NotArmed {
            None
        } else {
            Some(self.systolic)
        }
    }

    pub fn strongest_amplitude(&self) -> f32 {
        self.strongest_amplitude
    }

    /// Beats per minute over the counted interval; 0.0 when no beat was
    /// ever observed.
    pub fn heart_rate_bpm(&self, tick_seconds: f32) -> f32 {
        if self.ticks_elapsed == 0 {
            return 0.0;
        }
        self.beat_count as f32 * 60.0 / (self.ticks_elapsed as f32 * tick_seconds)
    }

    pub fn summary(&self) -> BeatSummary {
        BeatSummary {
            beat_count: self.beat_count,
            ticks_elapsed: self.ticks_elapsed,
            strongest_amplitude: self.strongest_amplitude,
            strongest_peak_pressure: self.strongest_peak_pressure,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for BeatTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed a pressure series tick by tick, pairing each sample with its
    /// predecessor the way the deflating stage does.
    fn feed(tracker: &mut BeatTracker, series: &[f32]) {
        for pair in series.windows(2) {
            tracker.observe(pair[1], pair[0]);
        }
    }

    #[test]
    fn declining_pressure_never_arms() {
        let mut tracker = BeatTracker::new();
        feed(&mut tracker, &[170.0, 160.0, 150.0, 140.0]);
        assert_eq!(tracker.systolic(), None);
        assert_eq!(tracker.summary().beat_count, 0);
        assert_eq!(tracker.summary().ticks_elapsed, 0);
    }

    #[test]
    fn first_rising_slope_is_systolic_and_first_beat() {
        let mut tracker = BeatTracker::new();
        feed(&mut tracker, &[130.0, 125.0, 121.0, 122.0]);
        assert_eq!(tracker.systolic(), Some(122.0));
        assert_eq!(tracker.summary().beat_count, 1);
        // Arming tick does not advance the elapsed counter.
        assert_eq!(tracker.summary().ticks_elapsed, 0);
    }

    #[test]
    fn n_full_cycles_after_systolic_count_n_plus_one_beats() {
        let mut tracker = BeatTracker::new();
        // Arm on the first rise, then three complete rise/fall oscillations.
        let series = [
            121.0, 120.0, // declining, not yet armed
            122.0, // first rise: systolic, beat 1
            128.0, 127.0, // peak
            118.0, 112.0, 113.0, // beat 2
            120.0, 119.0, // peak
            108.0, 103.0, 104.0, // beat 3
            110.0, 109.0, // peak
            99.0, 95.0, 96.0, // beat 4
        ];
        feed(&mut tracker, &series);
        assert_eq!(tracker.summary().beat_count, 4);
    }

    #[test]
    fn strongest_amplitude_keeps_first_tie_holder() {
        let mut tracker = BeatTracker::new();
        // Beats with amplitudes 4, 9, 6, 9; distinct peak pressures so the
        // retained peak identifies which beat won.
        let series = [
            149.0, 150.0, // arm: trough 150
            153.0, 155.0, 154.0, // peak 154, amplitude 4
            148.0, 141.0, 142.0, // trough 142
            147.0, 150.0, 152.0, 151.0, // peak 151, amplitude 9
            145.0, 138.0, 139.0, // trough 139
            144.0, 146.0, 145.0, // peak 145, amplitude 6
            140.0, 133.0, 134.0, // trough 134
            138.0, 144.0, 143.0, // peak 143, amplitude 9 again
        ];
        feed(&mut tracker, &series);
        let summary = tracker.summary();
        assert_eq!(summary.strongest_amplitude, 9.0);
        assert_eq!(summary.strongest_peak_pressure, 151.0);
        assert_eq!(summary.beat_count, 4);
    }

    #[test]
    fn heart_rate_normalizes_to_beats_per_minute() {
        let mut tracker = BeatTracker::new();
        tracker.beat_count = 4;
        tracker.ticks_elapsed = 32;
        tracker.phase = BeatPhase::Falling;
        // 4 beats over 3.2 s -> 75 bpm.
        assert!((tracker.heart_rate_bpm(0.1) - 75.0).abs() < 1e-3);
    }

    #[test]
    fn heart_rate_is_zero_without_elapsed_ticks() {
        let tracker = BeatTracker::new();
        assert_eq!(tracker.heart_rate_bpm(0.1), 0.0);
    }

    #[test]
    fn flat_slope_changes_nothing() {
        let mut tracker = BeatTracker::new();
        feed(&mut tracker, &[100.0, 99.0, 100.0, 100.0, 100.0]);
        let before = tracker.summary();
        assert_eq!(before.beat_count, 1);
        // Flat ticks advanced the counter but left the phase untouched.
        assert_eq!(before.ticks_elapsed, 2);
        assert_eq!(tracker.systolic(), Some(100.0));
    }
}
