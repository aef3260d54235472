use log::debug;

/// History depth in ticks; at the 100 ms cadence the oldest slot holds the
/// sample from roughly one second ago.
pub const DEFLATION_HISTORY: usize = 10;

/// How the cuff's deflation rate compares against the acceptable band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateClass {
    TooFast,
    TooSlow,
    Good,
}

/// Classifies deflation rate from a fixed ring of recent smoothed pressures.
///
/// The slot at the cursor is the sample recorded exactly `DEFLATION_HISTORY`
/// ticks ago; it is read for the rate comparison, then overwritten with the
/// current sample before the cursor advances.
#[derive(Debug, Clone)]
pub struct DeflationClassifier {
    history: [f32; DEFLATION_HISTORY],
    cursor: usize,
    rate_too_fast: f32,
    rate_too_slow: f32,
}

impl DeflationClassifier {
    pub fn new(rate_too_fast: f32, rate_too_slow: f32) -> Self {
        Self {
            history: [0.0; DEFLATION_HISTORY],
            cursor: 0,
            rate_too_fast,
            rate_too_slow,
        }
    }

    /// Store a sample without classifying; used while the hold stage
    /// pre-populates the ring before deflation begins.
    pub fn record(&mut self, sample: f32) {
        self.history[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % DEFLATION_HISTORY;
    }

    /// Compare the current sample against the one from ~1 s ago and bucket
    /// the absolute rate of change. Boundary values 1.0 and 5.0 are Good.
    pub fn classify(&mut self, current: f32) -> RateClass {
        let oldest = self.history[self.cursor];
        let rate = (current - oldest).abs();
        let class = if rate > self.rate_too_fast {
            RateClass::TooFast
        } else if rate < self.rate_too_slow {
            RateClass::TooSlow
        } else {
            RateClass::Good
        };
        debug!("deflation rate {:.2} mmHg/s -> {:?}", rate, class);
        self.record(current);
        class
    }

    pub fn reset(&mut self) {
        self.history = [0.0; DEFLATION_HISTORY];
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> DeflationClassifier {
        DeflationClassifier::new(5.0, 1.0)
    }

    fn classify_with_rate(rate: f32) -> RateClass {
        let mut c = classifier();
        for _ in 0..DEFLATION_HISTORY {
            c.record(100.0);
        }
        c.classify(100.0 - rate)
    }

    #[test]
    fn rate_buckets_are_boundary_exclusive() {
        assert_eq!(classify_with_rate(0.9), RateClass::TooSlow);
        assert_eq!(classify_with_rate(1.0), RateClass::Good);
        assert_eq!(classify_with_rate(3.0), RateClass::Good);
        assert_eq!(classify_with_rate(5.0), RateClass::Good);
        assert_eq!(classify_with_rate(5.1), RateClass::TooFast);
    }

    #[test]
    fn rate_uses_magnitude_not_sign() {
        // A rising cuff compares the same as a falling one.
        assert_eq!(classify_with_rate(-3.0), RateClass::Good);
        assert_eq!(classify_with_rate(-7.0), RateClass::TooFast);
    }

    #[test]
    fn classification_reads_sample_from_history_ticks_ago() {
        let mut c = classifier();
        // Fill the ring with a descending second of history: 110, 109, ... 101.
        for i in 0..DEFLATION_HISTORY {
            c.record(110.0 - i as f32);
        }
        // The cursor wrapped; the slot about to be overwritten holds 110.
        assert_eq!(c.classify(107.0), RateClass::Good);
        // That write replaced 110, so the next oldest is 109.
        assert_eq!(c.classify(103.0), RateClass::TooFast);
    }
}
