/// Samples averaged per smoothed output (~half a second at the 100 ms cadence).
pub const FILTER_WINDOW: usize = 5;

/// Fixed-window moving average over the raw pressure signal.
///
/// The window is zero-filled at construction and on every `reset`, so the
/// first `FILTER_WINDOW - 1` outputs after a reset are pulled toward zero
/// rather than computed against the previous cycle's tail. Harmless for this
/// protocol: the idle stage only exits above 30 and the cuff is slack when a
/// cycle wraps around.
#[derive(Debug, Clone)]
pub struct MovingAverageFilter {
    window: [f32; FILTER_WINDOW],
    index: usize,
}

impl MovingAverageFilter {
    pub fn new() -> Self {
        Self {
            window: [0.0; FILTER_WINDOW],
            index: 0,
        }
    }

    /// Overwrite the oldest slot and return the mean of the whole window.
    pub fn push(&mut self, sample: f32) -> f32 {
        self.window[self.index] = sample;
        self.index = (self.index + 1) % FILTER_WINDOW;
        self.window.iter().sum::<f32>() / FILTER_WINDOW as f32
    }

    pub fn reset(&mut self) {
        self.window = [0.0; FILTER_WINDOW];
        self.index = 0;
    }
}

impl Default for MovingAverageFilter {
    fn default() -> Self {
        Self::new()
    }
}
