use crate::deflation::RateClass;
use log::info;

/// Abstract indicator pattern for one protocol-visible state. Colors and
/// pixel positions are panel policy; the core only names the pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageVisual {
    /// Waiting for the user to start pumping.
    Standby,
    /// Inflation progress bar, `lit` of `total` segments revealed.
    InflateProgress { lit: u8, total: u8 },
    /// Alternating flash telling the user to stop pumping.
    HoldFlash { on: bool },
    /// Deflation rate feedback.
    DeflateRate(RateClass),
    /// Measurement complete, result available.
    ReportReady,
}

pub trait IndicatorPanel {
    fn set_pattern(&mut self, visual: StageVisual);
}

/// Renders each pattern as one log line; the hardware stand-in.
#[derive(Debug, Default)]
pub struct ConsolePanel;

impl ConsolePanel {
    fn render(visual: StageVisual) -> String {
        match visual {
            StageVisual::Standby => "[standby]".to_string(),
            StageVisual::InflateProgress { lit, total } => {
                let bar: String = (0..total).map(|i| if i < lit { '#' } else { '-' }).collect();
                format!("[{}] inflating {}/{}", bar, lit, total)
            }
            StageVisual::HoldFlash { on } => {
                format!("[{}] stop pumping", if on { "##########" } else { "          " })
            }
            StageVisual::DeflateRate(RateClass::TooFast) => "[deflate] too fast".to_string(),
            StageVisual::DeflateRate(RateClass::TooSlow) => "[deflate] too slow".to_string(),
            StageVisual::DeflateRate(RateClass::Good) => "[deflate] good rate".to_string(),
            StageVisual::ReportReady => "[report] measurement ready".to_string(),
        }
    }
}

impl IndicatorPanel for ConsolePanel {
    fn set_pattern(&mut self, visual: StageVisual) {
        info!("panel {}", Self::render(visual));
    }
}

/// Discards every pattern; used when the panel is suppressed.
#[derive(Debug, Default)]
pub struct NullPanel;

impl IndicatorPanel for NullPanel {
    fn set_pattern(&mut self, _visual: StageVisual) {}
}

/// Records every pattern it receives; test collaborator.
#[derive(Debug, Default)]
pub struct RecordingPanel {
    pub patterns: Vec<StageVisual>,
}

impl IndicatorPanel for RecordingPanel {
    fn set_pattern(&mut self, visual: StageVisual) {
        self.patterns.push(visual);
    }
}
