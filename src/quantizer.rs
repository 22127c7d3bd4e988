use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_QUANTIZE_DIVISOR;
use crate::model::Measure;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizeSettings {
    /// Grid divisor relative to a whole note: 4 = quarter, 8 = eighth,
    /// 1 = whole bar.
    pub divisor: u32,
    pub enabled: bool,
}

impl Default for QuantizeSettings {
    fn default() -> Self {
        Self {
            divisor: DEFAULT_QUANTIZE_DIVISOR,
            enabled: true,
        }
    }
}

/// Snaps ticks to a grid derived from the time-signature table. The grid is
/// measured from the start of the containing bar, so it realigns at every
/// time-signature change instead of drifting from the song start.
///
/// When disabled, the rounding functions degrade to bare integer rounding
/// with no measure awareness.
#[derive(Debug, Clone, Copy)]
pub struct Quantizer<'a> {
    measures: &'a [Measure],
    timebase: u32,
    settings: QuantizeSettings,
}

impl<'a> Quantizer<'a> {
    pub fn new(measures: &'a [Measure], timebase: u32, settings: QuantizeSettings) -> Self {
        Self {
            measures,
            timebase,
            settings: QuantizeSettings {
                divisor: settings.divisor.max(1),
                enabled: settings.enabled,
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Grid unit in ticks ignoring the measure table; used for default note
    /// lengths.
    pub fn unit(&self) -> f64 {
        (self.timebase * 4) as f64 / self.settings.divisor as f64
    }

    pub fn round(&self, tick: f64) -> f64 {
        if self.settings.enabled {
            self.calc(tick, f64::round)
        } else {
            tick.round()
        }
    }

    pub fn floor(&self, tick: f64) -> f64 {
        if self.settings.enabled {
            self.calc(tick, f64::floor)
        } else {
            tick.floor()
        }
    }

    pub fn ceil(&self, tick: f64) -> f64 {
        if self.settings.enabled {
            self.calc(tick, f64::ceil)
        } else {
            tick.ceil()
        }
    }

    /// Always snaps, even when live quantization is off. Used by the
    /// explicit quantize command.
    pub fn force_round(&self, tick: f64) -> f64 {
        self.calc(tick, f64::round)
    }

    fn calc(&self, tick: f64, f: fn(f64) -> f64) -> f64 {
        let start = Measure::get_measure_start(self.measures, tick, self.timebase);
        // divisor 1 means quantize-to-bar, which follows the bar's numerator
        let beats = if self.settings.divisor == 1 {
            start.numerator
        } else {
            4
        };
        let unit = (self.timebase * beats) as f64 / self.settings.divisor as f64;
        let offset = start.tick;
        f((tick - offset) / unit) * unit + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TB: u32 = 480;

    fn settings(divisor: u32) -> QuantizeSettings {
        QuantizeSettings {
            divisor,
            enabled: true,
        }
    }

    #[test]
    fn snaps_to_grid_unit() {
        let measures = Measure::from_time_signatures(&[], TB);
        let q = Quantizer::new(&measures, TB, settings(4));
        assert_eq!(q.unit(), 480.0);
        assert_eq!(q.round(700.0), 480.0);
        assert_eq!(q.round(721.0), 960.0);
        assert_eq!(q.floor(959.0), 480.0);
        assert_eq!(q.ceil(481.0), 960.0);
    }

    #[test]
    fn idempotent_for_all_roundings() {
        let measures = Measure::from_time_signatures(&[(0.0, 4, 4), (3840.0, 3, 4)], TB);
        let q = Quantizer::new(&measures, TB, settings(8));
        let roundings: [fn(&Quantizer, f64) -> f64; 3] = [
            |q, t| q.round(t),
            |q, t| q.floor(t),
            |q, t| q.ceil(t),
        ];
        for tick in [0.0, 123.0, 3839.9, 4000.0, 9999.5] {
            for f in roundings {
                let once = f(&q, tick);
                assert_eq!(f(&q, once), once, "tick {tick}");
            }
        }
    }

    #[test]
    fn grid_realigns_at_time_signature_change() {
        // a signature change off the song-start grid shifts the grid origin
        let measures = Measure::from_time_signatures(&[(0.0, 4, 4), (1000.0, 3, 4)], TB);
        let q = Quantizer::new(&measures, TB, settings(4));
        // the grid is measured from the bar start at 1000, not from tick 0
        assert_eq!(q.round(1100.0), 1000.0);
        assert_eq!(q.round(1300.0), 1480.0);
        // second 3/4 bar starts at 1000 + 1440 = 2440
        assert_eq!(q.floor(2439.0), 1960.0);
        assert_eq!(q.ceil(2441.0), 2920.0);
    }

    #[test]
    fn divisor_one_snaps_to_bar_using_numerator() {
        let measures = Measure::from_time_signatures(&[(0.0, 3, 4)], TB);
        let q = Quantizer::new(&measures, TB, settings(1));
        // bar length is 3 * 480 = 1440
        assert_eq!(q.round(800.0), 1440.0);
        assert_eq!(q.round(700.0), 0.0);
        assert_eq!(q.ceil(700.0), 1440.0);
    }

    #[test]
    fn disabled_quantizer_is_bare_rounding() {
        let measures = Measure::from_time_signatures(&[], TB);
        let q = Quantizer::new(
            &measures,
            TB,
            QuantizeSettings {
                divisor: 4,
                enabled: false,
            },
        );
        assert_eq!(q.round(700.4), 700.0);
        assert_eq!(q.floor(700.9), 700.0);
        assert_eq!(q.ceil(700.1), 701.0);
        // force variant still snaps
        assert_eq!(q.force_round(700.0), 480.0);
    }
}
