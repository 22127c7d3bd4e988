use serde::{Deserialize, Serialize};

/// One entry of the measure table derived from the song's time-signature
/// events. `measure` is the bar number at which this signature takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub tick: f64,
    pub measure: i32,
    pub numerator: u32,
    pub denominator: u32,
}

/// The bar containing a tick, resolved against the measure table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureStart {
    pub tick: f64,
    pub duration: f64,
    pub ticks_per_beat: f64,
    pub numerator: u32,
}

impl Measure {
    pub const DEFAULT: Measure = Measure {
        tick: 0.0,
        measure: 0,
        numerator: 4,
        denominator: 4,
    };

    /// Builds the measure table from `(tick, numerator, denominator)`
    /// time-signature events sorted by tick. An empty list yields the 4/4
    /// default so lookups never fail.
    pub fn from_time_signatures(events: &[(f64, u32, u32)], timebase: u32) -> Vec<Measure> {
        if events.is_empty() {
            return vec![Measure::DEFAULT];
        }
        let mut result = Vec::with_capacity(events.len());
        let mut last_measure = 0;
        for (i, &(tick, numerator, denominator)) in events.iter().enumerate() {
            let mut measure = 0;
            if i > 0 {
                let (last_tick, last_numerator, last_denominator) = events[i - 1];
                let ticks_per_beat = (timebase * 4) as f64 / last_denominator as f64;
                let measure_delta =
                    ((tick - last_tick) / ticks_per_beat / last_numerator as f64).floor() as i32;
                measure = last_measure + measure_delta;
                last_measure = measure;
            }
            result.push(Measure {
                tick,
                measure,
                numerator,
                denominator,
            });
        }
        result
    }

    /// Nearest bar beginning at or before `tick`. Keeps grid lines aligned
    /// across time-signature changes.
    pub fn get_measure_start(measures: &[Measure], tick: f64, timebase: u32) -> MeasureStart {
        let m = last_before(measures, tick).unwrap_or(Measure::DEFAULT);
        let ticks_per_beat = (timebase * 4) as f64 / m.denominator as f64;
        let ticks_per_measure = ticks_per_beat * m.numerator as f64;
        let number_of_measures = ((tick - m.tick) / ticks_per_measure).floor();
        MeasureStart {
            tick: m.tick + ticks_per_measure * number_of_measures,
            duration: ticks_per_measure,
            ticks_per_beat,
            numerator: m.numerator,
        }
    }

    /// Tick of the bar before `tick`. Within the first beat of a bar this
    /// rewinds a full extra bar, so repeated jumps keep moving backwards.
    pub fn previous_measure_tick(measures: &[Measure], tick: f64, timebase: u32) -> f64 {
        let start = Self::get_measure_start(measures, tick, timebase);
        if tick > start.tick + start.ticks_per_beat {
            return start.tick;
        }
        Self::get_measure_start(measures, start.tick - 1.0, timebase).tick
    }

    pub fn next_measure_tick(measures: &[Measure], tick: f64, timebase: u32) -> f64 {
        let start = Self::get_measure_start(measures, tick, timebase);
        start.tick + start.duration
    }

    /// "bar:beat:tick" position display, 1-based bar and beat.
    pub fn mbt_string(measures: &[Measure], tick: f64, timebase: u32) -> String {
        let m = last_before(measures, tick).unwrap_or(Measure::DEFAULT);
        let ticks_per_beat = (timebase * 4) as f64 / m.denominator as f64;
        let ticks_per_measure = ticks_per_beat * m.numerator as f64;

        let mut rel = tick - m.tick;
        let measure_delta = (rel / ticks_per_measure).floor();
        rel -= measure_delta * ticks_per_measure;
        let beat = (rel / ticks_per_beat).floor();
        rel -= beat * ticks_per_beat;

        format!(
            "{:04}:{:02}:{:03}",
            m.measure + measure_delta as i32 + 1,
            beat as i32 + 1,
            rel as i32
        )
    }
}

fn last_before(measures: &[Measure], tick: f64) -> Option<Measure> {
    let mut last = None;
    for m in measures {
        if m.tick > tick {
            break;
        }
        last = Some(*m);
    }
    last
}
