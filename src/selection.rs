use serde::{Deserialize, Serialize};

use crate::constants::MAX_NOTE_NUMBER;
use crate::coords::{
    ArrangeCoordTransform, ArrangePoint, ControlCoordTransform, NoteCoordTransform, NotePoint,
    TempoCoordTransform,
};
use crate::geometry::Range;
use crate::model::TrackEvent;
use crate::quantizer::Quantizer;

/// Rectangular piano-roll selection in tick-by-pitch space.
///
/// `from_note_number` is the upper pitch bound (ceiled) and `to_note_number`
/// the lower one (floored): the rectangle must fully contain the
/// pixel-dragged region, so the two corners round outwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub from_tick: f64,
    pub from_note_number: f64,
    pub to_tick: f64,
    pub to_note_number: f64,
}

impl Selection {
    pub fn from_points(start: NotePoint, end: NotePoint) -> Selection {
        let left_tick = start.tick.min(end.tick);
        let right_tick = start.tick.max(end.tick);

        let top_note_number = start.note_number.max(end.note_number).ceil();
        let bottom_note_number = start.note_number.min(end.note_number).floor();

        // -1 leaves a one-row margin for hit tests below the lowest key
        Selection {
            from_tick: left_tick.max(0.0),
            from_note_number: top_note_number.clamp(-1.0, MAX_NOTE_NUMBER as f64),
            to_tick: right_tick.max(0.0),
            to_note_number: bottom_note_number.clamp(-1.0, MAX_NOTE_NUMBER as f64),
        }
    }

    pub fn get_bounds(&self, transform: &NoteCoordTransform) -> egui::Rect {
        let left = transform.get_x(self.from_tick);
        let right = transform.get_x(self.to_tick);
        let top = transform.get_y(self.from_note_number);
        let bottom = transform.get_y(self.to_note_number);
        egui::Rect::from_min_size(
            egui::pos2(left as f32, top as f32),
            egui::vec2((right - left) as f32, (bottom - top) as f32),
        )
    }

    /// Pure translation; callers clamp before calling.
    pub fn moved(&self, delta_tick: f64, delta_note_number: f64) -> Selection {
        Selection {
            from_tick: self.from_tick + delta_tick,
            from_note_number: self.from_note_number + delta_note_number,
            to_tick: self.to_tick + delta_tick,
            to_note_number: self.to_note_number + delta_note_number,
        }
    }

    pub fn from_position(&self) -> NotePoint {
        NotePoint {
            tick: self.from_tick,
            note_number: self.from_note_number,
        }
    }

    pub fn to_position(&self) -> NotePoint {
        NotePoint {
            tick: self.to_tick,
            note_number: self.to_note_number,
        }
    }

    /// A selection that collapsed on either axis selects nothing.
    pub fn is_empty(&self) -> bool {
        self.from_tick == self.to_tick || self.from_note_number == self.to_note_number
    }
}

/// Notes intersecting the selection rectangle in musical space. A note spans
/// `[tick, tick + duration)` horizontally and one key row vertically, with
/// the pitch at the row's lower edge.
pub fn events_in_selection<'a>(
    events: &'a [TrackEvent],
    selection: &Selection,
) -> Vec<&'a TrackEvent> {
    let tick_range = Range {
        min: selection.from_tick,
        max: selection.to_tick,
    };
    let note_range = Range {
        min: selection.to_note_number,
        max: selection.from_note_number,
    };
    events
        .iter()
        .filter(|e| {
            let Some(note) = e.as_note() else {
                return false;
            };
            tick_range.intersects(&Range {
                min: e.tick,
                max: e.tick + note.duration,
            }) && note_range.intersects(&Range {
                min: note.note_number as f64 - 1.0,
                max: note.note_number as f64,
            })
        })
        .collect()
}

/// Rectangular arrange-view selection in tick-by-track space. Track indices
/// are integers; ticks snap outwards so a click covers one full grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrangeSelection {
    pub from_tick: f64,
    pub from_track_index: f64,
    pub to_tick: f64,
    pub to_track_index: f64,
}

impl ArrangeSelection {
    pub fn from_points(
        start: ArrangePoint,
        end: ArrangePoint,
        quantizer: &Quantizer,
        max_track_index: f64,
    ) -> ArrangeSelection {
        Self::from_point(start, quantizer)
            .union(&Self::from_point(end, quantizer))
            .clamp(max_track_index)
    }

    pub fn from_point(point: ArrangePoint, quantizer: &Quantizer) -> ArrangeSelection {
        ArrangeSelection {
            from_tick: quantizer.floor(point.tick),
            to_tick: quantizer.ceil(point.tick),
            from_track_index: point.track_index.floor(),
            to_track_index: point.track_index.floor() + 1.0,
        }
    }

    pub fn union(&self, other: &ArrangeSelection) -> ArrangeSelection {
        ArrangeSelection {
            from_tick: self.from_tick.min(other.from_tick),
            to_tick: self.to_tick.max(other.to_tick),
            from_track_index: self.from_track_index.min(other.from_track_index),
            to_track_index: self.to_track_index.max(other.to_track_index),
        }
    }

    pub fn clamp(&self, max_track_index: f64) -> ArrangeSelection {
        ArrangeSelection {
            from_tick: self.from_tick.max(0.0),
            to_tick: self.to_tick.max(0.0),
            from_track_index: self.from_track_index.clamp(0.0, max_track_index),
            to_track_index: self.to_track_index.clamp(0.0, max_track_index),
        }
    }

    pub fn moved(&self, delta: ArrangePoint) -> ArrangeSelection {
        ArrangeSelection {
            from_tick: self.from_tick + delta.tick,
            to_tick: self.to_tick + delta.tick,
            from_track_index: self.from_track_index + delta.track_index,
            to_track_index: self.to_track_index + delta.track_index,
        }
    }

    pub fn start(&self) -> ArrangePoint {
        ArrangePoint {
            tick: self.from_tick,
            track_index: self.from_track_index,
        }
    }

    pub fn end(&self) -> ArrangePoint {
        ArrangePoint {
            tick: self.to_tick,
            track_index: self.to_track_index,
        }
    }

    pub fn tick_range(&self) -> Range {
        Range {
            min: self.from_tick,
            max: self.to_tick,
        }
    }

    pub fn track_span(&self) -> f64 {
        self.to_track_index - self.from_track_index
    }

    pub fn get_bounds(&self, transform: &ArrangeCoordTransform) -> egui::Rect {
        let left = transform.get_x(self.from_tick);
        let right = transform.get_x(self.to_tick);
        let top = transform.get_y(self.from_track_index);
        let bottom = transform.get_y(self.to_track_index);
        egui::Rect::from_min_size(
            egui::pos2(left as f32, top as f32),
            egui::vec2((right - left) as f32, (bottom - top) as f32),
        )
    }
}

/// Tick-only selection on the tempo graph, always normalized `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoSelection {
    pub from_tick: f64,
    pub to_tick: f64,
}

impl TempoSelection {
    pub fn new(a: f64, b: f64) -> TempoSelection {
        TempoSelection {
            from_tick: a.min(b).max(0.0),
            to_tick: a.max(b).max(0.0),
        }
    }

    pub fn tick_range(&self) -> Range {
        Range {
            min: self.from_tick,
            max: self.to_tick,
        }
    }

    pub fn get_bounds(&self, transform: &TempoCoordTransform) -> egui::Rect {
        let left = transform.get_x(self.from_tick);
        let right = transform.get_x(self.to_tick);
        egui::Rect::from_min_size(
            egui::pos2(left as f32, 0.0),
            egui::vec2((right - left) as f32, transform.get_max_y() as f32),
        )
    }
}

/// Tick-only selection on a controller lane, always normalized `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSelection {
    pub from_tick: f64,
    pub to_tick: f64,
}

impl ControlSelection {
    pub fn new(a: f64, b: f64) -> ControlSelection {
        ControlSelection {
            from_tick: a.min(b).max(0.0),
            to_tick: a.max(b).max(0.0),
        }
    }

    pub fn tick_range(&self) -> Range {
        Range {
            min: self.from_tick,
            max: self.to_tick,
        }
    }

    pub fn get_bounds(&self, transform: &ControlCoordTransform) -> egui::Rect {
        let left = transform.get_x(self.from_tick);
        let right = transform.get_x(self.to_tick);
        egui::Rect::from_min_size(
            egui::pos2(left as f32, 0.0),
            egui::vec2((right - left) as f32, transform.height as f32),
        )
    }
}
