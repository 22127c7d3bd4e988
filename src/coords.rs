use egui::Pos2;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_BPM, NUMBER_OF_KEYS};
use crate::model::TrackEvent;

/// A position in time-by-pitch space. Fractional values occur during drags;
/// committed note numbers are integers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotePoint {
    pub tick: f64,
    pub note_number: f64,
}

impl NotePoint {
    pub fn add(self, other: NotePoint) -> NotePoint {
        NotePoint {
            tick: self.tick + other.tick,
            note_number: self.note_number + other.note_number,
        }
    }

    pub fn sub(self, other: NotePoint) -> NotePoint {
        NotePoint {
            tick: self.tick - other.tick,
            note_number: self.note_number - other.note_number,
        }
    }
}

/// A position in time-by-track space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrangePoint {
    pub tick: f64,
    pub track_index: f64,
}

impl ArrangePoint {
    pub fn sub(self, other: ArrangePoint) -> ArrangePoint {
        ArrangePoint {
            tick: self.tick - other.tick,
            track_index: self.track_index - other.track_index,
        }
    }

    pub fn clamp(self, max_track_index: f64) -> ArrangePoint {
        ArrangePoint {
            tick: self.tick.max(0.0),
            track_index: self.track_index.clamp(0.0, max_track_index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoPoint {
    pub tick: f64,
    pub bpm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub tick: f64,
    pub value: f64,
}

/// Pixels-per-tick scaling on the horizontal axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickTransform {
    pub pixels_per_tick: f64,
}

impl TickTransform {
    pub fn new(pixels_per_tick: f64) -> Self {
        Self { pixels_per_tick }
    }

    pub fn get_x(&self, tick: f64) -> f64 {
        tick * self.pixels_per_tick
    }

    pub fn get_tick(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_tick
    }
}

/// Pixels-per-key scaling with the vertical axis inverted: higher pitches
/// sit higher on screen, so `get_y` decreases as the note number grows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyTransform {
    pub pixels_per_key: f64,
    pub number_of_keys: u32,
}

impl KeyTransform {
    pub fn new(pixels_per_key: f64, number_of_keys: u32) -> Self {
        Self {
            pixels_per_key,
            number_of_keys,
        }
    }

    pub fn max_note_number(&self) -> f64 {
        (self.number_of_keys - 1) as f64
    }

    pub fn get_y(&self, note_number: f64) -> f64 {
        (self.max_note_number() - note_number) * self.pixels_per_key
    }

    pub fn get_note_number_fractional(&self, y: f64) -> f64 {
        self.max_note_number() - y / self.pixels_per_key
    }

    /// Notes are identified by the top edge of their pixel row.
    pub fn get_note_number(&self, y: f64) -> f64 {
        self.get_note_number_fractional(y).ceil()
    }

    pub fn get_delta_note_number(&self, delta_y: f64) -> f64 {
        -delta_y / self.pixels_per_key
    }

    pub fn get_max_y(&self) -> f64 {
        self.number_of_keys as f64 * self.pixels_per_key
    }
}

/// Composite tick-by-pitch transform for the piano roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteCoordTransform {
    pub tick: TickTransform,
    pub key: KeyTransform,
}

impl NoteCoordTransform {
    pub fn new(pixels_per_tick: f64, pixels_per_key: f64) -> Self {
        Self {
            tick: TickTransform::new(pixels_per_tick),
            key: KeyTransform::new(pixels_per_key, NUMBER_OF_KEYS),
        }
    }

    pub fn get_x(&self, tick: f64) -> f64 {
        self.tick.get_x(tick)
    }

    pub fn get_y(&self, note_number: f64) -> f64 {
        self.key.get_y(note_number)
    }

    pub fn get_tick(&self, pixels: f64) -> f64 {
        self.tick.get_tick(pixels)
    }

    pub fn get_note_point(&self, pos: Pos2) -> NotePoint {
        NotePoint {
            tick: self.get_tick(pos.x as f64),
            note_number: self.key.get_note_number(pos.y as f64),
        }
    }

    pub fn get_note_point_fractional(&self, pos: Pos2) -> NotePoint {
        NotePoint {
            tick: self.get_tick(pos.x as f64),
            note_number: self.key.get_note_number_fractional(pos.y as f64),
        }
    }

    pub fn get_rect(&self, event: &TrackEvent) -> Option<egui::Rect> {
        let note = event.as_note()?;
        Some(egui::Rect::from_min_size(
            egui::pos2(
                self.get_x(event.tick) as f32,
                self.get_y(note.note_number as f64) as f32,
            ),
            egui::vec2(
                self.get_x(note.duration) as f32,
                self.key.pixels_per_key as f32,
            ),
        ))
    }

    /// Fixed square centered on the tick for percussive tracks.
    pub fn get_drum_rect(&self, event: &TrackEvent) -> Option<egui::Rect> {
        let note = event.as_note()?;
        let size = self.key.pixels_per_key as f32;
        Some(egui::Rect::from_min_size(
            egui::pos2(
                (self.get_x(event.tick) - self.key.pixels_per_key / 2.0) as f32,
                self.get_y(note.note_number as f64) as f32,
            ),
            egui::vec2(size, size),
        ))
    }
}

/// Tick-by-BPM transform for the tempo graph. The vertical axis is inverted
/// and scaled by `max_bpm / height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoCoordTransform {
    pub tick: TickTransform,
    pub height: f64,
    pub max_bpm: f64,
}

impl TempoCoordTransform {
    pub fn new(pixels_per_tick: f64, height: f64) -> Self {
        Self {
            tick: TickTransform::new(pixels_per_tick),
            height,
            max_bpm: MAX_BPM,
        }
    }

    pub fn get_x(&self, tick: f64) -> f64 {
        self.tick.get_x(tick)
    }

    pub fn get_y(&self, bpm: f64) -> f64 {
        (1.0 - bpm / self.max_bpm) * self.height
    }

    pub fn get_tick(&self, pixels: f64) -> f64 {
        self.tick.get_tick(pixels)
    }

    pub fn get_bpm(&self, y: f64) -> f64 {
        (1.0 - y / self.height) * self.max_bpm
    }

    pub fn get_delta_bpm(&self, delta_y: f64) -> f64 {
        -delta_y / self.height * self.max_bpm
    }

    pub fn get_max_y(&self) -> f64 {
        self.height
    }

    pub fn from_position(&self, pos: Pos2) -> TempoPoint {
        TempoPoint {
            tick: self.get_tick(pos.x as f64),
            bpm: self.get_bpm(pos.y as f64),
        }
    }
}

/// Tick-by-value transform for controller lanes. Values map into the lane
/// height inset by the curve's line width; ticks and values floor to
/// integers on the way out of pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlCoordTransform {
    pub tick: TickTransform,
    pub max_value: f64,
    pub height: f64,
    pub line_width: f64,
}

impl ControlCoordTransform {
    pub fn new(pixels_per_tick: f64, max_value: f64, height: f64, line_width: f64) -> Self {
        Self {
            tick: TickTransform::new(pixels_per_tick),
            max_value,
            height,
            line_width,
        }
    }

    pub fn get_x(&self, tick: f64) -> f64 {
        self.tick.get_x(tick)
    }

    pub fn get_tick(&self, pixels: f64) -> f64 {
        self.tick.get_tick(pixels).floor()
    }

    pub fn get_y(&self, value: f64) -> f64 {
        (1.0 - value / self.max_value) * (self.height - self.line_width * 2.0) + self.line_width
    }

    pub fn get_value(&self, y: f64) -> f64 {
        ((1.0 - (y - self.line_width) / (self.height - self.line_width * 2.0)) * self.max_value)
            .floor()
    }

    pub fn to_position(&self, tick: f64, value: f64) -> Pos2 {
        egui::pos2(
            self.get_x(tick).round() as f32,
            self.get_y(value).round() as f32,
        )
    }

    pub fn from_position(&self, pos: Pos2) -> ControlPoint {
        ControlPoint {
            tick: self.get_tick(pos.x as f64),
            value: self.get_value(pos.y as f64),
        }
    }
}

/// Composite tick-by-track transform for the arrange view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrangeCoordTransform {
    pub tick: TickTransform,
    pub pixels_per_track: f64,
}

impl ArrangeCoordTransform {
    pub fn new(pixels_per_tick: f64, pixels_per_track: f64) -> Self {
        Self {
            tick: TickTransform::new(pixels_per_tick),
            pixels_per_track,
        }
    }

    pub fn get_x(&self, tick: f64) -> f64 {
        self.tick.get_x(tick)
    }

    pub fn get_y(&self, track_index: f64) -> f64 {
        track_index * self.pixels_per_track
    }

    pub fn get_tick(&self, pixels: f64) -> f64 {
        self.tick.get_tick(pixels)
    }

    pub fn get_arrange_point(&self, pos: Pos2) -> ArrangePoint {
        ArrangePoint {
            tick: self.get_tick(pos.x as f64),
            track_index: pos.y as f64 / self.pixels_per_track,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventBody, NoteEvent};

    #[test]
    fn tick_roundtrip_is_exact() {
        for &ppt in &[0.5, 0.25, 2.0, 8.0] {
            let t = TickTransform::new(ppt);
            for tick in 0..2000 {
                let tick = tick as f64;
                assert_eq!(t.get_tick(t.get_x(tick)), tick);
            }
        }
    }

    #[test]
    fn key_axis_is_inverted() {
        let k = KeyTransform::new(10.0, 128);
        assert_eq!(k.get_y(127.0), 0.0);
        assert!(k.get_y(60.0) > k.get_y(61.0));
        assert_eq!(k.get_max_y(), 1280.0);
    }

    #[test]
    fn note_number_is_identified_by_row_top_edge() {
        let k = KeyTransform::new(10.0, 128);
        assert_eq!(k.get_note_number(0.0), 127.0);
        assert_eq!(k.get_note_number(0.1), 127.0);
        assert_eq!(k.get_note_number(9.9), 127.0);
        assert_eq!(k.get_note_number(10.0), 126.0);
    }

    #[test]
    fn note_rect_width_comes_from_duration() {
        let t = NoteCoordTransform::new(2.0, 10.0);
        let event = TrackEvent {
            id: 1,
            tick: 100.0,
            body: EventBody::Note(NoteEvent {
                duration: 50.0,
                note_number: 60,
                velocity: 100,
            }),
        };
        let rect = t.get_rect(&event).unwrap();
        assert_eq!(rect.min.x, 200.0);
        assert_eq!(rect.width(), 100.0);
        assert_eq!(rect.height(), 10.0);

        let drum = t.get_drum_rect(&event).unwrap();
        assert_eq!(drum.width(), drum.height());
        assert_eq!(drum.center().x, 200.0);
    }

    #[test]
    fn tempo_axis_is_inverted_and_scaled() {
        let t = TempoCoordTransform::new(1.0, 320.0);
        assert_eq!(t.get_y(t.max_bpm), 0.0);
        assert_eq!(t.get_y(0.0), 320.0);
        assert_eq!(t.get_bpm(t.get_y(120.0)), 120.0);
        assert_eq!(t.get_delta_bpm(-32.0), 32.0);
    }

    #[test]
    fn control_value_floors_and_inverts() {
        let t = ControlCoordTransform::new(1.0, 127.0, 129.0, 1.0);
        assert_eq!(t.get_value(t.get_y(127.0)), 127.0);
        assert_eq!(t.get_value(t.get_y(0.0)), 0.0);
        assert_eq!(t.get_tick(10.7), 10.0);
    }

    #[test]
    fn arrange_point_has_fractional_track_index() {
        let t = ArrangeCoordTransform::new(1.0, 64.0);
        let p = t.get_arrange_point(egui::pos2(100.0, 96.0));
        assert_eq!(p.tick, 100.0);
        assert_eq!(p.track_index, 1.5);
    }
}
