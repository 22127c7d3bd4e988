use serde::{Deserialize, Serialize};

use crate::constants::MAX_NOTE_NUMBER;
use crate::coords::NotePoint;
use crate::geometry::Range;
use crate::model::{EventId, EventUpdate, Track, TrackEvent};
use crate::selection::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragPosition {
    Left,
    Right,
    Center,
}

/// A uniform handle over "note edge/center" and "selection edge/center".
/// It carries no storage of its own; it is a resolution rule for what
/// NotePoint the handle represents right now and how a new one is written
/// back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Draggable {
    Note {
        note_id: EventId,
        position: DragPosition,
    },
    Selection {
        position: DragPosition,
    },
}

/// Legal movement envelope for one draggable during one drag. Recomputed on
/// every pointer move because it depends on the other selected notes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DraggableArea {
    pub tick_range: Option<Range>,
    pub note_number_range: Option<Range>,
}

impl DraggableArea {
    pub fn constrain(&self, point: NotePoint) -> NotePoint {
        NotePoint {
            tick: match &self.tick_range {
                Some(range) => range.clamp(point.tick),
                None => point.tick,
            },
            note_number: match &self.note_number_range {
                Some(range) => range.clamp(point.note_number),
                None => point.note_number,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialNotePoint {
    pub tick: Option<f64>,
    pub note_number: Option<f64>,
}

impl From<NotePoint> for PartialNotePoint {
    fn from(point: NotePoint) -> Self {
        Self {
            tick: Some(point.tick),
            note_number: Some(point.note_number),
        }
    }
}

/// Resolves draggables against the selected track and the current piano-roll
/// selection state. Every lookup returns `None` when the referent no longer
/// exists, which callers treat as "abort this step silently".
pub struct DragContext<'a> {
    pub track: &'a mut Track,
    pub selection: &'a mut Option<Selection>,
    pub selected_note_ids: &'a [EventId],
}

impl DragContext<'_> {
    fn note(&self, id: EventId) -> Option<&TrackEvent> {
        self.track.get_event_by_id(id).filter(|e| e.is_note())
    }

    fn selected_notes(&self) -> Vec<TrackEvent> {
        self.selected_note_ids
            .iter()
            .filter_map(|&id| self.note(id).copied())
            .collect()
    }

    pub fn position(&self, draggable: Draggable) -> Option<NotePoint> {
        match draggable {
            Draggable::Note { note_id, position } => {
                let event = self.note(note_id)?;
                let note = event.as_note()?;
                match position {
                    DragPosition::Center | DragPosition::Left => Some(NotePoint {
                        tick: event.tick,
                        note_number: note.note_number as f64,
                    }),
                    DragPosition::Right => Some(NotePoint {
                        tick: event.tick + note.duration,
                        note_number: note.note_number as f64,
                    }),
                }
            }
            Draggable::Selection { position } => {
                let selection = (*self.selection)?;
                match position {
                    DragPosition::Center | DragPosition::Left => Some(selection.from_position()),
                    DragPosition::Right => Some(selection.to_position()),
                }
            }
        }
    }

    pub fn area(&self, draggable: Draggable, min_length: f64) -> Option<DraggableArea> {
        match draggable {
            Draggable::Note { note_id, position } => {
                let event = *self.note(note_id)?;
                let note = *event.as_note()?;
                let notes = self.selected_notes();
                let min_tick = notes.iter().map(|e| e.tick).fold(f64::INFINITY, f64::min);
                let min_tick = if min_tick.is_finite() { min_tick } else { 0.0 };
                // the group cannot push any member's start before tick 0
                let tick_lower_bound = event.tick - min_tick;
                match position {
                    DragPosition::Center => {
                        let note_number = note.note_number as f64;
                        let mut max_note_number = note_number;
                        let mut min_note_number = note_number;
                        for e in &notes {
                            if let Some(n) = e.as_note() {
                                max_note_number = max_note_number.max(n.note_number as f64);
                                min_note_number = min_note_number.min(n.note_number as f64);
                            }
                        }
                        Some(DraggableArea {
                            tick_range: Some(Range {
                                min: tick_lower_bound,
                                max: f64::INFINITY,
                            }),
                            note_number_range: Some(Range {
                                min: note_number - min_note_number,
                                max: MAX_NOTE_NUMBER as f64 - (max_note_number - note_number),
                            }),
                        })
                    }
                    DragPosition::Left => Some(DraggableArea {
                        tick_range: Some(Range {
                            min: tick_lower_bound,
                            max: event.tick + note.duration - min_length,
                        }),
                        // edge drags are horizontal-only
                        note_number_range: Some(Range::point(note.note_number as f64)),
                    }),
                    DragPosition::Right => Some(DraggableArea {
                        tick_range: Some(Range {
                            min: event.tick + min_length,
                            max: f64::INFINITY,
                        }),
                        note_number_range: Some(Range::point(note.note_number as f64)),
                    }),
                }
            }
            Draggable::Selection { position } => {
                let selection = (*self.selection)?;
                let notes = self.selected_notes();
                let min_tick = notes.iter().map(|e| e.tick).fold(f64::INFINITY, f64::min);
                let min_tick = if min_tick.is_finite() { min_tick } else { 0.0 };
                // how far the leftmost note protrudes from the selection edge
                let tick_offset = selection.from_tick - min_tick;
                match position {
                    DragPosition::Center => {
                        let height = selection.from_note_number - selection.to_note_number;
                        Some(DraggableArea {
                            tick_range: Some(Range {
                                min: tick_offset,
                                max: f64::INFINITY,
                            }),
                            note_number_range: Some(Range {
                                min: height - 1.0,
                                max: MAX_NOTE_NUMBER as f64 + 1.0,
                            }),
                        })
                    }
                    DragPosition::Left => {
                        let max_duration = notes
                            .iter()
                            .filter_map(|e| e.duration())
                            .fold(0.0, f64::max);
                        // neither the selection nor its longest note may
                        // shrink below min_length
                        let selection_smallest_left = selection.to_tick - min_length;
                        let note_smallest_left = selection.from_tick + (max_duration - min_length);
                        Some(DraggableArea {
                            tick_range: Some(Range {
                                min: tick_offset,
                                max: selection_smallest_left.min(note_smallest_left),
                            }),
                            note_number_range: Some(Range::point(selection.from_note_number)),
                        })
                    }
                    DragPosition::Right => {
                        let max_duration = notes
                            .iter()
                            .filter_map(|e| e.duration())
                            .fold(0.0, f64::max);
                        let selection_smallest_right = selection.from_tick + min_length;
                        let note_smallest_right = selection.to_tick - (max_duration - min_length);
                        Some(DraggableArea {
                            tick_range: Some(Range {
                                min: selection_smallest_right.max(note_smallest_right),
                                max: f64::INFINITY,
                            }),
                            note_number_range: Some(Range::point(selection.from_note_number)),
                        })
                    }
                }
            }
        }
    }

    pub fn update(&mut self, draggable: Draggable, position: PartialNotePoint) {
        match draggable {
            Draggable::Note { note_id, position: handle } => {
                let Some(event) = self.note(note_id).copied() else {
                    return;
                };
                let Some(note) = event.as_note().copied() else {
                    return;
                };
                match handle {
                    DragPosition::Center => {
                        self.track.update_event(
                            note_id,
                            EventUpdate {
                                tick: position.tick,
                                note_number: position.note_number.map(|n| n.round() as i32),
                                ..Default::default()
                            },
                        );
                    }
                    DragPosition::Left => {
                        // the dragged edge moves; the right end stays pinned
                        let Some(tick) = position.tick else {
                            return;
                        };
                        self.track.update_event(
                            note_id,
                            EventUpdate {
                                tick: Some(tick),
                                duration: Some(note.duration + event.tick - tick),
                                ..Default::default()
                            },
                        );
                    }
                    DragPosition::Right => {
                        let Some(tick) = position.tick else {
                            return;
                        };
                        self.track.update_event(
                            note_id,
                            EventUpdate {
                                duration: Some(tick - event.tick),
                                ..Default::default()
                            },
                        );
                    }
                }
            }
            Draggable::Selection { position: handle } => {
                let Some(selection) = *self.selection else {
                    return;
                };
                match handle {
                    DragPosition::Center => {
                        let from = selection.from_position();
                        let target = NotePoint {
                            tick: position.tick.unwrap_or(from.tick),
                            note_number: position.note_number.unwrap_or(from.note_number),
                        };
                        let delta = target.sub(from);
                        *self.selection = Some(selection.moved(delta.tick, delta.note_number));
                    }
                    DragPosition::Left => {
                        let Some(tick) = position.tick else {
                            return;
                        };
                        *self.selection = Some(Selection {
                            from_tick: tick,
                            ..selection
                        });
                    }
                    DragPosition::Right => {
                        let Some(tick) = position.tick else {
                            return;
                        };
                        *self.selection = Some(Selection {
                            to_tick: tick,
                            ..selection
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventBody, NoteEvent};

    fn track_with_notes(notes: &[(f64, f64, i32)]) -> (Track, Vec<EventId>) {
        let mut track = Track::new(1, "MIDI 1", Some(0));
        let ids = notes
            .iter()
            .map(|&(tick, duration, note_number)| {
                track
                    .add_event(
                        tick,
                        EventBody::Note(NoteEvent {
                            duration,
                            note_number,
                            velocity: 100,
                        }),
                    )
                    .id
            })
            .collect();
        (track, ids)
    }

    #[test]
    fn note_right_position_is_end_tick() {
        let (mut track, ids) = track_with_notes(&[(100.0, 50.0, 60)]);
        let mut selection = None;
        let ctx = DragContext {
            track: &mut track,
            selection: &mut selection,
            selected_note_ids: &ids,
        };
        let right = ctx
            .position(Draggable::Note {
                note_id: ids[0],
                position: DragPosition::Right,
            })
            .unwrap();
        assert_eq!(right.tick, 150.0);
        assert_eq!(right.note_number, 60.0);
    }

    #[test]
    fn vanished_referent_resolves_to_none() {
        let (mut track, _) = track_with_notes(&[]);
        let mut selection = None;
        let mut ctx = DragContext {
            track: &mut track,
            selection: &mut selection,
            selected_note_ids: &[],
        };
        let missing = Draggable::Note {
            note_id: 999,
            position: DragPosition::Center,
        };
        assert_eq!(ctx.position(missing), None);
        assert_eq!(ctx.area(missing, 10.0), None);
        ctx.update(missing, PartialNotePoint::default()); // silent no-op
        assert_eq!(
            ctx.position(Draggable::Selection {
                position: DragPosition::Center
            }),
            None
        );
    }

    #[test]
    fn center_area_bounds_group_by_member_offsets() {
        // dragging the note at tick 100 while a sibling sits at tick 40
        let (mut track, ids) = track_with_notes(&[(100.0, 50.0, 60), (40.0, 30.0, 72)]);
        let mut selection = None;
        let ctx = DragContext {
            track: &mut track,
            selection: &mut selection,
            selected_note_ids: &ids,
        };
        let area = ctx
            .area(
                Draggable::Note {
                    note_id: ids[0],
                    position: DragPosition::Center,
                },
                10.0,
            )
            .unwrap();
        let ticks = area.tick_range.unwrap();
        assert_eq!(ticks.min, 60.0); // sibling at 40 cannot go below 0
        assert_eq!(ticks.max, f64::INFINITY);
        let notes = area.note_number_range.unwrap();
        assert_eq!(notes.min, 0.0); // this note is the lowest member
        assert_eq!(notes.max, 115.0); // sibling at 72 caps the rise
    }

    #[test]
    fn left_edge_area_preserves_min_length_and_pins_pitch() {
        let (mut track, ids) = track_with_notes(&[(100.0, 50.0, 60)]);
        let mut selection = None;
        let ctx = DragContext {
            track: &mut track,
            selection: &mut selection,
            selected_note_ids: &ids,
        };
        let area = ctx
            .area(
                Draggable::Note {
                    note_id: ids[0],
                    position: DragPosition::Left,
                },
                10.0,
            )
            .unwrap();
        let ticks = area.tick_range.unwrap();
        assert_eq!(ticks.min, 0.0); // the group's leftmost member is the note itself
        assert_eq!(ticks.max, 140.0);
        assert_eq!(area.note_number_range.unwrap(), Range::point(60.0));
    }

    #[test]
    fn left_edge_update_pins_right_end() {
        let (mut track, ids) = track_with_notes(&[(100.0, 50.0, 60)]);
        let mut selection = None;
        let mut ctx = DragContext {
            track: &mut track,
            selection: &mut selection,
            selected_note_ids: &ids,
        };
        ctx.update(
            Draggable::Note {
                note_id: ids[0],
                position: DragPosition::Left,
            },
            PartialNotePoint {
                tick: Some(120.0),
                note_number: None,
            },
        );
        let event = track.get_event_by_id(ids[0]).unwrap();
        assert_eq!(event.tick, 120.0);
        assert_eq!(event.as_note().unwrap().duration, 30.0);
    }

    #[test]
    fn right_edge_update_rewrites_duration() {
        let (mut track, ids) = track_with_notes(&[(100.0, 50.0, 60)]);
        let mut selection = None;
        let mut ctx = DragContext {
            track: &mut track,
            selection: &mut selection,
            selected_note_ids: &ids,
        };
        ctx.update(
            Draggable::Note {
                note_id: ids[0],
                position: DragPosition::Right,
            },
            PartialNotePoint {
                tick: Some(190.0),
                note_number: None,
            },
        );
        let event = track.get_event_by_id(ids[0]).unwrap();
        assert_eq!(event.tick, 100.0);
        assert_eq!(event.as_note().unwrap().duration, 90.0);
    }

    #[test]
    fn selection_left_edge_accounts_for_longest_note() {
        let (mut track, ids) = track_with_notes(&[(100.0, 200.0, 60), (150.0, 20.0, 62)]);
        let mut selection = Some(Selection {
            from_tick: 100.0,
            from_note_number: 70.0,
            to_tick: 300.0,
            to_note_number: 55.0,
        });
        let ctx = DragContext {
            track: &mut track,
            selection: &mut selection,
            selected_note_ids: &ids,
        };
        let area = ctx
            .area(
                Draggable::Selection {
                    position: DragPosition::Left,
                },
                10.0,
            )
            .unwrap();
        let ticks = area.tick_range.unwrap();
        assert_eq!(ticks.min, 0.0);
        // from_tick + (max_duration - min_length) = 100 + 190 = 290 binds
        assert_eq!(ticks.max, 290.0);
    }

    #[test]
    fn selection_center_update_translates_whole_rectangle() {
        let (mut track, ids) = track_with_notes(&[]);
        let mut selection = Some(Selection {
            from_tick: 100.0,
            from_note_number: 70.0,
            to_tick: 200.0,
            to_note_number: 60.0,
        });
        let mut ctx = DragContext {
            track: &mut track,
            selection: &mut selection,
            selected_note_ids: &ids,
        };
        ctx.update(
            Draggable::Selection {
                position: DragPosition::Center,
            },
            PartialNotePoint {
                tick: Some(150.0),
                note_number: Some(72.0),
            },
        );
        let moved = selection.unwrap();
        assert_eq!(moved.from_tick, 150.0);
        assert_eq!(moved.to_tick, 250.0);
        assert_eq!(moved.from_note_number, 72.0);
        assert_eq!(moved.to_note_number, 62.0);
    }
}
