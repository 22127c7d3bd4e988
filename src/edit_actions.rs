use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coords::ArrangePoint;
use crate::model::event::{bpm_to_usec_per_beat, usec_per_beat_to_bpm};
use crate::model::{ControllerEvent, EventBody, EventId, EventUpdate, Song, TempoEvent, Track};
use crate::quantizer::Quantizer;

/// Single-valued event lane targeted by pencil edits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ValueLane {
    Controller { controller_type: u8 },
    Tempo,
}

impl ValueLane {
    pub fn matches(&self, body: &EventBody) -> bool {
        match (self, body) {
            (ValueLane::Controller { controller_type }, EventBody::Controller(c)) => {
                c.controller_type == *controller_type
            }
            (ValueLane::Tempo, EventBody::Tempo(_)) => true,
            _ => false,
        }
    }

    /// For tempo lanes the painted value is a BPM.
    pub fn make_body(&self, value: f64) -> EventBody {
        match self {
            ValueLane::Controller { controller_type } => EventBody::Controller(ControllerEvent {
                controller_type: *controller_type,
                value: value.floor() as i32,
            }),
            ValueLane::Tempo => EventBody::Tempo(TempoEvent {
                microseconds_per_beat: bpm_to_usec_per_beat(value).floor(),
            }),
        }
    }
}

pub fn transpose_notes(track: &mut Track, note_ids: &[EventId], delta_pitch: i32) {
    let updates: Vec<(EventId, EventUpdate)> = note_ids
        .iter()
        .filter_map(|&id| {
            let note = track.get_event_by_id(id)?.as_note()?;
            Some((
                id,
                EventUpdate {
                    note_number: Some(note.note_number + delta_pitch),
                    ..Default::default()
                },
            ))
        })
        .collect();
    track.update_events(&updates);
}

pub fn set_notes_velocity(track: &mut Track, note_ids: &[EventId], velocity: i32) {
    let updates: Vec<(EventId, EventUpdate)> = note_ids
        .iter()
        .map(|&id| {
            (
                id,
                EventUpdate {
                    velocity: Some(velocity),
                    ..Default::default()
                },
            )
        })
        .collect();
    track.update_events(&updates);
}

/// Explicit quantize command: always snaps, even when live quantization is
/// disabled.
pub fn quantize_notes(track: &mut Track, note_ids: &[EventId], quantizer: &Quantizer) {
    let updates: Vec<(EventId, EventUpdate)> = note_ids
        .iter()
        .filter_map(|&id| {
            let event = track.get_event_by_id(id)?;
            event.as_note()?;
            Some((id, EventUpdate::tick(quantizer.force_round(event.tick))))
        })
        .collect();
    track.update_events(&updates);
}

/// Copies the given notes in place and returns the new ids; used by
/// duplicate-drag, which then moves the copies.
pub fn duplicate_notes(track: &mut Track, note_ids: &[EventId]) -> Vec<EventId> {
    let copies: Vec<(f64, EventBody)> = note_ids
        .iter()
        .filter_map(|&id| {
            let event = track.get_event_by_id(id)?;
            event.as_note()?;
            Some((event.tick, event.body))
        })
        .collect();
    track.add_events(copies)
}

pub fn delete_notes(track: &mut Track, note_ids: &[EventId]) {
    track.remove_events(note_ids);
}

/// Pencil painting: replaces the lane's events across the dragged range with
/// linearly interpolated values on the quantize-floor grid. The event placed
/// at the drag's start tick survives so the press-created event is not
/// erased by its own drag.
#[allow(clippy::too_many_arguments)]
pub fn update_events_in_range(
    track: &mut Track,
    lane: ValueLane,
    quantizer: &Quantizer,
    start_value: f64,
    end_value: f64,
    start_tick: f64,
    end_tick: f64,
) {
    let min_tick = start_tick.min(end_tick);
    let max_tick = start_tick.max(end_tick);
    let quantized_start = quantizer.floor(min_tick.max(0.0));
    let quantized_end = quantizer.floor(max_tick.max(0.0));

    let min_value = start_value.min(end_value);
    let max_value = start_value.max(end_value);

    let value_at = |tick: f64| -> f64 {
        if end_tick == start_tick {
            end_value
        } else {
            let interpolated =
                (tick - start_tick) / (end_tick - start_tick) * (end_value - start_value)
                    + start_value;
            interpolated.clamp(min_value, max_value).floor()
        }
    };

    let remove_from = min_tick.min(quantized_start);
    let remove_to = max_tick.max(quantized_end);
    let stale: Vec<EventId> = track
        .events()
        .iter()
        .filter(|e| {
            lane.matches(&e.body)
                && e.tick != start_tick
                && e.tick >= remove_from
                && e.tick <= remove_to
        })
        .map(|e| e.id)
        .collect();
    track.remove_events(&stale);

    let unit = quantizer.unit();
    if unit <= 0.0 {
        return;
    }
    let mut tick = quantized_start;
    while tick <= quantized_end {
        track.create_or_update(tick, lane.make_body(value_at(tick)));
        tick += unit;
    }
}

/// Applies a tick/BPM delta to the given tempo events, clamping BPM into
/// `[0, max_bpm]` and flooring committed ticks.
pub fn move_tempo_events(
    track: &mut Track,
    event_ids: &[EventId],
    delta_tick: f64,
    delta_bpm: f64,
    max_bpm: f64,
) {
    let updates: Vec<(EventId, EventUpdate)> = event_ids
        .iter()
        .filter_map(|&id| {
            let event = track.get_event_by_id(id)?;
            let tempo = event.as_tempo()?;
            let bpm = (usec_per_beat_to_bpm(tempo.microseconds_per_beat) + delta_bpm)
                .clamp(0.0, max_bpm);
            Some((
                id,
                EventUpdate {
                    tick: Some((event.tick + delta_tick).floor().max(0.0)),
                    microseconds_per_beat: Some(bpm_to_usec_per_beat(bpm).floor()),
                    ..Default::default()
                },
            ))
        })
        .collect();
    track.update_events(&updates);
}

/// Moves the arrange selection's events by a tick/track delta. Crossing a
/// track boundary re-homes the events, which assigns fresh ids in the
/// destination track; the returned map carries the ids now selected.
pub fn move_events_between_tracks(
    song: &mut Song,
    event_ids_by_track: &BTreeMap<usize, Vec<EventId>>,
    delta: ArrangePoint,
) -> BTreeMap<usize, Vec<EventId>> {
    let delta_track = delta.track_index as i64;
    if delta_track == 0 {
        for (&track_index, ids) in event_ids_by_track {
            let Some(track) = song.track_at_mut(track_index) else {
                continue;
            };
            let updates: Vec<(EventId, EventUpdate)> = ids
                .iter()
                .filter_map(|&id| {
                    let event = track.get_event_by_id(id)?;
                    Some((id, EventUpdate::tick(event.tick + delta.tick)))
                })
                .collect();
            track.update_events(&updates);
        }
        return event_ids_by_track.clone();
    }

    let mut moved = BTreeMap::new();
    for (&track_index, ids) in event_ids_by_track {
        let destination_index = track_index as i64 + delta_track;
        if destination_index < 0 {
            continue;
        }
        let destination_index = destination_index as usize;
        if destination_index >= song.tracks.len() {
            continue;
        }

        let events: Vec<(f64, EventBody)> = {
            let Some(source) = song.track_at(track_index) else {
                continue;
            };
            ids.iter()
                .filter_map(|&id| {
                    let event = source.get_event_by_id(id)?;
                    Some((event.tick + delta.tick, event.body))
                })
                .collect()
        };

        if let Some(source) = song.track_at_mut(track_index) {
            source.remove_events(ids);
        }
        if let Some(destination) = song.track_at_mut(destination_index) {
            let new_ids = destination.add_events(events);
            moved.insert(destination_index, new_ids);
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Measure, NoteEvent};
    use crate::quantizer::QuantizeSettings;

    const TB: u32 = 480;

    fn note_body(note_number: i32) -> EventBody {
        EventBody::Note(NoteEvent {
            duration: 120.0,
            note_number,
            velocity: 100,
        })
    }

    #[test]
    fn transpose_clamps_at_scale_bounds() {
        let mut track = Track::new(1, "MIDI 1", Some(0));
        let a = track.add_event(0.0, note_body(120)).id;
        let b = track.add_event(10.0, note_body(60)).id;
        transpose_notes(&mut track, &[a, b], 12);
        assert_eq!(
            track.get_event_by_id(a).unwrap().as_note().unwrap().note_number,
            127
        );
        assert_eq!(
            track.get_event_by_id(b).unwrap().as_note().unwrap().note_number,
            72
        );
    }

    #[test]
    fn quantize_command_snaps_even_when_disabled() {
        let measures = Measure::from_time_signatures(&[], TB);
        let quantizer = Quantizer::new(
            &measures,
            TB,
            QuantizeSettings {
                divisor: 4,
                enabled: false,
            },
        );
        let mut track = Track::new(1, "MIDI 1", Some(0));
        let id = track.add_event(700.0, note_body(60)).id;
        quantize_notes(&mut track, &[id], &quantizer);
        assert_eq!(track.get_event_by_id(id).unwrap().tick, 480.0);
    }

    #[test]
    fn duplicate_copies_in_place() {
        let mut track = Track::new(1, "MIDI 1", Some(0));
        let id = track.add_event(100.0, note_body(60)).id;
        let new_ids = duplicate_notes(&mut track, &[id]);
        assert_eq!(new_ids.len(), 1);
        assert_ne!(new_ids[0], id);
        let copy = track.get_event_by_id(new_ids[0]).unwrap();
        assert_eq!(copy.tick, 100.0);
        assert_eq!(copy.as_note().unwrap().note_number, 60);
    }

    #[test]
    fn paint_range_interpolates_on_grid() {
        let measures = Measure::from_time_signatures(&[], TB);
        let quantizer = Quantizer::new(
            &measures,
            TB,
            QuantizeSettings {
                divisor: 4,
                enabled: true,
            },
        );
        let mut track = Track::new(1, "MIDI 1", Some(0));
        let lane = ValueLane::Controller { controller_type: 7 };
        update_events_in_range(&mut track, lane, &quantizer, 0.0, 96.0, 0.0, 960.0);

        let values: Vec<(f64, i32)> = track
            .events()
            .iter()
            .map(|e| (e.tick, e.as_controller().unwrap().value))
            .collect();
        assert_eq!(values, vec![(0.0, 0), (480.0, 48), (960.0, 96)]);
    }

    #[test]
    fn paint_range_replaces_covered_events_but_keeps_start() {
        let measures = Measure::from_time_signatures(&[], TB);
        let quantizer = Quantizer::new(
            &measures,
            TB,
            QuantizeSettings {
                divisor: 4,
                enabled: true,
            },
        );
        let mut track = Track::new(1, "MIDI 1", Some(0));
        let lane = ValueLane::Controller { controller_type: 7 };
        let pressed = track.create_or_update(100.0, lane.make_body(64.0));
        let covered = track.create_or_update(700.0, lane.make_body(10.0));

        update_events_in_range(&mut track, lane, &quantizer, 64.0, 32.0, 100.0, 900.0);

        assert!(track.get_event_by_id(pressed.id).is_some());
        assert!(track.get_event_by_id(covered.id).is_none());
    }

    #[test]
    fn tempo_move_clamps_bpm() {
        let mut track = Track::new(0, "Conductor", None);
        let id = track
            .add_event(480.0, EventBody::Tempo(TempoEvent::from_bpm(300.0)))
            .id;
        move_tempo_events(&mut track, &[id], 123.4, 100.0, 320.0);
        let event = track.get_event_by_id(id).unwrap();
        assert_eq!(event.tick, 603.0);
        assert_eq!(event.as_tempo().unwrap().bpm().round(), 320.0);
    }

    #[test]
    fn cross_track_move_rehomes_events() {
        let mut song = Song::empty();
        song.add_track(Track::new(0, "A", Some(0)));
        song.add_track(Track::new(0, "B", Some(1)));
        let id = song
            .track_at_mut(1)
            .unwrap()
            .add_event(100.0, note_body(60))
            .id;

        let mut selected = BTreeMap::new();
        selected.insert(1usize, vec![id]);
        let moved = move_events_between_tracks(
            &mut song,
            &selected,
            ArrangePoint {
                tick: 50.0,
                track_index: 1.0,
            },
        );

        assert!(song.track_at(1).unwrap().events().is_empty());
        let destination = song.track_at(2).unwrap();
        assert_eq!(destination.events().len(), 1);
        assert_eq!(destination.events()[0].tick, 150.0);
        assert_eq!(moved[&2].len(), 1);
    }

    #[test]
    fn same_track_move_keeps_ids() {
        let mut song = Song::empty();
        song.add_track(Track::new(0, "A", Some(0)));
        let id = song
            .track_at_mut(1)
            .unwrap()
            .add_event(100.0, note_body(60))
            .id;
        let mut selected = BTreeMap::new();
        selected.insert(1usize, vec![id]);
        let moved = move_events_between_tracks(
            &mut song,
            &selected,
            ArrangePoint {
                tick: -150.0,
                track_index: 0.0,
            },
        );
        assert_eq!(moved[&1], vec![id]);
        // committed ticks clamp at zero
        assert_eq!(song.track_at(1).unwrap().events()[0].tick, 0.0);
    }
}
