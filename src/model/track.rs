use serde::{Deserialize, Serialize};

use super::event::{EventBody, EventId, EventUpdate, TrackEvent};

pub type TrackId = u64;

/// A single track's event store. Events are kept ordered by tick; ids are
/// assigned by the store, monotonically increasing, and never reused within
/// a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// MIDI channel. `None` marks the conductor track, which carries tempo
    /// and time-signature events and is not editable in the piano roll.
    pub channel: Option<u8>,
    pub is_rhythm_track: bool,
    events: Vec<TrackEvent>,
    next_event_id: EventId,
    #[serde(skip)]
    revision: u64,
}

impl Track {
    pub fn new(id: TrackId, name: impl Into<String>, channel: Option<u8>) -> Self {
        Self {
            id,
            name: name.into(),
            channel,
            is_rhythm_track: channel == Some(9),
            events: Vec::new(),
            next_event_id: 1,
            revision: 0,
        }
    }

    pub fn conductor(id: TrackId) -> Self {
        Self::new(id, "Conductor", None)
    }

    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    /// Bumped on every mutation; the change-notification hook consumed by
    /// windowed views.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get_event_by_id(&self, id: EventId) -> Option<&TrackEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn add_event(&mut self, tick: f64, body: EventBody) -> TrackEvent {
        let event = TrackEvent {
            id: self.next_event_id,
            tick: tick.max(0.0),
            body,
        };
        self.next_event_id += 1;
        self.events.push(event);
        self.sort_events();
        self.touch();
        event
    }

    pub fn add_events(&mut self, events: impl IntoIterator<Item = (f64, EventBody)>) -> Vec<EventId> {
        let ids = events
            .into_iter()
            .map(|(tick, body)| {
                let event = TrackEvent {
                    id: self.next_event_id,
                    tick: tick.max(0.0),
                    body,
                };
                self.next_event_id += 1;
                self.events.push(event);
                event.id
            })
            .collect();
        self.sort_events();
        self.touch();
        ids
    }

    /// Applies a partial update. Returns the updated event, or `None` when
    /// the id is unknown or the update changes nothing.
    pub fn update_event(&mut self, id: EventId, update: EventUpdate) -> Option<TrackEvent> {
        let Some(index) = self.events.iter().position(|e| e.id == id) else {
            log::warn!("unknown event id: {id}");
            return None;
        };
        let updated = update.applied_to(&self.events[index]);
        if updated == self.events[index] {
            return None;
        }
        self.events[index] = updated;
        self.sort_events();
        self.touch();
        Some(updated)
    }

    pub fn update_events(&mut self, updates: &[(EventId, EventUpdate)]) {
        let mut changed = false;
        for (id, update) in updates {
            let Some(index) = self.events.iter().position(|e| e.id == *id) else {
                continue;
            };
            let updated = update.applied_to(&self.events[index]);
            if updated != self.events[index] {
                self.events[index] = updated;
                changed = true;
            }
        }
        if changed {
            self.sort_events();
            self.touch();
        }
    }

    pub fn remove_event(&mut self, id: EventId) {
        self.remove_events(&[id]);
    }

    pub fn remove_events(&mut self, ids: &[EventId]) {
        let before = self.events.len();
        self.events.retain(|e| !ids.contains(&e.id));
        if self.events.len() != before {
            self.touch();
        }
    }

    /// Events occupying the same tick and the same single-valued lane.
    pub fn redundant_event_ids(&self, tick: f64, body: &EventBody) -> Vec<EventId> {
        self.events
            .iter()
            .filter(|e| e.tick == tick && e.body.same_lane(body))
            .map(|e| e.id)
            .collect()
    }

    /// Upsert-by-tick-and-kind for single-valued lanes: an event of the same
    /// kind already at this tick is updated in place instead of duplicated.
    pub fn create_or_update(&mut self, tick: f64, body: EventBody) -> TrackEvent {
        let existing = self.redundant_event_ids(tick, &body);
        if let Some(&first) = existing.first() {
            for id in &existing {
                if let Some(index) = self.events.iter().position(|e| e.id == *id) {
                    self.events[index].body = body;
                }
            }
            self.touch();
            // the store owns ids, so the first occupant keeps its identity
            *self
                .get_event_by_id(first)
                .unwrap_or(&TrackEvent { id: first, tick, body })
        } else {
            self.add_event(tick, body)
        }
    }

    /// After a drag lands selected events on occupied ticks, drop the
    /// previous occupants (same tick, same lane, not part of the selection).
    pub fn remove_redundant_events_for_ids(&mut self, ids: &[EventId]) {
        let kept: Vec<TrackEvent> = self
            .events
            .iter()
            .filter(|e| ids.contains(&e.id))
            .copied()
            .collect();
        let mut to_remove = Vec::new();
        for e in &self.events {
            if ids.contains(&e.id) {
                continue;
            }
            if kept
                .iter()
                .any(|k| k.tick == e.tick && k.body.same_lane(&e.body))
            {
                to_remove.push(e.id);
            }
        }
        self.remove_events(&to_remove);
    }

    pub fn max_tick(&self) -> f64 {
        self.events.iter().fold(0.0, |acc, e| acc.max(e.end_tick()))
    }

    pub fn time_signatures(&self) -> Vec<(f64, u32, u32)> {
        self.events
            .iter()
            .filter_map(|e| {
                e.as_time_signature()
                    .map(|ts| (e.tick, ts.numerator, ts.denominator))
            })
            .collect()
    }

    fn sort_events(&mut self) {
        self.events.sort_by(|a, b| a.tick.total_cmp(&b.tick));
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::{ControllerEvent, NoteEvent};

    fn note_body(note_number: i32) -> EventBody {
        EventBody::Note(NoteEvent {
            duration: 120.0,
            note_number,
            velocity: 100,
        })
    }

    fn cc_body(value: i32) -> EventBody {
        EventBody::Controller(ControllerEvent {
            controller_type: 7,
            value,
        })
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut track = Track::new(1, "MIDI 1", Some(0));
        let a = track.add_event(0.0, note_body(60));
        let b = track.add_event(10.0, note_body(62));
        track.remove_event(b.id);
        let c = track.add_event(20.0, note_body(64));
        assert!(a.id < b.id);
        assert!(b.id < c.id);
    }

    #[test]
    fn events_stay_ordered_by_tick() {
        let mut track = Track::new(1, "MIDI 1", Some(0));
        track.add_event(100.0, note_body(60));
        track.add_event(0.0, note_body(62));
        let moved = track.events()[1].id;
        track.update_event(moved, EventUpdate::tick(-50.0));
        let ticks: Vec<f64> = track.events().iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0.0, 0.0]);
    }

    #[test]
    fn update_unknown_id_is_silent() {
        let mut track = Track::new(1, "MIDI 1", Some(0));
        assert_eq!(track.update_event(42, EventUpdate::tick(0.0)), None);
    }

    #[test]
    fn noop_update_returns_none_and_keeps_revision() {
        let mut track = Track::new(1, "MIDI 1", Some(0));
        let e = track.add_event(10.0, note_body(60));
        let revision = track.revision();
        assert_eq!(track.update_event(e.id, EventUpdate::tick(10.0)), None);
        assert_eq!(track.revision(), revision);
    }

    #[test]
    fn create_or_update_upserts_same_lane() {
        let mut track = Track::new(1, "MIDI 1", Some(0));
        let first = track.create_or_update(100.0, cc_body(64));
        let second = track.create_or_update(100.0, cc_body(80));
        assert_eq!(first.id, second.id);
        assert_eq!(track.events().len(), 1);
        assert_eq!(track.events()[0].as_controller().unwrap().value, 80);

        // different tick creates a new event
        track.create_or_update(200.0, cc_body(90));
        assert_eq!(track.events().len(), 2);
    }

    #[test]
    fn remove_redundant_keeps_selection() {
        let mut track = Track::new(1, "Conductor", None);
        let stale = track.add_event(480.0, EventBody::Tempo(crate::model::TempoEvent::from_bpm(100.0)));
        let dragged = track.add_event(0.0, EventBody::Tempo(crate::model::TempoEvent::from_bpm(140.0)));
        // simulate a drag landing on the stale event's tick
        track.update_event(dragged.id, EventUpdate::tick(480.0));
        track.remove_redundant_events_for_ids(&[dragged.id]);
        assert_eq!(track.events().len(), 1);
        assert_eq!(track.events()[0].id, dragged.id);
        assert!(track.get_event_by_id(stale.id).is_none());
    }

    #[test]
    fn max_tick_includes_durations() {
        let mut track = Track::new(1, "MIDI 1", Some(0));
        track.add_event(100.0, note_body(60));
        track.add_event(150.0, cc_body(0));
        assert_eq!(track.max_tick(), 220.0);
    }
}
