use serde::{Deserialize, Serialize};

use crate::constants::MAX_NOTE_NUMBER;
use crate::geometry::Range;

pub type EventId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub duration: f64,
    pub note_number: i32,
    pub velocity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerEvent {
    pub controller_type: u8,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEvent {
    pub microseconds_per_beat: f64,
}

impl TempoEvent {
    pub fn from_bpm(bpm: f64) -> Self {
        Self {
            microseconds_per_beat: bpm_to_usec_per_beat(bpm).floor(),
        }
    }

    pub fn bpm(&self) -> f64 {
        usec_per_beat_to_bpm(self.microseconds_per_beat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSignatureEvent {
    pub numerator: u32,
    pub denominator: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EventBody {
    Note(NoteEvent),
    Controller(ControllerEvent),
    Tempo(TempoEvent),
    TimeSignature(TimeSignatureEvent),
}

impl EventBody {
    /// Two bodies occupy the same single-valued lane when they are the same
    /// kind of event (and, for controllers, the same controller number).
    pub fn same_lane(&self, other: &EventBody) -> bool {
        match (self, other) {
            (EventBody::Note(_), EventBody::Note(_)) => true,
            (EventBody::Controller(a), EventBody::Controller(b)) => {
                a.controller_type == b.controller_type
            }
            (EventBody::Tempo(_), EventBody::Tempo(_)) => true,
            (EventBody::TimeSignature(_), EventBody::TimeSignature(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackEvent {
    pub id: EventId,
    pub tick: f64,
    pub body: EventBody,
}

impl TrackEvent {
    pub fn is_note(&self) -> bool {
        matches!(self.body, EventBody::Note(_))
    }

    pub fn as_note(&self) -> Option<&NoteEvent> {
        match &self.body {
            EventBody::Note(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_controller(&self) -> Option<&ControllerEvent> {
        match &self.body {
            EventBody::Controller(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_tempo(&self) -> Option<&TempoEvent> {
        match &self.body {
            EventBody::Tempo(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_time_signature(&self) -> Option<&TimeSignatureEvent> {
        match &self.body {
            EventBody::TimeSignature(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.as_note().map(|n| n.duration)
    }

    /// Tick at which the event stops occupying the timeline.
    pub fn end_tick(&self) -> f64 {
        self.tick + self.duration().unwrap_or(0.0)
    }
}

/// Partial update applied to an event. Fields that do not apply to the
/// event's kind are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EventUpdate {
    pub tick: Option<f64>,
    pub duration: Option<f64>,
    pub note_number: Option<i32>,
    pub velocity: Option<i32>,
    pub value: Option<i32>,
    pub microseconds_per_beat: Option<f64>,
}

impl EventUpdate {
    pub fn tick(tick: f64) -> Self {
        Self {
            tick: Some(tick),
            ..Default::default()
        }
    }

    /// Returns the updated event, clamped into committable range.
    pub(crate) fn applied_to(&self, event: &TrackEvent) -> TrackEvent {
        let mut updated = *event;
        if let Some(tick) = self.tick {
            updated.tick = tick.max(0.0);
        }
        match &mut updated.body {
            EventBody::Note(n) => {
                if let Some(duration) = self.duration {
                    n.duration = duration.max(0.0);
                }
                if let Some(note_number) = self.note_number {
                    n.note_number = note_number.clamp(0, MAX_NOTE_NUMBER);
                }
                if let Some(velocity) = self.velocity {
                    n.velocity = velocity.clamp(0, 127);
                }
            }
            EventBody::Controller(c) => {
                if let Some(value) = self.value {
                    c.value = value;
                }
            }
            EventBody::Tempo(t) => {
                if let Some(usec) = self.microseconds_per_beat {
                    t.microseconds_per_beat = usec;
                }
            }
            EventBody::TimeSignature(_) => {}
        }
        updated
    }
}

/// Containment by tick only, even for duration-bearing events.
pub fn is_event_in_range(event: &TrackEvent, range: &Range) -> bool {
    range.contains(event.tick)
}

/// Half-open overlap for duration-bearing events, containment otherwise.
pub fn is_event_overlap_range(event: &TrackEvent, range: &Range) -> bool {
    match event.duration() {
        Some(duration) => range.intersects(&Range {
            min: event.tick,
            max: event.tick + duration,
        }),
        None => range.contains(event.tick),
    }
}

pub fn bpm_to_usec_per_beat(bpm: f64) -> f64 {
    60_000_000.0 / bpm
}

pub fn usec_per_beat_to_bpm(usec_per_beat: f64) -> f64 {
    60_000_000.0 / usec_per_beat
}
