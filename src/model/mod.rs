pub mod event;
pub mod measure;
pub mod song;
pub mod track;

pub use event::{
    ControllerEvent, EventBody, EventId, EventUpdate, NoteEvent, TempoEvent, TimeSignatureEvent,
    TrackEvent,
};
pub use measure::{Measure, MeasureStart};
pub use song::Song;
pub use track::{Track, TrackId};
