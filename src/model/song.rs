use serde::{Deserialize, Serialize};

use super::measure::Measure;
use super::track::{Track, TrackId};
use crate::constants::TIMEBASE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub tracks: Vec<Track>,
    pub timebase: u32,
    next_track_id: TrackId,
}

impl Default for Song {
    fn default() -> Self {
        let mut song = Self {
            tracks: Vec::new(),
            timebase: TIMEBASE,
            next_track_id: 1,
        };
        song.add_track(Track::conductor(0));
        song.add_track(Track::new(0, "MIDI 1", Some(0)));
        song
    }
}

impl Song {
    /// A song with only the conductor track.
    pub fn empty() -> Self {
        let mut song = Self {
            tracks: Vec::new(),
            timebase: TIMEBASE,
            next_track_id: 1,
        };
        song.add_track(Track::conductor(0));
        song
    }

    pub fn add_track(&mut self, mut track: Track) -> TrackId {
        track.id = self.next_track_id;
        self.next_track_id += 1;
        let id = track.id;
        self.tracks.push(track);
        id
    }

    pub fn remove_track(&mut self, id: TrackId) {
        self.tracks.retain(|t| t.id != id);
    }

    pub fn get_track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn get_track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_at_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    pub fn conductor_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.channel.is_none())
    }

    pub fn conductor_track_mut(&mut self) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.channel.is_none())
    }

    /// The measure table derived from the conductor track's time-signature
    /// events. Falls back to 4/4 when there are none.
    pub fn measures(&self) -> Vec<Measure> {
        let signatures = self
            .conductor_track()
            .map(|t| t.time_signatures())
            .unwrap_or_default();
        Measure::from_time_signatures(&signatures, self.timebase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::{EventBody, TimeSignatureEvent};

    #[test]
    fn default_song_has_conductor_and_one_track() {
        let song = Song::default();
        assert_eq!(song.tracks.len(), 2);
        assert!(song.conductor_track().is_some());
        assert!(song.tracks[1].channel.is_some());
    }

    #[test]
    fn track_ids_are_unique_after_removal() {
        let mut song = Song::empty();
        let a = song.add_track(Track::new(0, "A", Some(0)));
        song.remove_track(a);
        let b = song.add_track(Track::new(0, "B", Some(1)));
        assert_ne!(a, b);
    }

    #[test]
    fn measures_follow_conductor_time_signatures() {
        let mut song = Song::default();
        let conductor = song.conductor_track_mut().unwrap();
        conductor.add_event(
            0.0,
            EventBody::TimeSignature(TimeSignatureEvent {
                numerator: 3,
                denominator: 4,
            }),
        );
        let measures = song.measures();
        assert_eq!(measures.len(), 1);
        assert_eq!(measures[0].numerator, 3);
    }
}
