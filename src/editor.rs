use serde::{Deserialize, Serialize};

use crate::edit_actions;
use crate::gesture::arrange::{ArrangeState, ArrangeViewState};
use crate::gesture::control::{ControlPaneState, ControlPaneViewState};
use crate::gesture::piano_roll::{PianoRollState, PianoRollViewState};
use crate::gesture::tempo::{TempoGraphState, TempoGraphViewState};
use crate::history::History;
use crate::model::Song;
use crate::quantizer::Quantizer;

/// Opaque full snapshot of song content plus every view-state holder, taken
/// just before the first mutating step of a user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSnapshot {
    pub song: Song,
    pub piano_roll: PianoRollViewState,
    pub arrange: ArrangeViewState,
    pub tempo: TempoGraphViewState,
    pub control: ControlPaneViewState,
}

/// The explicit state container shared by all editors. Gesture handlers and
/// commands mutate it directly and synchronously; there is no transaction
/// layer below a full history snapshot.
#[derive(Debug, Default)]
pub struct Editor {
    pub song: Song,
    pub piano_roll: PianoRollState,
    pub arrange: ArrangeState,
    pub tempo: TempoGraphState,
    pub control: ControlPaneState,
    pub history: History<EditorSnapshot>,
}

impl Editor {
    pub fn new() -> Self {
        let mut editor = Self::default();
        // point the piano roll at the first editable track
        if let Some(track) = editor.song.tracks.iter().find(|t| t.channel.is_some()) {
            editor.piano_roll.view.selected_track_id = track.id;
        }
        editor
    }

    pub fn serialize_state(&self) -> EditorSnapshot {
        EditorSnapshot {
            song: self.song.clone(),
            piano_roll: self.piano_roll.view.clone(),
            arrange: self.arrange.view.clone(),
            tempo: self.tempo.view.clone(),
            control: self.control.view.clone(),
        }
    }

    pub fn restore_state(&mut self, snapshot: EditorSnapshot) {
        self.song = snapshot.song;
        self.piano_roll.view = snapshot.piano_roll;
        self.arrange.view = snapshot.arrange;
        self.tempo.view = snapshot.tempo;
        self.control.view = snapshot.control;
    }

    /// Snapshot the current state onto the undo stack. Called exactly once
    /// per logical action, before its first mutation.
    pub fn push_history(&mut self) {
        let snapshot = self.serialize_state();
        self.history.push(snapshot);
    }

    pub fn undo(&mut self) {
        if let Some(snapshot) = self.history.undo(self.serialize_state()) {
            self.restore_state(snapshot);
        }
    }

    pub fn redo(&mut self) {
        if let Some(snapshot) = self.history.redo(self.serialize_state()) {
            self.restore_state(snapshot);
        }
    }

    pub fn has_undo(&self) -> bool {
        self.history.has_undo()
    }

    pub fn has_redo(&self) -> bool {
        self.history.has_redo()
    }

    /// Replaces the current document and drops both history stacks.
    pub fn set_song(&mut self, song: Song) {
        self.song = song;
        self.piano_roll.view.selection = None;
        self.piano_roll.view.selected_note_ids.clear();
        self.arrange.view.selection = None;
        self.arrange.view.selected_event_ids.clear();
        self.tempo.view.selection = None;
        self.tempo.view.selected_event_ids.clear();
        self.control.view.selection = None;
        self.control.view.selected_event_ids.clear();
        if let Some(track) = self.song.tracks.iter().find(|t| t.channel.is_some()) {
            self.piano_roll.view.selected_track_id = track.id;
        }
        self.history.clear();
    }

    /* selection commands */

    pub fn transpose_selection(&mut self, delta_pitch: i32) {
        if self.piano_roll.view.selected_note_ids.is_empty() {
            return;
        }
        self.push_history();
        if let Some(selection) = self.piano_roll.view.selection {
            self.piano_roll.view.selection = Some(selection.moved(0.0, delta_pitch as f64));
        }
        let ids = self.piano_roll.view.selected_note_ids.clone();
        if let Some(track) = self.song.get_track_mut(self.piano_roll.view.selected_track_id) {
            edit_actions::transpose_notes(track, &ids, delta_pitch);
        }
    }

    /// Explicit quantize command; snaps even when live quantization is off.
    pub fn quantize_selected_notes(&mut self) {
        if self.piano_roll.view.selected_note_ids.is_empty() {
            return;
        }
        self.push_history();
        let measures = self.song.measures();
        let quantizer = Quantizer::new(&measures, self.song.timebase, self.piano_roll.quantize);
        let ids = self.piano_roll.view.selected_note_ids.clone();
        let track_id = self.piano_roll.view.selected_track_id;
        let Some(track) = self.song.get_track_mut(track_id) else {
            return;
        };
        edit_actions::quantize_notes(track, &ids, &quantizer);
    }

    pub fn set_selection_velocity(&mut self, velocity: i32) {
        if self.piano_roll.view.selected_note_ids.is_empty() {
            return;
        }
        self.push_history();
        let ids = self.piano_roll.view.selected_note_ids.clone();
        if let Some(track) = self.song.get_track_mut(self.piano_roll.view.selected_track_id) {
            edit_actions::set_notes_velocity(track, &ids, velocity);
        }
        self.piano_roll.new_note_velocity = velocity;
    }

    pub fn delete_selection(&mut self) {
        if self.piano_roll.view.selected_note_ids.is_empty()
            && self.piano_roll.view.selection.is_none()
        {
            return;
        }
        self.push_history();
        let ids = self.piano_roll.view.selected_note_ids.clone();
        if let Some(track) = self.song.get_track_mut(self.piano_roll.view.selected_track_id) {
            edit_actions::delete_notes(track, &ids);
        }
        self.piano_roll.view.selected_note_ids.clear();
        self.piano_roll.view.selection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventBody, NoteEvent};

    fn add_note(editor: &mut Editor, tick: f64, note_number: i32) -> u64 {
        let track_id = editor.piano_roll.view.selected_track_id;
        editor
            .song
            .get_track_mut(track_id)
            .unwrap()
            .add_event(
                tick,
                EventBody::Note(NoteEvent {
                    duration: 240.0,
                    note_number,
                    velocity: 100,
                }),
            )
            .id
    }

    #[test]
    fn undo_restores_exact_pre_mutation_state() {
        let mut editor = Editor::new();
        add_note(&mut editor, 0.0, 60);
        let state0 = editor.serialize_state();

        editor.push_history();
        add_note(&mut editor, 480.0, 64);
        let state1 = editor.serialize_state();
        assert_ne!(state0, state1);

        editor.undo();
        assert_eq!(editor.serialize_state(), state0);

        editor.redo();
        assert_eq!(editor.serialize_state(), state1);
    }

    #[test]
    fn undo_on_empty_stack_is_noop() {
        let mut editor = Editor::new();
        let state = editor.serialize_state();
        editor.undo();
        editor.redo();
        assert_eq!(editor.serialize_state(), state);
    }

    #[test]
    fn new_document_clears_history() {
        let mut editor = Editor::new();
        editor.push_history();
        assert!(editor.has_undo());
        editor.set_song(Song::default());
        assert!(!editor.has_undo());
        assert!(!editor.has_redo());
    }

    #[test]
    fn snapshot_covers_view_state() {
        let mut editor = Editor::new();
        let id = add_note(&mut editor, 0.0, 60);

        editor.push_history();
        editor.piano_roll.view.selected_note_ids = vec![id];
        editor.transpose_selection(2);

        // two actions: the explicit push and the transpose's own push
        editor.undo();
        editor.undo();
        assert!(editor.piano_roll.view.selected_note_ids.is_empty());
    }

    #[test]
    fn transpose_moves_selection_rectangle_with_notes() {
        let mut editor = Editor::new();
        let id = add_note(&mut editor, 0.0, 60);
        editor.piano_roll.view.selected_note_ids = vec![id];
        editor.piano_roll.view.selection = Some(crate::selection::Selection {
            from_tick: 0.0,
            from_note_number: 61.0,
            to_tick: 240.0,
            to_note_number: 59.0,
        });
        editor.transpose_selection(5);
        let selection = editor.piano_roll.view.selection.unwrap();
        assert_eq!(selection.from_note_number, 66.0);
        let track_id = editor.piano_roll.view.selected_track_id;
        let note = *editor
            .song
            .get_track(track_id)
            .unwrap()
            .get_event_by_id(id)
            .unwrap()
            .as_note()
            .unwrap();
        assert_eq!(note.note_number, 65);
    }

    #[test]
    fn delete_selection_removes_notes_and_clears_state() {
        let mut editor = Editor::new();
        let id = add_note(&mut editor, 0.0, 60);
        editor.piano_roll.view.selected_note_ids = vec![id];
        editor.delete_selection();
        let track_id = editor.piano_roll.view.selected_track_id;
        assert!(
            editor
                .song
                .get_track(track_id)
                .unwrap()
                .events()
                .is_empty()
        );
        assert!(editor.piano_roll.view.selected_note_ids.is_empty());

        editor.undo();
        assert_eq!(
            editor
                .song
                .get_track(editor.piano_roll.view.selected_track_id)
                .unwrap()
                .events()
                .len(),
            1
        );
    }
}
