//! Piano-roll pointer handling: an explicit press/move/release state
//! machine composing the transforms, quantizer and draggable resolvers.
//!
//! All positions are content-space pixels (scroll already applied by the
//! embedder). Handlers run synchronously inside pointer events; `mouse_down`
//! always completes before any `mouse_move`, and `mouse_up` runs last.

use egui::{Modifiers, Pos2};
use serde::{Deserialize, Serialize};

use super::MouseMode;
use crate::constants::{
    DEFAULT_NEW_NOTE_VELOCITY, DEFAULT_PIXELS_PER_KEY, DEFAULT_PIXELS_PER_TICK,
    DRUM_NOTE_DURATION_DIVISOR, MAX_NOTE_NUMBER, MIN_NOTE_LENGTH, NOTE_EDGE_THRESHOLD,
    SELECTION_EDGE_THRESHOLD,
};
use crate::coords::{NoteCoordTransform, NotePoint};
use crate::draggable::{DragContext, DragPosition, Draggable};
use crate::edit_actions;
use crate::editor::Editor;
use crate::model::{EventBody, EventId, NoteEvent, TrackId};
use crate::quantizer::{QuantizeSettings, Quantizer};
use crate::selection::{Selection, events_in_selection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PianoRollViewState {
    pub selection: Option<Selection>,
    pub selected_note_ids: Vec<EventId>,
    pub selected_track_id: TrackId,
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub pixels_per_tick: f64,
    pub pixels_per_key: f64,
}

impl Default for PianoRollViewState {
    fn default() -> Self {
        Self {
            selection: None,
            selected_note_ids: Vec::new(),
            selected_track_id: 0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            pixels_per_tick: DEFAULT_PIXELS_PER_TICK,
            pixels_per_key: DEFAULT_PIXELS_PER_KEY,
        }
    }
}

#[derive(Debug)]
pub struct PianoRollState {
    pub view: PianoRollViewState,
    pub mouse_mode: MouseMode,
    pub quantize: QuantizeSettings,
    pub new_note_velocity: i32,
    /// Duration of the last dragged or resized note; new notes default to it.
    pub last_note_duration: Option<f64>,
    /// The note number currently sounding as a drag preview, owned here
    /// explicitly; the playback layer observes it.
    pub previewing_note: Option<i32>,
    pub gesture: PianoRollGesture,
}

impl Default for PianoRollState {
    fn default() -> Self {
        Self {
            view: PianoRollViewState::default(),
            mouse_mode: MouseMode::default(),
            quantize: QuantizeSettings::default(),
            new_note_velocity: DEFAULT_NEW_NOTE_VELOCITY,
            last_note_duration: None,
            previewing_note: None,
            gesture: PianoRollGesture::Idle,
        }
    }
}

impl PianoRollState {
    pub fn transform(&self) -> NoteCoordTransform {
        NoteCoordTransform::new(self.view.pixels_per_tick, self.view.pixels_per_key)
    }
}

#[derive(Debug, Default)]
pub enum PianoRollGesture {
    #[default]
    Idle,
    MoveDraggable(MoveDrag),
    RectSelect(RectSelect),
}

/// One move-or-resize drag over a draggable and its siblings.
#[derive(Debug)]
pub struct MoveDrag {
    draggable: Draggable,
    sub_draggables: Vec<Draggable>,
    /// Position of the draggable at press time; per-move deltas are always
    /// measured against this anchor so quantization error cannot accumulate.
    anchor: NotePoint,
    sub_anchors: Vec<Option<NotePoint>>,
    /// Pointer-to-draggable offset fixed at press so the entity does not
    /// jump to the pointer.
    offset: NotePoint,
    moved: bool,
    changed: bool,
    hit_note_id: Option<EventId>,
}

#[derive(Debug)]
pub struct RectSelect {
    start: NotePoint,
}

pub fn mouse_down(editor: &mut Editor, pos: Pos2, modifiers: Modifiers) {
    if !matches!(editor.piano_roll.gesture, PianoRollGesture::Idle) {
        return;
    }
    match editor.piano_roll.mouse_mode {
        MouseMode::Pencil => pencil_mouse_down(editor, pos, modifiers),
        MouseMode::Selection => selection_mouse_down(editor, pos, modifiers),
    }
}

pub fn mouse_move(editor: &mut Editor, pos: Pos2, modifiers: Modifiers) {
    let mut gesture = std::mem::take(&mut editor.piano_roll.gesture);
    match &mut gesture {
        PianoRollGesture::Idle => {}
        PianoRollGesture::MoveDraggable(drag) => move_drag_mouse_move(editor, drag, pos, modifiers),
        PianoRollGesture::RectSelect(rect) => rect_select_mouse_move(editor, rect, pos),
    }
    editor.piano_roll.gesture = gesture;
}

pub fn mouse_up(editor: &mut Editor, _pos: Pos2, modifiers: Modifiers) {
    let gesture = std::mem::take(&mut editor.piano_roll.gesture);
    match gesture {
        PianoRollGesture::Idle => {}
        PianoRollGesture::MoveDraggable(drag) => {
            editor.piano_roll.previewing_note = None;
            // no mouse move fired between press and release: this was a click
            if !drag.moved
                && let Some(note_id) = drag.hit_note_id
                && !modifiers.shift
            {
                select_note(editor, note_id);
            }
        }
        PianoRollGesture::RectSelect(_) => {
            let Some(selection) = editor.piano_roll.view.selection else {
                return;
            };
            if selection.is_empty() {
                editor.piano_roll.view.selection = None;
                editor.piano_roll.view.selected_note_ids.clear();
                return;
            }
            let track_id = editor.piano_roll.view.selected_track_id;
            if let Some(track) = editor.song.get_track(track_id) {
                editor.piano_roll.view.selected_note_ids =
                    events_in_selection(track.events(), &selection)
                        .iter()
                        .map(|e| e.id)
                        .collect();
            }
        }
    }
}

/* press handling */

fn pencil_mouse_down(editor: &mut Editor, pos: Pos2, modifiers: Modifiers) {
    if let Some((note_id, handle)) = hit_test_note(editor, pos) {
        start_note_drag(editor, pos, note_id, handle);
        return;
    }
    if modifiers.shift {
        return;
    }
    create_note(editor, pos);
}

fn selection_mouse_down(editor: &mut Editor, pos: Pos2, modifiers: Modifiers) {
    let transform = editor.piano_roll.transform();
    if let Some(selection) = editor.piano_roll.view.selection
        && !selection.is_empty()
    {
        let bounds = selection.get_bounds(&transform);
        if bounds.contains(pos) {
            if pos.x - bounds.left() < SELECTION_EDGE_THRESHOLD {
                start_selection_edge_drag(editor, pos, DragPosition::Left);
            } else if bounds.right() - pos.x < SELECTION_EDGE_THRESHOLD {
                start_selection_edge_drag(editor, pos, DragPosition::Right);
            } else {
                start_selection_center_drag(editor, pos, modifiers.command);
            }
            return;
        }
    }
    start_rect_selection(editor, pos);
}

fn create_note(editor: &mut Editor, pos: Pos2) {
    let track_id = editor.piano_roll.view.selected_track_id;
    let Some(track) = editor.song.get_track(track_id) else {
        return;
    };
    if track.channel.is_none() {
        return;
    }
    let is_rhythm_track = track.is_rhythm_track;

    let transform = editor.piano_roll.transform();
    let point = transform.get_note_point(pos);
    if point.note_number < 0.0 || point.note_number > MAX_NOTE_NUMBER as f64 {
        return;
    }

    editor.push_history();

    let (tick, duration) = {
        let measures = editor.song.measures();
        let quantizer = Quantizer::new(&measures, editor.song.timebase, editor.piano_roll.quantize);
        let tick = if is_rhythm_track {
            quantizer.round(point.tick)
        } else {
            quantizer.floor(point.tick)
        };
        let duration = if is_rhythm_track {
            (editor.song.timebase / DRUM_NOTE_DURATION_DIVISOR) as f64
        } else {
            editor
                .piano_roll
                .last_note_duration
                .unwrap_or_else(|| quantizer.unit())
        };
        (tick, duration)
    };

    let velocity = editor.piano_roll.new_note_velocity;
    let Some(track) = editor.song.get_track_mut(track_id) else {
        return;
    };
    let event = track.add_event(
        tick,
        EventBody::Note(NoteEvent {
            duration,
            note_number: point.note_number as i32,
            velocity,
        }),
    );

    select_note(editor, event.id);
    editor.piano_roll.previewing_note = Some(point.note_number as i32);
    // the same press continues as a center drag; history is already pushed
    start_move_drag(
        editor,
        pos,
        Draggable::Note {
            note_id: event.id,
            position: DragPosition::Center,
        },
        Vec::new(),
        Some(event.id),
        true,
    );
}

fn start_note_drag(editor: &mut Editor, pos: Pos2, note_id: EventId, handle: DragPosition) {
    if !editor.piano_roll.view.selected_note_ids.contains(&note_id) {
        select_note(editor, note_id);
    }
    let sub_draggables: Vec<Draggable> = editor
        .piano_roll
        .view
        .selected_note_ids
        .iter()
        .filter(|&&id| id != note_id)
        .map(|&id| Draggable::Note {
            note_id: id,
            position: handle,
        })
        .collect();

    let track_id = editor.piano_roll.view.selected_track_id;
    if let Some(note) = editor
        .song
        .get_track(track_id)
        .and_then(|t| t.get_event_by_id(note_id))
        .and_then(|e| e.as_note())
    {
        editor.piano_roll.previewing_note = Some(note.note_number);
    }

    start_move_drag(
        editor,
        pos,
        Draggable::Note {
            note_id,
            position: handle,
        },
        sub_draggables,
        Some(note_id),
        false,
    );
}

fn start_selection_edge_drag(editor: &mut Editor, pos: Pos2, edge: DragPosition) {
    let sub_draggables: Vec<Draggable> = editor
        .piano_roll
        .view
        .selected_note_ids
        .iter()
        .map(|&id| Draggable::Note {
            note_id: id,
            position: edge,
        })
        .collect();
    start_move_drag(
        editor,
        pos,
        Draggable::Selection { position: edge },
        sub_draggables,
        None,
        false,
    );
}

fn start_selection_center_drag(editor: &mut Editor, pos: Pos2, duplicate: bool) {
    if duplicate {
        editor.push_history();
        let track_id = editor.piano_roll.view.selected_track_id;
        let ids = editor.piano_roll.view.selected_note_ids.clone();
        if let Some(track) = editor.song.get_track_mut(track_id) {
            let new_ids = edit_actions::duplicate_notes(track, &ids);
            if !new_ids.is_empty() {
                editor.piano_roll.view.selected_note_ids = new_ids;
            }
        }
    }
    let sub_draggables: Vec<Draggable> = editor
        .piano_roll
        .view
        .selected_note_ids
        .iter()
        .map(|&id| Draggable::Note {
            note_id: id,
            position: DragPosition::Center,
        })
        .collect();
    start_move_drag(
        editor,
        pos,
        Draggable::Selection {
            position: DragPosition::Center,
        },
        sub_draggables,
        None,
        duplicate,
    );
}

fn start_rect_selection(editor: &mut Editor, pos: Pos2) {
    editor.control.view.selected_event_ids.clear();
    let transform = editor.piano_roll.transform();
    let start = transform.get_note_point_fractional(pos);
    editor.piano_roll.view.selection = Some(Selection::from_points(start, start));
    editor.piano_roll.gesture = PianoRollGesture::RectSelect(RectSelect { start });
}

fn start_move_drag(
    editor: &mut Editor,
    pos: Pos2,
    draggable: Draggable,
    sub_draggables: Vec<Draggable>,
    hit_note_id: Option<EventId>,
    history_pushed: bool,
) {
    let Some((anchor, sub_anchors)) = with_drag_context(editor, |ctx| {
        let anchor = ctx.position(draggable)?;
        let sub_anchors = sub_draggables.iter().map(|d| ctx.position(*d)).collect();
        Some((anchor, sub_anchors))
    })
    .flatten() else {
        return;
    };

    let transform = editor.piano_roll.transform();
    let point = transform.get_note_point(pos);
    let offset = anchor.sub(point);

    editor.piano_roll.gesture = PianoRollGesture::MoveDraggable(MoveDrag {
        draggable,
        sub_draggables,
        anchor,
        sub_anchors,
        offset,
        moved: false,
        changed: history_pushed,
        hit_note_id,
    });
}

/* move handling */

fn move_drag_mouse_move(editor: &mut Editor, drag: &mut MoveDrag, pos: Pos2, modifiers: Modifiers) {
    drag.moved = true;

    // holding shift suspends snapping for the rest of the move
    let quantize_on = !modifiers.shift && editor.piano_roll.quantize.enabled;
    let measures = editor.song.measures();
    let quantizer = Quantizer::new(&measures, editor.song.timebase, editor.piano_roll.quantize);
    let min_length = if quantize_on {
        quantizer.unit()
    } else {
        MIN_NOTE_LENGTH
    };

    let transform = editor.piano_roll.transform();
    let note_point = transform.get_note_point(pos).add(drag.offset);
    let target = if quantize_on {
        NotePoint {
            tick: quantizer.round(note_point.tick),
            note_number: note_point.note_number,
        }
    } else {
        note_point
    };

    let draggable = drag.draggable;
    let Some((current, new_position)) = with_drag_context(editor, |ctx| {
        let area = ctx.area(draggable, min_length)?;
        let current = ctx.position(draggable)?;
        Some((current, area.constrain(target)))
    })
    .flatten() else {
        return;
    };

    if new_position == current {
        return;
    }
    let delta = new_position.sub(drag.anchor);

    let sub_draggables = drag.sub_draggables.clone();
    let sub_anchors = drag.sub_anchors.clone();
    let Some(sub_positions) = with_drag_context(editor, |ctx| {
        sub_draggables
            .iter()
            .zip(&sub_anchors)
            .map(|(d, anchor)| {
                let anchor = (*anchor)?;
                let area = ctx.area(*d, min_length)?;
                Some(area.constrain(anchor.add(delta)))
            })
            .collect::<Vec<Option<NotePoint>>>()
    }) else {
        return;
    };

    // one snapshot per gesture, taken before the first mutation lands
    if !drag.changed {
        drag.changed = true;
        editor.push_history();
    }

    with_drag_context(editor, |ctx| {
        ctx.update(draggable, new_position.into());
        for (d, position) in sub_draggables.iter().zip(&sub_positions) {
            if let Some(position) = position {
                ctx.update(*d, (*position).into());
            }
        }
    });

    if let Some(note_id) = drag.hit_note_id {
        let track_id = editor.piano_roll.view.selected_track_id;
        let note = editor
            .song
            .get_track(track_id)
            .and_then(|t| t.get_event_by_id(note_id))
            .and_then(|e| e.as_note())
            .copied();
        if let Some(note) = note {
            if current.tick != new_position.tick {
                editor.piano_roll.last_note_duration = Some(note.duration);
            }
            if current.note_number != new_position.note_number {
                editor.piano_roll.previewing_note = Some(note.note_number);
            }
        }
    }
}

fn rect_select_mouse_move(editor: &mut Editor, rect: &mut RectSelect, pos: Pos2) {
    let transform = editor.piano_roll.transform();
    let end = transform.get_note_point_fractional(pos);
    let measures = editor.song.measures();
    let quantizer = Quantizer::new(&measures, editor.song.timebase, editor.piano_roll.quantize);
    editor.piano_roll.view.selection = Some(Selection::from_points(
        NotePoint {
            tick: quantizer.round(rect.start.tick),
            note_number: rect.start.note_number,
        },
        NotePoint {
            tick: quantizer.round(end.tick),
            note_number: end.note_number,
        },
    ));
}

/* helpers */

fn select_note(editor: &mut Editor, note_id: EventId) {
    editor.piano_roll.view.selection = None;
    editor.piano_roll.view.selected_note_ids = vec![note_id];
}

fn hit_test_note(editor: &Editor, pos: Pos2) -> Option<(EventId, DragPosition)> {
    let track = editor.song.get_track(editor.piano_roll.view.selected_track_id)?;
    let transform = editor.piano_roll.transform();
    // iterate in reverse so the topmost-drawn note wins
    for event in track.events().iter().rev() {
        let rect = if track.is_rhythm_track {
            transform.get_drum_rect(event)
        } else {
            transform.get_rect(event)
        };
        let Some(rect) = rect else {
            continue;
        };
        if !rect.contains(pos) {
            continue;
        }
        if track.is_rhythm_track {
            return Some((event.id, DragPosition::Center));
        }
        // keep a grabbable center on short notes
        let edge_zone = NOTE_EDGE_THRESHOLD.min(rect.width() / 3.0);
        if pos.x - rect.left() < edge_zone {
            return Some((event.id, DragPosition::Left));
        }
        if rect.right() - pos.x < edge_zone {
            return Some((event.id, DragPosition::Right));
        }
        return Some((event.id, DragPosition::Center));
    }
    None
}

fn with_drag_context<R>(editor: &mut Editor, f: impl FnOnce(&mut DragContext) -> R) -> Option<R> {
    let Editor {
        song, piano_roll, ..
    } = editor;
    let track = song.get_track_mut(piano_roll.view.selected_track_id)?;
    let PianoRollViewState {
        selection,
        selected_note_ids,
        ..
    } = &mut piano_roll.view;
    let mut ctx = DragContext {
        track,
        selection,
        selected_note_ids: selected_note_ids.as_slice(),
    };
    Some(f(&mut ctx))
}
