//! Controller-lane pointer handling: pencil painting of single-valued
//! events, tick-range selection, and dragging selected events. Edits target
//! the piano roll's selected track.

use egui::{Modifiers, Pos2};
use serde::{Deserialize, Serialize};

use super::MouseMode;
use crate::constants::{
    CONTROL_LINE_WIDTH, CONTROL_POINT_RADIUS, DEFAULT_CONTROL_PANE_HEIGHT, DEFAULT_PIXELS_PER_TICK,
    MAX_CONTROLLER_VALUE,
};
use crate::coords::ControlCoordTransform;
use crate::edit_actions::{ValueLane, update_events_in_range};
use crate::editor::Editor;
use crate::model::event::is_event_in_range;
use crate::model::{EventId, EventUpdate, TrackEvent};
use crate::quantizer::{QuantizeSettings, Quantizer};
use crate::selection::ControlSelection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPaneViewState {
    pub selection: Option<ControlSelection>,
    pub selected_event_ids: Vec<EventId>,
    pub pixels_per_tick: f64,
    pub height: f64,
    pub max_value: f64,
}

impl Default for ControlPaneViewState {
    fn default() -> Self {
        Self {
            selection: None,
            selected_event_ids: Vec::new(),
            pixels_per_tick: DEFAULT_PIXELS_PER_TICK,
            height: DEFAULT_CONTROL_PANE_HEIGHT,
            max_value: MAX_CONTROLLER_VALUE as f64,
        }
    }
}

#[derive(Debug)]
pub struct ControlPaneState {
    pub view: ControlPaneViewState,
    /// Which single-valued lane this pane edits.
    pub lane: ValueLane,
    pub mouse_mode: MouseMode,
    pub quantize: QuantizeSettings,
    pub gesture: ControlPaneGesture,
}

impl Default for ControlPaneState {
    fn default() -> Self {
        Self {
            view: ControlPaneViewState::default(),
            lane: ValueLane::Controller { controller_type: 7 },
            mouse_mode: MouseMode::default(),
            quantize: QuantizeSettings::default(),
            gesture: ControlPaneGesture::Idle,
        }
    }
}

impl ControlPaneState {
    pub fn transform(&self) -> ControlCoordTransform {
        ControlCoordTransform::new(
            self.view.pixels_per_tick,
            self.view.max_value,
            self.view.height,
            CONTROL_LINE_WIDTH,
        )
    }
}

#[derive(Debug, Default)]
pub enum ControlPaneGesture {
    #[default]
    Idle,
    Pencil(Pencil),
    RectSelect(RectSelect),
    DragEvents(DragEvents),
}

#[derive(Debug)]
pub struct Pencil {
    last_tick: f64,
    last_value: f64,
}

#[derive(Debug)]
pub struct RectSelect {
    start_tick: f64,
}

#[derive(Debug)]
pub struct DragEvents {
    /// Copies of the selected events taken at press; per-move updates are
    /// absolute against these, so rounding never accumulates.
    events_at_press: Vec<TrackEvent>,
    dragged_event_tick: f64,
    press_pos: Pos2,
    start_value: f64,
}

pub fn mouse_down(editor: &mut Editor, pos: Pos2, _modifiers: Modifiers) {
    if !matches!(editor.control.gesture, ControlPaneGesture::Idle) {
        return;
    }
    let transform = editor.control.transform();
    let track_id = editor.piano_roll.view.selected_track_id;

    if let Some(hit_id) = hit_test_control_event(editor, pos) {
        editor.push_history();
        if !editor.control.view.selected_event_ids.contains(&hit_id) {
            editor.control.view.selected_event_ids = vec![hit_id];
        }
        let Some(track) = editor.song.get_track(track_id) else {
            return;
        };
        let events_at_press: Vec<TrackEvent> = track
            .events()
            .iter()
            .filter(|e| editor.control.view.selected_event_ids.contains(&e.id))
            .copied()
            .collect();
        let Some(dragged) = events_at_press.iter().find(|e| e.id == hit_id) else {
            return;
        };
        editor.control.gesture = ControlPaneGesture::DragEvents(DragEvents {
            dragged_event_tick: dragged.tick,
            events_at_press,
            press_pos: pos,
            start_value: transform.get_value(pos.y as f64),
        });
        return;
    }

    match editor.control.mouse_mode {
        MouseMode::Pencil => {
            editor.push_history();
            editor.control.view.selected_event_ids.clear();
            editor.control.view.selection = None;
            editor.piano_roll.view.selection = None;
            editor.piano_roll.view.selected_note_ids.clear();

            let point = transform.from_position(pos);
            let lane = editor.control.lane;
            let tick = {
                let measures = editor.song.measures();
                let quantizer =
                    Quantizer::new(&measures, editor.song.timebase, editor.control.quantize);
                quantizer.round(point.tick)
            };
            if let Some(track) = editor.song.get_track_mut(track_id) {
                track.create_or_update(tick, lane.make_body(point.value));
            }
            editor.control.gesture = ControlPaneGesture::Pencil(Pencil {
                last_tick: point.tick,
                last_value: point.value,
            });
        }
        MouseMode::Selection => {
            editor.control.view.selected_event_ids.clear();
            editor.piano_roll.view.selection = None;
            editor.piano_roll.view.selected_note_ids.clear();
            let start_tick = {
                let measures = editor.song.measures();
                let quantizer =
                    Quantizer::new(&measures, editor.song.timebase, editor.control.quantize);
                quantizer.round(transform.get_tick(pos.x as f64))
            };
            editor.control.view.selection = Some(ControlSelection::new(start_tick, start_tick));
            editor.control.gesture = ControlPaneGesture::RectSelect(RectSelect { start_tick });
        }
    }
}

pub fn mouse_move(editor: &mut Editor, pos: Pos2, _modifiers: Modifiers) {
    let mut gesture = std::mem::take(&mut editor.control.gesture);
    match &mut gesture {
        ControlPaneGesture::Idle => {}
        ControlPaneGesture::Pencil(pencil) => pencil_mouse_move(editor, pencil, pos),
        ControlPaneGesture::RectSelect(rect) => {
            let transform = editor.control.transform();
            let end_tick = {
                let measures = editor.song.measures();
                let quantizer =
                    Quantizer::new(&measures, editor.song.timebase, editor.control.quantize);
                quantizer.round(transform.get_tick(pos.x as f64))
            };
            editor.control.view.selection =
                Some(ControlSelection::new(rect.start_tick, end_tick));
        }
        ControlPaneGesture::DragEvents(drag) => drag_events_mouse_move(editor, drag, pos),
    }
    editor.control.gesture = gesture;
}

pub fn mouse_up(editor: &mut Editor, _pos: Pos2, _modifiers: Modifiers) {
    let gesture = std::mem::take(&mut editor.control.gesture);
    let track_id = editor.piano_roll.view.selected_track_id;
    match gesture {
        ControlPaneGesture::Idle | ControlPaneGesture::Pencil(_) => {}
        ControlPaneGesture::RectSelect(_) => {
            if let Some(selection) = editor.control.view.selection {
                let range = selection.tick_range();
                let lane = editor.control.lane;
                editor.control.view.selected_event_ids = editor
                    .song
                    .get_track(track_id)
                    .map(|t| {
                        t.events()
                            .iter()
                            .filter(|e| lane.matches(&e.body) && is_event_in_range(e, &range))
                            .map(|e| e.id)
                            .collect()
                    })
                    .unwrap_or_default();
            }
            editor.control.view.selection = None;
        }
        ControlPaneGesture::DragEvents(drag) => {
            let ids: Vec<EventId> = drag.events_at_press.iter().map(|e| e.id).collect();
            if let Some(track) = editor.song.get_track_mut(track_id) {
                track.remove_redundant_events_for_ids(&ids);
            }
        }
    }
}

fn pencil_mouse_move(editor: &mut Editor, pencil: &mut Pencil, pos: Pos2) {
    let transform = editor.control.transform();
    let point = transform.from_position(pos);
    let value = point.value.clamp(0.0, transform.max_value);

    let lane = editor.control.lane;
    let measures = editor.song.measures();
    let timebase = editor.song.timebase;
    let quantize = editor.control.quantize;
    let track_id = editor.piano_roll.view.selected_track_id;
    let Some(track) = editor.song.get_track_mut(track_id) else {
        return;
    };
    let quantizer = Quantizer::new(&measures, timebase, quantize);
    update_events_in_range(
        track,
        lane,
        &quantizer,
        pencil.last_value,
        value,
        pencil.last_tick,
        point.tick,
    );
    pencil.last_tick = point.tick;
    pencil.last_value = value;
}

fn drag_events_mouse_move(editor: &mut Editor, drag: &mut DragEvents, pos: Pos2) {
    let transform = editor.control.transform();
    let delta = pos - drag.press_pos;
    let delta_tick = transform.get_tick(delta.x as f64);

    let quantized_delta_tick = {
        let measures = editor.song.measures();
        let quantizer = Quantizer::new(&measures, editor.song.timebase, editor.control.quantize);
        let target = drag.dragged_event_tick + delta_tick;
        let offset_tick = target - quantizer.round(target);
        delta_tick - offset_tick
    };

    let current_value = transform.get_value(pos.y as f64);
    let delta_value = current_value - drag.start_value;

    let max_value = transform.max_value;
    let updates: Vec<(EventId, EventUpdate)> = drag
        .events_at_press
        .iter()
        .filter_map(|event| {
            let value = event.as_controller()?.value;
            Some((
                event.id,
                EventUpdate {
                    tick: Some((event.tick + quantized_delta_tick).floor().max(0.0)),
                    value: Some(
                        ((value as f64 + delta_value).floor().clamp(0.0, max_value)) as i32,
                    ),
                    ..Default::default()
                },
            ))
        })
        .collect();

    let track_id = editor.piano_roll.view.selected_track_id;
    if let Some(track) = editor.song.get_track_mut(track_id) {
        track.update_events(&updates);
    }
}

fn hit_test_control_event(editor: &Editor, pos: Pos2) -> Option<EventId> {
    let transform = editor.control.transform();
    let track = editor.song.get_track(editor.piano_roll.view.selected_track_id)?;
    let lane = editor.control.lane;
    for event in track.events().iter().rev() {
        if !lane.matches(&event.body) {
            continue;
        }
        let Some(controller) = event.as_controller() else {
            continue;
        };
        let center = transform.to_position(event.tick, controller.value as f64);
        if (pos - center).length() <= CONTROL_POINT_RADIUS {
            return Some(event.id);
        }
    }
    None
}
