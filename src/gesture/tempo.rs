//! Tempo-graph pointer handling: pencil painting of tempo events, tick-range
//! selection and dragging selected events with an incremental quantized
//! delta measured against the press-time anchor.

use egui::{Modifiers, Pos2};
use serde::{Deserialize, Serialize};

use super::MouseMode;
use crate::constants::{DEFAULT_PIXELS_PER_TICK, DEFAULT_TEMPO_GRAPH_HEIGHT, TEMPO_POINT_RADIUS};
use crate::coords::{TempoCoordTransform, TempoPoint};
use crate::edit_actions::{ValueLane, move_tempo_events, update_events_in_range};
use crate::editor::Editor;
use crate::model::EventId;
use crate::model::event::is_event_in_range;
use crate::quantizer::{QuantizeSettings, Quantizer};
use crate::selection::TempoSelection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoGraphViewState {
    pub selection: Option<TempoSelection>,
    pub selected_event_ids: Vec<EventId>,
    pub scroll_x: f64,
    pub pixels_per_tick: f64,
    pub height: f64,
}

impl Default for TempoGraphViewState {
    fn default() -> Self {
        Self {
            selection: None,
            selected_event_ids: Vec::new(),
            scroll_x: 0.0,
            pixels_per_tick: DEFAULT_PIXELS_PER_TICK,
            height: DEFAULT_TEMPO_GRAPH_HEIGHT,
        }
    }
}

#[derive(Debug, Default)]
pub struct TempoGraphState {
    pub view: TempoGraphViewState,
    pub mouse_mode: MouseMode,
    pub quantize: QuantizeSettings,
    pub gesture: TempoGraphGesture,
}

impl TempoGraphState {
    pub fn transform(&self) -> TempoCoordTransform {
        TempoCoordTransform::new(self.view.pixels_per_tick, self.view.height)
    }
}

#[derive(Debug, Default)]
pub enum TempoGraphGesture {
    #[default]
    Idle,
    Pencil(Pencil),
    RectSelect(RectSelect),
    DragEvents(DragEvents),
}

#[derive(Debug)]
pub struct Pencil {
    last_tick: f64,
    last_bpm: f64,
}

#[derive(Debug)]
pub struct RectSelect {
    start_tick: f64,
}

#[derive(Debug)]
pub struct DragEvents {
    event_ids: Vec<EventId>,
    anchor: TempoPoint,
    /// Tick of the grabbed event at press; quantized deltas are measured
    /// against it so rounding never accumulates across moves.
    dragged_event_tick: f64,
    last_delta_tick: f64,
    last_delta_bpm: f64,
}

pub fn mouse_down(editor: &mut Editor, pos: Pos2, _modifiers: Modifiers) {
    if !matches!(editor.tempo.gesture, TempoGraphGesture::Idle) {
        return;
    }
    let transform = editor.tempo.transform();

    if let Some(hit_id) = hit_test_tempo_event(editor, pos) {
        editor.push_history();
        if !editor.tempo.view.selected_event_ids.contains(&hit_id) {
            editor.tempo.view.selected_event_ids = vec![hit_id];
        }
        let Some(dragged_event_tick) = editor
            .song
            .conductor_track()
            .and_then(|t| t.get_event_by_id(hit_id))
            .map(|e| e.tick)
        else {
            return;
        };
        editor.tempo.gesture = TempoGraphGesture::DragEvents(DragEvents {
            event_ids: editor.tempo.view.selected_event_ids.clone(),
            anchor: transform.from_position(pos),
            dragged_event_tick,
            last_delta_tick: 0.0,
            last_delta_bpm: 0.0,
        });
        return;
    }

    match editor.tempo.mouse_mode {
        MouseMode::Pencil => {
            editor.push_history();
            let point = transform.from_position(pos);
            let tick = {
                let measures = editor.song.measures();
                let quantizer =
                    Quantizer::new(&measures, editor.song.timebase, editor.tempo.quantize);
                quantizer.round(point.tick)
            };
            if let Some(conductor) = editor.song.conductor_track_mut() {
                conductor.create_or_update(tick, ValueLane::Tempo.make_body(point.bpm));
            }
            editor.tempo.gesture = TempoGraphGesture::Pencil(Pencil {
                last_tick: point.tick,
                last_bpm: point.bpm,
            });
        }
        MouseMode::Selection => {
            editor.tempo.view.selected_event_ids.clear();
            let start_tick = transform.from_position(pos).tick;
            editor.tempo.view.selection = Some(TempoSelection::new(start_tick, start_tick));
            editor.tempo.gesture = TempoGraphGesture::RectSelect(RectSelect { start_tick });
        }
    }
}

pub fn mouse_move(editor: &mut Editor, pos: Pos2, _modifiers: Modifiers) {
    let mut gesture = std::mem::take(&mut editor.tempo.gesture);
    match &mut gesture {
        TempoGraphGesture::Idle => {}
        TempoGraphGesture::Pencil(pencil) => pencil_mouse_move(editor, pencil, pos),
        TempoGraphGesture::RectSelect(rect) => {
            let transform = editor.tempo.transform();
            let end_tick = transform.from_position(pos).tick;
            editor.tempo.view.selection = Some(TempoSelection::new(rect.start_tick, end_tick));
        }
        TempoGraphGesture::DragEvents(drag) => drag_events_mouse_move(editor, drag, pos),
    }
    editor.tempo.gesture = gesture;
}

pub fn mouse_up(editor: &mut Editor, _pos: Pos2, _modifiers: Modifiers) {
    let gesture = std::mem::take(&mut editor.tempo.gesture);
    match gesture {
        TempoGraphGesture::Idle | TempoGraphGesture::Pencil(_) => {}
        TempoGraphGesture::RectSelect(_) => {
            // confirm the range into a set of selected events and drop the
            // rectangle
            if let Some(selection) = editor.tempo.view.selection {
                let range = selection.tick_range();
                editor.tempo.view.selected_event_ids = editor
                    .song
                    .conductor_track()
                    .map(|t| {
                        t.events()
                            .iter()
                            .filter(|e| e.as_tempo().is_some() && is_event_in_range(e, &range))
                            .map(|e| e.id)
                            .collect()
                    })
                    .unwrap_or_default();
            }
            editor.tempo.view.selection = None;
        }
        TempoGraphGesture::DragEvents(drag) => {
            // events dragged onto an occupied tick replace the old occupant
            if let Some(conductor) = editor.song.conductor_track_mut() {
                conductor.remove_redundant_events_for_ids(&drag.event_ids);
            }
        }
    }
}

fn pencil_mouse_move(editor: &mut Editor, pencil: &mut Pencil, pos: Pos2) {
    let transform = editor.tempo.transform();
    let point = transform.from_position(pos);
    let bpm = point.bpm.clamp(0.0, transform.max_bpm);

    let measures = editor.song.measures();
    let timebase = editor.song.timebase;
    let quantize = editor.tempo.quantize;
    let Some(conductor) = editor.song.conductor_track_mut() else {
        return;
    };
    let quantizer = Quantizer::new(&measures, timebase, quantize);
    update_events_in_range(
        conductor,
        ValueLane::Tempo,
        &quantizer,
        pencil.last_bpm,
        bpm,
        pencil.last_tick,
        point.tick,
    );
    pencil.last_tick = point.tick;
    pencil.last_bpm = bpm;
}

fn drag_events_mouse_move(editor: &mut Editor, drag: &mut DragEvents, pos: Pos2) {
    let transform = editor.tempo.transform();
    let point = transform.from_position(pos);
    let delta_tick = point.tick - drag.anchor.tick;

    let quantized_delta_tick = {
        let measures = editor.song.measures();
        let quantizer = Quantizer::new(&measures, editor.song.timebase, editor.tempo.quantize);
        let target = drag.dragged_event_tick + delta_tick;
        let offset_tick = target - quantizer.round(target);
        delta_tick - offset_tick
    };
    let delta_bpm = point.bpm - drag.anchor.bpm;

    let Some(conductor) = editor.song.conductor_track_mut() else {
        return;
    };
    move_tempo_events(
        conductor,
        &drag.event_ids,
        quantized_delta_tick - drag.last_delta_tick,
        delta_bpm - drag.last_delta_bpm,
        transform.max_bpm,
    );
    drag.last_delta_tick = quantized_delta_tick;
    drag.last_delta_bpm = delta_bpm;
}

fn hit_test_tempo_event(editor: &Editor, pos: Pos2) -> Option<EventId> {
    let transform = editor.tempo.transform();
    let conductor = editor.song.conductor_track()?;
    for event in conductor.events().iter().rev() {
        let Some(tempo) = event.as_tempo() else {
            continue;
        };
        let center = egui::pos2(
            transform.get_x(event.tick) as f32,
            transform.get_y(tempo.bpm()) as f32,
        );
        if (pos - center).length() <= TEMPO_POINT_RADIUS {
            return Some(event.id);
        }
    }
    None
}
