//! Arrange-view pointer handling: rectangle selection over tick-by-track
//! space and whole-selection moves, including re-homing events across
//! tracks.

use std::collections::BTreeMap;

use egui::{Modifiers, Pos2};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PIXELS_PER_TICK, DEFAULT_PIXELS_PER_TRACK};
use crate::coords::{ArrangeCoordTransform, ArrangePoint};
use crate::edit_actions::move_events_between_tracks;
use crate::editor::Editor;
use crate::model::event::is_event_in_range;
use crate::model::EventId;
use crate::quantizer::{QuantizeSettings, Quantizer};
use crate::selection::ArrangeSelection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangeViewState {
    pub selection: Option<ArrangeSelection>,
    pub selected_event_ids: BTreeMap<usize, Vec<EventId>>,
    pub selected_track_index: usize,
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub pixels_per_tick: f64,
    pub pixels_per_track: f64,
}

impl Default for ArrangeViewState {
    fn default() -> Self {
        Self {
            selection: None,
            selected_event_ids: BTreeMap::new(),
            selected_track_index: 0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            pixels_per_tick: DEFAULT_PIXELS_PER_TICK,
            pixels_per_track: DEFAULT_PIXELS_PER_TRACK,
        }
    }
}

#[derive(Debug, Default)]
pub struct ArrangeState {
    pub view: ArrangeViewState,
    pub quantize: QuantizeSettings,
    pub gesture: ArrangeGesture,
}

impl ArrangeState {
    pub fn transform(&self) -> ArrangeCoordTransform {
        ArrangeCoordTransform::new(self.view.pixels_per_tick, self.view.pixels_per_track)
    }
}

#[derive(Debug, Default)]
pub enum ArrangeGesture {
    #[default]
    Idle,
    RectSelect(RectSelect),
    MoveSelection(MoveSelection),
}

#[derive(Debug)]
pub struct RectSelect {
    start: ArrangePoint,
}

#[derive(Debug)]
pub struct MoveSelection {
    start_pos: Pos2,
    /// Selection bounds origin at press; the quantized target is always
    /// derived from it, so rounding never accumulates.
    origin_px: Pos2,
    changed: bool,
}

pub fn mouse_down(editor: &mut Editor, pos: Pos2, _modifiers: Modifiers) {
    if !matches!(editor.arrange.gesture, ArrangeGesture::Idle) {
        return;
    }
    let transform = editor.arrange.transform();

    if let Some(selection) = editor.arrange.view.selection {
        let bounds = selection.get_bounds(&transform);
        if bounds.contains(pos) {
            let selected = events_in_arrange_selection(editor, &selection);
            editor.arrange.view.selected_event_ids = selected;
            editor.arrange.gesture = ArrangeGesture::MoveSelection(MoveSelection {
                start_pos: pos,
                origin_px: bounds.min,
                changed: false,
            });
            return;
        }
    }

    let start = transform.get_arrange_point(pos);
    editor.arrange.view.selection = None;
    editor.arrange.view.selected_event_ids.clear();
    editor.arrange.view.selected_track_index = start
        .track_index
        .floor()
        .clamp(0.0, (editor.song.tracks.len().saturating_sub(1)) as f64)
        as usize;
    editor.arrange.gesture = ArrangeGesture::RectSelect(RectSelect { start });
}

pub fn mouse_move(editor: &mut Editor, pos: Pos2, _modifiers: Modifiers) {
    let mut gesture = std::mem::take(&mut editor.arrange.gesture);
    match &mut gesture {
        ArrangeGesture::Idle => {}
        ArrangeGesture::RectSelect(rect) => rect_select_mouse_move(editor, rect, pos),
        ArrangeGesture::MoveSelection(drag) => move_selection_mouse_move(editor, drag, pos),
    }
    editor.arrange.gesture = gesture;
}

pub fn mouse_up(editor: &mut Editor, _pos: Pos2, _modifiers: Modifiers) {
    editor.arrange.gesture = ArrangeGesture::Idle;
}

fn rect_select_mouse_move(editor: &mut Editor, rect: &mut RectSelect, pos: Pos2) {
    let transform = editor.arrange.transform();
    let end = transform.get_arrange_point(pos);
    let measures = editor.song.measures();
    let quantizer = Quantizer::new(&measures, editor.song.timebase, editor.arrange.quantize);
    editor.arrange.view.selection = Some(ArrangeSelection::from_points(
        rect.start,
        end,
        &quantizer,
        editor.song.tracks.len() as f64,
    ));
}

fn move_selection_mouse_move(editor: &mut Editor, drag: &mut MoveSelection, pos: Pos2) {
    let Some(selection) = editor.arrange.view.selection else {
        return;
    };
    let transform = editor.arrange.transform();
    let measures = editor.song.measures();
    let quantizer = Quantizer::new(&measures, editor.song.timebase, editor.arrange.quantize);

    let target_px = drag.origin_px + (pos - drag.start_pos);
    let point = transform.get_arrange_point(target_px);
    let point = ArrangePoint {
        tick: quantizer.round(point.tick),
        track_index: point.track_index.round(),
    };
    let point = point.clamp(editor.song.tracks.len() as f64 - selection.track_span());

    let delta = point.sub(selection.start());
    if delta.tick == 0.0 && delta.track_index == 0.0 {
        return;
    }

    if !drag.changed {
        drag.changed = true;
        editor.push_history();
    }

    editor.arrange.view.selection = Some(selection.moved(delta));
    let selected = editor.arrange.view.selected_event_ids.clone();
    editor.arrange.view.selected_event_ids =
        move_events_between_tracks(&mut editor.song, &selected, delta);
}

/// Ids of the events inside the selection, keyed by track index. Containment
/// is by tick only, matching how the arrange view draws events.
pub fn events_in_arrange_selection(
    editor: &Editor,
    selection: &ArrangeSelection,
) -> BTreeMap<usize, Vec<EventId>> {
    let mut ids = BTreeMap::new();
    let range = selection.tick_range();
    let from = selection.from_track_index.max(0.0) as usize;
    let to = selection.to_track_index.max(0.0) as usize;
    for track_index in from..to {
        let Some(track) = editor.song.track_at(track_index) else {
            continue;
        };
        ids.insert(
            track_index,
            track
                .events()
                .iter()
                .filter(|e| is_event_in_range(e, &range))
                .map(|e| e.id)
                .collect(),
        );
    }
    ids
}
