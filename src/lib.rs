pub mod config;
pub mod constants;
pub mod coords;
pub mod draggable;
pub mod edit_actions;
pub mod editor;
pub mod event_view;
pub mod geometry;
pub mod gesture;
pub mod history;
pub mod model;
pub mod paths;
pub mod quantizer;
pub mod selection;

pub use coords::{ArrangePoint, NoteCoordTransform, NotePoint};
pub use editor::{Editor, EditorSnapshot};
pub use event_view::EventView;
pub use geometry::Range;
pub use history::History;
pub use quantizer::{QuantizeSettings, Quantizer};
pub use selection::{ArrangeSelection, ControlSelection, Selection, TempoSelection};
