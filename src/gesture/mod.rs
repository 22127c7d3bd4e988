pub mod arrange;
pub mod control;
pub mod piano_roll;
pub mod tempo;

use serde::{Deserialize, Serialize};

/// Tool selection shared by the editors that distinguish drawing from
/// rectangle selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseMode {
    #[default]
    Pencil,
    Selection,
}
