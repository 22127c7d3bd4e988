// Musical Time Constants
pub const TIMEBASE: u32 = 480; // ticks per quarter note
pub const MAX_NOTE_NUMBER: i32 = 127;
pub const NUMBER_OF_KEYS: u32 = 128;
pub const MAX_BPM: f64 = 320.0;
pub const MAX_CONTROLLER_VALUE: i32 = 127;

// Quantize Constants
pub const DEFAULT_QUANTIZE_DIVISOR: u32 = 8; // 1/8th note grid
pub const MIN_NOTE_LENGTH: f64 = 10.0; // ticks, used when snapping is off

// Interaction Constants
pub const NOTE_EDGE_THRESHOLD: f32 = 8.0;
pub const SELECTION_EDGE_THRESHOLD: f32 = 8.0;
pub const TEMPO_POINT_RADIUS: f32 = 4.0;
pub const CONTROL_POINT_RADIUS: f32 = 4.0;
pub const UNDO_STACK_LIMIT: usize = 100;

// Default View Scales
pub const DEFAULT_PIXELS_PER_TICK: f64 = 0.1;
pub const DEFAULT_PIXELS_PER_KEY: f64 = 12.0;
pub const DEFAULT_PIXELS_PER_TRACK: f64 = 64.0;
pub const DEFAULT_TEMPO_GRAPH_HEIGHT: f64 = 300.0;
pub const DEFAULT_CONTROL_PANE_HEIGHT: f64 = 120.0;
pub const CONTROL_LINE_WIDTH: f64 = 2.0;

// Editing Defaults
pub const DEFAULT_NEW_NOTE_VELOCITY: i32 = 100;
pub const DRUM_NOTE_DURATION_DIVISOR: u32 = 8; // 32th note in a rhythm track
