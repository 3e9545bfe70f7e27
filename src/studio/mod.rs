pub mod app;
pub mod camera;
pub mod catalog;
pub mod error;
pub mod layout;
pub mod raster;
pub mod surface;
pub mod sync;
pub mod ui;
pub mod viewer;

pub const CATALOG_PATH: &str = "config/catalog.ron";
pub const DEFAULT_PRODUCT: &str = "mugs";
pub const DEFAULT_MODEL: &str = "mug1";

pub const DEBOUNCE_MILLIS: u64 = 300;
pub const RASTER_REFERENCE_WIDTH: f32 = 500.0;
pub const RASTER_MULTIPLIER_CAP: f32 = 4.0;

pub const MIN_PANE_PX: f32 = 300.0;
pub const SPLITTER_THICKNESS_PX: f32 = 8.0;
pub const EDITOR_SCALE_MIN: f32 = 0.4;
pub const EDITOR_SCALE_MAX: f32 = 1.0;

pub const MIN_POLAR_DEG: f32 = 60.0;
pub const MAX_POLAR_DEG: f32 = 106.0;

pub const DEFAULT_MODEL_SCALE: f32 = 30.0;
pub const DEFAULT_ROTATION_DEG: f32 = 54.0;
pub const DEFAULT_CAMERA_POSITION: [f32; 3] = [0.0, 5.0, 15.0];
pub const DEFAULT_MIN_DISTANCE: f32 = 10.0;
pub const DEFAULT_MAX_DISTANCE: f32 = 25.0;
pub const INITIAL_MIN_DISTANCE: f32 = 20.0;
pub const INITIAL_MAX_DISTANCE: f32 = 80.0;
pub const FALLBACK_CAMERA_Z: f32 = 40.0;
