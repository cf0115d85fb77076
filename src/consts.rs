// Rendering defaults
pub const DEFAULT_WIDTH: usize = 640;
pub const DEFAULT_HEIGHT: usize = 480;
pub const DEFAULT_FOCAL_LENGTH: f64 = 1.0;
pub const OUT_FILE: &'static str = "./out.ppm";

// Worker pool sizing
pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_DESIRED_LOAD: f64 = 0.7;

// Floating point comparisons
pub const FEQ_EPSILON: f64 = 0.0001;

/// Offset applied to shadow ray origins, and the minimum distance at which a
/// shadow ray hit counts as an occluder.
pub const SHADOW_EPSILON: f64 = 1e-5;

// Lighting defaults
pub const DEFAULT_AMBIENT_INTENSITY: f64 = 0.08;
pub const MAX_CHANNEL: f64 = 255.0;
