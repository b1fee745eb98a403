//! Global constants for brace-core

/// Radii at or below this are treated as "no geometry" (1 mm)
pub const MIN_SECTION_RADIUS: f32 = 0.001;

/// Nominal node size to radius conversion
pub const NODE_SIZE_RADIUS_FACTOR: f32 = 1.25;

/// Node size assumed when a connection declares none
pub const DEFAULT_NODE_SIZE: f32 = 1.0;

/// |cos| above which two directions count as aligned (about 25 degrees)
pub const ALIGNMENT_COSINE: f32 = 0.9;

/// Exponent applied to area and moment of inertia in volume mode
pub const VOLUME_EXPONENT: f32 = 1.5;

/// Scale applied to the angular drive damper
pub const ANGULAR_DAMPER_SCALE: f32 = 0.1;

/// Crash tolerance multiplier while an assembly eases into physics
pub const EASING_CRASH_TOLERANCE_FACTOR: f32 = 10000.0;

/// Default number of segments for cylinder vertex generation
pub const CYLINDER_SEGMENTS: u32 = 32;

/// Default number of latitude segments for sphere vertex generation
pub const SPHERE_LAT_SEGMENTS: u32 = 16;

/// Default number of longitude segments for sphere vertex generation
pub const SPHERE_LON_SEGMENTS: u32 = 32;

/// STL vertex comparison precision (multiply by this, then round to int)
pub const STL_VERTEX_PRECISION: f32 = 10000.0;
