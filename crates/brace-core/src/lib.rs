//! Brace Core
//!
//! Joint reinforcement for trees of rigid bodies:
//! - Assembly: bodies, primary joints and the extra joints hosted on them
//! - Geometry: cross-section estimation from body meshes
//! - Registry: bookkeeping for reinforcement joints between non-adjacent bodies
//! - Reinforce: joint strength, mass-ratio propagation, lattice and decoupler passes
//! - Manager: lifecycle notifications, deferred passes and teardown

pub mod assembly;
pub mod constants;
pub mod geometry;
pub mod import;
pub mod manager;
pub mod registry;
pub mod reinforce;
pub mod settings;

pub use assembly::*;
pub use constants::*;
pub use geometry::*;
pub use import::*;
pub use manager::*;
pub use registry::*;
pub use reinforce::*;
pub use settings::*;
