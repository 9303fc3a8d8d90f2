//! Burnin - simulation core for a 3D arcade platformer
//!
//! Core modules:
//! - `sim`: Per-frame simulation (kinematics, sphere collisions, hazards, game state)
//! - `tuning`: Data-driven game balance and world layout
//!
//! Rendering, asset loading and input polling live outside this crate. The
//! simulation consumes abstract intents and produces transforms plus HUD state.

pub mod sim;
pub mod tuning;

pub use sim::{GameEvent, HudSnapshot, Intent, Simulation};
pub use tuning::{Tuning, TuningError, WorldLayout};

use glam::{Quat, Vec2, Vec3};

/// Fixed engine constants (not tunable)
pub mod consts {
    /// Fixed timestep used by the native runner (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// World height of the ground plane (z-up)
    pub const GROUND_LEVEL: f32 = 0.0;
    /// Falling below this height resets the session
    pub const FALL_RESET_HEIGHT: f32 = -20.0;

    /// Buildings are approximated by a cube of N×N×N spheres
    pub const BUILDING_GRID: usize = 8;
    /// Spheres stacked to approximate a tree
    pub const TREE_SEGMENTS: usize = 3;
    /// Collision spheres on the player footprint
    pub const PLAYER_CORNERS: usize = 4;
    /// Upper bound on buildings in a layout
    pub const MAX_BUILDINGS: usize = 6;

    /// Full health
    pub const MAX_HEALTH: f32 = 100.0;
}

/// Horizontal (x, y) part of a vector
#[inline]
pub fn lateral(v: Vec3) -> Vec2 {
    v.truncate()
}

/// Replace the horizontal part of a vector, keeping z
#[inline]
pub fn with_lateral(v: Vec3, lat: Vec2) -> Vec3 {
    lat.extend(v.z)
}

/// Forward direction of a body. Bodies face +y at identity rotation.
#[inline]
pub fn forward(rotation: Quat) -> Vec3 {
    rotation * Vec3::Y
}

/// Yaw (rotation about +z) of a rotation, in radians
#[inline]
pub fn yaw(rotation: Quat) -> f32 {
    let f = forward(rotation);
    // Angle of the forward vector measured from +y, counter-clockwise
    (-f.x).atan2(f.y)
}
