//! Per-frame simulation module
//!
//! All gameplay logic lives here. Nothing in this module draws, plays sound
//! or reads devices:
//! - Intents in, transforms and HUD numbers out
//! - Seeded RNG only
//! - Fixed update order within a tick

pub mod body;
pub mod collider;
pub mod hazard;
pub mod objects;
pub mod player;
pub mod state;
pub mod tick;
pub mod world;

pub use body::{Motion, Transform};
pub use collider::{Collider, ColliderSnapshot, ColliderTag, CollisionResult, WorldCollider, sphere_contact, test};
pub use hazard::{Flame, FlameKey, Meteor, MeteorKey, MeteorSpawner, flame_chain};
pub use objects::{Medal, Spring, SpringId, SpringState};
pub use player::Player;
pub use state::{EntityRef, GameEvent, HudSnapshot, RenderInstance, ResetCause, Simulation};
pub use tick::{Intent, tick};
pub use world::{Building, Ground, StaticWorld, Tree};
