//! Falling meteors and the fire they leave behind
//!
//! A meteor drops at constant speed until it reaches the ground or strikes a
//! solid object (building, tree, player). The impact spawns four straight
//! flame chains, one per cardinal direction. Each flame burns out on its own
//! timer.

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::body::{Motion, Transform};
use super::collider::{Collider, ColliderSnapshot, ColliderTag, WorldCollider};
use super::state::EntityRef;
use super::world::Ground;
use crate::tuning::Tuning;

slotmap::new_key_type! {
    /// Stable handle to a live meteor
    pub struct MeteorKey;
    /// Stable handle to a live flame
    pub struct FlameKey;
}

/// Directions fire spreads from an impact, in spawn order
pub const SPREAD_DIRECTIONS: [Vec3; 4] = [Vec3::Y, Vec3::X, Vec3::NEG_Y, Vec3::NEG_X];

/// What happened to a meteor this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeteorStatus {
    Falling,
    /// Hit something at `position`; the meteor must be removed
    Impact {
        position: Vec3,
        /// The player was among the things hit
        struck_player: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meteor {
    pub transform: Transform,
    pub motion: Motion,
    pub collider: Collider,
}

impl Meteor {
    pub fn new(position: Vec3, tuning: &Tuning) -> Self {
        Self {
            transform: Transform::at(position),
            // Falls at a constant rate: gravity is applied as a velocity
            motion: Motion::new(Vec3::new(0.0, 0.0, -tuning.meteor_fall_speed), 1.0),
            collider: Collider::new(Vec3::ZERO, ColliderTag::Meteor, tuning.meteor_radius),
        }
    }

    pub fn world_collider(&self, key: MeteorKey) -> WorldCollider {
        let position = self.transform.position;
        self.collider.resolve(
            EntityRef::Meteor(key),
            position,
            position.z + self.collider.radius,
        )
    }

    /// Move and check for impact
    pub fn update(&mut self, dt: f32, colliders: &ColliderSnapshot, ground: &Ground) -> MeteorStatus {
        self.transform.position += (self.motion.velocity + self.motion.gravity) * dt;

        let center = self.collider.centroid(self.transform.position);
        let radius = self.collider.radius;

        let landed = center.z <= ground.height + radius;
        let struck = colliders.any_overlap(center, radius, ColliderTag::is_obstacle);
        let struck_player = colliders.any_overlap(center, radius, |tag| tag == ColliderTag::Player);

        if landed || struck || struck_player {
            MeteorStatus::Impact {
                position: self.transform.position,
                struck_player,
            }
        } else {
            MeteorStatus::Falling
        }
    }
}

/// One burning segment of a flame chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flame {
    pub transform: Transform,
    pub collider: Collider,
    /// Segments still to come after this one
    pub spawn_level: u32,
    pub spawn_direction: Vec3,
    /// Seconds until this segment burns out
    pub burn_timer: f32,
}

impl Flame {
    pub fn new(position: Vec3, direction: Vec3, spawn_level: u32, tuning: &Tuning) -> Self {
        Self {
            transform: Transform::at(position),
            collider: Collider::new(Vec3::ZERO, ColliderTag::Flame, tuning.flame_radius),
            spawn_level,
            spawn_direction: direction,
            burn_timer: tuning.flame_burn_time,
        }
    }

    pub fn world_collider(&self, key: FlameKey) -> WorldCollider {
        let position = self.transform.position;
        self.collider.resolve(
            EntityRef::Flame(key),
            position,
            position.z + self.collider.radius,
        )
    }

    /// Burn for `dt`. Returns true once the flame has burned out.
    pub fn update(&mut self, dt: f32) -> bool {
        self.burn_timer = (self.burn_timer - dt).max(0.0);
        self.burn_timer <= 0.0
    }
}

/// Build one straight chain of `depth + 1` flames starting at `origin`.
///
/// Segment `i` sits at `origin + direction * i * radius` and carries
/// `depth - i` as its remaining spawn level.
pub fn flame_chain(origin: Vec3, direction: Vec3, depth: u32, tuning: &Tuning) -> Vec<Flame> {
    let step = tuning.flame_radius;
    (0..=depth)
        .map(|i| {
            let offset = direction * (i as f32 * step);
            Flame::new(origin + offset, direction, depth - i, tuning)
        })
        .collect()
}

/// All flames produced by a single impact, one chain per spread direction
pub fn impact_flames(origin: Vec3, tuning: &Tuning) -> Vec<Flame> {
    SPREAD_DIRECTIONS
        .iter()
        .flat_map(|&dir| flame_chain(origin, dir, tuning.flame_spread_depth, tuning))
        .collect()
}

/// Drops meteors on a fixed interval at random points over the play area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeteorSpawner {
    pub interval: f32,
    /// Seconds until the next spawn; may go negative by less than one tick
    pub timer: f32,
    pub height: f32,
}

impl MeteorSpawner {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            interval: tuning.meteor_spawn_interval,
            timer: tuning.meteor_spawn_interval,
            height: tuning.meteor_spawn_height,
        }
    }

    /// Advance the timer. Returns a spawn position when it expires.
    ///
    /// The interval is added to the timer rather than replacing it, so
    /// overrun carries into the next period.
    pub fn update<R: Rng>(&mut self, dt: f32, ground: &Ground, rng: &mut R) -> Option<Vec3> {
        self.timer -= dt;
        if self.timer > 0.0 {
            return None;
        }
        self.timer += self.interval;

        let xy = Vec2::new(
            rng.random_range(ground.min.x..=ground.max.x),
            rng.random_range(ground.min.y..=ground.max.y),
        );
        Some(xy.extend(ground.height + self.height))
    }
}
