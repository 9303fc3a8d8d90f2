//! Interactable world objects: launch springs and the score medal

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::body::Transform;
use super::collider::{Collider, ColliderTag, WorldCollider};
use super::state::EntityRef;
use crate::tuning::Tuning;

/// Index of a spring in the simulation's spring list.
///
/// Springs are created once and never removed, so the index is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpringId(pub usize);

/// Launch pad phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpringState {
    /// Armed, will launch on contact
    #[default]
    Resting,
    /// Just fired
    Shooting,
    /// Retracting back to rest
    Sinking,
}

/// A launch pad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spring {
    pub id: SpringId,
    pub transform: Transform,
    pub collider: Collider,
    pub state: SpringState,
    /// Time left in the current phase
    pub timer: f32,
    shoot_time: f32,
    sink_time: f32,
}

/// How far the pad stretches at full extension
const SPRING_STRETCH: f32 = 0.5;

impl Spring {
    pub fn new(id: SpringId, position: Vec3, tuning: &Tuning) -> Self {
        Self {
            id,
            transform: Transform::at(position),
            collider: Collider::new(
                Vec3::new(0.0, 0.0, tuning.spring_radius * 0.5),
                ColliderTag::Spring,
                tuning.spring_radius,
            ),
            state: SpringState::Resting,
            timer: 0.0,
            shoot_time: tuning.spring_shoot_time,
            sink_time: tuning.spring_sink_time,
        }
    }

    #[inline]
    pub fn is_resting(&self) -> bool {
        self.state == SpringState::Resting
    }

    pub fn world_collider(&self) -> WorldCollider {
        let position = self.transform.position;
        self.collider.resolve(
            EntityRef::Spring(self.id),
            position,
            self.collider.centroid(position).z + self.collider.radius,
        )
    }

    /// Fire the spring. Only possible while resting.
    pub fn trigger(&mut self) -> bool {
        if !self.is_resting() {
            return false;
        }
        self.state = SpringState::Shooting;
        self.timer = self.shoot_time;
        true
    }

    /// Advance the phase timer
    pub fn update(&mut self, dt: f32) {
        match self.state {
            SpringState::Resting => {}
            SpringState::Shooting => {
                self.timer = (self.timer - dt).clamp(0.0, self.shoot_time);
                if self.timer <= 0.0 {
                    self.state = SpringState::Sinking;
                    self.timer = self.sink_time;
                }
            }
            SpringState::Sinking => {
                self.timer = (self.timer - dt).clamp(0.0, self.sink_time);
                if self.timer <= 0.0 {
                    self.state = SpringState::Resting;
                }
            }
        }

        // Cosmetic stretch; no gameplay coupling
        let extension = match self.state {
            SpringState::Resting => 0.0,
            SpringState::Shooting => 1.0 - self.timer / self.shoot_time,
            SpringState::Sinking => self.timer / self.sink_time,
        };
        self.transform.scale = Vec3::new(1.0, 1.0, 1.0 + SPRING_STRETCH * extension);
    }
}

/// Score pickup that hops between fixed slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medal {
    pub transform: Transform,
    pub collider: Collider,
    /// Index into `slots` currently occupied
    pub slot: usize,
    slots: Vec<Vec3>,
    spin_speed: f32,
}

impl Medal {
    /// Place the medal in the first slot
    pub fn new(slots: Vec<Vec3>, tuning: &Tuning) -> Self {
        let position = slots.first().copied().unwrap_or(Vec3::ZERO);
        Self {
            transform: Transform::at(position),
            collider: Collider::new(Vec3::ZERO, ColliderTag::Medal, tuning.medal_radius),
            slot: 0,
            slots,
            spin_speed: tuning.medal_spin_speed,
        }
    }

    pub fn slots(&self) -> &[Vec3] {
        &self.slots
    }

    pub fn world_collider(&self) -> WorldCollider {
        let position = self.transform.position;
        self.collider
            .resolve(EntityRef::Medal, position, position.z + self.collider.radius)
    }

    /// Move to a random slot other than the current one
    pub fn relocate<R: Rng>(&mut self, rng: &mut R) {
        if self.slots.len() < 2 {
            return;
        }
        let mut next = self.slot;
        while next == self.slot {
            next = rng.random_range(0..self.slots.len());
        }
        self.slot = next;
        self.transform.position = self.slots[next];
    }

    /// Spin, and hop away if the player grabbed it this tick
    pub fn update<R: Rng>(&mut self, dt: f32, collected: bool, rng: &mut R) {
        self.transform.rotation =
            (Quat::from_rotation_z(self.spin_speed * dt) * self.transform.rotation).normalize();
        if collected {
            let from = self.slot;
            self.relocate(rng);
            log::debug!("Medal moved from slot {} to slot {}", from, self.slot);
        }
    }
}
