//! Kinematic bodies
//!
//! A `Transform` is what the renderer sees; `Motion` is the velocity state
//! integrated by the owning entity's update.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::lateral;

/// Position, rotation and scale of an entity (z-up)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Rotate about the world z axis
    pub fn rotate_yaw(&mut self, delta: f32) {
        self.rotation = (Quat::from_rotation_z(delta) * self.rotation).normalize();
    }
}

/// Velocity state of a dynamic body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub velocity: Vec3,
    /// Constant per entity
    pub gravity: Vec3,
    /// Stored only; dynamics ignore it
    pub mass: f32,
}

impl Motion {
    pub fn new(gravity: Vec3, mass: f32) -> Self {
        Self {
            velocity: Vec3::ZERO,
            gravity,
            mass,
        }
    }

    /// Magnitude of the horizontal velocity
    #[inline]
    pub fn lateral_speed(&self) -> f32 {
        lateral(self.velocity).length()
    }

    #[inline]
    pub fn lateral_velocity(&self) -> Vec2 {
        lateral(self.velocity)
    }

    /// Overwrite the horizontal velocity, keeping the vertical component
    #[inline]
    pub fn set_lateral_velocity(&mut self, lat: Vec2) {
        self.velocity.x = lat.x;
        self.velocity.y = lat.y;
    }

    /// Reduce lateral speed by `amount` without reversing direction.
    ///
    /// Does nothing when lateral velocity is exactly zero.
    pub fn decelerate_lateral(&mut self, amount: f32) {
        let lat = self.lateral_velocity();
        if lat == Vec2::ZERO {
            return;
        }
        let speed = lat.length();
        if amount >= speed {
            self.set_lateral_velocity(Vec2::ZERO);
        } else {
            self.set_lateral_velocity(lat / speed * (speed - amount));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lateral_speed_ignores_vertical() {
        let mut motion = Motion::new(Vec3::ZERO, 1.0);
        motion.velocity = Vec3::new(3.0, 4.0, -100.0);
        assert!((motion.lateral_speed() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_decelerate_does_not_reverse() {
        let mut motion = Motion::new(Vec3::ZERO, 1.0);
        motion.velocity = Vec3::new(1.0, 0.0, 2.0);
        motion.decelerate_lateral(5.0);
        assert_eq!(motion.velocity, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_decelerate_zero_velocity_is_noop() {
        let mut motion = Motion::new(Vec3::ZERO, 1.0);
        motion.velocity = Vec3::new(0.0, 0.0, -1.0);
        motion.decelerate_lateral(1.0);
        assert!(motion.velocity.is_finite());
        assert_eq!(motion.velocity, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_decelerate_partial() {
        let mut motion = Motion::new(Vec3::ZERO, 1.0);
        motion.velocity = Vec3::new(0.0, 10.0, 0.0);
        motion.decelerate_lateral(4.0);
        assert!((motion.velocity.y - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_yaw_keeps_unit_quaternion() {
        let mut t = Transform::default();
        for _ in 0..1000 {
            t.rotate_yaw(0.37);
        }
        assert!((t.rotation.length() - 1.0).abs() < 1e-4);
    }
}
