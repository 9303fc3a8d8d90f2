//! Data-driven game balance
//!
//! Every gameplay constant lives here so a session can be re-tuned from JSON
//! without touching simulation code. Missing fields fall back to defaults.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::MAX_BUILDINGS;

/// Errors produced while loading or validating tuning data
#[derive(thiserror::Error, Debug)]
pub enum TuningError {
    /// JSON could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of its valid range
    #[error("Invalid tuning value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// A building: a solid block standing on the ground
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    /// Center of the footprint, at the base
    pub position: Vec3,
    /// Full extent along x, y and z
    pub size: Vec3,
}

/// A tree: trunk plus canopy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeSpec {
    /// Base of the trunk
    pub position: Vec3,
    pub height: f32,
}

/// Static placement of everything in the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldLayout {
    /// Lower corner of the drivable ground rectangle
    pub bounds_min: Vec2,
    /// Upper corner of the drivable ground rectangle
    pub bounds_max: Vec2,
    pub player_spawn: Vec3,
    /// Initial heading in radians (0 faces +y)
    pub player_spawn_yaw: f32,
    pub buildings: Vec<BuildingSpec>,
    pub trees: Vec<TreeSpec>,
    pub springs: Vec<Vec3>,
    /// Positions the medal may occupy
    pub medal_slots: Vec<Vec3>,
}

impl Default for WorldLayout {
    fn default() -> Self {
        let building = |x: f32, y: f32, h: f32| BuildingSpec {
            position: Vec3::new(x, y, 0.0),
            size: Vec3::new(10.0, 10.0, h),
        };
        let tree = |x: f32, y: f32| TreeSpec {
            position: Vec3::new(x, y, 0.0),
            height: 5.0,
        };

        Self {
            bounds_min: Vec2::new(-50.0, -50.0),
            bounds_max: Vec2::new(50.0, 50.0),
            player_spawn: Vec3::ZERO,
            player_spawn_yaw: 0.0,
            buildings: vec![
                building(25.0, 25.0, 12.0),
                building(-25.0, 25.0, 8.0),
                building(-25.0, -25.0, 16.0),
                building(25.0, -25.0, 10.0),
            ],
            trees: vec![
                tree(-10.0, 15.0),
                tree(12.0, -8.0),
                tree(38.0, 0.0),
                tree(-38.0, 5.0),
                tree(0.0, -38.0),
            ],
            springs: vec![
                Vec3::new(10.0, 10.0, 0.0),
                Vec3::new(-15.0, -12.0, 0.0),
                Vec3::new(18.0, -38.0, 0.0),
            ],
            medal_slots: vec![
                Vec3::new(0.0, 20.0, 1.0),
                Vec3::new(-20.0, 0.0, 1.0),
                Vec3::new(20.0, 5.0, 1.0),
                Vec3::new(0.0, -20.0, 1.0),
                Vec3::new(-40.0, 40.0, 1.0),
                // Rooftop
                Vec3::new(25.0, 25.0, 13.5),
            ],
        }
    }
}

/// Game balance values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Scoring ===
    /// Points per unit of lateral distance driven
    pub score_gain: f32,
    /// Added to the multiplier per medal
    pub multiplier_gain: f32,
    /// Seconds a combo survives without a new medal
    pub combo_duration: f32,
    /// Drop the multiplier back to 1 when the combo runs out
    pub reset_multiplier_on_combo_expiry: bool,

    // === Movement ===
    /// Radians per second at full responsiveness
    pub turn_speed: f32,
    pub top_speed: f32,
    pub ground_accel: f32,
    pub air_accel: f32,
    pub friction_decel: f32,
    pub jump_strength: f32,
    pub gravity: Vec3,
    pub player_mass: f32,
    pub player_radius: f32,

    // === Brake / boost ===
    pub charge_time: f32,
    /// Multiplies top speed while boosting
    pub boost_power: f32,
    pub boost_time: f32,

    // === Hazards ===
    pub meteor_damage: f32,
    /// Damage per second while touching fire
    pub flame_dps: f32,
    pub meteor_spawn_interval: f32,
    pub meteor_spawn_height: f32,
    pub meteor_fall_speed: f32,
    pub meteor_radius: f32,
    pub flame_radius: f32,
    /// Extra segments per flame chain
    pub flame_spread_depth: u32,
    pub flame_burn_time: f32,

    // === Interactables ===
    pub spring_launch: f32,
    pub spring_radius: f32,
    pub spring_shoot_time: f32,
    pub spring_sink_time: f32,
    pub medal_radius: f32,
    pub medal_spin_speed: f32,

    pub layout: WorldLayout,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            score_gain: 100.0,
            multiplier_gain: 1.0,
            combo_duration: 10.0,
            reset_multiplier_on_combo_expiry: false,

            turn_speed: 8.0 * std::f32::consts::PI,
            top_speed: 10.0,
            ground_accel: 10.0,
            air_accel: 1.0,
            friction_decel: 5.0,
            jump_strength: 10.0,
            gravity: Vec3::new(0.0, 0.0, -9.8),
            player_mass: 1.0,
            player_radius: 0.5,

            charge_time: 1.0,
            boost_power: 1.5,
            boost_time: 2.0,

            meteor_damage: 20.0,
            flame_dps: 25.0,
            meteor_spawn_interval: 3.0,
            meteor_spawn_height: 40.0,
            meteor_fall_speed: 8.0,
            meteor_radius: 1.0,
            flame_radius: 1.0,
            flame_spread_depth: 3,
            flame_burn_time: 4.0,

            spring_launch: 20.0,
            spring_radius: 1.0,
            spring_shoot_time: 0.3,
            spring_sink_time: 1.0,
            medal_radius: 0.75,
            medal_spin_speed: std::f32::consts::PI,

            layout: WorldLayout::default(),
        }
    }
}

impl Tuning {
    /// Parse and validate tuning from JSON
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Maximum lateral speed, boosted or not
    #[inline]
    pub fn max_lateral_speed(&self, boosting: bool) -> f32 {
        if boosting {
            self.top_speed * self.boost_power
        } else {
            self.top_speed
        }
    }

    /// Check that every value is in range
    pub fn validate(&self) -> Result<(), TuningError> {
        let positive = [
            ("top_speed", self.top_speed),
            ("combo_duration", self.combo_duration),
            ("charge_time", self.charge_time),
            ("boost_time", self.boost_time),
            ("boost_power", self.boost_power),
            ("player_radius", self.player_radius),
            ("meteor_radius", self.meteor_radius),
            ("flame_radius", self.flame_radius),
            ("flame_burn_time", self.flame_burn_time),
            ("meteor_spawn_interval", self.meteor_spawn_interval),
            ("spring_radius", self.spring_radius),
            ("spring_shoot_time", self.spring_shoot_time),
            ("spring_sink_time", self.spring_sink_time),
            ("medal_radius", self.medal_radius),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(TuningError::Invalid {
                    field,
                    reason: "must be greater than zero",
                });
            }
        }

        let non_negative = [
            ("friction_decel", self.friction_decel),
            ("ground_accel", self.ground_accel),
            ("air_accel", self.air_accel),
            ("meteor_damage", self.meteor_damage),
            ("flame_dps", self.flame_dps),
            ("meteor_fall_speed", self.meteor_fall_speed),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(TuningError::Invalid {
                    field,
                    reason: "must not be negative",
                });
            }
        }

        let layout = &self.layout;
        if layout.bounds_min.x >= layout.bounds_max.x || layout.bounds_min.y >= layout.bounds_max.y
        {
            return Err(TuningError::Invalid {
                field: "layout.bounds",
                reason: "bounds_min must be below bounds_max",
            });
        }
        if layout.medal_slots.len() < 2 {
            return Err(TuningError::Invalid {
                field: "layout.medal_slots",
                reason: "need at least two slots to relocate between",
            });
        }
        if layout.buildings.len() > MAX_BUILDINGS {
            return Err(TuningError::Invalid {
                field: "layout.buildings",
                reason: "too many buildings",
            });
        }
        if layout.buildings.iter().any(|b| b.size.min_element() <= 0.0) {
            return Err(TuningError::Invalid {
                field: "layout.buildings",
                reason: "building size must be positive on every axis",
            });
        }
        if layout.trees.iter().any(|t| t.height <= 0.0) {
            return Err(TuningError::Invalid {
                field: "layout.trees",
                reason: "tree height must be positive",
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning = Tuning::from_json(r#"{ "top_speed": 14.0, "flame_spread_depth": 5 }"#)
            .expect("valid tuning");
        assert_eq!(tuning.top_speed, 14.0);
        assert_eq!(tuning.flame_spread_depth, 5);
        assert_eq!(tuning.boost_power, Tuning::default().boost_power);
        assert_eq!(tuning.layout, WorldLayout::default());
    }

    #[test]
    fn test_invalid_value_rejected() {
        let err = Tuning::from_json(r#"{ "charge_time": 0.0 }"#).unwrap_err();
        assert!(matches!(
            err,
            TuningError::Invalid {
                field: "charge_time",
                ..
            }
        ));
    }

    #[test]
    fn test_single_medal_slot_rejected() {
        let mut tuning = Tuning::default();
        tuning.layout.medal_slots.truncate(1);
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            Tuning::from_json("{ not json"),
            Err(TuningError::Parse(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_preserves_layout() {
        let tuning = Tuning::default();
        let json = tuning.to_json().expect("serializable");
        let back = Tuning::from_json(&json).expect("parses");
        assert_eq!(back, tuning);
    }
}
