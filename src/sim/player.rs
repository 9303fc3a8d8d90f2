//! Player vehicle controller
//!
//! Movement state is a handful of flags and timers rather than an explicit
//! enum: grounded or airborne, accelerating this tick, mid-jump this tick,
//! charging (brake held) and boosting (boost timer running).

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::body::{Motion, Transform};
use super::collider::{
    Collider, ColliderSnapshot, ColliderTag, WorldCollider, lateral_contact, sphere_contact, spheres_overlap,
};
use super::objects::{Spring, SpringId};
use super::state::EntityRef;
use super::tick::Intent;
use super::world::Ground;
use crate::consts::{FALL_RESET_HEIGHT, MAX_HEALTH, PLAYER_CORNERS};
use crate::tuning::{Tuning, WorldLayout};
use crate::{forward, lateral};

/// Turn responsiveness while braking
const BRAKE_TURN_MODIFIER: f32 = 0.5;
/// Overspeed bleeds off at this multiple of the current deceleration
const OVERSPEED_BLEED: f32 = 4.0;
/// Upper bound on pushback sweeps over the solid colliders per tick
const PUSHBACK_PASSES: usize = 16;

/// Read-only world the player collides against this tick
pub struct PlayerEnv<'a> {
    pub colliders: &'a ColliderSnapshot,
    pub springs: &'a [Spring],
    pub ground: &'a Ground,
    pub tuning: &'a Tuning,
}

/// What happened to the player during one update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerReport {
    pub medal_collected: bool,
    pub launched_from: Option<SpringId>,
    /// Total damage taken this tick
    pub damage: f32,
    /// Dropped below the fall-reset height
    pub fell: bool,
    /// A meteor already dealt its damage this tick
    pub meteor_hit: bool,
}

/// Result of applying one tick of intents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntentReport {
    pub jumped: bool,
    /// `Some(fired)` when the brake was released this tick
    pub boost: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub transform: Transform,
    pub motion: Motion,
    /// Footprint corners
    pub colliders: [Collider; PLAYER_CORNERS],

    pub score: f32,
    pub multiplier: f32,
    pub combo_timer: f32,
    pub health: f32,

    pub accelerating: bool,
    pub airborne: bool,
    /// Set by a jump or spring launch, cleared at the end of the tick
    pub jumping: bool,
    /// Brake held this tick
    pub braking: bool,

    pub charge_timer: f32,
    pub boost_timer: f32,

    /// Spring that launched us; it cannot launch us again until we land
    pub last_spring: Option<SpringId>,
}

impl Player {
    /// A fresh player at the layout's spawn point
    pub fn new(layout: &WorldLayout, tuning: &Tuning) -> Self {
        let r = tuning.player_radius;
        let corner = |x: f32, y: f32| Collider::new(Vec3::new(x * r, y * r, r), ColliderTag::Player, r);

        Self {
            transform: Transform {
                position: layout.player_spawn,
                rotation: Quat::from_rotation_z(layout.player_spawn_yaw),
                scale: Vec3::ONE,
            },
            motion: Motion::new(tuning.gravity, tuning.player_mass),
            colliders: [corner(1.0, 1.0), corner(-1.0, 1.0), corner(-1.0, -1.0), corner(1.0, -1.0)],
            score: 0.0,
            multiplier: 1.0,
            combo_timer: 0.0,
            health: MAX_HEALTH,
            accelerating: false,
            airborne: false,
            jumping: false,
            braking: false,
            charge_timer: 0.0,
            boost_timer: 0.0,
            last_spring: None,
        }
    }

    #[inline]
    pub fn is_boosting(&self) -> bool {
        self.boost_timer > 0.0
    }

    #[inline]
    pub fn lateral_speed(&self) -> f32 {
        self.motion.lateral_speed()
    }

    /// Current lateral speed cap (base or boosted)
    pub fn max_lateral_speed(&self, tuning: &Tuning) -> f32 {
        tuning.max_lateral_speed(self.is_boosting())
    }

    pub fn world_colliders(&self) -> impl Iterator<Item = WorldCollider> + '_ {
        let position = self.transform.position;
        self.colliders.iter().map(move |c| {
            let top = c.centroid(position).z + c.radius;
            c.resolve(EntityRef::Player, position, top)
        })
    }

    /// Whether any footprint sphere overlaps `other`
    pub fn overlaps(&self, other: &WorldCollider) -> bool {
        let position = self.transform.position;
        self.colliders
            .iter()
            .any(|c| spheres_overlap(c.centroid(position), c.radius, other.centroid, other.radius))
    }

    /// Apply one tick of intents: turn, jump, accelerate, then brake/boost
    pub fn apply_intent(&mut self, intent: &Intent, dt: f32, tuning: &Tuning) -> IntentReport {
        let was_braking = self.braking;
        self.braking = intent.brake;

        let mut report = IntentReport::default();

        if intent.turn != 0 {
            self.turn(intent.turn as f32, dt, tuning);
        }
        // Jump first: thrust on the tick we leave the ground is air thrust
        if intent.jump {
            report.jumped = self.jump(tuning);
        }
        if intent.accelerate {
            self.accelerate(dt, tuning);
        }
        if intent.brake {
            self.charge(dt, tuning);
        } else if was_braking {
            report.boost = Some(self.boost(tuning));
        }

        report
    }

    /// Yaw by `direction` (+1 counter-clockwise, -1 clockwise)
    pub fn turn(&mut self, direction: f32, dt: f32, tuning: &Tuning) {
        let modifier = if self.braking || self.charge_timer > 0.0 {
            BRAKE_TURN_MODIFIER
        } else {
            0.5 + 0.5 * self.lateral_speed() / tuning.top_speed
        };
        self.transform
            .rotate_yaw(tuning.turn_speed * direction * modifier * dt);
    }

    /// Push forward. Lasts for this tick only.
    pub fn accelerate(&mut self, dt: f32, tuning: &Tuning) {
        let accel = if self.airborne {
            tuning.air_accel
        } else {
            tuning.ground_accel
        };
        let push = self.motion.gravity + forward(self.transform.rotation) * accel;
        self.motion.velocity += push * dt;
        self.accelerating = true;
    }

    /// Jump off the ground. Fails in the air.
    pub fn jump(&mut self, tuning: &Tuning) -> bool {
        if self.airborne {
            return false;
        }
        self.motion.velocity.z += tuning.jump_strength;
        self.airborne = true;
        self.jumping = true;
        true
    }

    /// Brake and build charge. Cancels any running boost.
    pub fn charge(&mut self, dt: f32, tuning: &Tuning) {
        self.boost_timer = 0.0;
        self.motion.decelerate_lateral(tuning.friction_decel * dt);
        self.charge_timer = (self.charge_timer + dt).min(tuning.charge_time);
    }

    /// Release the charge as a burst of forward speed.
    ///
    /// An incomplete charge is wasted: it resets to zero and nothing fires.
    pub fn boost(&mut self, tuning: &Tuning) -> bool {
        let charged = self.charge_timer >= tuning.charge_time;
        self.charge_timer = 0.0;
        if !charged {
            return false;
        }

        let heading = lateral(forward(self.transform.rotation)).normalize_or_zero();
        self.motion
            .set_lateral_velocity(heading * tuning.top_speed * tuning.boost_power);
        self.boost_timer = tuning.boost_time;
        true
    }

    /// Launch off a spring unless that same spring launched us already
    pub fn launch_from_spring(&mut self, spring: SpringId, tuning: &Tuning) -> bool {
        if self.last_spring == Some(spring) {
            return false;
        }
        self.motion.velocity.z += tuning.spring_launch;
        self.airborne = true;
        self.jumping = true;
        self.last_spring = Some(spring);
        true
    }

    /// Lose health, never dropping below zero
    pub fn take_damage(&mut self, amount: f32) {
        self.health = (self.health - amount).clamp(0.0, MAX_HEALTH);
    }

    /// Integrate, collide, settle on the ground and update bookkeeping
    pub fn update(&mut self, dt: f32, env: &PlayerEnv<'_>) -> PlayerReport {
        let tuning = env.tuning;

        // Friction while coasting on the ground
        if !self.accelerating && !self.is_boosting() && !self.airborne {
            self.motion.decelerate_lateral(tuning.friction_decel * dt);
        }

        // Bleed overspeed smoothly instead of clamping
        let max_speed = self.max_lateral_speed(tuning);
        let speed = self.lateral_speed();
        if speed > max_speed {
            let decel = if self.airborne {
                tuning.air_accel
            } else {
                tuning.friction_decel
            };
            let bled = (speed - OVERSPEED_BLEED * decel * dt).max(max_speed);
            let lat = self.motion.lateral_velocity();
            self.motion.set_lateral_velocity(lat / speed * bled);
        }

        self.motion.velocity += self.motion.gravity * dt;
        self.transform.position += self.motion.velocity * dt;

        self.push_out_of_solids(env.colliders);
        let mut report = self.resolve_contacts(dt, env);

        // Snapping to the ground can move the footprint back into a wall
        if !self.jumping && self.settle_on_ground(env.ground) {
            self.push_out_of_solids(env.colliders);
        }
        report.fell = self.transform.position.z < FALL_RESET_HEIGHT;

        self.boost_timer = (self.boost_timer - dt).clamp(0.0, tuning.boost_time);
        if self.combo_timer > 0.0 {
            self.combo_timer = (self.combo_timer - dt).clamp(0.0, tuning.combo_duration);
            if self.combo_timer <= 0.0 && tuning.reset_multiplier_on_combo_expiry {
                self.multiplier = 1.0;
            }
        }
        self.score += self.lateral_speed() * dt * tuning.score_gain * self.multiplier;

        self.accelerating = false;
        self.jumping = false;

        report
    }

    /// Respond to every non-solid collider the footprint touches, by tag
    fn resolve_contacts(&mut self, dt: f32, env: &PlayerEnv<'_>) -> PlayerReport {
        let tuning = env.tuning;
        let mut report = PlayerReport::default();
        let mut burned = false;

        for other in env.colliders.iter() {
            match other.tag {
                ColliderTag::Player | ColliderTag::Building | ColliderTag::Tree => {}
                ColliderTag::Medal => {
                    if !report.medal_collected && self.overlaps(other) {
                        self.multiplier += tuning.multiplier_gain;
                        self.combo_timer = tuning.combo_duration;
                        report.medal_collected = true;
                    }
                }
                ColliderTag::Meteor => {
                    if !report.meteor_hit && self.overlaps(other) {
                        self.take_damage(tuning.meteor_damage);
                        report.damage += tuning.meteor_damage;
                        report.meteor_hit = true;
                    }
                }
                ColliderTag::Flame => {
                    if !burned && self.overlaps(other) {
                        self.take_damage(tuning.flame_dps * dt);
                        report.damage += tuning.flame_dps * dt;
                        burned = true;
                    }
                }
                ColliderTag::Spring => {
                    let EntityRef::Spring(id) = other.owner else {
                        continue;
                    };
                    let armed = env.springs.get(id.0).is_some_and(Spring::is_resting);
                    if armed && self.overlaps(other) && self.launch_from_spring(id, tuning) {
                        report.launched_from = Some(id);
                    }
                }
            }
        }

        report
    }

    /// Sweep the solid colliders until the footprint is clear of all of them.
    ///
    /// A wall is many overlapping spheres, and leaving one can mean entering
    /// its neighbour, so a single sweep is not enough.
    fn push_out_of_solids(&mut self, colliders: &ColliderSnapshot) {
        for _ in 0..PUSHBACK_PASSES {
            let mut touched = false;
            for obstacle in colliders.iter().filter(|c| c.tag.is_obstacle()) {
                touched |= self.push_out_of(obstacle);
            }
            if !touched {
                break;
            }
        }
    }

    /// Positional pushback out of a solid sphere, per footprint corner.
    ///
    /// A grounded footprint below the obstacle's top is pushed horizontally
    /// so that it stays on the ground. Returns whether any corner touched.
    fn push_out_of(&mut self, obstacle: &WorldCollider) -> bool {
        let mut touched = false;
        for i in 0..self.colliders.len() {
            let collider = self.colliders[i];
            let center = collider.centroid(self.transform.position);
            let contact = if !self.airborne && center.z < obstacle.top {
                lateral_contact(center, collider.radius, obstacle.centroid, obstacle.radius)
            } else {
                sphere_contact(center, collider.radius, obstacle.centroid, obstacle.radius)
            };
            if !contact.hit {
                continue;
            }
            touched = true;

            self.transform.position += contact.normal * contact.penetration;

            // Stop driving into the obstacle without gaining lateral speed
            let into = self.motion.velocity.dot(contact.normal);
            if into < 0.0 {
                let speed_before = self.lateral_speed();
                self.motion.velocity -= contact.normal * into;
                let speed_after = self.lateral_speed();
                if speed_after > speed_before {
                    let lat = self.motion.lateral_velocity();
                    self.motion.set_lateral_velocity(lat / speed_after * speed_before);
                }
            }

            // Riding on top of the obstacle
            if collider.centroid(self.transform.position).z >= obstacle.top {
                self.airborne = true;
                self.last_spring = None;
            }
        }
        touched
    }

    /// Snap to the ground when inside the play area and at or below it.
    ///
    /// Returns true if the snap moved the player.
    fn settle_on_ground(&mut self, ground: &Ground) -> bool {
        let position = &mut self.transform.position;
        let inside = ground.contains(lateral(*position));

        if inside && position.z <= ground.height {
            let moved = position.z != ground.height;
            position.z = ground.height;
            self.motion.velocity.z = 0.0;
            self.airborne = false;
            self.last_spring = None;
            moved
        } else {
            self.airborne = true;
            false
        }
    }
}
