//! Per-frame simulation tick
//!
//! The update order is fixed: spawner, player intents, collider snapshot,
//! player, medal, springs, meteors, flames. Everything except the player
//! collides against the snapshot taken before the player moved.

use serde::{Deserialize, Serialize};

use super::hazard::MeteorStatus;
use super::player::PlayerEnv;
use super::state::{GameEvent, ResetCause, Simulation};

/// Abstract player intents, polled once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// -1 turns clockwise, +1 counter-clockwise, 0 holds heading
    pub turn: i8,
    pub accelerate: bool,
    /// Edge-triggered: true only on the tick the button went down
    pub jump: bool,
    /// Held to charge; releasing fires the boost
    pub brake: bool,
}

/// Advance the simulation by exactly `dt` seconds
pub fn tick(sim: &mut Simulation, intent: &Intent, dt: f32) {
    sim.time += dt;
    sim.time_ticks += 1;

    // Spawner
    if let Some(position) = sim.spawner.update(dt, &sim.world.ground, &mut sim.rng) {
        sim.spawn_meteor(position);
    }

    // Intents
    let intent_report = sim.player.apply_intent(intent, dt, &sim.tuning);
    match intent_report.boost {
        Some(true) => sim.emit(GameEvent::BoostFired),
        Some(false) => sim.emit(GameEvent::BoostWasted),
        None => {}
    }

    // Snapshot of the world as of the start of the tick
    sim.gather_colliders();

    // Player
    let report = {
        let env = PlayerEnv {
            colliders: &sim.colliders,
            springs: &sim.springs,
            ground: &sim.world.ground,
            tuning: &sim.tuning,
        };
        sim.player.update(dt, &env)
    };

    if report.damage > 0.0 {
        let health = sim.player.health;
        sim.emit(GameEvent::PlayerDamaged {
            amount: report.damage,
            health,
        });
    }
    if report.fell {
        sim.reset(ResetCause::Fell);
        return;
    }
    if sim.player.health <= 0.0 {
        log::info!("Player burned out");
        sim.reset(ResetCause::Burned);
        return;
    }
    if report.medal_collected {
        let multiplier = sim.player.multiplier;
        log::debug!("Medal collected, multiplier now {}", multiplier);
        sim.emit(GameEvent::MedalCollected { multiplier });
    }

    // Medal
    sim.medal.update(dt, report.medal_collected, &mut sim.rng);

    // Springs
    if let Some(id) = report.launched_from {
        if let Some(spring) = sim.springs.get_mut(id.0) {
            spring.trigger();
        }
        sim.emit(GameEvent::SpringLaunched(id));
    }
    for spring in &mut sim.springs {
        spring.update(dt);
    }

    // Meteors
    let mut impacts = Vec::new();
    let mut struck = false;
    for (key, meteor) in sim.meteors.iter_mut() {
        if let MeteorStatus::Impact {
            position,
            struck_player,
        } = meteor.update(dt, &sim.colliders, &sim.world.ground)
        {
            impacts.push((key, position));
            struck |= struck_player;
        }
    }
    for (key, position) in impacts {
        sim.release_meteor(key);
        sim.emit(GameEvent::MeteorImpact { position });
        sim.spawn_impact_flames(position);
    }

    // A meteor landing on the player hurts as much as driving into one,
    // still at most once per tick
    if struck && !report.meteor_hit {
        let amount = sim.tuning.meteor_damage;
        sim.player.take_damage(amount);
        let health = sim.player.health;
        sim.emit(GameEvent::PlayerDamaged { amount, health });
        if health <= 0.0 {
            log::info!("Player crushed by a meteor");
            sim.reset(ResetCause::Burned);
            return;
        }
    }

    // Flames
    let burned_out: Vec<_> = sim
        .flames
        .iter_mut()
        .filter_map(|(key, flame)| flame.update(dt).then_some(key))
        .collect();
    for key in burned_out {
        sim.release_flame(key);
    }
}

impl Simulation {
    /// Advance by `dt` seconds with the given intents
    pub fn update(&mut self, intent: &Intent, dt: f32) {
        tick(self, intent, dt);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::consts::{FALL_RESET_HEIGHT, GROUND_LEVEL, MAX_HEALTH, SIM_DT};
    use crate::sim::objects::SpringState;
    use crate::sim::state::EntityRef;
    use crate::tuning::Tuning;

    fn quiet_tuning() -> Tuning {
        // Effectively no meteors unless a test spawns one
        Tuning {
            meteor_spawn_interval: 1.0e6,
            ..Default::default()
        }
    }

    #[test]
    fn test_idle_player_stays_grounded() {
        let mut sim = Simulation::new(quiet_tuning(), 1).expect("valid tuning");
        let spawn = sim.player.transform.position;
        for _ in 0..300 {
            tick(&mut sim, &Intent::default(), SIM_DT);
        }
        assert_eq!(sim.player.transform.position, spawn);
        assert_eq!(sim.player.transform.position.z, GROUND_LEVEL);
        assert_eq!(sim.player.motion.velocity.z, 0.0);
        assert_eq!(sim.score(), 0.0);
    }

    #[test]
    fn test_driving_scores_points() {
        let mut sim = Simulation::new(quiet_tuning(), 1).expect("valid tuning");
        let intent = Intent {
            accelerate: true,
            ..Default::default()
        };
        for _ in 0..60 {
            tick(&mut sim, &intent, SIM_DT);
        }
        assert!(sim.score() > 0.0);
        assert!(sim.player.transform.position.y > 0.0);
        assert!(sim.player.lateral_speed() <= sim.tuning.top_speed + 1e-3);
    }

    #[test]
    fn test_fall_triggers_reset() {
        let mut sim = Simulation::new(quiet_tuning(), 1).expect("valid tuning");
        sim.player.score = 1234.0;
        sim.player.health = 40.0;
        // Off the edge of the play area, already below the floor
        sim.player.transform.position = Vec3::new(70.0, 0.0, FALL_RESET_HEIGHT - 1.0);
        sim.player.airborne = true;
        sim.spawn_meteor(Vec3::new(5.0, 5.0, 30.0));
        sim.drain_events();

        tick(&mut sim, &Intent::default(), SIM_DT);

        assert_eq!(sim.score(), 0.0);
        assert_eq!(sim.health(), MAX_HEALTH);
        let layout = &sim.tuning.layout;
        assert_eq!(sim.player.transform.position, layout.player_spawn);
        assert!(
            (crate::yaw(sim.player.transform.rotation) - layout.player_spawn_yaw).abs() < 1e-6
        );
        assert!(sim.meteors.is_empty());
        assert_eq!(sim.resets, 1);
        assert!(
            sim.events()
                .contains(&GameEvent::SessionReset(ResetCause::Fell))
        );
    }

    #[test]
    fn test_health_depletion_resets() {
        let mut sim = Simulation::new(quiet_tuning(), 1).expect("valid tuning");
        sim.player.health = 1.0;
        sim.spawn_impact_flames(sim.player.transform.position);
        tick(&mut sim, &Intent::default(), SIM_DT * 10.0);
        assert_eq!(sim.resets, 1);
        assert_eq!(sim.health(), MAX_HEALTH);
        assert!(sim.flames.is_empty());
    }

    #[test]
    fn test_meteor_impact_spawns_flame_chains() {
        let mut sim = Simulation::new(quiet_tuning(), 3).expect("valid tuning");
        // Open ground away from everything
        let key = sim.spawn_meteor(Vec3::new(-5.0, 30.0, 1.05));
        sim.drain_events();

        tick(&mut sim, &Intent::default(), SIM_DT);

        assert!(!sim.meteors.contains_key(key));
        let per_chain = sim.tuning.flame_spread_depth as usize + 1;
        assert_eq!(sim.flames.len(), 4 * per_chain);

        let events = sim.drain_events();
        assert!(events.contains(&GameEvent::Despawned(EntityRef::Meteor(key))));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::MeteorImpact { .. }))
        );
        let spawned_flames = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Spawned(EntityRef::Flame(_))))
            .count();
        assert_eq!(spawned_flames, 4 * per_chain);
    }

    #[test]
    fn test_meteor_landing_on_idle_player_damages_once() {
        let tuning = Tuning {
            flame_dps: 0.0,
            ..quiet_tuning()
        };
        let mut sim = Simulation::new(tuning, 4).expect("valid tuning");
        let above = sim.player.transform.position + Vec3::new(0.0, 0.0, 10.0);
        sim.spawn_meteor(above);
        sim.drain_events();

        for _ in 0..200 {
            tick(&mut sim, &Intent::default(), SIM_DT);
        }

        let events = sim.drain_events();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::MeteorImpact { .. }))
        );
        let hits = events
            .iter()
            .filter(|e| matches!(e, GameEvent::PlayerDamaged { .. }))
            .count();
        assert_eq!(hits, 1);
        assert_eq!(sim.health(), MAX_HEALTH - sim.tuning.meteor_damage);
    }

    #[test]
    fn test_flames_burn_out() {
        let mut sim = Simulation::new(quiet_tuning(), 3).expect("valid tuning");
        sim.spawn_impact_flames(Vec3::new(-5.0, 30.0, 0.0));
        let count = sim.flames.len();
        sim.drain_events();

        let ticks = (sim.tuning.flame_burn_time / SIM_DT).ceil() as usize + 2;
        for _ in 0..ticks {
            tick(&mut sim, &Intent::default(), SIM_DT);
        }
        assert!(sim.flames.is_empty());
        let despawns = sim
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::Despawned(EntityRef::Flame(_))))
            .count();
        assert_eq!(despawns, count);
    }

    #[test]
    fn test_spawner_drops_meteors_over_time() {
        let tuning = Tuning {
            meteor_spawn_interval: 0.5,
            ..Default::default()
        };
        let mut sim = Simulation::new(tuning, 9).expect("valid tuning");
        for _ in 0..31 {
            tick(&mut sim, &Intent::default(), SIM_DT);
        }
        assert_eq!(sim.meteors.len(), 1);
        let meteor = sim.meteors.values().next().expect("one meteor");
        assert!(sim.world.ground.contains(meteor.transform.position.truncate()));
    }

    #[test]
    fn test_medal_pickup_relocates_and_raises_multiplier() {
        let mut sim = Simulation::new(quiet_tuning(), 5).expect("valid tuning");
        let slot = sim.medal.slot;
        sim.medal.transform.position = sim.player.transform.position + Vec3::new(0.0, 0.0, 0.5);

        tick(&mut sim, &Intent::default(), SIM_DT);

        assert_eq!(sim.multiplier(), 1.0 + sim.tuning.multiplier_gain);
        assert_ne!(sim.medal.slot, slot);
        assert_eq!(sim.medal.transform.position, sim.medal.slots()[sim.medal.slot]);
        assert!(
            sim.events()
                .iter()
                .any(|e| matches!(e, GameEvent::MedalCollected { .. }))
        );
    }

    #[test]
    fn test_spring_launch_once_per_contact() {
        let mut sim = Simulation::new(quiet_tuning(), 5).expect("valid tuning");
        let spring_pos = sim.springs[0].transform.position;
        sim.player.transform.position = spring_pos;

        tick(&mut sim, &Intent::default(), SIM_DT);
        assert_eq!(sim.springs[0].state, SpringState::Shooting);
        assert!(sim.player.airborne);
        let launches = |sim: &Simulation| {
            sim.events()
                .iter()
                .filter(|e| matches!(e, GameEvent::SpringLaunched(_)))
                .count()
        };
        assert_eq!(launches(&sim), 1);

        for _ in 0..10 {
            tick(&mut sim, &Intent::default(), SIM_DT);
        }
        assert_eq!(launches(&sim), 1);
        assert!(sim.player.transform.position.z > 0.0);
    }

    #[test]
    fn test_brake_release_fires_boost_event() {
        let mut sim = Simulation::new(quiet_tuning(), 5).expect("valid tuning");
        let brake = Intent {
            brake: true,
            ..Default::default()
        };
        tick(&mut sim, &brake, SIM_DT);
        tick(&mut sim, &Intent::default(), SIM_DT);
        assert!(sim.events().contains(&GameEvent::BoostWasted));

        for _ in 0..70 {
            tick(&mut sim, &brake, SIM_DT);
        }
        tick(&mut sim, &Intent::default(), SIM_DT);
        assert!(sim.events().contains(&GameEvent::BoostFired));
        assert!(sim.hud().boosting);
    }

    #[test]
    fn test_determinism() {
        let tuning = Tuning {
            meteor_spawn_interval: 0.25,
            ..Default::default()
        };
        let mut a = Simulation::new(tuning.clone(), 99).expect("valid tuning");
        let mut b = Simulation::new(tuning, 99).expect("valid tuning");
        let intents = [
            Intent {
                accelerate: true,
                ..Default::default()
            },
            Intent {
                accelerate: true,
                turn: 1,
                ..Default::default()
            },
            Intent {
                jump: true,
                ..Default::default()
            },
            Intent::default(),
        ];
        for i in 0..600 {
            let intent = &intents[i % intents.len()];
            tick(&mut a, intent, SIM_DT);
            tick(&mut b, intent, SIM_DT);
        }
        assert_eq!(a.player.transform.position, b.player.transform.position);
        assert_eq!(a.score(), b.score());
        assert_eq!(a.meteors.len(), b.meteors.len());
        assert_eq!(a.flames.len(), b.flames.len());
        assert_eq!(a.medal.slot, b.medal.slot);
    }
}
