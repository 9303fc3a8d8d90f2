//! Simulation root
//!
//! One owned aggregate holds every entity. Hazards live in slot maps so that
//! removal frees a slot and outstanding keys go stale instead of dangling.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;
use slotmap::SlotMap;

use super::body::Transform;
use super::collider::ColliderSnapshot;
use super::hazard::{Flame, FlameKey, Meteor, MeteorKey, MeteorSpawner, impact_flames};
use super::objects::{Medal, Spring, SpringId};
use super::player::Player;
use super::world::StaticWorld;
use crate::consts::MAX_HEALTH;
use crate::tuning::{Tuning, TuningError};

/// Identifies any entity the renderer may draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Player,
    Medal,
    Spring(SpringId),
    Building(usize),
    Tree(usize),
    Meteor(MeteorKey),
    Flame(FlameKey),
}

/// Why a session restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResetCause {
    /// Fell through the bottom of the world
    Fell,
    /// Health reached zero
    Burned,
    /// Requested by the caller
    Manual,
}

/// Things that happened during a tick, for the renderer, HUD and audio
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A hazard came into existence
    Spawned(EntityRef),
    /// A hazard was released; drop its render resources
    Despawned(EntityRef),
    MeteorImpact { position: Vec3 },
    MedalCollected { multiplier: f32 },
    SpringLaunched(SpringId),
    PlayerDamaged { amount: f32, health: f32 },
    BoostFired,
    BoostWasted,
    SessionReset(ResetCause),
}

/// One drawable entity and where to draw it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderInstance {
    pub entity: EntityRef,
    pub transform: Transform,
}

/// Read-only numbers for the overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub score: f32,
    pub health: f32,
    pub multiplier: f32,
    /// Seconds left on the combo
    pub combo_remaining: f32,
    /// Brake charge progress in [0, 1]
    pub charge_fraction: f32,
    pub boosting: bool,
}

/// Complete simulation state
pub struct Simulation {
    pub tuning: Tuning,
    pub seed: u64,
    pub(super) rng: Pcg32,
    pub world: StaticWorld,
    pub player: Player,
    pub medal: Medal,
    pub springs: Vec<Spring>,
    pub meteors: SlotMap<MeteorKey, Meteor>,
    pub flames: SlotMap<FlameKey, Flame>,
    pub spawner: MeteorSpawner,
    /// Reused every tick
    pub(super) colliders: ColliderSnapshot,
    events: Vec<GameEvent>,
    /// Simulated seconds since the current session started
    pub time: f32,
    pub time_ticks: u64,
    /// Sessions restarted so far
    pub resets: u32,
}

impl Simulation {
    /// Create a new simulation with the given tuning and seed.
    ///
    /// The tuning is validated first; out-of-range values are rejected
    /// rather than left to misbehave mid-session.
    pub fn new(tuning: Tuning, seed: u64) -> Result<Self, TuningError> {
        tuning.validate()?;

        let world = StaticWorld::from_layout(&tuning.layout);
        let player = Player::new(&tuning.layout, &tuning);
        let medal = Medal::new(tuning.layout.medal_slots.clone(), &tuning);
        let springs = Self::build_springs(&tuning);
        let spawner = MeteorSpawner::new(&tuning);
        let colliders = ColliderSnapshot::with_capacity(world.collider_count() + 64);

        log::info!(
            "Simulation started (seed {}, {} static colliders, {} springs)",
            seed,
            world.collider_count(),
            springs.len()
        );

        Ok(Self {
            tuning,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            world,
            player,
            medal,
            springs,
            meteors: SlotMap::with_key(),
            flames: SlotMap::with_key(),
            spawner,
            colliders,
            events: Vec::new(),
            time: 0.0,
            time_ticks: 0,
            resets: 0,
        })
    }

    fn build_springs(tuning: &Tuning) -> Vec<Spring> {
        tuning
            .layout
            .springs
            .iter()
            .enumerate()
            .map(|(i, &pos)| Spring::new(SpringId(i), pos, tuning))
            .collect()
    }

    /// Start a new session in place.
    ///
    /// Every hazard is released first. Afterwards the simulation evolves
    /// exactly like a freshly created one with the same tuning and seed;
    /// only static geometry, pending events and the reset count carry over.
    pub fn reset(&mut self, cause: ResetCause) {
        let meteors: Vec<_> = self.meteors.keys().collect();
        for key in meteors {
            self.release_meteor(key);
        }
        let flames: Vec<_> = self.flames.keys().collect();
        for key in flames {
            self.release_flame(key);
        }

        log::info!(
            "Session reset ({:?}) after {:.1}s with score {:.0}",
            cause,
            self.time,
            self.player.score
        );

        self.player = Player::new(&self.tuning.layout, &self.tuning);
        self.medal = Medal::new(self.tuning.layout.medal_slots.clone(), &self.tuning);
        self.springs = Self::build_springs(&self.tuning);
        self.spawner = MeteorSpawner::new(&self.tuning);
        self.colliders.clear();
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.time = 0.0;
        self.time_ticks = 0;
        self.resets += 1;
        self.events.push(GameEvent::SessionReset(cause));
    }

    pub(super) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Events since the last drain, oldest first
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn spawn_meteor(&mut self, position: Vec3) -> MeteorKey {
        let key = self.meteors.insert(Meteor::new(position, &self.tuning));
        log::debug!("Meteor spawned at {:?}", position);
        self.emit(GameEvent::Spawned(EntityRef::Meteor(key)));
        key
    }

    /// Spawn the four flame chains of an impact
    pub fn spawn_impact_flames(&mut self, origin: Vec3) -> Vec<FlameKey> {
        let flames = impact_flames(origin, &self.tuning);
        let mut keys = Vec::with_capacity(flames.len());
        for flame in flames {
            let key = self.flames.insert(flame);
            self.emit(GameEvent::Spawned(EntityRef::Flame(key)));
            keys.push(key);
        }
        keys
    }

    /// Free a meteor's slot and signal its render resources for release.
    ///
    /// Stale keys are ignored, so the signal fires at most once.
    pub fn release_meteor(&mut self, key: MeteorKey) -> Option<Meteor> {
        let meteor = self.meteors.remove(key)?;
        self.emit(GameEvent::Despawned(EntityRef::Meteor(key)));
        Some(meteor)
    }

    pub fn release_flame(&mut self, key: FlameKey) -> Option<Flame> {
        let flame = self.flames.remove(key)?;
        self.emit(GameEvent::Despawned(EntityRef::Flame(key)));
        Some(flame)
    }

    /// Flatten every live collider into the per-tick snapshot
    pub(super) fn gather_colliders(&mut self) {
        let snapshot = &mut self.colliders;
        snapshot.clear();
        snapshot.extend(self.player.world_colliders());
        snapshot.extend(self.world.world_colliders());
        snapshot.push(self.medal.world_collider());
        snapshot.extend(self.springs.iter().map(Spring::world_collider));
        snapshot.extend(self.meteors.iter().map(|(k, m)| m.world_collider(k)));
        snapshot.extend(self.flames.iter().map(|(k, f)| f.world_collider(k)));
    }

    /// The collider snapshot used by the most recent tick
    pub fn colliders(&self) -> &ColliderSnapshot {
        &self.colliders
    }

    /// Every live entity's transform for the renderer
    pub fn render_instances(&self) -> Vec<RenderInstance> {
        let mut out = Vec::with_capacity(
            2 + self.springs.len()
                + self.world.buildings.len()
                + self.world.trees.len()
                + self.meteors.len()
                + self.flames.len(),
        );
        let mut push = |entity, transform| out.push(RenderInstance { entity, transform });

        push(EntityRef::Player, self.player.transform);
        push(EntityRef::Medal, self.medal.transform);
        for spring in &self.springs {
            push(EntityRef::Spring(spring.id), spring.transform);
        }
        for (i, building) in self.world.buildings.iter().enumerate() {
            push(EntityRef::Building(i), building.transform);
        }
        for (i, tree) in self.world.trees.iter().enumerate() {
            push(EntityRef::Tree(i), tree.transform);
        }
        for (key, meteor) in &self.meteors {
            push(EntityRef::Meteor(key), meteor.transform);
        }
        for (key, flame) in &self.flames {
            push(EntityRef::Flame(key), flame.transform);
        }
        out
    }

    pub fn hud(&self) -> HudSnapshot {
        let player = &self.player;
        HudSnapshot {
            score: player.score,
            health: player.health,
            multiplier: player.multiplier,
            combo_remaining: player.combo_timer,
            charge_fraction: (player.charge_timer / self.tuning.charge_time).clamp(0.0, 1.0),
            boosting: player.is_boosting(),
        }
    }

    pub fn score(&self) -> f32 {
        self.player.score
    }

    pub fn health(&self) -> f32 {
        self.player.health
    }

    pub fn multiplier(&self) -> f32 {
        self.player.multiplier
    }

    /// Whether the player has full health and no score (fresh session)
    pub fn is_fresh(&self) -> bool {
        self.player.score == 0.0 && self.player.health == MAX_HEALTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> Simulation {
        Simulation::new(Tuning::default(), 42).expect("valid tuning")
    }

    #[test]
    fn test_new_simulation_is_fresh() {
        let sim = sim();
        assert!(sim.is_fresh());
        assert_eq!(sim.multiplier(), 1.0);
        assert!(sim.meteors.is_empty());
        assert!(sim.flames.is_empty());
        assert_eq!(sim.springs.len(), sim.tuning.layout.springs.len());
    }

    #[test]
    fn test_release_signals_exactly_once() {
        let mut sim = sim();
        let key = sim.spawn_meteor(Vec3::new(0.0, 0.0, 30.0));
        assert!(sim.release_meteor(key).is_some());
        assert!(sim.release_meteor(key).is_none());

        let events = sim.drain_events();
        let despawns = events
            .iter()
            .filter(|e| **e == GameEvent::Despawned(EntityRef::Meteor(key)))
            .count();
        assert_eq!(despawns, 1);
        assert!(sim.events().is_empty());
    }

    #[test]
    fn test_impact_flames_registered() {
        let mut sim = sim();
        let keys = sim.spawn_impact_flames(Vec3::new(5.0, 5.0, 0.0));
        let per_chain = sim.tuning.flame_spread_depth as usize + 1;
        assert_eq!(keys.len(), 4 * per_chain);
        assert_eq!(sim.flames.len(), 4 * per_chain);
    }

    #[test]
    fn test_reset_releases_hazards() {
        let mut sim = sim();
        sim.spawn_meteor(Vec3::new(0.0, 0.0, 30.0));
        sim.spawn_impact_flames(Vec3::ZERO);
        sim.player.score = 500.0;
        sim.player.health = 10.0;
        sim.drain_events();

        sim.reset(ResetCause::Manual);

        assert!(sim.meteors.is_empty());
        assert!(sim.flames.is_empty());
        assert!(sim.is_fresh());
        assert_eq!(sim.resets, 1);
        let events = sim.drain_events();
        let despawns = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Despawned(_)))
            .count();
        assert_eq!(despawns, 1 + 4 * (sim.tuning.flame_spread_depth as usize + 1));
        assert_eq!(events.last(), Some(&GameEvent::SessionReset(ResetCause::Manual)));
    }

    #[test]
    fn test_new_rejects_invalid_tuning() {
        let mut tuning = Tuning::default();
        tuning.layout.bounds_min.x = 60.0;
        assert!(matches!(
            Simulation::new(tuning, 1),
            Err(TuningError::Invalid { field: "layout.bounds", .. })
        ));
    }

    #[test]
    fn test_reset_restarts_random_stream() {
        let tuning = Tuning {
            meteor_spawn_interval: 0.1,
            ..Default::default()
        };
        let mut fresh = Simulation::new(tuning.clone(), 7).expect("valid tuning");
        let mut replayed = Simulation::new(tuning, 7).expect("valid tuning");
        for _ in 0..30 {
            replayed.update(&Default::default(), 1.0 / 60.0);
        }
        replayed.reset(ResetCause::Manual);
        assert_eq!(replayed.time_ticks, 0);

        for _ in 0..30 {
            fresh.update(&Default::default(), 1.0 / 60.0);
            replayed.update(&Default::default(), 1.0 / 60.0);
        }
        let positions = |sim: &Simulation| {
            let mut positions = sim
                .meteors
                .values()
                .map(|m| m.transform.position)
                .collect::<Vec<_>>();
            // Slot reuse after a reset may change iteration order
            positions.sort_by(|a, b| a.x.total_cmp(&b.x));
            positions
        };
        assert!(!fresh.meteors.is_empty());
        assert_eq!(positions(&fresh), positions(&replayed));
        assert_eq!(fresh.medal.slot, replayed.medal.slot);
        assert_eq!(fresh.time_ticks, replayed.time_ticks);
    }

    #[test]
    fn test_render_instances_cover_world() {
        let mut sim = sim();
        let key = sim.spawn_meteor(Vec3::new(1.0, 2.0, 30.0));
        let instances = sim.render_instances();
        let expected = 2 + sim.springs.len() + sim.world.buildings.len() + sim.world.trees.len() + 1;
        assert_eq!(instances.len(), expected);
        let meteor = instances
            .iter()
            .find(|i| i.entity == EntityRef::Meteor(key))
            .expect("meteor rendered");
        assert_eq!(meteor.transform.position, Vec3::new(1.0, 2.0, 30.0));
    }

    #[test]
    fn test_gather_includes_every_collider() {
        let mut sim = sim();
        sim.spawn_meteor(Vec3::new(0.0, 0.0, 30.0));
        sim.gather_colliders();
        let expected = 4 + sim.world.collider_count() + 1 + sim.springs.len() + 1;
        assert_eq!(sim.colliders().len(), expected);
    }

    #[test]
    fn test_hud_reports_charge_fraction() {
        let mut sim = sim();
        sim.player.charge_timer = sim.tuning.charge_time * 0.25;
        let hud = sim.hud();
        assert!((hud.charge_fraction - 0.25).abs() < 1e-6);
        assert!(!hud.boosting);
        assert_eq!(hud.health, MAX_HEALTH);
    }
}
