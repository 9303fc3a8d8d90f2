//! Burnin headless runner
//!
//! Drives the simulation with an autopilot at a fixed timestep and logs the
//! HUD. Rendering and real input live in the host application; this binary
//! exists to exercise the core end to end.
//!
//! Usage: `burnin [seconds] [seed] [tuning.json]`

use burnin::consts::{MAX_SUBSTEPS, SIM_DT};
use burnin::sim::{GameEvent, Intent, Simulation};
use burnin::{Tuning, lateral, yaw};

/// Seconds between autopilot brake-boosts
const BOOST_PERIOD: f32 = 6.0;
/// How long the autopilot holds the brake
const BRAKE_HOLD: f32 = 1.2;
/// Pretend the host renders at this rate
const FRAME_DT: f32 = 1.0 / 50.0;

struct Runner {
    sim: Simulation,
    accumulator: f32,
    jump_cooldown: f32,
}

impl Runner {
    fn new(sim: Simulation) -> Self {
        Self {
            sim,
            accumulator: 0.0,
            jump_cooldown: 0.0,
        }
    }

    /// Steer toward the medal, boost now and then, hop over meteors
    fn autopilot(&mut self) -> Intent {
        let player = &self.sim.player;
        let to_medal = lateral(self.sim.medal.transform.position - player.transform.position);

        let heading = yaw(player.transform.rotation);
        // Desired yaw so that forward (+y at zero yaw) points at the medal
        let desired = (-to_medal.x).atan2(to_medal.y);
        let mut error = desired - heading;
        while error > std::f32::consts::PI {
            error -= std::f32::consts::TAU;
        }
        while error < -std::f32::consts::PI {
            error += std::f32::consts::TAU;
        }
        let turn = if error > 0.05 {
            1
        } else if error < -0.05 {
            -1
        } else {
            0
        };

        let phase = self.sim.time % BOOST_PERIOD;
        let brake = phase > BOOST_PERIOD - BRAKE_HOLD;

        let meteor_close = self.sim.meteors.values().any(|m| {
            let d = m.transform.position - player.transform.position;
            lateral(d).length() < 3.0 && d.z < 4.0
        });
        let jump = meteor_close && self.jump_cooldown <= 0.0 && !player.airborne;
        if jump {
            self.jump_cooldown = 1.0;
        }

        Intent {
            turn,
            accelerate: !brake,
            jump,
            brake,
        }
    }

    /// Run simulation ticks for one host frame
    fn frame(&mut self, dt: f32) {
        self.accumulator += dt.min(0.1);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let intent = self.autopilot();
            self.sim.update(&intent, SIM_DT);
            self.accumulator -= SIM_DT;
            self.jump_cooldown = (self.jump_cooldown - SIM_DT).max(0.0);
            substeps += 1;
        }

        for event in self.sim.drain_events() {
            match event {
                GameEvent::MedalCollected { multiplier } => {
                    log::info!("Medal! multiplier x{}", multiplier)
                }
                GameEvent::SessionReset(cause) => log::warn!("Session reset: {:?}", cause),
                GameEvent::PlayerDamaged { amount, health } => {
                    log::debug!("Hit for {:.1}, health {:.1}", amount, health)
                }
                GameEvent::BoostFired => log::info!("Boost!"),
                _ => {}
            }
        }
    }
}

fn load_tuning(path: Option<&str>) -> Tuning {
    let Some(path) = path else {
        return Tuning::default();
    };
    match std::fs::read_to_string(path) {
        Ok(json) => match Tuning::from_json(&json) {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path);
                tuning
            }
            Err(e) => {
                log::error!("Bad tuning file {}: {}", path, e);
                Tuning::default()
            }
        },
        Err(e) => {
            log::error!("Cannot read {}: {}", path, e);
            Tuning::default()
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let seconds: f32 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(30.0);
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1);
    let tuning = load_tuning(args.get(3).map(String::as_str));

    log::info!("Burnin (headless) running {}s with seed {}", seconds, seed);

    let sim = match Simulation::new(tuning, seed) {
        Ok(sim) => sim,
        Err(e) => {
            log::error!("Cannot start simulation: {}", e);
            std::process::exit(1);
        }
    };
    let mut runner = Runner::new(sim);
    let frames = (seconds / FRAME_DT).ceil() as u32;
    let frames_per_second = (1.0 / FRAME_DT).round() as u32;

    for frame in 1..=frames {
        runner.frame(FRAME_DT);
        if frame % frames_per_second == 0 {
            let hud = runner.sim.hud();
            log::info!(
                "t={:>5.1}s score={:>9.0} health={:>5.1} x{} meteors={} flames={}",
                frame as f32 * FRAME_DT,
                hud.score,
                hud.health,
                hud.multiplier,
                runner.sim.meteors.len(),
                runner.sim.flames.len()
            );
        }
    }

    match serde_json::to_string_pretty(&runner.sim.hud()) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Cannot serialize HUD: {}", e),
    }
}
