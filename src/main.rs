//! Truck Rally headless runner
//!
//! Drives a session with a scripted player and logs what happens. Usage:
//! `truck-rally [race|jump] [config.json]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use truck_rally::consts::*;
    use truck_rally::sim::{GameEvent, GamePhase, InputCommand, SessionState, TickInput, tick};
    use truck_rally::{GameMode, SessionConfig, ground_xz, heading_of, wrap_angle};

    /// Simulated wall-clock frame length (a 50 Hz display)
    const FRAME_DT: f32 = 0.02;
    /// Upper bound on fixed steps per frame
    const MAX_SUBSTEPS: u32 = 4;
    /// Session length in seconds
    const RUN_SECONDS: f32 = 120.0;
    /// How far ahead on the lap the autopilot aims
    const LOOKAHEAD: f32 = 0.02;
    /// Heading error below which the autopilot stops steering
    const STEER_DEADBAND: f32 = 0.05;

    pub fn load_config(args: &[String]) -> SessionConfig {
        let mode = args.get(1).and_then(|s| GameMode::from_str(s));
        let from_file = args.get(2).map(|path| match std::fs::read_to_string(path) {
            Ok(json) => SessionConfig::load_or_default(&json),
            Err(err) => {
                log::warn!("Could not read {path} ({err}), using defaults");
                SessionConfig::default()
            }
        });
        match (from_file, mode) {
            (Some(config), Some(mode)) => SessionConfig { mode, ..config },
            (Some(config), None) => config,
            (None, Some(GameMode::Jump)) => SessionConfig::jump(),
            (None, _) => SessionConfig::default(),
        }
    }

    /// Keyboard-style driver: race follows the centerline, jump does laps of the arena
    fn autopilot(state: &SessionState) -> InputCommand {
        let player = &state.player;
        let target_heading = match state.config.mode {
            GameMode::Race => {
                let track = &state.world.track;
                let progress = track.project(ground_xz(player.position)).progress;
                let aim = track.point((progress + LOOKAHEAD) * std::f32::consts::TAU);
                heading_of(aim - ground_xz(player.position))
            }
            GameMode::Jump => {
                // Circle the origin at a fixed radius
                let pos = ground_xz(player.position);
                let tangent = glam::Vec2::new(pos.y, -pos.x).normalize_or_zero();
                let inward = -pos.normalize_or_zero() * ((pos.length() - 80.0) / 80.0);
                heading_of(tangent + inward)
            }
        };
        let error = wrap_angle(target_heading - player.heading);
        InputCommand {
            forward: true,
            left: error > STEER_DEADBAND,
            right: error < -STEER_DEADBAND,
            boost: error.abs() < 0.1,
            ..Default::default()
        }
    }

    fn report(event: &GameEvent, clock: f64) {
        match event {
            GameEvent::LapCompleted { vehicle_id, lap } => {
                log::info!("[{clock:6.2}] vehicle {vehicle_id} completed lap {lap}")
            }
            GameEvent::RaceFinished { rank } => log::info!("[{clock:6.2}] finished in P{rank}"),
            GameEvent::AgentSpunOut { agent_id, .. } => {
                log::info!("[{clock:6.2}] agent {agent_id} spun out")
            }
            other => log::debug!("[{clock:6.2}] {other:?}"),
        }
    }

    pub fn run(config: SessionConfig) {
        let mut state = SessionState::new(config);
        let mut accumulator = 0.0_f32;
        let frames = (RUN_SECONDS / FRAME_DT) as u32;

        for _ in 0..frames {
            accumulator += FRAME_DT.min(MAX_DT);
            let mut substeps = 0;
            while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = TickInput {
                    drive: autopilot(&state),
                    ..Default::default()
                };
                tick(&mut state, &input, SIM_DT);
                for event in &state.events {
                    report(event, state.clock);
                }
                accumulator -= SIM_DT;
                substeps += 1;
            }
            if state.phase == GamePhase::Finished {
                break;
            }
        }

        log::info!(
            "Session over at t={:.1}s: score {}, phase {:?}",
            state.clock,
            state.score,
            state.phase
        );
        for (place, id) in state.standings.ranking().iter().enumerate() {
            if let Some(entry) = state.standings.entry(*id) {
                log::info!(
                    "P{}: vehicle {} ({:.2} laps)",
                    place + 1,
                    id,
                    entry.tracker.distance().max(0.0)
                );
            }
        }
        let fallen = state.entities.trees.iter().filter(|t| t.fallen).count();
        let crushed: f32 = state.entities.props.iter().map(|p| p.damage).sum();
        log::info!("Trees toppled: {fallen}, total car damage: {crushed:.2}");
        for pose in state.poses() {
            log::debug!(
                "vehicle {} at ({:.1}, {:.1}, {:.1}) heading {:.2} speed {:.1}",
                pose.id,
                pose.position.x,
                pose.position.y,
                pose.position.z,
                pose.heading,
                pose.speed
            );
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Truck Rally (headless) starting...");

    let args: Vec<String> = std::env::args().collect();
    let config = headless::load_config(&args);
    headless::run(config);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host page; nothing to run here
}
