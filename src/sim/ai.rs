//! Waypoint-following AI racers
//!
//! An agent is a `Vehicle` plus a strategy that turns the next waypoint into a
//! `DriveCommand`. Everything physical goes through `vehicle::tick`, exactly
//! like the player's truck.

use glam::Vec2;
use std::sync::Arc;

use super::terrain::WorldLayout;
use super::vehicle::{self, DriveCommand, Throttle, Vehicle, VehicleConfig};
use crate::settings::Difficulty;
use crate::{ground_xz, heading_of, wrap_angle};

/// Distance at which a waypoint counts as reached
pub const CAPTURE_RADIUS: f32 = 12.0;
/// Heading rate while spun out (radians per second)
pub const SPIN_RATE: f32 = 10.0;
/// Amplitude of the per-agent speed wobble
pub const SPEED_VARIATION: f32 = 0.05;
pub const VARIATION_FREQUENCY: f64 = 0.7;
/// Speed given up at a full 180° heading error
pub const CORNER_SLOWDOWN: f32 = 0.5;

/// Who is driving the agent right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentControl {
    Normal,
    SpinningOut,
}

#[derive(Debug, Clone)]
pub struct AiAgent {
    pub id: u32,
    pub vehicle: Vehicle,
    /// Next waypoint to reach; only ever advances (mod waypoint count)
    pub waypoint_index: usize,
    pub waypoints: Arc<[Vec2]>,
    pub difficulty: Difficulty,
    /// Game-clock deadline of the current spin-out
    pub spin_until: f64,
    /// Fixed phase for the speed wobble, taken from the spawn position
    pub phase: f32,
    /// Grid pose restored on reset
    start: Vehicle,
}

impl AiAgent {
    pub fn new(id: u32, start: Vehicle, waypoints: Arc<[Vec2]>, difficulty: Difficulty) -> Self {
        let phase = start.position.x * 0.13 + start.position.z * 0.07;
        Self {
            id,
            vehicle: start,
            waypoint_index: 0,
            waypoints,
            difficulty,
            spin_until: f64::NEG_INFINITY,
            phase,
            start,
        }
    }

    pub fn control(&self, now: f64) -> AgentControl {
        if now < self.spin_until {
            AgentControl::SpinningOut
        } else {
            AgentControl::Normal
        }
    }

    /// Start a spin-out lasting `duration` seconds from `now`
    pub fn spin_out(&mut self, now: f64, duration: f64) {
        self.spin_until = now + duration;
    }

    pub fn reset(&mut self) {
        self.vehicle = self.start;
        self.waypoint_index = 0;
        self.spin_until = f64::NEG_INFINITY;
    }

    /// Target speed for this tick: difficulty share of the cap with a
    /// deterministic wobble, eased off in tight corners
    fn target_speed(&self, now: f64, heading_error: f32, config: &VehicleConfig) -> f32 {
        let cap = config.forward_cap(false);
        let wobble = ((now * VARIATION_FREQUENCY) as f32 + self.phase).sin() * SPEED_VARIATION;
        let corner = 1.0 - CORNER_SLOWDOWN * (heading_error.abs() / std::f32::consts::PI);
        (cap * self.difficulty.speed_scalar() * (1.0 + wobble) * corner).min(cap)
    }

    /// Advance one tick, returning the next agent state
    pub fn step(&self, now: f64, dt: f32, config: &VehicleConfig, layout: &WorldLayout) -> Self {
        let mut next = self.clone();
        let n = self.waypoints.len();
        if n == 0 {
            return next;
        }

        if self.control(now) == AgentControl::SpinningOut {
            let mut spun = self.vehicle;
            spun.heading = wrap_angle(spun.heading + SPIN_RATE * dt);
            next.vehicle = vehicle::tick(&spun, &DriveCommand::coast(), dt, config, layout);
            return next;
        }

        let pos = ground_xz(self.vehicle.position);
        let mut index = self.waypoint_index % n;
        if pos.distance(self.waypoints[index]) < CAPTURE_RADIUS {
            index = (index + 1) % n;
        }
        next.waypoint_index = index;

        let to_target = self.waypoints[index] - pos;
        let heading_error = if to_target.length_squared() > f32::EPSILON {
            wrap_angle(heading_of(to_target) - self.vehicle.heading)
        } else {
            0.0
        };

        let speed_fraction = (self.vehicle.speed.abs() / config.max_speed).min(1.0);
        let max_turn = config.turn_speed * (1.0 - speed_fraction * config.turn_reduction) * dt;
        let steer = if max_turn > f32::EPSILON {
            (heading_error / max_turn).clamp(-1.0, 1.0)
        } else {
            heading_error.signum()
        };

        let command = DriveCommand {
            throttle: Throttle::Toward(self.target_speed(now, heading_error, config)),
            steer,
            boost: false,
        };
        next.vehicle = vehicle::tick(&self.vehicle, &command, dt, config, layout);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TrackConfig;
    use crate::sim::track::Track;
    use glam::Vec3;

    const DT: f32 = 1.0 / 60.0;

    fn agent_on_track(index: usize) -> (AiAgent, Track) {
        let track = Track::new(&TrackConfig::default());
        let wps: Arc<[Vec2]> = track.waypoints(32).into();
        // Between the previous waypoint and `index`, facing it
        let prev = wps[(index + 31) % 32];
        let target = wps[index];
        let pos = prev.lerp(target, 0.3);
        let mut v = Vehicle::new(Vec3::new(pos.x, 0.0, pos.y), heading_of(target - prev));
        v.speed = 15.0;
        let mut agent = AiAgent::new(7, v, wps, Difficulty::Hard);
        agent.waypoint_index = index;
        (agent, track)
    }

    #[test]
    fn test_waypoint_index_advances_and_never_regresses() {
        let (mut agent, _) = agent_on_track(5);
        let config = VehicleConfig::default();
        let layout = WorldLayout::default();
        let mut now = 0.0;
        let mut reached = false;
        for _ in 0..600 {
            let before = agent.waypoint_index;
            agent = agent.step(now, DT, &config, &layout);
            now += DT as f64;
            assert!(agent.waypoint_index == before || agent.waypoint_index == (before + 1) % 32);
            if agent.waypoint_index == 6 {
                reached = true;
            }
            if reached {
                assert!(agent.waypoint_index >= 6);
            }
            if agent.waypoint_index > 10 {
                break;
            }
        }
        assert!(reached);
    }

    #[test]
    fn test_agent_laps_the_track() {
        let (mut agent, track) = agent_on_track(1);
        let config = VehicleConfig::default();
        let layout = WorldLayout::default();
        let mut now = 0.0;
        let mut wrapped = false;
        for _ in 0..60 * 120 {
            let before = agent.waypoint_index;
            agent = agent.step(now, DT, &config, &layout);
            now += DT as f64;
            if before == 31 && agent.waypoint_index == 0 {
                wrapped = true;
                break;
            }
            // Stays near the road the whole way round
            let off = track.project(ground_xz(agent.vehicle.position)).distance;
            assert!(off < 30.0, "agent wandered {off} from the centerline");
        }
        assert!(wrapped);
    }

    #[test]
    fn test_heading_error_takes_short_way_round() {
        // Facing heading 3.0; the target sits at heading -3.0, 0.28 rad away across ±π
        let wps: Arc<[Vec2]> = vec![crate::heading_vector(-3.0) * 100.0].into();
        let mut v = Vehicle::new(Vec3::ZERO, 3.0);
        v.speed = 10.0;
        let agent = AiAgent::new(1, v, wps, Difficulty::Medium);
        let next = agent.step(0.0, DT, &VehicleConfig::default(), &WorldLayout::default());
        let turned = wrap_angle(next.vehicle.heading - 3.0);
        assert!(turned > 0.0, "turned the long way: {turned}");
        assert!(turned <= crate::consts::TURN_SPEED * DT + 1e-6);
    }

    #[test]
    fn test_spin_out_overrides_then_resumes() {
        let (mut agent, _) = agent_on_track(5);
        let config = VehicleConfig::default();
        let layout = WorldLayout::default();
        agent.spin_out(10.0, 2.5);
        assert_eq!(agent.control(10.0), AgentControl::SpinningOut);
        assert_eq!(agent.control(12.49), AgentControl::SpinningOut);
        assert_eq!(agent.control(12.5), AgentControl::Normal);

        let spun = agent.step(11.0, DT, &config, &layout);
        let turned = wrap_angle(spun.vehicle.heading - agent.vehicle.heading);
        assert!((turned - SPIN_RATE * DT).abs() < 1e-4);
        assert!(spun.vehicle.speed < agent.vehicle.speed);
        assert_eq!(spun.waypoint_index, agent.waypoint_index);
    }

    #[test]
    fn test_empty_waypoints_hold_pose() {
        let mut v = Vehicle::new(Vec3::new(5.0, 0.0, 5.0), 1.0);
        v.speed = 12.0;
        let agent = AiAgent::new(3, v, Vec::new().into(), Difficulty::Easy);
        let next = agent.step(1.0, DT, &VehicleConfig::default(), &WorldLayout::default());
        assert_eq!(next.vehicle, agent.vehicle);
        assert_eq!(next.waypoint_index, 0);
    }

    #[test]
    fn test_difficulty_bounds_cruise_speed() {
        let config = VehicleConfig::default();
        let (mut easy, _) = agent_on_track(3);
        easy.difficulty = Difficulty::Easy;
        easy.vehicle.speed = 0.0;
        let layout = WorldLayout::default();
        let mut now = 0.0;
        let mut top: f32 = 0.0;
        for _ in 0..600 {
            easy = easy.step(now, DT, &config, &layout);
            now += DT as f64;
            top = top.max(easy.vehicle.speed);
        }
        let ceiling = config.max_speed * Difficulty::Easy.speed_scalar() * (1.0 + SPEED_VARIATION);
        assert!(top <= ceiling + 1e-4);
        assert!(top > config.max_speed * 0.5);
    }

    #[test]
    fn test_reset_restores_grid_pose() {
        let (agent, _) = agent_on_track(5);
        let start = agent.vehicle;
        let mut moved = agent.step(0.0, DT, &VehicleConfig::default(), &WorldLayout::default());
        moved.spin_out(0.0, 5.0);
        moved.reset();
        assert_eq!(moved.vehicle, start);
        assert_eq!(moved.waypoint_index, 0);
        assert_eq!(moved.control(1.0), AgentControl::Normal);
    }
}
