//! Vehicle kinematics shared by the player truck and AI racers
//!
//! This is an arcade model: position and heading are *set* each tick from
//! hand-tuned integration rules. There is no mass, torque or contact solving.
//! Input strategies (keyboard, waypoint AI) only differ in how they produce a
//! `DriveCommand`; everything after that is this one code path.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use super::terrain::WorldLayout;
use crate::consts::*;
use crate::settings::{GameMode, SpeedLevel, finite_or};
use crate::{heading_vector, wrap_angle};

/// Per-tick speed retention while grounded in mud (jump mode)
pub const MUD_DRAG: f32 = 0.96;
/// Exponential rate for smoothing the raw ground height
pub const GROUND_LERP_RATE: f32 = 10.0;
/// Height above smoothed ground that still counts as grounded
pub const GROUND_TOLERANCE: f32 = 0.05;
/// Ground rise in one tick that turns into a launch
pub const LAUNCH_RISE: f32 = 0.12;
/// Upward launch velocity per unit of horizontal speed
pub const LAUNCH_FACTOR: f32 = 0.45;
/// No launches below this horizontal speed
pub const MIN_LAUNCH_SPEED: f32 = 4.0;

/// Visual steer angle at full lock (radians)
pub const MAX_VISUAL_STEER: f32 = 0.55;
/// Exponential rate for visual smoothing
pub const VISUAL_SMOOTHING: f32 = 10.0;
/// Rate at which released steering returns to center (per second)
pub const STEER_RELEASE: f32 = 8.0;
/// Extra per-tick steer decay in race mode with hands off the wheel
pub const AUTO_STRAIGHTEN: f32 = 0.85;
/// Released steering below this snaps to center
const STEER_EPSILON: f32 = 1e-3;
pub const WHEEL_RADIUS: f32 = 0.6;

/// Tuning for one vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub max_speed: f32,
    pub acceleration: f32,
    pub brake_force: f32,
    /// Heading rate at standstill (radians per second)
    pub turn_speed: f32,
    /// Speed retained per coasting tick
    pub friction_factor: f32,
    pub speed_multiplier: f32,
    pub gravity: f32,
    pub boost_factor: f32,
    /// Fraction of turn authority lost at top speed
    pub turn_reduction: f32,
    pub mode: GameMode,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            max_speed: MAX_SPEED,
            acceleration: ACCELERATION,
            brake_force: BRAKE_FORCE,
            turn_speed: TURN_SPEED,
            friction_factor: FRICTION_FACTOR,
            speed_multiplier: 1.0,
            gravity: GRAVITY,
            boost_factor: BOOST_FACTOR,
            turn_reduction: TURN_REDUCTION,
            mode: GameMode::Race,
        }
    }
}

impl VehicleConfig {
    /// Clamp out-of-range tuning to safe values
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            max_speed: finite_or(self.max_speed, d.max_speed).max(0.1),
            acceleration: finite_or(self.acceleration, d.acceleration).max(0.0),
            brake_force: finite_or(self.brake_force, d.brake_force).max(0.0),
            turn_speed: finite_or(self.turn_speed, d.turn_speed).max(0.0),
            friction_factor: finite_or(self.friction_factor, d.friction_factor).clamp(0.0, 1.0),
            speed_multiplier: finite_or(self.speed_multiplier, 1.0)
                .clamp(SpeedLevel::MIN_MULTIPLIER, SpeedLevel::MAX_MULTIPLIER),
            gravity: finite_or(self.gravity, d.gravity).max(0.0),
            boost_factor: finite_or(self.boost_factor, d.boost_factor).max(1.0),
            turn_reduction: finite_or(self.turn_reduction, d.turn_reduction).clamp(0.0, 1.0),
            mode: self.mode,
        }
    }

    /// Forward top speed, with or without boost
    pub fn forward_cap(&self, boost: bool) -> f32 {
        let boost = if boost { self.boost_factor } else { 1.0 };
        self.max_speed * self.speed_multiplier * boost
    }

    /// Reverse top speed (positive magnitude)
    pub fn reverse_cap(&self) -> f32 {
        REVERSE_FRACTION * self.max_speed * self.speed_multiplier
    }
}

/// Raw player controls for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputCommand {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub brake: bool,
    pub boost: bool,
}

impl InputCommand {
    /// +1 full left, -1 full right
    pub fn steer(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }
}

/// Longitudinal intent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Throttle {
    /// Accelerate toward a signed target speed
    Toward(f32),
    /// Bleed speed magnitude at the brake rate
    Brake,
    /// Roll with per-tick friction
    Coast,
}

/// What a controller wants the vehicle to do this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    pub throttle: Throttle,
    /// Fraction of turn authority, positive turns left
    pub steer: f32,
    pub boost: bool,
}

impl DriveCommand {
    pub fn coast() -> Self {
        Self {
            throttle: Throttle::Coast,
            steer: 0.0,
            boost: false,
        }
    }

    /// Map keyboard-style input onto a command
    ///
    /// Brake wins over pedals; both pedals together coast.
    pub fn from_input(input: &InputCommand, config: &VehicleConfig) -> Self {
        let throttle = if input.brake {
            Throttle::Brake
        } else {
            match (input.forward, input.backward) {
                (true, false) => Throttle::Toward(config.forward_cap(input.boost)),
                (false, true) => Throttle::Toward(-config.reverse_cap()),
                _ => Throttle::Coast,
            }
        };
        Self {
            throttle,
            steer: input.steer(),
            boost: input.boost,
        }
    }
}

/// Display-only state, smoothed for the renderer and never read back by gameplay
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualState {
    pub steer_angle: f32,
    /// Accumulated wheel rotation (radians, wrapped)
    pub wheel_spin: f32,
    pub wheel_spin_rate: f32,
}

/// Authoritative vehicle state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub position: Vec3,
    pub heading: f32,
    /// Signed speed along the heading
    pub speed: f32,
    pub vertical_velocity: f32,
    pub airborne: bool,
    /// Smoothed ground under the vehicle
    pub ground_height: f32,
    /// Wheel position driving the heading, +1 full left
    #[serde(default)]
    pub steer: f32,
    pub visual: VisualState,
}

impl Vehicle {
    pub fn new(position: Vec3, heading: f32) -> Self {
        Self {
            position,
            heading: wrap_angle(heading),
            speed: 0.0,
            vertical_velocity: 0.0,
            airborne: false,
            ground_height: position.y,
            steer: 0.0,
            visual: VisualState::default(),
        }
    }

    /// Vehicle resting on the ground at (x, z)
    pub fn grounded(layout: &WorldLayout, x: f32, z: f32, heading: f32) -> Self {
        let y = layout.ground_height(x, z);
        Self::new(Vec3::new(x, y, z), heading)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.heading.is_finite()
            && self.speed.is_finite()
            && self.vertical_velocity.is_finite()
            && self.ground_height.is_finite()
            && self.steer.is_finite()
    }
}

/// Advance one vehicle by `dt`
///
/// Pure: returns the next state. Invalid `dt` or an already non-finite state
/// yields the input unchanged.
pub fn tick(
    state: &Vehicle,
    command: &DriveCommand,
    dt: f32,
    config: &VehicleConfig,
    layout: &WorldLayout,
) -> Vehicle {
    let mut v = *state;
    if !dt.is_finite() || dt <= 0.0 || !state.is_finite() {
        return v;
    }

    v.speed = integrate_speed(v.speed, command, dt, config);
    v.steer = integrate_steer(v.steer, command.steer, dt, config.mode);
    v.heading = integrate_heading(v.heading, v.speed, v.steer, dt, config);

    let step = heading_vector(v.heading) * (v.speed * dt);
    v.position.x += step.x;
    v.position.z += step.y;

    match config.mode {
        GameMode::Jump => {
            integrate_vertical(&mut v, dt, config, layout);
            if !v.airborne && layout.in_mud_pit(v.position.x, v.position.z) {
                v.speed *= MUD_DRAG;
            }
        }
        GameMode::Race => {
            v.position.y = 0.0;
            v.vertical_velocity = 0.0;
            v.airborne = false;
            v.ground_height = 0.0;
        }
    }

    v.speed = v
        .speed
        .clamp(-config.reverse_cap(), config.forward_cap(command.boost));
    v.visual = update_visuals(&state.visual, v.steer, v.speed, dt);
    v
}

#[inline]
fn move_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

fn integrate_speed(speed: f32, command: &DriveCommand, dt: f32, config: &VehicleConfig) -> f32 {
    match command.throttle {
        Throttle::Toward(target) => {
            move_toward(speed, target, config.acceleration * config.speed_multiplier * dt)
        }
        Throttle::Brake => move_toward(speed, 0.0, config.brake_force * dt),
        Throttle::Coast => {
            let s = speed * config.friction_factor;
            if s.abs() < SPEED_EPSILON { 0.0 } else { s }
        }
    }
}

/// Held steering bites at once; released steering eases back to center,
/// faster in race mode
fn integrate_steer(steer: f32, input: f32, dt: f32, mode: GameMode) -> f32 {
    if input != 0.0 {
        return input.clamp(-1.0, 1.0);
    }
    let mut s = steer * (1.0 - (STEER_RELEASE * dt).min(1.0));
    if mode == GameMode::Race {
        s *= AUTO_STRAIGHTEN;
    }
    if s.abs() < STEER_EPSILON { 0.0 } else { s }
}

/// Turn authority shrinks with speed; reversing mirrors the steering
fn integrate_heading(heading: f32, speed: f32, steer: f32, dt: f32, config: &VehicleConfig) -> f32 {
    if speed.abs() <= MIN_TURN_SPEED || steer == 0.0 {
        return heading;
    }
    let speed_fraction = (speed.abs() / config.max_speed).min(1.0);
    let rate = config.turn_speed * (1.0 - speed_fraction * config.turn_reduction);
    wrap_angle(heading + steer.clamp(-1.0, 1.0) * rate * dt * speed.signum())
}

fn integrate_vertical(v: &mut Vehicle, dt: f32, config: &VehicleConfig, layout: &WorldLayout) {
    let raw = layout.ground_height(v.position.x, v.position.z);
    v.ground_height += (raw - v.ground_height) * (GROUND_LERP_RATE * dt).min(1.0);
    let ground = v.ground_height;

    if !v.airborne
        && ground - v.position.y > LAUNCH_RISE
        && v.speed.abs() > MIN_LAUNCH_SPEED
    {
        v.position.y = ground;
        v.vertical_velocity = v.speed.abs() * LAUNCH_FACTOR;
        v.airborne = true;
        return;
    }

    if v.position.y > ground + GROUND_TOLERANCE || v.vertical_velocity > 0.0 {
        v.airborne = true;
        v.vertical_velocity -= config.gravity * dt;
        v.position.y += v.vertical_velocity * dt;
        if v.position.y <= ground {
            v.position.y = ground;
            v.vertical_velocity = 0.0;
            v.airborne = false;
        }
    } else {
        v.position.y = ground;
        v.vertical_velocity = 0.0;
        v.airborne = false;
    }
}

/// Smooth steer angle and wheel spin toward their targets
pub fn update_visuals(prev: &VisualState, steer: f32, speed: f32, dt: f32) -> VisualState {
    let k = (VISUAL_SMOOTHING * dt).min(1.0);

    let target_steer = steer.clamp(-1.0, 1.0) * MAX_VISUAL_STEER;
    let steer_angle = prev.steer_angle + (target_steer - prev.steer_angle) * k;

    let wheel_spin_rate = prev.wheel_spin_rate + (speed / WHEEL_RADIUS - prev.wheel_spin_rate) * k;
    VisualState {
        steer_angle,
        wheel_spin: (prev.wheel_spin + wheel_spin_rate * dt).rem_euclid(TAU),
        wheel_spin_rate,
    }
}
