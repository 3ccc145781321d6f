//! Truck Rally - arcade truck-racing simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (terrain, kinematics, AI, interactions)
//! - `settings`: Session configuration loaded once per race
//! - `standings`: Lap progress and race ranking

pub mod settings;
pub mod sim;
pub mod standings;

pub use settings::{Difficulty, GameMode, SessionConfig, SpeedLevel};
pub use standings::{LapTracker, Standings};

use glam::{Vec2, Vec3};

/// Game configuration constants
pub mod consts {
    /// Nominal host frame step (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Largest step a single tick will integrate; longer frames are clamped
    pub const MAX_DT: f32 = 0.1;

    /// Player truck defaults
    pub const MAX_SPEED: f32 = 20.0;
    pub const ACCELERATION: f32 = 12.0;
    pub const BRAKE_FORCE: f32 = 30.0;
    pub const TURN_SPEED: f32 = 2.2; // radians per second at standstill
    pub const FRICTION_FACTOR: f32 = 0.98; // per tick while coasting
    pub const GRAVITY: f32 = 30.0;
    pub const BOOST_FACTOR: f32 = 1.5;
    /// Fraction of turn authority lost at full speed
    pub const TURN_REDUCTION: f32 = 0.3;
    /// Reverse top speed as a fraction of forward top speed
    pub const REVERSE_FRACTION: f32 = 0.4;
    /// Below this |speed| coasting snaps to rest
    pub const SPEED_EPSILON: f32 = 0.01;
    /// Heading only integrates above this |speed|
    pub const MIN_TURN_SPEED: f32 = 0.5;

    /// Race track defaults
    pub const TRACK_LENGTH: f32 = 400.0;
    pub const TRACK_WIDTH: f32 = 240.0;
    pub const ROAD_WIDTH: f32 = 16.0;
    pub const WAYPOINT_COUNT: usize = 32;

    /// Arena containment radius per mode
    pub const RACE_ARENA_RADIUS: f32 = 320.0;
    pub const JUMP_ARENA_RADIUS: f32 = 180.0;
    /// Clearance kept between the road edge and the race arena wall
    pub const ARENA_TRACK_MARGIN: f32 = 24.0;

    /// Most AI racers a session will spawn
    pub const MAX_AI_COUNT: usize = 12;
}

/// Wrap an angle into (-π, π]
///
/// Non-finite input wraps to 0 so a bad heading can never poison integration.
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if !angle.is_finite() {
        return 0.0;
    }
    let a = angle.rem_euclid(TAU);
    if a > PI { a - TAU } else { a }
}

/// Ground-plane projection of a world position
#[inline]
pub fn ground_xz(p: Vec3) -> Vec2 {
    Vec2::new(p.x, p.z)
}

/// Unit forward direction on the ground plane for a heading (0 = +z)
#[inline]
pub fn heading_vector(heading: f32) -> Vec2 {
    Vec2::new(heading.sin(), heading.cos())
}

/// Heading that points along a ground-plane direction
#[inline]
pub fn heading_of(dir: Vec2) -> f32 {
    dir.x.atan2(dir.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::PI;

    #[test]
    fn test_wrap_angle_boundaries() {
        assert!((wrap_angle(PI) - PI).abs() < 1e-6);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-5);
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert_eq!(wrap_angle(f32::NAN), 0.0);
    }

    #[test]
    fn test_heading_roundtrip() {
        let dir = Vec2::new(1.0, 1.0).normalize();
        let h = heading_of(dir);
        assert!((h - PI / 4.0).abs() < 1e-6);
        assert!((heading_vector(h) - dir).length() < 1e-6);
    }

    proptest! {
        #[test]
        fn wrapped_angle_in_half_open_range(a in -1000.0f32..1000.0) {
            let w = wrap_angle(a);
            prop_assert!(w > -PI && w <= PI);
        }
    }
}
