//! Track and arena containment
//!
//! Two independent policies run after position integration:
//! - soft guidance nudges a race vehicle back toward the road (never a wall)
//! - the hard arena clamp keeps every vehicle inside a fixed radius

use glam::{Vec2, Vec3};

use super::track::Track;
use crate::ground_xz;

/// Slack past the road edge before guidance kicks in
pub const GUIDANCE_TOLERANCE: f32 = 2.0;
/// Fraction of the way back to the boundary per tick
pub const GUIDANCE_PULL: f32 = 0.15;
/// Speed kept after a guidance nudge
pub const GUIDANCE_SPEED_KEEP: f32 = 0.95;
/// Speed kept after hitting the arena edge
pub const ARENA_SPEED_KEEP: f32 = 0.2;

/// What a boundary policy did this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryResult {
    Inside,
    /// Soft nudge toward the road
    Guided,
    /// Hard projection onto the arena radius
    Clamped,
}

/// Soft track guidance (race mode only)
///
/// Returns the adjusted position and speed.
pub fn guide_to_track(track: &Track, position: Vec3, speed: f32) -> (Vec3, f32, BoundaryResult) {
    let p = ground_xz(position);
    let proj = track.project(p);
    let limit = track.road_half_width + GUIDANCE_TOLERANCE;
    if proj.distance <= limit {
        return (position, speed, BoundaryResult::Inside);
    }

    let outward = (p - proj.point).normalize_or_zero();
    let boundary = proj.point + outward * limit;
    let nudged = p.lerp(boundary, GUIDANCE_PULL);
    (
        Vec3::new(nudged.x, position.y, nudged.y),
        speed * GUIDANCE_SPEED_KEEP,
        BoundaryResult::Guided,
    )
}

/// Hard arena clamp (all modes)
pub fn clamp_to_arena(position: Vec3, speed: f32, radius: f32) -> (Vec3, f32, BoundaryResult) {
    let p = ground_xz(position);
    let dist = p.length();
    if dist <= radius {
        return (position, speed, BoundaryResult::Inside);
    }

    let dir = p.normalize_or_zero();
    let clamped = if dir == Vec2::ZERO { Vec2::ZERO } else { dir * radius };
    (
        Vec3::new(clamped.x, position.y, clamped.y),
        speed * ARENA_SPEED_KEEP,
        BoundaryResult::Clamped,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TrackConfig;

    #[test]
    fn test_inside_road_untouched() {
        let track = Track::new(&TrackConfig::default());
        let start = track.point(0.0);
        let pos = Vec3::new(start.x, 0.0, start.y);
        let (p, s, r) = guide_to_track(&track, pos, 10.0);
        assert_eq!(r, BoundaryResult::Inside);
        assert_eq!(p, pos);
        assert_eq!(s, 10.0);
    }

    #[test]
    fn test_off_road_nudged_not_snapped() {
        let track = Track::new(&TrackConfig::default());
        let start = track.point(0.0);
        let pos = Vec3::new(start.x + 40.0, 0.0, start.y);
        let before = track.project(ground_xz(pos)).distance;
        let (p, s, r) = guide_to_track(&track, pos, 10.0);
        assert_eq!(r, BoundaryResult::Guided);
        let after = track.project(ground_xz(p)).distance;
        assert!(after < before);
        // Still well outside the road: a nudge, not a snap
        assert!(after > track.road_half_width + GUIDANCE_TOLERANCE);
        assert!((s - 9.5).abs() < 1e-5);
    }

    #[test]
    fn test_arena_clamp_projects_onto_radius() {
        let pos = Vec3::new(300.0, 1.5, 400.0);
        let (p, s, r) = clamp_to_arena(pos, 20.0, 100.0);
        assert_eq!(r, BoundaryResult::Clamped);
        assert!((ground_xz(p).length() - 100.0).abs() < 1e-3);
        // Same angle, same height
        assert!((p.x / p.z - 0.75).abs() < 1e-5);
        assert_eq!(p.y, 1.5);
        assert!((s - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_arena_inside_untouched() {
        let pos = Vec3::new(10.0, 0.0, 10.0);
        let (p, s, r) = clamp_to_arena(pos, 5.0, 100.0);
        assert_eq!(r, BoundaryResult::Inside);
        assert_eq!(p, pos);
        assert_eq!(s, 5.0);
    }
}
