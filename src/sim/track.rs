//! Race track centerline geometry
//!
//! One closed curve drives everything that needs to know where the road is:
//! the renderer's road mesh, AI waypoints, soft boundary guidance and lap
//! progress. Keep all of them on `centerline_point` so they never drift apart.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::heading_of;
use crate::settings::TrackConfig;

/// Polyline resolution used for nearest-point queries
pub const CENTERLINE_SAMPLES: usize = 256;

/// Point on the centerline for parameter `t` (radians, one lap = 2π)
///
/// An oval stretched by `length` along x and `width` along z, with two
/// low-frequency wobbles so the track isn't a perfect ellipse.
pub fn centerline_point(t: f32, length: f32, width: f32) -> Vec2 {
    let half_len = length * 0.5;
    let half_wid = width * 0.5;
    Vec2::new(
        half_len * t.cos() + half_len * 0.08 * (2.0 * t).sin(),
        half_wid * t.sin() + half_wid * 0.1 * (3.0 * t).sin(),
    )
}

/// Farthest distance from the origin reached by the sampled centerline
pub fn max_extent(length: f32, width: f32) -> f32 {
    waypoints(CENTERLINE_SAMPLES, length, width)
        .iter()
        .map(|p| p.length())
        .fold(0.0, f32::max)
}

/// `n` evenly spaced points around the loop, starting at t = 0
pub fn waypoints(n: usize, length: f32, width: f32) -> Vec<Vec2> {
    (0..n)
        .map(|i| centerline_point(i as f32 / n as f32 * TAU, length, width))
        .collect()
}

/// A spawn location on the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSlot {
    pub pos: Vec2,
    pub heading: f32,
}

/// Nearest-point query result
#[derive(Debug, Clone, Copy)]
pub struct TrackProjection {
    /// Closest centerline point
    pub point: Vec2,
    /// Distance from the query point to `point`
    pub distance: f32,
    /// Lap fraction of `point` in [0, 1)
    pub progress: f32,
}

/// Sampled track, built once per session
#[derive(Debug, Clone)]
pub struct Track {
    pub length: f32,
    pub width: f32,
    pub road_half_width: f32,
    samples: Vec<Vec2>,
}

impl Track {
    pub fn new(config: &TrackConfig) -> Self {
        let samples = waypoints(CENTERLINE_SAMPLES, config.length, config.width);
        Self {
            length: config.length,
            width: config.width,
            road_half_width: config.road_width * 0.5,
            samples,
        }
    }

    pub fn point(&self, t: f32) -> Vec2 {
        centerline_point(t, self.length, self.width)
    }

    /// Direction of travel (increasing t) at parameter `t`
    pub fn tangent(&self, t: f32) -> Vec2 {
        let eps = 1e-3;
        (self.point(t + eps) - self.point(t - eps)).normalize_or_zero()
    }

    pub fn waypoints(&self, n: usize) -> Vec<Vec2> {
        waypoints(n, self.length, self.width)
    }

    /// Closest point on the sampled centerline
    pub fn project(&self, p: Vec2) -> TrackProjection {
        let n = self.samples.len();
        let mut best = TrackProjection {
            point: self.samples[0],
            distance: f32::INFINITY,
            progress: 0.0,
        };

        for i in 0..n {
            let a = self.samples[i];
            let b = self.samples[(i + 1) % n];
            let ab = b - a;
            let len_sq = ab.length_squared();
            let s = if len_sq > f32::EPSILON {
                ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let q = a + ab * s;
            let d = p.distance(q);
            if d < best.distance {
                best = TrackProjection {
                    point: q,
                    distance: d,
                    progress: ((i as f32 + s) / n as f32).fract(),
                };
            }
        }
        best
    }

    /// Start-grid slot: `row` lengths back from the start line, `lane` offset sideways
    ///
    /// Row 0 lane 0 is the pole position on the line itself.
    pub fn grid_slot(&self, row: usize, lane: f32) -> GridSlot {
        const ROW_SPACING: f32 = 8.0;
        let tangent = self.tangent(0.0);
        let right = Vec2::new(tangent.y, -tangent.x);
        let pos = self.point(0.0) - tangent * (row as f32 * ROW_SPACING) + right * lane;
        GridSlot {
            pos,
            heading: heading_of(tangent),
        }
    }
}
