//! Procedural terrain and static world features
//!
//! Every query here is a pure function of `(x, z)` and an immutable
//! `WorldLayout`. Cost is linear in the number of features and independent of
//! whatever mesh resolution the renderer builds from the same functions.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::finite_or;

/// Half-width of the two orthogonal road corridors through the origin
pub const ROAD_CORRIDOR_HALF_WIDTH: f32 = 8.0;
/// Corridors keep this fraction of the natural undulation
pub const ROAD_FLATTEN_SCALE: f32 = 0.2;

/// River centerline: z = RIVER_Z + RIVER_AMPLITUDE * sin(x * RIVER_FREQUENCY)
pub const RIVER_Z: f32 = 70.0;
pub const RIVER_AMPLITUDE: f32 = 12.0;
pub const RIVER_FREQUENCY: f32 = 0.02;
/// Distance from the river centerline at which the valley starts
pub const RIVER_HALF_WIDTH: f32 = 16.0;
pub const RIVER_DEPTH: f32 = 5.0;

/// Tunnel floors are flat regardless of the terrain above them
pub const TUNNEL_FLOOR_HEIGHT: f32 = 0.0;

/// Smallest extent a feature is clamped to
const MIN_FEATURE_EXTENT: f32 = 0.01;

/// A bridge deck with ramps at both ends; its length runs along local +x
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bridge {
    pub pos: Vec2,
    /// Yaw of the deck's long axis (radians)
    pub rotation: f32,
    pub deck_length: f32,
    pub width: f32,
    pub deck_height: f32,
    pub ramp_length: f32,
}

/// A rectangular tunnel; its length runs along local +x
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tunnel {
    pub pos: Vec2,
    pub rotation: f32,
    pub length: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MudPit {
    pub pos: Vec2,
    pub radius: f32,
}

/// A jump ramp: a cone whose height falls off linearly from its center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampCone {
    pub x: f32,
    pub z: f32,
    pub radius: f32,
    pub height: f32,
}

/// Immutable static features of the jump arena
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldLayout {
    pub bridges: Vec<Bridge>,
    pub tunnels: Vec<Tunnel>,
    pub mud_pits: Vec<MudPit>,
    pub ramps: Vec<RampCone>,
}

/// Result of a bridge query
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BridgeSample {
    pub on_bridge: bool,
    pub height: f32,
}

/// Everything known about one ground point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSample {
    /// Natural heightfield elevation
    pub elevation: f32,
    /// Surface a wheel rests on (tunnel floor, bridge deck, ramp or terrain)
    pub ground: f32,
    pub on_road: bool,
    pub on_bridge: bool,
    pub in_tunnel: bool,
    pub in_mud_pit: bool,
}

/// Express `p` in a feature's frame (feature long axis = local +x)
#[inline]
fn to_local(p: Vec2, origin: Vec2, rotation: f32) -> Vec2 {
    Vec2::from_angle(-rotation).rotate(p - origin)
}

/// Layered sine undulation minus the river valley
fn natural_height(x: f32, z: f32) -> f32 {
    let mut h = 2.4 * (x * 0.021).sin() * (z * 0.018).cos()
        + 1.1 * (x * 0.047 + 1.3).sin() * (z * 0.039).sin()
        + 0.35 * (x * 0.13).sin() * (z * 0.11 + 0.7).cos();

    let river_z = RIVER_Z + RIVER_AMPLITUDE * (x * RIVER_FREQUENCY).sin();
    let d = (z - river_z).abs();
    if d < RIVER_HALF_WIDTH {
        // Smoothstep-shaped bank, deepest on the centerline
        let t = 1.0 - d / RIVER_HALF_WIDTH;
        h -= RIVER_DEPTH * t * t * (3.0 - 2.0 * t);
    }
    h
}

impl WorldLayout {
    /// Default jump arena: river crossings, a tunnel, mud and ramps
    pub fn jump_arena() -> Self {
        Self {
            bridges: vec![
                Bridge {
                    pos: Vec2::new(0.0, RIVER_Z),
                    rotation: std::f32::consts::FRAC_PI_2,
                    deck_length: 36.0,
                    width: 10.0,
                    deck_height: 4.0,
                    ramp_length: 12.0,
                },
                Bridge {
                    pos: Vec2::new(-90.0, RIVER_Z + RIVER_AMPLITUDE * (-90.0 * RIVER_FREQUENCY).sin()),
                    rotation: std::f32::consts::FRAC_PI_2,
                    deck_length: 36.0,
                    width: 8.0,
                    deck_height: 3.5,
                    ramp_length: 10.0,
                },
            ],
            tunnels: vec![Tunnel {
                pos: Vec2::new(-70.0, -60.0),
                rotation: 0.0,
                length: 40.0,
                width: 10.0,
            }],
            mud_pits: vec![
                MudPit {
                    pos: Vec2::new(60.0, -40.0),
                    radius: 18.0,
                },
                MudPit {
                    pos: Vec2::new(-40.0, 20.0),
                    radius: 12.0,
                },
            ],
            ramps: vec![
                RampCone {
                    x: 40.0,
                    z: 0.0,
                    radius: 10.0,
                    height: 4.0,
                },
                RampCone {
                    x: 0.0,
                    z: -50.0,
                    radius: 14.0,
                    height: 6.0,
                },
                RampCone {
                    x: 100.0,
                    z: 100.0,
                    radius: 8.0,
                    height: 3.0,
                },
            ],
        }
    }

    /// Clamp degenerate or non-finite feature sizes to safe minimums
    pub fn sanitized(mut self) -> Self {
        for b in &mut self.bridges {
            b.deck_length = finite_or(b.deck_length, 0.0).max(MIN_FEATURE_EXTENT);
            b.width = finite_or(b.width, 0.0).max(MIN_FEATURE_EXTENT);
            b.ramp_length = finite_or(b.ramp_length, 0.0).max(MIN_FEATURE_EXTENT);
            b.deck_height = finite_or(b.deck_height, 0.0);
        }
        for t in &mut self.tunnels {
            t.length = finite_or(t.length, 0.0).max(MIN_FEATURE_EXTENT);
            t.width = finite_or(t.width, 0.0).max(MIN_FEATURE_EXTENT);
        }
        for pit in &mut self.mud_pits {
            pit.radius = finite_or(pit.radius, 0.0).max(MIN_FEATURE_EXTENT);
        }
        for ramp in &mut self.ramps {
            ramp.radius = finite_or(ramp.radius, 0.0).max(MIN_FEATURE_EXTENT);
            ramp.height = finite_or(ramp.height, 0.0);
        }
        self
    }

    /// Terrain elevation at (x, z)
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let natural = natural_height(x, z);
        let mut h = natural;

        let p = Vec2::new(x, z);
        for pit in &self.mud_pits {
            if pit.radius <= 0.0 {
                continue;
            }
            let d = p.distance(pit.pos);
            if d < pit.radius {
                let blend = 1.0 - d / pit.radius;
                h *= 1.0 - blend;
            }
        }

        // Road corridors scale the pre-flatten height, overriding mud
        if on_road(x, z) {
            h = natural * ROAD_FLATTEN_SCALE;
        }
        h
    }

    /// Deck or ramp height if (x, z) is on any bridge
    pub fn on_bridge(&self, x: f32, z: f32) -> BridgeSample {
        let p = Vec2::new(x, z);
        let mut best: Option<f32> = None;

        for b in &self.bridges {
            let local = to_local(p, b.pos, b.rotation);
            if local.y.abs() > b.width * 0.5 {
                continue;
            }
            let half_deck = b.deck_length * 0.5;
            let along = local.x.abs();
            let height = if along <= half_deck {
                b.deck_height
            } else if b.ramp_length > 0.0 && along <= half_deck + b.ramp_length {
                let t = 1.0 - (along - half_deck) / b.ramp_length;
                b.deck_height * t
            } else {
                continue;
            };
            best = Some(best.map_or(height, |h| h.max(height)));
        }

        match best {
            Some(height) => BridgeSample {
                on_bridge: true,
                height,
            },
            None => BridgeSample::default(),
        }
    }

    pub fn in_tunnel(&self, x: f32, z: f32) -> bool {
        let p = Vec2::new(x, z);
        self.tunnels.iter().any(|t| {
            let local = to_local(p, t.pos, t.rotation);
            local.x.abs() <= t.length * 0.5 && local.y.abs() <= t.width * 0.5
        })
    }

    pub fn in_mud_pit(&self, x: f32, z: f32) -> bool {
        let p = Vec2::new(x, z);
        self.mud_pits.iter().any(|pit| p.distance(pit.pos) < pit.radius)
    }

    /// Highest ramp-cone surface at (x, z), 0 when outside all ramps
    pub fn ramp_height(&self, x: f32, z: f32) -> f32 {
        let p = Vec2::new(x, z);
        self.ramps
            .iter()
            .filter(|r| r.radius > 0.0)
            .filter_map(|r| {
                let d = p.distance(Vec2::new(r.x, r.z));
                (d < r.radius).then(|| r.height * (1.0 - d / r.radius))
            })
            .fold(0.0, f32::max)
    }

    /// Surface a vehicle rests on
    pub fn ground_height(&self, x: f32, z: f32) -> f32 {
        if self.in_tunnel(x, z) {
            return TUNNEL_FLOOR_HEIGHT;
        }
        let mut ground = self.height_at(x, z);
        let bridge = self.on_bridge(x, z);
        if bridge.on_bridge {
            ground = ground.max(bridge.height);
        }
        ground.max(self.ramp_height(x, z))
    }

    /// All classifications for one point
    pub fn sample(&self, x: f32, z: f32) -> TerrainSample {
        let bridge = self.on_bridge(x, z);
        TerrainSample {
            elevation: self.height_at(x, z),
            ground: self.ground_height(x, z),
            on_road: on_road(x, z),
            on_bridge: bridge.on_bridge,
            in_tunnel: self.in_tunnel(x, z),
            in_mud_pit: self.in_mud_pit(x, z),
        }
    }
}

/// Inside either orthogonal road corridor
#[inline]
pub fn on_road(x: f32, z: f32) -> bool {
    x.abs() < ROAD_CORRIDOR_HALF_WIDTH || z.abs() < ROAD_CORRIDOR_HALF_WIDTH
}
