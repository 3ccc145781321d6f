//! Session state and core simulation types
//!
//! Everything a running session owns lives here. The world (layout and track)
//! is fixed at creation and shared behind `Arc`.

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::sync::Arc;

use super::ai::AiAgent;
use super::interaction::{DamageableProp, PickupItem, TopplableProp, WorldEntities};
use super::terrain::WorldLayout;
use super::track::Track;
use super::vehicle::{Vehicle, VehicleConfig};
use crate::consts::*;
use crate::ground_xz;
use crate::settings::{GameMode, SessionConfig};
use crate::standings::Standings;

/// The player's vehicle id; agents are numbered from 1
pub const PLAYER_ID: u32 = 0;
/// Sideways offset of the two grid lanes
pub const GRID_LANE_OFFSET: f32 = 3.0;
/// Where the player starts in a jump session
pub const JUMP_START: Vec2 = Vec2::new(0.0, -20.0);

/// Scatter counts
pub const RACE_TREES: usize = 24;
pub const RACE_PICKUPS: usize = 7;
pub const JUMP_PARKED_CARS: usize = 8;
pub const JUMP_TREES: usize = 30;
pub const JUMP_PICKUPS: usize = 5;
/// Tries per scattered entity before giving up on a clear spot
const SCATTER_ATTEMPTS: usize = 16;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Everyone held on the grid
    Countdown,
    Running,
    Paused,
    /// Player completed the lap count
    Finished,
}

/// Events for the host (audio, effects, HUD); cleared at the start of every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    RaceStarted,
    PropDamaged { prop_id: u32, delta: f32, damage: f32 },
    TreeToppled { tree_id: u32, direction: f32 },
    PickupCollected { item_id: u32, score: u64 },
    PickupRespawned { item_id: u32 },
    ProjectileThrown { target_agent: u32, destination: Vec3 },
    ProjectileDiscarded { target_agent: u32 },
    AgentSpunOut { agent_id: u32, until: f64 },
    /// Player touched down after a jump
    Landed { impact_speed: f32 },
    ArenaEdgeHit { vehicle_id: u32 },
    LapCompleted { vehicle_id: u32, lap: u32 },
    RankChanged { rank: usize },
    RaceFinished { rank: usize },
}

/// Published per-vehicle pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehiclePose {
    pub id: u32,
    pub position: Vec3,
    pub heading: f32,
    pub speed: f32,
}

/// Immutable world data for a session
#[derive(Debug, Clone)]
pub struct World {
    pub layout: Arc<WorldLayout>,
    pub track: Arc<Track>,
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub config: SessionConfig,
    pub world: World,
    /// Tuning shared by the player and agents
    pub vehicle_config: VehicleConfig,
    pub phase: GamePhase,
    /// Game clock in seconds
    pub clock: f64,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub score: u64,
    pub player: Vehicle,
    /// Agents in id order
    pub agents: Vec<AiAgent>,
    pub entities: WorldEntities,
    pub standings: Standings,
    /// Player rank as of the last tick (race mode)
    pub player_rank: usize,
    /// Events produced by the last tick
    pub events: Vec<GameEvent>,
    pub(crate) player_start: Vehicle,
    /// Next entity ID
    next_id: u32,
}

impl SessionState {
    /// Create a session: world, grid, and seeded scenery
    pub fn new(config: SessionConfig) -> Self {
        let config = config.sanitized();
        let layout = Arc::new(config.layout.clone());
        let track = Arc::new(Track::new(&config.track));
        let vehicle_config = config.player_vehicle();

        let mut state = Self {
            world: World {
                layout: layout.clone(),
                track,
            },
            vehicle_config,
            phase: GamePhase::Running,
            clock: 0.0,
            time_ticks: 0,
            score: 0,
            player: Vehicle::new(Vec3::ZERO, 0.0),
            agents: Vec::new(),
            entities: WorldEntities::default(),
            standings: Standings::new(config.laps),
            player_rank: 1,
            events: Vec::new(),
            player_start: Vehicle::new(Vec3::ZERO, 0.0),
            next_id: 1,
            config,
        };

        match state.config.mode {
            GameMode::Race => state.spawn_race_grid(),
            GameMode::Jump => {
                state.player_start = Vehicle::grounded(&layout, JUMP_START.x, JUMP_START.y, 0.0);
            }
        }
        state.player = state.player_start;
        state.scatter_entities();
        state.phase = state.start_phase();
        state.player_rank = state.standings.rank_of(PLAYER_ID).unwrap_or(1);

        log::info!(
            "Session created: mode={}, {} agents, {} props, {} trees, {} pickups, seed {:#x}",
            state.config.mode.as_str(),
            state.agents.len(),
            state.entities.props.len(),
            state.entities.trees.len(),
            state.entities.pickups.len(),
            state.config.seed
        );
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Phase a fresh (or reset) session begins in
    fn start_phase(&self) -> GamePhase {
        if self.config.mode == GameMode::Race && self.config.countdown > 0.0 {
            GamePhase::Countdown
        } else {
            GamePhase::Running
        }
    }

    /// Player and agents on the two-lane grid, player on pole
    fn spawn_race_grid(&mut self) {
        let track = self.world.track.clone();
        let slot_vehicle = |k: usize| {
            let lane = if k % 2 == 0 { -GRID_LANE_OFFSET } else { GRID_LANE_OFFSET };
            let slot = track.grid_slot(k / 2, lane);
            Vehicle::new(Vec3::new(slot.pos.x, 0.0, slot.pos.y), slot.heading)
        };

        self.player_start = slot_vehicle(0);
        self.standings
            .add(PLAYER_ID, track.project(ground_xz(self.player_start.position)).progress);

        let waypoints: Arc<[Vec2]> = track.waypoints(WAYPOINT_COUNT).into();
        for i in 0..self.config.ai_count {
            let id = i as u32 + 1;
            let start = slot_vehicle(i + 1);
            self.standings
                .add(id, track.project(ground_xz(start.position)).progress);
            self.agents.push(AiAgent::new(
                id,
                start,
                waypoints.clone(),
                self.config.difficulty,
            ));
        }
        // Entity ids continue after the vehicles
        self.next_id = self.config.ai_count as u32 + 1;
    }

    /// Deterministic scenery from the session seed
    fn scatter_entities(&mut self) {
        let mut rng = Pcg32::seed_from_u64(self.config.seed);
        match self.config.mode {
            GameMode::Race => self.scatter_race(&mut rng),
            GameMode::Jump => self.scatter_jump(&mut rng),
        }
    }

    fn scatter_race(&mut self, rng: &mut Pcg32) {
        let track = self.world.track.clone();
        let clear = track.road_half_width + 4.0;

        for k in 1..=RACE_PICKUPS {
            let t = k as f32 / (RACE_PICKUPS + 1) as f32 * TAU;
            let p = track.point(t);
            let id = self.next_entity_id();
            self.entities
                .pickups
                .push(PickupItem::new(id, Vec3::new(p.x, 0.0, p.y)));
        }

        for _ in 0..RACE_TREES {
            let spot = (0..SCATTER_ATTEMPTS).find_map(|_| {
                let t = rng.random_range(0.0..TAU);
                let side = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                let offset = clear + rng.random_range(2.0..24.0);
                let tangent = track.tangent(t);
                let normal = Vec2::new(tangent.y, -tangent.x);
                let p = track.point(t) + normal * side * offset;
                // The centerline can pass near itself; keep trees off every stretch
                (track.project(p).distance > clear && p.length() < self.config.arena_radius)
                    .then_some(p)
            });
            if let Some(p) = spot {
                let rotation = rng.random_range(0.0..TAU);
                let id = self.next_entity_id();
                self.entities
                    .trees
                    .push(TopplableProp::new(id, Vec3::new(p.x, 0.0, p.y), rotation));
            }
        }
    }

    fn scatter_jump(&mut self, rng: &mut Pcg32) {
        let layout = self.world.layout.clone();
        let inner = 25.0;
        let outer = (self.config.arena_radius * 0.85).max(inner + 1.0);
        let spot = |rng: &mut Pcg32| {
            (0..SCATTER_ATTEMPTS).find_map(|_| {
                let angle = rng.random_range(0.0..TAU);
                let r = rng.random_range(inner..outer);
                let p = Vec2::from_angle(angle) * r;
                let s = layout.sample(p.x, p.y);
                let blocked = s.on_bridge || s.in_tunnel || s.in_mud_pit || layout.ramp_height(p.x, p.y) > 0.0;
                (!blocked).then(|| Vec3::new(p.x, s.ground, p.y))
            })
        };

        for _ in 0..JUMP_PARKED_CARS {
            if let Some(pos) = spot(rng) {
                let rotation = rng.random_range(0.0..TAU);
                let id = self.next_entity_id();
                self.entities.props.push(DamageableProp::new(id, pos, rotation));
            }
        }
        for _ in 0..JUMP_TREES {
            if let Some(pos) = spot(rng) {
                let rotation = rng.random_range(0.0..TAU);
                let id = self.next_entity_id();
                self.entities.trees.push(TopplableProp::new(id, pos, rotation));
            }
        }
        for _ in 0..JUMP_PICKUPS {
            if let Some(pos) = spot(rng) {
                let id = self.next_entity_id();
                self.entities.pickups.push(PickupItem::new(id, pos));
            }
        }
    }

    /// Back to the start of the session; scenery keeps its layout
    pub fn reset(&mut self) {
        self.player = self.player_start;
        for agent in &mut self.agents {
            agent.reset();
        }
        self.entities.reset();
        let track = self.world.track.clone();
        let starts: Vec<(u32, f32)> = std::iter::once((PLAYER_ID, self.player_start))
            .chain(self.agents.iter().map(|a| (a.id, a.vehicle)))
            .map(|(id, v)| (id, track.project(ground_xz(v.position)).progress))
            .collect();
        self.standings.reset(|id| {
            starts
                .iter()
                .find(|(sid, _)| *sid == id)
                .map_or(0.0, |(_, p)| *p)
        });
        self.player_rank = self.standings.rank_of(PLAYER_ID).unwrap_or(1);
        self.score = 0;
        self.clock = 0.0;
        self.time_ticks = 0;
        self.events.clear();
        self.phase = self.start_phase();
        log::info!("Session reset ({})", self.config.mode.as_str());
    }

    /// Current pose of every vehicle, player first
    pub fn poses(&self) -> Vec<VehiclePose> {
        let pose = |id, v: &Vehicle| VehiclePose {
            id,
            position: v.position,
            heading: v.heading,
            speed: v.speed,
        };
        std::iter::once(pose(PLAYER_ID, &self.player))
            .chain(self.agents.iter().map(|a| pose(a.id, &a.vehicle)))
            .collect()
    }

    pub fn agent(&self, id: u32) -> Option<&AiAgent> {
        self.agents.iter().find(|a| a.id == id)
    }
}
