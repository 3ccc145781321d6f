//! Fixed-order session tick
//!
//! Player kinematics, then agents, then interactions, then standings. Every
//! vehicle has exactly one writer per tick.

use super::boundary::{BoundaryResult, clamp_to_arena, guide_to_track};
use super::state::{GameEvent, GamePhase, PLAYER_ID, SessionState};
use super::vehicle::{self, DriveCommand, InputCommand, Vehicle};
use crate::consts::MAX_DT;
use crate::ground_xz;
use crate::settings::GameMode;
use crate::standings::ProgressUpdate;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Player controls
    pub drive: InputCommand,
    /// Pause toggle
    pub pause: bool,
    /// Restart the session from the grid
    pub restart: bool,
}

/// Advance the session by `dt` seconds
pub fn tick(state: &mut SessionState, input: &TickInput, dt: f32) {
    state.events.clear();

    if input.restart {
        state.reset();
        return;
    }

    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Running | GamePhase::Countdown => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => {
                let holding = state.config.mode == GameMode::Race
                    && state.clock < f64::from(state.config.countdown);
                state.phase = if holding {
                    GamePhase::Countdown
                } else {
                    GamePhase::Running
                };
            }
            GamePhase::Finished => {}
        }
    }

    // Don't tick if paused or finished
    if matches!(state.phase, GamePhase::Paused | GamePhase::Finished) {
        return;
    }

    if !dt.is_finite() || dt <= 0.0 {
        log::warn!("Ignoring tick with invalid dt {dt}");
        return;
    }
    let dt = dt.min(MAX_DT);

    state.time_ticks += 1;
    state.clock += f64::from(dt);

    if state.phase == GamePhase::Countdown {
        if state.clock < f64::from(state.config.countdown) {
            return;
        }
        state.phase = GamePhase::Running;
        state.events.push(GameEvent::RaceStarted);
        log::info!("Race started at t={:.2}", state.clock);
    }

    step_player(state, &input.drive, dt);
    if state.config.mode == GameMode::Race {
        step_agents(state, dt);
    }

    let awarded = state.entities.resolve(
        &state.player,
        &mut state.agents,
        state.clock,
        &mut state.events,
    );
    state.score += awarded;

    if state.config.mode == GameMode::Race {
        update_standings(state);
    }
}

/// Boundary policies for one vehicle; returns whether the arena edge was hit
fn contain(state: &SessionState, v: &mut Vehicle) -> bool {
    if state.config.mode == GameMode::Race {
        let (position, speed, _) = guide_to_track(&state.world.track, v.position, v.speed);
        v.position = position;
        v.speed = speed;
    }
    let (position, speed, result) = clamp_to_arena(v.position, v.speed, state.config.arena_radius);
    v.position = position;
    v.speed = speed;
    result == BoundaryResult::Clamped
}

fn step_player(state: &mut SessionState, input: &InputCommand, dt: f32) {
    let config = state.vehicle_config;
    let command = DriveCommand::from_input(input, &config);
    let prev = state.player;
    let mut next = vehicle::tick(&prev, &command, dt, &config, &state.world.layout);
    if !next.is_finite() {
        if prev.is_finite() {
            log::warn!("Player pose went non-finite, holding last pose");
        } else {
            log::warn!("Player pose non-finite, returning to start");
            state.player = state.player_start;
        }
        return;
    }
    let hit_edge = contain(state, &mut next);

    if hit_edge {
        state.events.push(GameEvent::ArenaEdgeHit {
            vehicle_id: PLAYER_ID,
        });
    }
    if prev.airborne && !next.airborne {
        let impact_speed = (prev.vertical_velocity - config.gravity * dt).abs();
        log::debug!("Landed at {impact_speed:.1}");
        state.events.push(GameEvent::Landed { impact_speed });
    }
    state.player = next;
}

fn step_agents(state: &mut SessionState, dt: f32) {
    let config = state.vehicle_config;
    for i in 0..state.agents.len() {
        let mut next = state.agents[i].step(state.clock, dt, &config, &state.world.layout);
        if !next.vehicle.is_finite() {
            let agent = &mut state.agents[i];
            if agent.vehicle.is_finite() {
                log::warn!("Agent {} pose went non-finite, holding last pose", agent.id);
            } else {
                log::warn!("Agent {} pose non-finite, returning to grid", agent.id);
                agent.reset();
            }
            continue;
        }
        let hit_edge = contain(state, &mut next.vehicle);

        let agent = &mut state.agents[i];
        if hit_edge {
            state.events.push(GameEvent::ArenaEdgeHit { vehicle_id: agent.id });
        }
        *agent = next;
    }
}

fn update_standings(state: &mut SessionState) {
    let now = state.clock;
    let racers: Vec<(u32, glam::Vec3)> = std::iter::once((PLAYER_ID, state.player.position))
        .chain(state.agents.iter().map(|a| (a.id, a.vehicle.position)))
        .collect();

    let mut player_finished = false;
    for (vehicle_id, position) in racers {
        let progress = state.world.track.project(ground_xz(position)).progress;
        match state.standings.update(vehicle_id, progress, now) {
            Some(ProgressUpdate::LapCompleted(lap)) => {
                state.events.push(GameEvent::LapCompleted { vehicle_id, lap });
            }
            Some(ProgressUpdate::Finished(lap)) => {
                state.events.push(GameEvent::LapCompleted { vehicle_id, lap });
                log::info!("Vehicle {vehicle_id} finished at t={now:.2}");
                player_finished |= vehicle_id == PLAYER_ID;
            }
            None => {}
        }
    }

    let rank = state.standings.rank_of(PLAYER_ID).unwrap_or(1);
    if rank != state.player_rank {
        state.player_rank = rank;
        state.events.push(GameEvent::RankChanged { rank });
    }
    if player_finished {
        state.phase = GamePhase::Finished;
        state.events.push(GameEvent::RaceFinished { rank });
    }
}
