//! Proximity interactions between the player truck and world entities
//!
//! Reads vehicle poses and changes state on *other* entities only: prop
//! damage, toppling trees, pickups, and the thrown projectile that spins out
//! an AI racer. All timers are plain deadline checks against the game clock.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::ai::AiAgent;
use super::state::GameEvent;
use super::vehicle::Vehicle;
use crate::{ground_xz, heading_of};

/// Landing on a prop: tight radius, well above it
pub const CRUSH_RADIUS: f32 = 3.5;
pub const CRUSH_HEIGHT: f32 = 1.2;
pub const CRUSH_DAMAGE: f32 = 0.08;
/// Clipping a prop while driving through: wider radius, roughly level
pub const CLIP_RADIUS: f32 = 5.0;
pub const CLIP_HEIGHT: f32 = -0.5;
pub const CLIP_DAMAGE: f32 = 0.01;

pub const TREE_CONTACT_RADIUS: f32 = 2.5;
/// How far a toppled tree leans over (radians from vertical)
pub const TREE_FALL_ANGLE: f32 = 1.45;

pub const PICKUP_RADIUS: f32 = 3.0;
pub const PICKUP_SCORE: u64 = 10;
/// Seconds from collection until the item is back
pub const PICKUP_RESPAWN: f64 = 8.0;

/// Agents closer than this to the thrower are never targeted
pub const MIN_THROW_DISTANCE: f32 = 10.0;
pub const FLIGHT_DURATION: f64 = 0.8;
pub const SPIN_DURATION: f64 = 2.5;
/// Peak of the presentation arc above the straight line
pub const ARC_HEIGHT: f32 = 6.0;
/// Projectiles leave from roughly the cab roof
const THROW_HEIGHT: f32 = 1.5;

/// A parked car that can be crushed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageableProp {
    pub id: u32,
    pub position: Vec3,
    pub rotation: f32,
    /// 0 = pristine, 1 = flattened; never decreases until reset
    pub damage: f32,
}

impl DamageableProp {
    pub fn new(id: u32, position: Vec3, rotation: f32) -> Self {
        Self {
            id,
            position,
            rotation,
            damage: 0.0,
        }
    }

    /// Apply this tick's contact, returning the damage actually added
    pub fn apply_contact(&mut self, vehicle: Vec3) -> f32 {
        let dist = ground_xz(vehicle).distance(ground_xz(self.position));
        let above = vehicle.y - self.position.y;
        let delta = if dist < CRUSH_RADIUS && above > CRUSH_HEIGHT {
            CRUSH_DAMAGE
        } else if dist < CLIP_RADIUS && above > CLIP_HEIGHT {
            CLIP_DAMAGE
        } else {
            0.0
        };
        let applied = delta.min(1.0 - self.damage);
        self.damage = (self.damage + applied).min(1.0);
        applied
    }

    pub fn reset(&mut self) {
        self.damage = 0.0;
    }
}

/// A tree that falls over once when hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopplableProp {
    pub id: u32,
    pub position: Vec3,
    pub rotation: f32,
    pub fallen: bool,
    pub fall_angle: f32,
    /// Heading the tree fell toward
    pub fall_direction: f32,
}

impl TopplableProp {
    pub fn new(id: u32, position: Vec3, rotation: f32) -> Self {
        Self {
            id,
            position,
            rotation,
            fallen: false,
            fall_angle: 0.0,
            fall_direction: 0.0,
        }
    }

    /// Topple on first contact; returns true only on the tick it falls
    pub fn apply_contact(&mut self, vehicle: &Vehicle) -> bool {
        if self.fallen {
            return false;
        }
        let contact = ground_xz(self.position) - ground_xz(vehicle.position);
        if contact.length() >= TREE_CONTACT_RADIUS {
            return false;
        }
        self.fallen = true;
        self.fall_angle = TREE_FALL_ANGLE;
        self.fall_direction = if contact.length_squared() > f32::EPSILON {
            heading_of(contact)
        } else {
            vehicle.heading
        };
        true
    }

    pub fn reset(&mut self) {
        self.fallen = false;
        self.fall_angle = 0.0;
        self.fall_direction = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupStatus {
    Available,
    OnCooldown,
}

/// A collectible item (banana)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupItem {
    pub id: u32,
    pub position: Vec3,
    pub collected: bool,
    pub collected_at: f64,
}

impl PickupItem {
    pub fn new(id: u32, position: Vec3) -> Self {
        Self {
            id,
            position,
            collected: false,
            collected_at: 0.0,
        }
    }

    pub fn status(&self) -> PickupStatus {
        if self.collected {
            PickupStatus::OnCooldown
        } else {
            PickupStatus::Available
        }
    }

    pub fn try_collect(&mut self, vehicle: Vec3, now: f64) -> bool {
        if self.collected || ground_xz(vehicle).distance(ground_xz(self.position)) >= PICKUP_RADIUS {
            return false;
        }
        self.collected = true;
        self.collected_at = now;
        true
    }

    pub fn try_respawn(&mut self, now: f64) -> bool {
        if self.collected && now - self.collected_at >= PICKUP_RESPAWN {
            self.collected = false;
            return true;
        }
        false
    }
}

/// A thrown item in flight toward a snapshotted destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub from: Vec3,
    /// Target position at throw time; the projectile does not home
    pub to: Vec3,
    pub target_agent: u32,
    pub start_time: f64,
    pub flight_duration: f64,
}

impl Projectile {
    pub fn arrival_time(&self) -> f64 {
        self.start_time + self.flight_duration
    }

    pub fn has_arrived(&self, now: f64) -> bool {
        now >= self.arrival_time()
    }

    /// Presentation position: straight line plus a parabolic hop
    pub fn position_at(&self, now: f64) -> Vec3 {
        let s = if self.flight_duration > 0.0 {
            ((now - self.start_time) / self.flight_duration).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };
        let mut p = self.from.lerp(self.to, s);
        p.y += ARC_HEIGHT * 4.0 * s * (1.0 - s);
        p
    }
}

/// Closest agent that is still far enough away to be worth a throw
pub fn pick_target(thrower: Vec3, agents: &[AiAgent]) -> Option<&AiAgent> {
    let origin = ground_xz(thrower);
    agents
        .iter()
        .map(|a| (a, ground_xz(a.vehicle.position).distance(origin)))
        .filter(|(_, d)| *d > MIN_THROW_DISTANCE)
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(a, _)| a)
}

/// Every interactive entity in a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldEntities {
    pub props: Vec<DamageableProp>,
    pub trees: Vec<TopplableProp>,
    pub pickups: Vec<PickupItem>,
    /// Single global slot: a new throw supersedes the one in flight
    pub projectile: Option<Projectile>,
}

impl WorldEntities {
    /// Restore every entity to its session-start state
    pub fn reset(&mut self) {
        self.props.iter_mut().for_each(DamageableProp::reset);
        self.trees.iter_mut().for_each(TopplableProp::reset);
        for item in &mut self.pickups {
            item.collected = false;
            item.collected_at = 0.0;
        }
        self.projectile = None;
    }

    /// Run one tick of interactions for the player at `player`
    ///
    /// Returns the score awarded this tick.
    pub fn resolve(
        &mut self,
        player: &Vehicle,
        agents: &mut [AiAgent],
        now: f64,
        events: &mut Vec<GameEvent>,
    ) -> u64 {
        self.resolve_projectile(agents, now, events);

        for item in &mut self.pickups {
            if item.try_respawn(now) {
                events.push(GameEvent::PickupRespawned { item_id: item.id });
            }
        }

        for prop in &mut self.props {
            let delta = prop.apply_contact(player.position);
            if delta > 0.0 {
                events.push(GameEvent::PropDamaged {
                    prop_id: prop.id,
                    delta,
                    damage: prop.damage,
                });
            }
        }

        for tree in &mut self.trees {
            if tree.apply_contact(player) {
                log::debug!("Tree {} toppled toward {:.2}", tree.id, tree.fall_direction);
                events.push(GameEvent::TreeToppled {
                    tree_id: tree.id,
                    direction: tree.fall_direction,
                });
            }
        }

        let mut awarded = 0;
        let mut collected = Vec::new();
        for item in &mut self.pickups {
            if item.try_collect(player.position, now) {
                awarded += PICKUP_SCORE;
                collected.push(item.id);
            }
        }
        for item_id in collected {
            events.push(GameEvent::PickupCollected {
                item_id,
                score: PICKUP_SCORE,
            });
            self.throw_from(player.position, agents, now, events);
        }
        awarded
    }

    fn throw_from(&mut self, thrower: Vec3, agents: &[AiAgent], now: f64, events: &mut Vec<GameEvent>) {
        let Some(target) = pick_target(thrower, agents) else {
            log::debug!("Pickup collected with no agent in range to target");
            return;
        };
        if let Some(old) = self.projectile.take() {
            log::debug!("Projectile at agent {} superseded", old.target_agent);
            events.push(GameEvent::ProjectileDiscarded {
                target_agent: old.target_agent,
            });
        }
        let projectile = Projectile {
            from: thrower + Vec3::Y * THROW_HEIGHT,
            to: target.vehicle.position,
            target_agent: target.id,
            start_time: now,
            flight_duration: FLIGHT_DURATION,
        };
        events.push(GameEvent::ProjectileThrown {
            target_agent: target.id,
            destination: projectile.to,
        });
        self.projectile = Some(projectile);
    }

    fn resolve_projectile(&mut self, agents: &mut [AiAgent], now: f64, events: &mut Vec<GameEvent>) {
        let arrived = self.projectile.as_ref().is_some_and(|p| p.has_arrived(now));
        if !arrived {
            return;
        }
        let Some(projectile) = self.projectile.take() else {
            return;
        };
        match agents.iter_mut().find(|a| a.id == projectile.target_agent) {
            Some(agent) => {
                agent.spin_out(now, SPIN_DURATION);
                log::debug!("Agent {} spun out until {:.2}", agent.id, agent.spin_until);
                events.push(GameEvent::AgentSpunOut {
                    agent_id: agent.id,
                    until: agent.spin_until,
                });
            }
            None => {
                events.push(GameEvent::ProjectileDiscarded {
                    target_agent: projectile.target_agent,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Difficulty;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn agent_at(id: u32, pos: Vec3) -> AiAgent {
        AiAgent::new(id, Vehicle::new(pos, 0.0), Arc::from(Vec::new()), Difficulty::Medium)
    }

    fn truck_at(pos: Vec3) -> Vehicle {
        Vehicle::new(pos, 0.0)
    }

    #[test]
    fn test_crush_vs_clip_damage() {
        let mut prop = DamageableProp::new(1, Vec3::ZERO, 0.0);
        // Airborne right over it
        assert_eq!(prop.apply_contact(Vec3::new(1.0, 2.0, 0.0)), CRUSH_DAMAGE);
        // Level, inside the wider radius
        assert_eq!(prop.apply_contact(Vec3::new(4.0, 0.0, 0.0)), CLIP_DAMAGE);
        // High but outside the crush radius still clips
        assert_eq!(prop.apply_contact(Vec3::new(4.0, 3.0, 0.0)), CLIP_DAMAGE);
        // Far away
        assert_eq!(prop.apply_contact(Vec3::new(6.0, 0.0, 0.0)), 0.0);
        assert!((prop.damage - (CRUSH_DAMAGE + 2.0 * CLIP_DAMAGE)).abs() < 1e-6);
    }

    #[test]
    fn test_damage_event_carries_exact_increment() {
        let mut entities = WorldEntities {
            props: vec![DamageableProp::new(4, Vec3::ZERO, 0.0)],
            ..Default::default()
        };
        entities.props[0].damage = CRUSH_DAMAGE;
        let mut events = Vec::new();
        entities.resolve(&truck_at(Vec3::new(4.0, 0.0, 0.0)), &mut [], 1.0, &mut events);
        assert_eq!(
            events,
            vec![GameEvent::PropDamaged {
                prop_id: 4,
                delta: CLIP_DAMAGE,
                damage: entities.props[0].damage,
            }]
        );

        // Near the cap only the remainder is reported
        entities.props[0].damage = 0.995;
        events.clear();
        entities.resolve(&truck_at(Vec3::new(4.0, 0.0, 0.0)), &mut [], 2.0, &mut events);
        assert_eq!(entities.props[0].damage, 1.0);
        match events.as_slice() {
            [GameEvent::PropDamaged { delta, .. }] => assert!((delta - 0.005).abs() < 1e-6),
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn test_damage_saturates_at_one() {
        let mut prop = DamageableProp::new(1, Vec3::ZERO, 0.0);
        for _ in 0..100 {
            prop.apply_contact(Vec3::new(0.0, 3.0, 0.0));
        }
        assert_eq!(prop.damage, 1.0);
        assert_eq!(prop.apply_contact(Vec3::new(0.0, 3.0, 0.0)), 0.0);
        prop.reset();
        assert_eq!(prop.damage, 0.0);
    }

    #[test]
    fn test_tree_falls_exactly_once() {
        let mut tree = TopplableProp::new(4, Vec3::new(0.0, 0.0, 10.0), 0.0);
        let truck = truck_at(Vec3::new(0.0, 0.0, 8.5));
        assert!(tree.apply_contact(&truck));
        assert!(tree.fallen);
        assert_eq!(tree.fall_angle, TREE_FALL_ANGLE);
        // Pushed along +z: heading 0
        assert!(tree.fall_direction.abs() < 1e-6);

        let other_side = truck_at(Vec3::new(1.0, 0.0, 10.5));
        assert!(!tree.apply_contact(&other_side));
        assert!(tree.fall_direction.abs() < 1e-6);
    }

    #[test]
    fn test_projectile_scenario_snapshot_and_single_spin() {
        let mut entities = WorldEntities {
            pickups: vec![PickupItem::new(1, Vec3::new(0.0, 0.0, 0.0))],
            ..Default::default()
        };
        let mut agents = vec![
            agent_at(1, Vec3::new(5.0, 0.0, 0.0)), // too close
            agent_at(2, Vec3::new(120.0, 2.0, 40.0)),
            agent_at(3, Vec3::new(-200.0, 0.0, 0.0)),
        ];
        let truck = truck_at(Vec3::new(0.5, 0.0, 0.0));
        let mut events = Vec::new();

        let score = entities.resolve(&truck, &mut agents, 10.0, &mut events);
        assert_eq!(score, PICKUP_SCORE);
        let projectile = entities.projectile.clone().expect("projectile thrown");
        assert_eq!(projectile.target_agent, 2);
        assert_eq!(projectile.to, Vec3::new(120.0, 2.0, 40.0));
        assert!(events.contains(&GameEvent::ProjectileThrown {
            target_agent: 2,
            destination: Vec3::new(120.0, 2.0, 40.0),
        }));

        // Target moves; destination does not
        agents[1].vehicle.position = Vec3::new(150.0, 2.0, 60.0);
        let far_truck = truck_at(Vec3::new(50.0, 0.0, 50.0));
        events.clear();
        entities.resolve(&far_truck, &mut agents, 10.5, &mut events);
        assert_eq!(entities.projectile.as_ref().map(|p| p.to), Some(Vec3::new(120.0, 2.0, 40.0)));
        assert!(events.is_empty());

        // Arrival
        entities.resolve(&far_truck, &mut agents, 10.8, &mut events);
        assert!(entities.projectile.is_none());
        assert!((agents[1].spin_until - (10.8 + SPIN_DURATION)).abs() < 1e-9);
        assert_eq!(
            events.iter().filter(|e| matches!(e, GameEvent::AgentSpunOut { .. })).count(),
            1
        );

        // Nothing resolves twice
        events.clear();
        entities.resolve(&far_truck, &mut agents, 11.0, &mut events);
        assert!(events.is_empty());
        assert!(agents[0].spin_until.is_infinite());
        assert!(agents[2].spin_until.is_infinite());
    }

    #[test]
    fn test_new_throw_supersedes_projectile_in_flight() {
        let mut entities = WorldEntities {
            pickups: vec![
                PickupItem::new(1, Vec3::ZERO),
                PickupItem::new(2, Vec3::new(0.0, 0.0, 20.0)),
            ],
            ..Default::default()
        };
        let mut agents = vec![agent_at(9, Vec3::new(100.0, 0.0, 0.0))];
        let mut events = Vec::new();
        entities.resolve(&truck_at(Vec3::ZERO), &mut agents, 1.0, &mut events);
        entities.resolve(&truck_at(Vec3::new(0.0, 0.0, 20.0)), &mut agents, 1.2, &mut events);
        assert!(events.contains(&GameEvent::ProjectileDiscarded { target_agent: 9 }));
        let p = entities.projectile.as_ref().expect("new projectile");
        assert_eq!(p.start_time, 1.2);

        // Only the surviving projectile lands
        events.clear();
        entities.resolve(&truck_at(Vec3::new(0.0, 0.0, 50.0)), &mut agents, 2.1, &mut events);
        assert_eq!(
            events.iter().filter(|e| matches!(e, GameEvent::AgentSpunOut { .. })).count(),
            1
        );
        assert!((agents[0].spin_until - (2.1 + SPIN_DURATION)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_target_discards() {
        let mut entities = WorldEntities {
            projectile: Some(Projectile {
                from: Vec3::ZERO,
                to: Vec3::X,
                target_agent: 77,
                start_time: 0.0,
                flight_duration: 0.5,
            }),
            ..Default::default()
        };
        let mut events = Vec::new();
        entities.resolve(&truck_at(Vec3::ZERO), &mut [], 1.0, &mut events);
        assert!(entities.projectile.is_none());
        assert_eq!(events, vec![GameEvent::ProjectileDiscarded { target_agent: 77 }]);
    }

    #[test]
    fn test_pickup_cooldown_cycle() {
        let mut item = PickupItem::new(1, Vec3::ZERO);
        assert_eq!(item.status(), PickupStatus::Available);
        assert!(item.try_collect(Vec3::new(1.0, 0.0, 1.0), 5.0));
        assert_eq!(item.status(), PickupStatus::OnCooldown);
        assert!(!item.try_collect(Vec3::ZERO, 6.0));
        assert!(!item.try_respawn(5.0 + PICKUP_RESPAWN - 0.01));
        assert!(item.try_respawn(5.0 + PICKUP_RESPAWN));
        assert_eq!(item.status(), PickupStatus::Available);
    }

    #[test]
    fn test_no_eligible_target_no_projectile() {
        let mut entities = WorldEntities {
            pickups: vec![PickupItem::new(1, Vec3::ZERO)],
            ..Default::default()
        };
        let mut agents = vec![agent_at(1, Vec3::new(3.0, 0.0, 0.0))];
        let mut events = Vec::new();
        let score = entities.resolve(&truck_at(Vec3::ZERO), &mut agents, 0.0, &mut events);
        assert_eq!(score, PICKUP_SCORE);
        assert!(entities.projectile.is_none());
    }

    #[test]
    fn test_projectile_arc_shape() {
        let p = Projectile {
            from: Vec3::ZERO,
            to: Vec3::new(10.0, 0.0, 0.0),
            target_agent: 1,
            start_time: 0.0,
            flight_duration: 1.0,
        };
        assert_eq!(p.position_at(0.0), Vec3::ZERO);
        assert_eq!(p.position_at(2.0), Vec3::new(10.0, 0.0, 0.0));
        let mid = p.position_at(0.5);
        assert!((mid.x - 5.0).abs() < 1e-5);
        assert!((mid.y - ARC_HEIGHT).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn damage_is_monotonic_and_bounded(
            path in prop::collection::vec((-8.0f32..8.0, -1.0f32..4.0, -8.0f32..8.0), 1..200)
        ) {
            let mut car = DamageableProp::new(1, Vec3::ZERO, 0.0);
            let mut last = 0.0;
            for (x, y, z) in path {
                car.apply_contact(Vec3::new(x, y, z));
                prop_assert!(car.damage >= last);
                prop_assert!(car.damage <= 1.0);
                last = car.damage;
            }
        }
    }
}
