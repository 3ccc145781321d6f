//! Session configuration
//!
//! Supplied once at race start and immutable afterwards. Loaded from JSON by
//! the host; every field has a default so partial files are fine.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::terrain::WorldLayout;
use crate::sim::track;
use crate::sim::vehicle::VehicleConfig;

/// Which game is being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Closed-loop track with AI racers
    #[default]
    Race,
    /// Free-roam arena with terrain, ramps and props
    Jump,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Race => "race",
            GameMode::Jump => "jump",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "race" => Some(GameMode::Race),
            "jump" | "arena" => Some(GameMode::Jump),
            _ => None,
        }
    }
}

/// AI difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Fraction of top speed AI racers aim for
    pub fn speed_scalar(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.7,
            Difficulty::Medium => 0.85,
            Difficulty::Hard => 1.0,
        }
    }
}

/// User-facing speed level (1-10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeedLevel(pub u8);

impl SpeedLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    pub const MIN_MULTIPLIER: f32 = 0.2;
    pub const MAX_MULTIPLIER: f32 = 2.0;

    /// Clamp to the valid range
    pub fn new(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    /// Linear map of 1..=10 onto [0.2, 2.0]
    pub fn multiplier(&self) -> f32 {
        let level = self.0.clamp(Self::MIN, Self::MAX);
        let t = (level - Self::MIN) as f32 / (Self::MAX - Self::MIN) as f32;
        Self::MIN_MULTIPLIER + t * (Self::MAX_MULTIPLIER - Self::MIN_MULTIPLIER)
    }
}

impl Default for SpeedLevel {
    fn default() -> Self {
        // Level 5 gives exactly 1.0
        Self(5)
    }
}

/// Closed-loop track dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Extent of the oval along x
    pub length: f32,
    /// Extent of the oval along z
    pub width: f32,
    /// Drivable road width (half of it is the guidance half-width)
    pub road_width: f32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            length: TRACK_LENGTH,
            width: TRACK_WIDTH,
            road_width: ROAD_WIDTH,
        }
    }
}

/// Everything a session needs, fixed for its lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub mode: GameMode,
    /// Seed for prop scattering (the only randomness in a session)
    pub seed: u64,
    pub difficulty: Difficulty,
    pub speed_level: SpeedLevel,
    pub track: TrackConfig,
    /// Jump-mode world features
    pub layout: WorldLayout,
    /// Number of AI racers (race mode only)
    pub ai_count: usize,
    /// Laps to finish a race
    pub laps: u32,
    /// Hard containment radius around the world origin
    pub arena_radius: f32,
    /// Player truck tuning (speed multiplier is taken from `speed_level`)
    pub vehicle: VehicleConfig,
    /// Seconds the race holds everyone on the grid before starting
    pub countdown: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Race,
            seed: 0x7275_636b,
            difficulty: Difficulty::Medium,
            speed_level: SpeedLevel::default(),
            track: TrackConfig::default(),
            layout: WorldLayout::jump_arena(),
            ai_count: 3,
            laps: 3,
            arena_radius: RACE_ARENA_RADIUS,
            vehicle: VehicleConfig::default(),
            countdown: 3.0,
        }
    }
}

impl SessionConfig {
    /// Defaults for a free-roam jump session
    pub fn jump() -> Self {
        Self {
            mode: GameMode::Jump,
            ai_count: 0,
            arena_radius: JUMP_ARENA_RADIUS,
            countdown: 0.0,
            ..Self::default()
        }
    }

    /// Parse from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::sanitized)
    }

    /// Parse, falling back to defaults on malformed input
    pub fn load_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(config) => {
                log::info!(
                    "Loaded session config: mode={}, difficulty={}, speed level {}",
                    config.mode.as_str(),
                    config.difficulty.as_str(),
                    config.speed_level.0
                );
                config
            }
            Err(err) => {
                log::warn!("Invalid session config ({err}), using defaults");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Clamp out-of-range values to safe minimums
    pub fn sanitized(mut self) -> Self {
        self.speed_level = SpeedLevel::new(self.speed_level.0);
        self.track.length = finite_or(self.track.length, TRACK_LENGTH).max(20.0);
        self.track.width = finite_or(self.track.width, TRACK_WIDTH).max(20.0);
        self.track.road_width = finite_or(self.track.road_width, ROAD_WIDTH).max(2.0);
        self.arena_radius = finite_or(self.arena_radius, RACE_ARENA_RADIUS).max(10.0);
        if self.mode == GameMode::Race {
            let needed = track::max_extent(self.track.length, self.track.width)
                + self.track.road_width * 0.5
                + ARENA_TRACK_MARGIN;
            if self.arena_radius < needed {
                log::warn!(
                    "Arena radius {:.0} cuts the track, raising to {needed:.0}",
                    self.arena_radius
                );
                self.arena_radius = needed;
            }
        }
        self.ai_count = self.ai_count.min(MAX_AI_COUNT);
        self.countdown = finite_or(self.countdown, 0.0).max(0.0);
        self.laps = self.laps.max(1);
        self.layout = self.layout.sanitized();
        self.vehicle = self.vehicle.sanitized();
        self
    }

    /// Player tuning with the session speed multiplier and mode applied
    pub fn player_vehicle(&self) -> VehicleConfig {
        VehicleConfig {
            speed_multiplier: self.speed_level.multiplier(),
            mode: self.mode,
            ..self.vehicle
        }
    }
}

pub(crate) fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_level_multiplier_range() {
        assert!((SpeedLevel::new(1).multiplier() - 0.2).abs() < 1e-6);
        assert!((SpeedLevel::new(10).multiplier() - 2.0).abs() < 1e-6);
        assert!((SpeedLevel::default().multiplier() - 1.0).abs() < 1e-6);
        // Out-of-range levels clamp
        assert_eq!(SpeedLevel::new(0).0, 1);
        assert_eq!(SpeedLevel::new(42).0, 10);
    }

    #[test]
    fn test_difficulty_scalars() {
        assert_eq!(Difficulty::Easy.speed_scalar(), 0.7);
        assert_eq!(Difficulty::Medium.speed_scalar(), 0.85);
        assert_eq!(Difficulty::Hard.speed_scalar(), 1.0);
        assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str("extreme"), None);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = SessionConfig::from_json(r#"{"mode":"jump","difficulty":"easy","speed_level":12}"#)
            .expect("valid json");
        assert_eq!(config.mode, GameMode::Jump);
        assert_eq!(config.difficulty, Difficulty::Easy);
        assert_eq!(config.speed_level.0, 10);
        assert_eq!(config.laps, 3);
    }

    #[test]
    fn test_malformed_json_falls_back() {
        let config = SessionConfig::load_or_default("{not json");
        assert_eq!(config.mode, GameMode::Race);
        assert!(SessionConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_sanitize_clamps_negative_values() {
        let mut config = SessionConfig::default();
        config.track.road_width = -4.0;
        config.arena_radius = f32::NAN;
        config.laps = 0;
        let config = config.sanitized();
        assert_eq!(config.track.road_width, 2.0);
        assert_eq!(config.arena_radius, RACE_ARENA_RADIUS);
        assert_eq!(config.laps, 1);
    }

    #[test]
    fn test_long_track_widens_race_arena() {
        let mut config = SessionConfig::default();
        config.track.length = 700.0;
        let config = config.sanitized();
        let extent = track::max_extent(700.0, config.track.width);
        assert!(config.arena_radius >= extent + config.track.road_width * 0.5 + ARENA_TRACK_MARGIN);

        // Default track already fits; jump arenas are left alone
        assert_eq!(SessionConfig::default().sanitized().arena_radius, RACE_ARENA_RADIUS);
        let mut jump = SessionConfig::jump();
        jump.track.length = 700.0;
        assert_eq!(jump.sanitized().arena_radius, JUMP_ARENA_RADIUS);
    }

    #[test]
    fn test_ai_count_capped() {
        let config = SessionConfig::from_json(r#"{"ai_count":4000000000}"#).expect("valid json");
        assert_eq!(config.ai_count, MAX_AI_COUNT);
    }

    #[test]
    fn test_json_roundtrip_keeps_mode() {
        let json = SessionConfig::jump().to_json().expect("serializable");
        let back = SessionConfig::from_json(&json).expect("parses");
        assert_eq!(back.mode, GameMode::Jump);
        assert_eq!(back.arena_radius, JUMP_ARENA_RADIUS);
    }
}
