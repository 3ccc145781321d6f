//! Race progress and ranking
//!
//! Progress is laps plus the lap fraction of the nearest centerline point, so
//! player and AI are measured by the same ruler.

use serde::{Deserialize, Serialize};

/// Crossing the start line is detected as a jump between these fractions
const LINE_LOW: f32 = 0.25;
const LINE_HIGH: f32 = 0.75;

/// Lap counter for one vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapTracker {
    /// Completed laps; starts at -1 for vehicles gridded behind the line
    pub laps: i32,
    /// Lap fraction in [0, 1)
    pub progress: f32,
}

impl LapTracker {
    pub fn new(progress: f32) -> Self {
        Self {
            laps: if progress > 0.5 { -1 } else { 0 },
            progress,
        }
    }

    /// Feed the latest lap fraction; returns the lap number just completed
    pub fn update(&mut self, progress: f32) -> Option<u32> {
        let last = self.progress;
        self.progress = progress;
        if last > LINE_HIGH && progress < LINE_LOW {
            self.laps += 1;
            if self.laps > 0 {
                return Some(self.laps as u32);
            }
        } else if last < LINE_LOW && progress > LINE_HIGH {
            // Backed over the line
            self.laps -= 1;
        }
        None
    }

    /// Total distance in laps
    pub fn distance(&self) -> f32 {
        self.laps as f32 + self.progress
    }
}

/// One racer's standing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingEntry {
    pub vehicle_id: u32,
    pub tracker: LapTracker,
    /// Game-clock time the racer completed the final lap
    pub finished_at: Option<f64>,
}

/// What an update changed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressUpdate {
    LapCompleted(u32),
    Finished(u32),
}

/// Race table for every vehicle in the session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Standings {
    pub entries: Vec<StandingEntry>,
    /// Laps needed to finish
    pub laps: u32,
}

impl Standings {
    pub fn new(laps: u32) -> Self {
        Self {
            entries: Vec::new(),
            laps,
        }
    }

    /// Register a racer at its grid progress
    pub fn add(&mut self, vehicle_id: u32, progress: f32) {
        self.entries.push(StandingEntry {
            vehicle_id,
            tracker: LapTracker::new(progress),
            finished_at: None,
        });
    }

    pub fn entry(&self, vehicle_id: u32) -> Option<&StandingEntry> {
        self.entries.iter().find(|e| e.vehicle_id == vehicle_id)
    }

    /// Record new progress for a racer; finished racers are frozen
    pub fn update(&mut self, vehicle_id: u32, progress: f32, now: f64) -> Option<ProgressUpdate> {
        let laps = self.laps;
        let entry = self.entries.iter_mut().find(|e| e.vehicle_id == vehicle_id)?;
        if entry.finished_at.is_some() {
            return None;
        }
        let lap = entry.tracker.update(progress)?;
        if lap >= laps {
            entry.finished_at = Some(now);
            Some(ProgressUpdate::Finished(lap))
        } else {
            Some(ProgressUpdate::LapCompleted(lap))
        }
    }

    /// Vehicle ids from first to last
    ///
    /// Finishers come first in finishing order, then everyone else by
    /// distance covered; ties keep registration order.
    pub fn ranking(&self) -> Vec<u32> {
        let mut order: Vec<&StandingEntry> = self.entries.iter().collect();
        order.sort_by(|a, b| match (a.finished_at, b.finished_at) {
            (Some(ta), Some(tb)) => ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b
                .tracker
                .distance()
                .partial_cmp(&a.tracker.distance())
                .unwrap_or(std::cmp::Ordering::Equal),
        });
        order.into_iter().map(|e| e.vehicle_id).collect()
    }

    /// 1-indexed position of a racer
    pub fn rank_of(&self, vehicle_id: u32) -> Option<usize> {
        self.ranking()
            .iter()
            .position(|&id| id == vehicle_id)
            .map(|i| i + 1)
    }

    /// Forget all progress, keeping the registered racers
    pub fn reset(&mut self, start_progress: impl Fn(u32) -> f32) {
        for entry in &mut self.entries {
            entry.tracker = LapTracker::new(start_progress(entry.vehicle_id));
            entry.finished_at = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lap_counted_on_forward_crossing() {
        let mut t = LapTracker::new(0.1);
        assert_eq!(t.laps, 0);
        assert_eq!(t.update(0.5), None);
        assert_eq!(t.update(0.9), None);
        assert_eq!(t.update(0.02), Some(1));
        assert!((t.distance() - 1.02).abs() < 1e-6);
    }

    #[test]
    fn test_grid_behind_line_does_not_score_a_lap() {
        let mut t = LapTracker::new(0.98);
        assert_eq!(t.laps, -1);
        assert_eq!(t.update(0.01), None);
        assert_eq!(t.laps, 0);
    }

    #[test]
    fn test_reversing_over_line_takes_lap_back() {
        let mut t = LapTracker::new(0.1);
        t.update(0.9);
        assert_eq!(t.laps, -1);
        // Driving forward over it again only restores the count
        assert_eq!(t.update(0.05), None);
        assert_eq!(t.laps, 0);
    }

    #[test]
    fn test_ranking_by_distance_then_finish() {
        let mut s = Standings::new(1);
        s.add(0, 0.1);
        s.add(1, 0.3);
        s.add(2, 0.2);
        assert_eq!(s.ranking(), vec![1, 2, 0]);
        assert_eq!(s.rank_of(0), Some(3));

        // Racer 0 finishes the single lap
        assert_eq!(s.update(0, 0.5, 4.0), None);
        assert_eq!(s.update(0, 0.9, 5.0), None);
        assert_eq!(s.update(0, 0.01, 6.0), Some(ProgressUpdate::Finished(1)));
        assert_eq!(s.rank_of(0), Some(1));
        // Frozen after finishing
        assert_eq!(s.update(0, 0.5, 7.0), None);
        assert_eq!(s.entry(0).and_then(|e| e.finished_at), Some(6.0));

        s.reset(|_| 0.1);
        assert!(s.entries.iter().all(|e| e.finished_at.is_none()));
    }

    #[test]
    fn test_unknown_vehicle_ignored() {
        let mut s = Standings::new(3);
        assert_eq!(s.update(42, 0.5, 0.0), None);
        assert_eq!(s.rank_of(42), None);
    }
}
