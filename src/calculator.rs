// Derived metrics: percentages from counters and per-entity delta tracking.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Clamp a percentage into [0, 100]. NaN becomes 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// `used / total` as a percentage; a zero total is 0%, not a fault.
pub fn ratio_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    clamp_percent(used as f64 / total as f64 * 100.0)
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

/// Compact uptime text: `"2d 3h"`, `"5h 12m"` or `"7m"`.
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let days = secs / 86_400;
    let hours = (secs / 3_600) % 24;
    let minutes = (secs / 60) % 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// One cumulative CPU reading for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSample {
    /// Entity CPU time, cumulative.
    pub cpu_total: u64,
    /// Host CPU time, cumulative.
    pub system: u64,
}

/// CPU% from two cumulative readings. Non-positive deltas give 0.
pub fn cpu_percent_between(prev: CounterSample, cur: CounterSample, num_cpus: u32) -> f64 {
    let cpu_delta = cur.cpu_total as i128 - prev.cpu_total as i128;
    let sys_delta = cur.system as i128 - prev.system as i128;
    if cpu_delta <= 0 || sys_delta <= 0 {
        return 0.0;
    }
    let cpus = num_cpus.max(1) as f64;
    clamp_percent(cpu_delta as f64 / sys_delta as f64 * cpus * 100.0)
}

/// Previous counter reading per entity (container id).
#[derive(Debug, Default)]
pub struct DeltaState {
    previous: HashMap<String, CounterSample>,
}

impl DeltaState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `cur` as the new baseline for `id` and return the CPU% since
    /// the previous baseline. The first observation of an entity yields 0.
    /// A reading older than the stored baseline (host counter behind it)
    /// yields 0 and leaves the baseline in place.
    pub fn observe(&mut self, id: &str, cur: CounterSample, num_cpus: u32) -> f64 {
        match self.previous.get_mut(id) {
            Some(prev) if cur.system < prev.system => 0.0,
            Some(prev) => {
                let pct = cpu_percent_between(*prev, cur, num_cpus);
                *prev = cur;
                pct
            }
            None => {
                self.previous.insert(id.to_string(), cur);
                0.0
            }
        }
    }

    /// Drop baselines for entities not in `present`; returns how many were removed.
    pub fn retain_present(&mut self, present: &HashSet<String>) -> usize {
        let before = self.previous.len();
        self.previous.retain(|id, _| present.contains(id));
        before - self.previous.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.previous.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cpu_total: u64, system: u64) -> CounterSample {
        CounterSample { cpu_total, system }
    }

    #[test]
    fn clamp_percent_bounds_and_nan() {
        assert_eq!(clamp_percent(-3.0), 0.0);
        assert_eq!(clamp_percent(250.0), 100.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
        assert_eq!(clamp_percent(42.5), 42.5);
    }

    #[test]
    fn ratio_percent_zero_total_is_zero() {
        assert_eq!(ratio_percent(10, 0), 0.0);
        assert_eq!(ratio_percent(25, 100), 25.0);
        assert_eq!(ratio_percent(200, 100), 100.0);
    }

    #[test]
    fn cpu_percent_between_computes_scaled_ratio() {
        // (100M-50M)/(1000M-500M) * 2 * 100 = 20
        let pct = cpu_percent_between(
            sample(50_000_000, 500_000_000),
            sample(100_000_000, 1_000_000_000),
            2,
        );
        assert!((pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn cpu_percent_between_non_positive_deltas_are_zero() {
        assert_eq!(cpu_percent_between(sample(50, 500), sample(100, 500), 2), 0.0);
        assert_eq!(cpu_percent_between(sample(50, 500), sample(50, 900), 2), 0.0);
        // counter reset after a restart
        assert_eq!(cpu_percent_between(sample(900, 500), sample(10, 900), 2), 0.0);
        assert_eq!(cpu_percent_between(sample(50, 900), sample(100, 500), 2), 0.0);
    }

    #[test]
    fn cpu_percent_between_is_clamped() {
        let pct = cpu_percent_between(sample(0, 0), sample(1000, 100), 8);
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn first_observation_is_zero_and_records_baseline() {
        let mut state = DeltaState::new();
        assert_eq!(state.observe("abc", sample(100, 1000), 4), 0.0);
        assert!(state.contains("abc"));
        let pct = state.observe("abc", sample(150, 2000), 4);
        assert!((pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn stale_reading_does_not_rewind_baseline() {
        let mut state = DeltaState::new();
        state.observe("abc", sample(100, 1000), 4);
        state.observe("abc", sample(150, 2000), 4);
        // fetched before the previous reading but applied after it
        assert_eq!(state.observe("abc", sample(120, 1500), 4), 0.0);
        let pct = state.observe("abc", sample(200, 3000), 4);
        assert!((pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn retain_present_prunes_vanished_entities() {
        let mut state = DeltaState::new();
        state.observe("a", sample(1, 1), 1);
        state.observe("b", sample(1, 1), 1);
        let present: HashSet<String> = ["a".to_string()].into_iter().collect();
        assert_eq!(state.retain_present(&present), 1);
        assert!(state.contains("a"));
        assert!(!state.contains("b"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn format_uptime_picks_largest_units() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0m");
        assert_eq!(format_uptime(Duration::from_secs(7 * 60)), "7m");
        assert_eq!(format_uptime(Duration::from_secs(5 * 3600 + 12 * 60)), "5h 12m");
        assert_eq!(format_uptime(Duration::from_secs(2 * 86_400 + 3 * 3600)), "2d 3h");
    }
}
