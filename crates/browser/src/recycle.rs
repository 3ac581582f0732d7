//! Recycling score (spec §4.1 "Recycling decision"): a weighted combination
//! of time, usage, health and resource signals decides which idle instances
//! get destroyed and relaunched. Tunable, not a contract (spec §9 "the
//! recycling weights and recyclingThreshold=80 are empirical").

use std::time::Duration;

/// Weights applied to the four signal scores, each normalized to `0..=100`
/// before combining. Defaults match spec §4.1 exactly.
#[derive(Debug, Clone, Copy)]
pub struct RecycleWeights {
    pub time: f64,
    pub usage: f64,
    pub health: f64,
    pub resources: f64,
}

impl Default for RecycleWeights {
    fn default() -> Self {
        Self {
            time: 0.25,
            usage: 0.25,
            health: 0.30,
            resources: 0.20,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecyclePolicy {
    pub weights: RecycleWeights,
    pub threshold: f64,
    pub cooldown: Duration,
    pub batch_cap: usize,
    pub max_age: Duration,
    pub recycle_after_uses: u32,
}

impl Default for RecyclePolicy {
    fn default() -> Self {
        Self {
            weights: RecycleWeights::default(),
            threshold: 80.0,
            cooldown: Duration::from_secs(300),
            batch_cap: 3,
            max_age: Duration::from_secs(3600),
            recycle_after_uses: 1_000,
        }
    }
}

/// Raw signal inputs for one instance, sampled just before scoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecycleSignals {
    pub age: Duration,
    pub idle_for: Duration,
    pub use_count: u32,
    pub page_count: usize,
    pub consecutive_failures: u32,
    pub memory_percent: Option<f32>,
}

/// Combines `signals` into a single `0..=100` recycling score per the
/// configured weights. Higher means "more in need of recycling".
pub fn score(signals: &RecycleSignals, policy: &RecyclePolicy) -> f64 {
    let time_score = normalize_ratio(signals.age.as_secs_f64(), policy.max_age.as_secs_f64());
    let usage_score = normalize_ratio(
        f64::from(signals.use_count),
        f64::from(policy.recycle_after_uses),
    );
    let health_score = (f64::from(signals.consecutive_failures) * 20.0).min(100.0);
    let resource_score = f64::from(signals.memory_percent.unwrap_or(0.0));

    let w = policy.weights;
    (time_score * w.time
        + usage_score * w.usage
        + health_score * w.health
        + resource_score * w.resources)
        .clamp(0.0, 100.0)
}

fn normalize_ratio(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    (value / max * 100.0).clamp(0.0, 100.0)
}

/// Whether an instance at `score` should be recycled right now, given how
/// long it's been since its last recycle.
pub fn should_recycle(current_score: f64, since_last_recycle: Duration, policy: &RecyclePolicy) -> bool {
    current_score >= policy.threshold && since_last_recycle >= policy.cooldown
}

/// Picks at most `policy.batch_cap` candidates from `scored`, highest score
/// first, to bound how many instances get torn down in one sweep (spec
/// §4.1 "batch size capped").
pub fn select_batch<'a>(
    scored: impl IntoIterator<Item = (&'a str, f64)>,
    policy: &RecyclePolicy,
) -> Vec<&'a str> {
    let mut candidates: Vec<(&str, f64)> = scored
        .into_iter()
        .filter(|(_, s)| *s >= policy.threshold)
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    candidates
        .into_iter()
        .take(policy.batch_cap)
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_healthy_instance_scores_low() {
        let policy = RecyclePolicy::default();
        let signals = RecycleSignals {
            age: Duration::from_secs(10),
            idle_for: Duration::from_secs(1),
            use_count: 1,
            page_count: 1,
            consecutive_failures: 0,
            memory_percent: Some(5.0),
        };
        assert!(score(&signals, &policy) < 10.0);
    }

    #[test]
    fn old_heavily_used_unhealthy_instance_crosses_threshold() {
        let policy = RecyclePolicy::default();
        let signals = RecycleSignals {
            age: Duration::from_secs(3600),
            idle_for: Duration::from_secs(60),
            use_count: 1_000,
            page_count: 8,
            consecutive_failures: 5,
            memory_percent: Some(90.0),
        };
        let s = score(&signals, &policy);
        assert!(s >= policy.threshold, "score was {s}");
    }

    #[test]
    fn cooldown_blocks_recycle_even_at_high_score() {
        let policy = RecyclePolicy::default();
        assert!(!should_recycle(95.0, Duration::from_secs(10), &policy));
        assert!(should_recycle(95.0, Duration::from_secs(301), &policy));
    }

    #[test]
    fn batch_selection_is_capped_and_sorted_by_score() {
        let policy = RecyclePolicy::default();
        let scored = vec![("a", 81.0), ("b", 95.0), ("c", 82.0), ("d", 50.0)];
        let batch = select_batch(scored, &policy);
        assert_eq!(batch, vec!["b", "c", "a"]);
    }
}
