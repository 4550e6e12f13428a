//! Corpus selection with adaptive threshold relaxation

use voxcorpus_types::{AppliedThreshold, ScoredSegment, SelectionPolicy};

/// Result of one selection pass
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    /// Selected segments, quality descending. Not chronological.
    pub selected: Vec<ScoredSegment>,
    /// Threshold every selected segment satisfies
    pub threshold: AppliedThreshold,
    /// Segments that cleared the strict bar, before truncation
    pub strict_count: usize,
    /// Size of the pool offered to the selector
    pub pool_size: usize,
}

/// `p`-th percentile with linear interpolation between closest ranks
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Picks a target-sized, quality-ranked corpus from a scored pool
#[derive(Debug, Clone, Default)]
pub struct CorpusSelector {
    policy: SelectionPolicy,
}

impl CorpusSelector {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    /// Rank by quality, keep segments at or above the strict bar, and when
    /// that starves the target, fall back to the pool's
    /// `fallback_percentile` and re-filter the whole pool with it.
    pub fn select(&self, mut pool: Vec<ScoredSegment>) -> SelectionOutcome {
        let target = self.policy.target_corpus_size;
        let strict = self.policy.min_quality_score;
        let pool_size = pool.len();

        // Stable, so equal scores keep locator order
        pool.sort_by(|a, b| b.quality_score().total_cmp(&a.quality_score()));

        let strict_count = pool
            .iter()
            .filter(|s| s.quality_score() >= strict)
            .count();

        let threshold = if strict_count >= target {
            AppliedThreshold::Strict { threshold: strict }
        } else {
            let scores: Vec<f64> = pool.iter().map(ScoredSegment::quality_score).collect();
            match percentile(&scores, self.policy.fallback_percentile) {
                Some(threshold) => {
                    tracing::info!(
                        "Only {} of {} segments meet quality {:.3}; relaxing to {:.3} (p{})",
                        strict_count,
                        pool_size,
                        strict,
                        threshold,
                        self.policy.fallback_percentile
                    );
                    AppliedThreshold::Relaxed {
                        threshold,
                        percentile: self.policy.fallback_percentile,
                    }
                }
                None => AppliedThreshold::Strict { threshold: strict },
            }
        };

        let bar = threshold.value();
        let selected: Vec<ScoredSegment> = pool
            .into_iter()
            .filter(|s| s.quality_score() >= bar)
            .take(target)
            .collect();

        SelectionOutcome {
            selected,
            threshold,
            strict_count,
            pool_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxcorpus_types::{CandidateSegment, QualityMetrics};

    fn scored(index: usize, quality_score: f64) -> ScoredSegment {
        ScoredSegment {
            segment: CandidateSegment {
                index,
                start_time: index as f64,
                end_time: index as f64 + 1.0,
                duration: 1.0,
                transcript: format!("Segment number {} is here.", index),
                samples: Vec::new(),
                sample_rate: 16000,
            },
            metrics: QualityMetrics {
                quality_score,
                ..QualityMetrics::sentinel()
            },
            assessment_failed: false,
        }
    }

    fn policy(min_quality_score: f64, target_corpus_size: usize) -> SelectionPolicy {
        SelectionPolicy {
            min_quality_score,
            target_corpus_size,
            ..Default::default()
        }
    }

    fn is_descending(segments: &[ScoredSegment]) -> bool {
        segments
            .windows(2)
            .all(|w| w[0].quality_score() >= w[1].quality_score())
    }

    #[test]
    fn test_percentile_matches_linear_interpolation() {
        assert_eq!(percentile(&[], 25.0), None);
        assert_eq!(percentile(&[3.0], 25.0), Some(3.0));
        assert_eq!(percentile(&[4.0, 1.0, 3.0, 2.0], 25.0), Some(1.75));
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 50.0), Some(3.0));
        assert_eq!(percentile(&[1.0, 2.0], 100.0), Some(2.0));
    }

    #[test]
    fn test_truncates_to_target_in_quality_order() {
        let pool: Vec<ScoredSegment> = (0..60).map(|i| scored(i, 0.3 + (i % 7) as f64 * 0.05)).collect();
        let outcome = CorpusSelector::new(policy(0.05, 50)).select(pool);

        assert_eq!(outcome.selected.len(), 50);
        assert_eq!(outcome.pool_size, 60);
        assert!(is_descending(&outcome.selected));
        assert_eq!(outcome.threshold, AppliedThreshold::Strict { threshold: 0.05 });
    }

    #[test]
    fn test_small_pool_keeps_upper_quantile() {
        assert_eq!(CorpusSelector::default().select(vec![scored(0, 0.2)]).selected.len(), 1);

        let flat: Vec<ScoredSegment> = (0..5).map(|i| scored(i, 0.4)).collect();
        assert_eq!(CorpusSelector::default().select(flat).selected.len(), 5);

        // p25 of 0.1..0.4 is 0.175, so only the lowest score is dropped
        let pool: Vec<ScoredSegment> = (0..4).map(|i| scored(i, 0.1 * i as f64 + 0.1)).collect();
        let outcome = CorpusSelector::new(policy(0.05, 50)).select(pool);
        assert_eq!(outcome.selected.len(), 3);
        assert!(is_descending(&outcome.selected));

        assert!(CorpusSelector::default().select(Vec::new()).selected.is_empty());
    }

    #[test]
    fn test_relaxes_to_pool_percentile() {
        // 3 of 10 clear the strict bar; p25 of the pool is 0.2025
        let scores = [0.9, 0.8, 0.7, 0.3, 0.25, 0.22, 0.21, 0.2, 0.1, 0.05];
        let pool: Vec<ScoredSegment> = scores
            .iter()
            .enumerate()
            .map(|(i, &q)| scored(i, q))
            .collect();
        let outcome = CorpusSelector::new(policy(0.6, 5)).select(pool);

        assert_eq!(outcome.strict_count, 3);
        match outcome.threshold {
            AppliedThreshold::Relaxed { threshold, percentile } => {
                assert!((threshold - 0.2025).abs() < 1e-12);
                assert_eq!(percentile, 25.0);
            }
            other => panic!("expected relaxed threshold, got {:?}", other),
        }
        assert_eq!(outcome.selected.len(), 5);
        assert!(is_descending(&outcome.selected));
        assert!(outcome
            .selected
            .iter()
            .all(|s| s.quality_score() >= outcome.threshold.value()));
    }

    #[test]
    fn test_small_pool_is_cut_at_percentile() {
        // All 10 clear the strict bar but the target is not met; p25 is 0.4125
        let scores = [0.3, 0.35, 0.4, 0.45, 0.5, 0.6, 0.7, 0.8, 0.85, 0.9];
        let pool: Vec<ScoredSegment> = scores
            .iter()
            .enumerate()
            .map(|(i, &q)| scored(i, q))
            .collect();
        let outcome = CorpusSelector::default().select(pool);

        match outcome.threshold {
            AppliedThreshold::Relaxed { threshold, .. } => {
                assert!((threshold - 0.4125).abs() < 1e-9, "threshold = {}", threshold);
            }
            other => panic!("expected relaxed threshold, got {:?}", other),
        }
        assert_eq!(outcome.strict_count, 10);
        assert_eq!(outcome.selected.len(), 7);
        assert!(outcome.selected.iter().all(|s| s.quality_score() >= 0.4125));
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let pool = vec![scored(0, 0.5), scored(1, 0.7), scored(2, 0.5), scored(3, 0.5)];
        let outcome = CorpusSelector::new(policy(0.05, 3)).select(pool);
        let indices: Vec<usize> = outcome.selected.iter().map(|s| s.segment.index).collect();
        assert_eq!(indices, vec![1, 0, 2]);
    }
}
