//! Chip distribution analysis.
//!
//! Buckets the session's traded volume by price into a holding histogram
//! — a proxy for where holders' cost bases cluster. Unlike the cost
//! calculator this operates on the raw tick list, not on synthetic
//! orders: the chip distribution measures the whole market's turnover,
//! and its peaks are used to cross-validate the major-capital cost
//! estimate.
//!
//! Operations: build the histogram, locate peaks, derive support and
//! resistance around the session close, measure concentration, and
//! validate a cost estimate against the top peak.

use crate::config::AnalysisConfig;
use crate::types::Tick;
use serde::{Deserialize, Serialize};

/// Relative center shift below which a migration counts as stable.
const MIGRATION_STABLE_BAND: f64 = 0.01;

/// Price-bucketed holding histogram.
///
/// Bucket centers are equally spaced; all counts are non-negative. A
/// session trading at a single price collapses to one bucket of zero
/// width.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChipDistribution {
    centers: Vec<f64>,
    volumes: Vec<u64>,
    step: f64,
}

/// One histogram peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChipPeak {
    /// Bucket center price.
    pub price: f64,
    /// Cumulative volume in the bucket.
    pub volume: u64,
}

/// Support and resistance levels around a reference price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SupportResistance {
    /// Highest-volume bucket at or below the reference, if any.
    pub support: Option<f64>,
    /// Highest-volume bucket strictly above the reference, if any.
    pub resistance: Option<f64>,
}

/// Outcome of validating the cost estimate against the chip peaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    /// The estimate is compatible with where shares actually reside (or
    /// there is no evidence to contradict it).
    Valid,
    /// The estimate sits too far from the dominant peak to be a useful
    /// cost-basis proxy.
    Invalid,
}

/// Direction of the chip center of gravity between two sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationDirection {
    Upward,
    Downward,
    Stable,
}

/// Shift of the holding distribution between two sessions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChipMigration {
    pub old_center: f64,
    pub new_center: f64,
    /// Relative center shift, `(new − old) / old`.
    pub ratio: f64,
    pub direction: MigrationDirection,
}

/// Result of building a distribution, with the count of skipped ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionBuild {
    pub distribution: ChipDistribution,
    /// Ticks without a positive price and volume, excluded from the
    /// histogram.
    pub skipped_ticks: u64,
}

impl ChipDistribution {
    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Whether the distribution has no buckets.
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Bucket width.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Iterate `(center, volume)` pairs in ascending price order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.centers.iter().copied().zip(self.volumes.iter().copied())
    }

    /// Total volume across all buckets.
    pub fn total_volume(&self) -> u64 {
        self.volumes.iter().sum()
    }

    /// Volume-weighted center of gravity, 0 when empty.
    pub fn center_price(&self) -> f64 {
        let total = self.total_volume();
        if total == 0 {
            return 0.0;
        }
        let weighted: f64 = self
            .iter()
            .map(|(center, volume)| center * volume as f64)
            .sum();
        weighted / total as f64
    }
}

/// Analyzes the price-bucketed holding structure of a session.
#[derive(Debug, Clone)]
pub struct ChipAnalyzer {
    price_bins: usize,
    peak_top_n: usize,
    concentration_top_fraction: f64,
    validation_distance: f64,
}

impl ChipAnalyzer {
    /// Create an analyzer with explicit parameters.
    pub fn new(
        price_bins: usize,
        peak_top_n: usize,
        concentration_top_fraction: f64,
        validation_distance: f64,
    ) -> Self {
        Self {
            price_bins: price_bins.max(1),
            peak_top_n,
            concentration_top_fraction,
            validation_distance,
        }
    }

    /// Create an analyzer from an analysis configuration.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.price_bins,
            config.peak_top_n,
            config.concentration_top_fraction,
            config.validation_distance,
        )
    }

    /// Build the holding histogram from a session's raw ticks.
    ///
    /// Ticks without a positive price and volume are skipped and counted;
    /// they are the malformed mass the classifier tags as noise.
    pub fn build_distribution(&self, ticks: &[Tick]) -> DistributionBuild {
        let mut skipped = 0u64;
        let mut min_price = f64::INFINITY;
        let mut max_price = f64::NEG_INFINITY;
        for tick in ticks {
            if tick.price <= 0.0 || tick.volume == 0 {
                skipped += 1;
                continue;
            }
            min_price = min_price.min(tick.price);
            max_price = max_price.max(tick.price);
        }

        if min_price > max_price {
            return DistributionBuild {
                distribution: ChipDistribution::default(),
                skipped_ticks: skipped,
            };
        }

        // Degenerate session: everything traded at one price.
        if max_price == min_price {
            let volume: u64 = ticks
                .iter()
                .filter(|t| t.price > 0.0 && t.volume > 0)
                .map(|t| t.volume)
                .sum();
            return DistributionBuild {
                distribution: ChipDistribution {
                    centers: vec![min_price],
                    volumes: vec![volume],
                    step: 0.0,
                },
                skipped_ticks: skipped,
            };
        }

        let step = (max_price - min_price) / self.price_bins as f64;
        let centers = (0..self.price_bins)
            .map(|i| min_price + (i as f64 + 0.5) * step)
            .collect();
        let mut volumes = vec![0u64; self.price_bins];

        for tick in ticks {
            if tick.price <= 0.0 || tick.volume == 0 {
                continue;
            }
            let index = ((tick.price - min_price) / step) as usize;
            let index = index.min(self.price_bins - 1);
            volumes[index] += tick.volume;
        }

        DistributionBuild {
            distribution: ChipDistribution {
                centers,
                volumes,
                step,
            },
            skipped_ticks: skipped,
        }
    }

    /// Top buckets by volume, ties broken by lower price.
    pub fn peaks(&self, distribution: &ChipDistribution) -> Vec<ChipPeak> {
        let mut buckets: Vec<ChipPeak> = distribution
            .iter()
            .filter(|&(_, volume)| volume > 0)
            .map(|(price, volume)| ChipPeak { price, volume })
            .collect();
        buckets.sort_by(|a, b| {
            b.volume
                .cmp(&a.volume)
                .then(a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal))
        });
        buckets.truncate(self.peak_top_n);
        buckets
    }

    /// Support and resistance around a reference price (usually the
    /// session close).
    pub fn support_resistance(
        &self,
        distribution: &ChipDistribution,
        reference_price: f64,
    ) -> SupportResistance {
        let mut support: Option<ChipPeak> = None;
        let mut resistance: Option<ChipPeak> = None;

        for (price, volume) in distribution.iter() {
            if volume == 0 {
                continue;
            }
            let candidate = ChipPeak { price, volume };
            if price <= reference_price {
                // Ascending scan plus strict greater-than keeps the
                // lowest-priced bucket on volume ties.
                if support.map_or(true, |best| volume > best.volume) {
                    support = Some(candidate);
                }
            } else if resistance.map_or(true, |best| volume > best.volume) {
                resistance = Some(candidate);
            }
        }

        SupportResistance {
            support: support.map(|p| p.price),
            resistance: resistance.map(|p| p.price),
        }
    }

    /// Fraction of total volume held by the top fifth of buckets (by
    /// default), 0 when the distribution is empty.
    pub fn concentration_ratio(&self, distribution: &ChipDistribution) -> f64 {
        let total = distribution.total_volume();
        if total == 0 {
            return 0.0;
        }

        let mut volumes: Vec<u64> = distribution.volumes.clone();
        volumes.sort_unstable_by(|a, b| b.cmp(a));

        let top_count = ((distribution.len() as f64 * self.concentration_top_fraction) as usize)
            .max(1);
        let top_volume: u64 = volumes.iter().take(top_count).sum();
        top_volume as f64 / total as f64
    }

    /// Validate a cost estimate against the dominant chip peak.
    ///
    /// An empty distribution (or one without peaks) yields `Valid`: there
    /// is no evidence to contradict the estimate.
    pub fn validate_cost(&self, weighted_cost: f64, distribution: &ChipDistribution) -> ValidationStatus {
        if distribution.is_empty() {
            return ValidationStatus::Valid;
        }
        let peaks = self.peaks(distribution);
        let Some(peak) = peaks.first() else {
            return ValidationStatus::Valid;
        };

        let distance = (weighted_cost - peak.price).abs() / peak.price;
        if distance > self.validation_distance {
            log::warn!(
                "cost {:.2} sits {:.1}% from chip peak {:.2}; marking estimate invalid",
                weighted_cost,
                distance * 100.0,
                peak.price
            );
            ValidationStatus::Invalid
        } else {
            ValidationStatus::Valid
        }
    }
}

impl ChipMigration {
    /// Measure the center-of-gravity shift between two distributions.
    pub fn between(old: &ChipDistribution, new: &ChipDistribution) -> Self {
        let old_center = old.center_price();
        let new_center = new.center_price();
        let ratio = if old_center > 0.0 {
            (new_center - old_center) / old_center
        } else {
            0.0
        };
        let direction = if ratio.abs() < MIGRATION_STABLE_BAND {
            MigrationDirection::Stable
        } else if ratio > 0.0 {
            MigrationDirection::Upward
        } else {
            MigrationDirection::Downward
        };
        Self {
            old_center,
            new_center,
            ratio,
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn tick(price: f64, volume: u64) -> Tick {
        Tick::new(0, "600000", price, volume, price * volume as f64, Direction::Buy)
    }

    fn analyzer() -> ChipAnalyzer {
        ChipAnalyzer::new(100, 3, 0.2, 0.20)
    }

    #[test]
    fn test_empty_ticks_empty_distribution() {
        let build = analyzer().build_distribution(&[]);
        assert!(build.distribution.is_empty());
        assert_eq!(build.skipped_ticks, 0);
    }

    #[test]
    fn test_single_price_collapses_to_one_bucket() {
        let ticks = vec![tick(10.0, 100), tick(10.0, 200)];
        let build = analyzer().build_distribution(&ticks);
        assert_eq!(build.distribution.len(), 1);
        assert_eq!(build.distribution.step(), 0.0);
        let (center, volume) = build.distribution.iter().next().unwrap();
        assert_eq!(center, 10.0);
        assert_eq!(volume, 300);
    }

    #[test]
    fn test_buckets_cover_price_range() {
        let ticks = vec![tick(10.0, 100), tick(11.0, 100), tick(12.0, 100)];
        let build = analyzer().build_distribution(&ticks);
        let dist = &build.distribution;
        assert_eq!(dist.len(), 100);
        assert!((dist.step() - 0.02).abs() < 1e-12);
        assert_eq!(dist.total_volume(), 300);
        // Max price lands in the last bucket via the clamp.
        let (last_center, last_volume) = dist.iter().last().unwrap();
        assert!((last_center - 11.99).abs() < 1e-9);
        assert_eq!(last_volume, 100);
    }

    #[test]
    fn test_malformed_ticks_are_skipped() {
        let mut bad = tick(0.0, 100);
        bad.amount = 0.0;
        let ticks = vec![tick(10.0, 100), bad, tick(11.0, 0)];
        let build = analyzer().build_distribution(&ticks);
        assert_eq!(build.skipped_ticks, 2);
        assert_eq!(build.distribution.total_volume(), 100);
    }

    #[test]
    fn test_peaks_ordered_with_lower_price_tiebreak() {
        let ticks = vec![
            tick(10.0, 100),
            tick(11.0, 500),
            tick(12.0, 500),
            tick(13.0, 50),
        ];
        let build = analyzer().build_distribution(&ticks);
        let peaks = analyzer().peaks(&build.distribution);
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[0].volume, 500);
        assert_eq!(peaks[1].volume, 500);
        // Volume tie resolves to the lower price first.
        assert!(peaks[0].price < peaks[1].price);
        assert_eq!(peaks[2].volume, 100);
    }

    #[test]
    fn test_support_resistance_around_close() {
        let ticks = vec![
            tick(10.0, 800),
            tick(10.5, 200),
            tick(11.0, 100),
            tick(11.5, 600),
        ];
        let build = analyzer().build_distribution(&ticks);
        let sr = analyzer().support_resistance(&build.distribution, 11.0);
        // Highest volume at or below 11.0 is the 10.0 bucket; above it,
        // the 11.5 bucket.
        let support = sr.support.unwrap();
        let resistance = sr.resistance.unwrap();
        assert!((support - 10.0).abs() < 0.02);
        assert!((resistance - 11.5).abs() < 0.02);
    }

    #[test]
    fn test_support_resistance_unset_sides() {
        let ticks = vec![tick(10.0, 100), tick(10.3, 100)];
        let build = analyzer().build_distribution(&ticks);
        // Reference below every bucket: no support exists.
        let sr = analyzer().support_resistance(&build.distribution, 9.0);
        assert!(sr.support.is_none());
        assert!(sr.resistance.is_some());
        // Reference above every bucket: no resistance exists.
        let sr = analyzer().support_resistance(&build.distribution, 20.0);
        assert!(sr.support.is_some());
        assert!(sr.resistance.is_none());
    }

    #[test]
    fn test_concentration_ratio_bounds() {
        let ticks: Vec<Tick> = (0..100).map(|i| tick(10.0 + i as f64 * 0.01, 100)).collect();
        let build = analyzer().build_distribution(&ticks);
        let uniform = analyzer().concentration_ratio(&build.distribution);
        assert!(uniform > 0.0 && uniform <= 1.0);

        // One dominant bucket pushes concentration toward 1.
        let mut ticks = ticks;
        ticks.push(tick(10.5, 1_000_000));
        let build = analyzer().build_distribution(&ticks);
        let concentrated = analyzer().concentration_ratio(&build.distribution);
        assert!(concentrated > uniform);
        assert!(concentrated <= 1.0);
    }

    #[test]
    fn test_concentration_of_empty_distribution() {
        assert_eq!(analyzer().concentration_ratio(&ChipDistribution::default()), 0.0);
    }

    #[test]
    fn test_validation_against_peak() {
        // Dominant peak far above the traded band.
        let mut ticks: Vec<Tick> = (0..100)
            .map(|i| tick(10.0 + (i % 6) as f64 * 0.01, 100))
            .collect();
        for _ in 0..50 {
            ticks.push(tick(13.0, 1_000));
        }
        let build = analyzer().build_distribution(&ticks);
        let peaks = analyzer().peaks(&build.distribution);
        assert!((peaks[0].price - 13.0).abs() < 0.05);

        // 10.02 vs ~13.0 is ~23% away: invalid.
        assert_eq!(
            analyzer().validate_cost(10.02, &build.distribution),
            ValidationStatus::Invalid
        );
        // A cost near the peak validates.
        assert_eq!(
            analyzer().validate_cost(12.5, &build.distribution),
            ValidationStatus::Valid
        );
    }

    #[test]
    fn test_validation_without_evidence() {
        assert_eq!(
            analyzer().validate_cost(10.0, &ChipDistribution::default()),
            ValidationStatus::Valid
        );
    }

    #[test]
    fn test_center_price() {
        let ticks = vec![tick(10.0, 100), tick(20.0, 100)];
        let build = ChipAnalyzer::new(2, 3, 0.2, 0.2).build_distribution(&ticks);
        // Two buckets at 12.5 and 17.5 with equal volume: center 15.
        assert!((build.distribution.center_price() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_chip_migration() {
        let old = ChipAnalyzer::new(2, 3, 0.2, 0.2)
            .build_distribution(&[tick(10.0, 100), tick(10.1, 100)])
            .distribution;
        let new = ChipAnalyzer::new(2, 3, 0.2, 0.2)
            .build_distribution(&[tick(11.0, 100), tick(11.1, 100)])
            .distribution;

        let migration = ChipMigration::between(&old, &new);
        assert_eq!(migration.direction, MigrationDirection::Upward);
        assert!(migration.ratio > 0.05);

        let stable = ChipMigration::between(&old, &old);
        assert_eq!(stable.direction, MigrationDirection::Stable);
        assert_eq!(stable.ratio, 0.0);
    }
}
