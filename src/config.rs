//! Analysis configuration management.
//!
//! Unified configuration for the whole pipeline: classifier thresholds,
//! synthetic-order window, chip-distribution parameters and weight
//! overrides, with serialization support for reproducible runs.
//!
//! Configuration is read once at startup and immutable thereafter; an
//! invalid configuration is the only fatal condition in the crate.
//!
//! # Example
//!
//! ```ignore
//! use capital_tracker::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::default()
//!     .with_window_sec(60)
//!     .with_synthetic_threshold(1_000_000.0);
//! config.validate().expect("invalid analysis config");
//! config.save_toml("analysis.toml")?;
//! ```

use crate::cost::WeightMap;
use std::fs;
use std::path::Path;

/// Unified pipeline configuration.
///
/// All thresholds are event-time or currency-unit based; nothing here
/// depends on the wall clock.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Synthetic-order rolling window, seconds.
    pub window_sec: u64,

    /// Minimum cumulative amount (currency) for a buffer to emit a
    /// synthetic order.
    pub synthetic_threshold: f64,

    /// Tick amount (currency) at or above which a print is "large".
    pub big_order_threshold: f64,

    /// Resting quote volume (lots) qualifying a level as a wall.
    pub wall_threshold: u64,

    /// Moving-average windows over daily weighted cost.
    pub ma_periods: Vec<usize>,

    /// Chip-distribution bucket count.
    pub price_bins: usize,

    /// Cost-to-peak relative distance above which the cost estimate is
    /// marked invalid.
    pub validation_distance: f64,

    /// Number of chip peaks reported.
    pub peak_top_n: usize,

    /// Fraction of buckets counted as "top" for the concentration ratio.
    pub concentration_top_fraction: f64,

    /// TWAP detection: maximum variance of inter-tick intervals (s²).
    pub twap_interval_variance: f64,

    /// VWAP detection: maximum `variance(amounts) / mean(amounts)`.
    ///
    /// Dimensionally this is not a true coefficient of variation, which
    /// is why the threshold lives in configuration rather than as a
    /// constant.
    pub vwap_amount_dispersion: f64,

    /// Relative tolerance for the `amount ≈ price × volume × lot_size`
    /// consistency check.
    pub amount_tolerance: f64,

    /// Shares per lot, used only by the amount consistency check.
    pub lot_size: f64,

    /// Per-class weight overrides.
    pub weights: WeightMap,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_sec: 30,
            synthetic_threshold: 500_000.0,
            big_order_threshold: 100_000.0,
            wall_threshold: 10_000,
            ma_periods: vec![5, 10, 20],
            price_bins: 100,
            validation_distance: 0.20,
            peak_top_n: 3,
            concentration_top_fraction: 0.2,
            twap_interval_variance: 1.0,
            vwap_amount_dispersion: 0.3,
            amount_tolerance: 0.01,
            lot_size: 1.0,
            weights: WeightMap::default(),
        }
    }
}

impl AnalysisConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the synthetic-order window.
    pub fn with_window_sec(mut self, window_sec: u64) -> Self {
        self.window_sec = window_sec;
        self
    }

    /// Set the synthetic-order emission threshold.
    pub fn with_synthetic_threshold(mut self, threshold: f64) -> Self {
        self.synthetic_threshold = threshold;
        self
    }

    /// Set the large-print classification threshold.
    pub fn with_big_order_threshold(mut self, threshold: f64) -> Self {
        self.big_order_threshold = threshold;
        self
    }

    /// Set the wall volume threshold.
    pub fn with_wall_threshold(mut self, threshold: u64) -> Self {
        self.wall_threshold = threshold;
        self
    }

    /// Set the chip-distribution bucket count.
    pub fn with_price_bins(mut self, bins: usize) -> Self {
        self.price_bins = bins;
        self
    }

    /// Override the weight map.
    pub fn with_weights(mut self, weights: WeightMap) -> Self {
        self.weights = weights;
        self
    }

    /// Validate the configuration.
    ///
    /// Returns `Ok(())` if valid, `Err(msg)` otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_sec == 0 {
            return Err("window_sec must be > 0".to_string());
        }
        if self.synthetic_threshold <= 0.0 {
            return Err("synthetic_threshold must be > 0".to_string());
        }
        if self.big_order_threshold <= 0.0 {
            return Err("big_order_threshold must be > 0".to_string());
        }
        if self.big_order_threshold > self.synthetic_threshold {
            return Err("big_order_threshold must be <= synthetic_threshold".to_string());
        }
        if self.ma_periods.is_empty() {
            return Err("ma_periods must not be empty".to_string());
        }
        if self.ma_periods.iter().any(|&p| p == 0) {
            return Err("ma_periods entries must be > 0".to_string());
        }
        if self.price_bins == 0 {
            return Err("price_bins must be > 0".to_string());
        }
        if self.validation_distance <= 0.0 {
            return Err("validation_distance must be > 0".to_string());
        }
        if self.peak_top_n == 0 {
            return Err("peak_top_n must be > 0".to_string());
        }
        if self.concentration_top_fraction <= 0.0 || self.concentration_top_fraction > 1.0 {
            return Err("concentration_top_fraction must be in (0, 1]".to_string());
        }
        if self.twap_interval_variance <= 0.0 {
            return Err("twap_interval_variance must be > 0".to_string());
        }
        if self.vwap_amount_dispersion <= 0.0 {
            return Err("vwap_amount_dispersion must be > 0".to_string());
        }
        if self.amount_tolerance < 0.0 {
            return Err("amount_tolerance must be >= 0".to_string());
        }
        if self.lot_size <= 0.0 {
            return Err("lot_size must be > 0".to_string());
        }
        self.weights.validate()?;
        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load configuration from a TOML file, validating it.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: AnalysisConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load configuration from a JSON file, validating it.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rolling window in milliseconds (event time).
    pub(crate) fn window_ms(&self) -> i64 {
        self.window_sec as i64 * 1_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_thresholds() {
        let mut config = AnalysisConfig::default();
        config.window_sec = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.synthetic_threshold = -1.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.big_order_threshold = 1_000_000.0; // above synthetic_threshold
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.ma_periods = vec![];
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.concentration_top_fraction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_methods() {
        let config = AnalysisConfig::new()
            .with_window_sec(60)
            .with_synthetic_threshold(1_000_000.0)
            .with_price_bins(50);
        assert_eq!(config.window_sec, 60);
        assert_eq!(config.synthetic_threshold, 1_000_000.0);
        assert_eq!(config.price_bins, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_ms() {
        let config = AnalysisConfig::default().with_window_sec(30);
        assert_eq!(config.window_ms(), 30_000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AnalysisConfig = toml::from_str("window_sec = 45\n").unwrap();
        assert_eq!(config.window_sec, 45);
        assert_eq!(config.price_bins, 100);
        assert!(config.validate().is_ok());
    }
}
