//! Per-(symbol, date) session driver.
//!
//! Composes the four pipeline stages over one timestamp-ordered tick
//! stream and produces a single [`DayResult`]:
//!
//! ```text
//! ticks ──► TickClassifier ──► SyntheticOrderBuilder ──► orders
//!   │                                                      │
//!   │                                                      ▼
//!   │                                              CostCalculator
//!   │                                                      │
//!   └──────────────► ChipAnalyzer ◄────── weighted_cost ───┘
//!                         │
//!                         ▼
//!                     DayResult
//! ```
//!
//! The driver is single-threaded and event-driven; replaying the same
//! tick list twice yields identical results. Cross-day state (the daily
//! cost history behind the moving averages) is handed in by the caller,
//! which keeps every session independently replayable.

use crate::chip::{ChipAnalyzer, ValidationStatus};
use crate::classifier::TickClassifier;
use crate::config::AnalysisConfig;
use crate::cost::{CostCalculator, WeightMap};
use crate::error::{AnalysisError, Result};
use crate::synthetic::{SyntheticOrder, SyntheticOrderBuilder};
use crate::types::Tick;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-session data quality counters.
///
/// Degenerate inputs never abort a session; they are tallied here and
/// surfaced on the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityCounters {
    /// Structurally malformed ticks (tagged `NOISE`).
    pub malformed_ticks: u64,

    /// Large directional ticks classified without quote context.
    pub missing_quote_ticks: u64,

    /// Ticks whose amount disagrees with `price × volume × lot_size`
    /// beyond the configured tolerance.
    pub amount_mismatch_ticks: u64,

    /// Ticks excluded from the chip distribution.
    pub skipped_chip_ticks: u64,
}

/// Per-(symbol, date) analysis output.
///
/// Assembled once per session and handed to external storage/rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayResult {
    pub symbol: String,
    pub date: NaiveDate,

    // Per-intent flow slices (unweighted)
    pub aggressive_buy_amount: f64,
    pub aggressive_sell_amount: f64,
    pub defensive_buy_amount: f64,
    pub defensive_sell_amount: f64,
    pub algo_buy_amount: f64,
    pub algo_sell_amount: f64,
    pub total_buy_amount: f64,
    pub total_sell_amount: f64,

    // Cost estimate
    pub weighted_cost: f64,
    pub cost_ma_5: f64,
    pub cost_ma_10: f64,
    pub cost_ma_20: f64,

    // Flow
    pub net_flow: f64,
    /// Whether `net_flow` was normalized by the float market cap.
    pub net_flow_normalized: bool,

    // Chip structure
    pub concentration_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chip_peak_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resistance_price: Option<f64>,
    pub validation_status: ValidationStatus,

    // Order statistics
    pub total_orders: usize,
    pub original_order_count: usize,
    pub algo_order_count: usize,

    pub quality: QualityCounters,
}

impl DayResult {
    /// Buy/sell amount ratio; infinite when only buys exist.
    pub fn buy_sell_ratio(&self) -> f64 {
        if self.total_sell_amount == 0.0 {
            return if self.total_buy_amount > 0.0 {
                f64::INFINITY
            } else {
                0.0
            };
        }
        self.total_buy_amount / self.total_sell_amount
    }

    /// Share of reconstructed buy flow that crossed the quote.
    pub fn aggressiveness_score(&self) -> f64 {
        if self.total_buy_amount == 0.0 {
            return 0.0;
        }
        self.aggressive_buy_amount / self.total_buy_amount
    }
}

/// Drives one symbol's session through the full pipeline.
///
/// Holds only immutable configuration; per-session state lives in the
/// builder created inside [`analyze_day`], so one analyzer can serve any
/// number of sessions (and be shared across threads in batch mode).
///
/// [`analyze_day`]: SessionAnalyzer::analyze_day
#[derive(Debug, Clone)]
pub struct SessionAnalyzer {
    config: AnalysisConfig,
    classifier: TickClassifier,
    cost: CostCalculator,
    chip: ChipAnalyzer,
}

impl SessionAnalyzer {
    /// Create an analyzer, validating the configuration.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate().map_err(AnalysisError::config)?;
        let classifier = TickClassifier::from_config(&config);
        let cost = CostCalculator::new(config.weights.clone());
        let chip = ChipAnalyzer::from_config(&config);
        Ok(Self {
            config,
            classifier,
            cost,
            chip,
        })
    }

    /// The configuration this analyzer runs with.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one session and return its result.
    ///
    /// `prior_costs` is the chronological daily-cost history, most recent
    /// day first, used for the moving averages. `float_market_cap`
    /// normalizes the net flow when known.
    ///
    /// This never fails: malformed ticks degrade to noise and are
    /// counted in [`DayResult::quality`].
    pub fn analyze_day(
        &self,
        symbol: &str,
        date: NaiveDate,
        ticks: &[Tick],
        prior_costs: &[f64],
        float_market_cap: Option<f64>,
    ) -> DayResult {
        let mut builder = SyntheticOrderBuilder::new(symbol, &self.config);
        let mut quality = QualityCounters::default();
        let mut orders: Vec<SyntheticOrder> = Vec::new();

        for tick in ticks {
            if tick.fault().is_some() {
                quality.malformed_ticks += 1;
            } else if !tick.amount_consistent(self.config.lot_size, self.config.amount_tolerance) {
                quality.amount_mismatch_ticks += 1;
            }

            let classification = self.classifier.classify(tick);
            if classification.quote_missing {
                quality.missing_quote_ticks += 1;
            }

            orders.extend(builder.feed(tick, classification.label));
        }
        orders.extend(builder.flush());

        let weighted_cost = self.cost.weighted_cost(&orders);
        let stats = self.cost.order_statistics(&orders);
        let flow = self.cost.net_flow(&orders, float_market_cap);

        let build = self.chip.build_distribution(ticks);
        quality.skipped_chip_ticks = build.skipped_ticks;
        let distribution = build.distribution;

        let peaks = self.chip.peaks(&distribution);
        let chip_peak_price = peaks.first().map(|p| p.price);
        let concentration_ratio = self.chip.concentration_ratio(&distribution);

        // Reference price for support/resistance is the session close.
        let close = ticks.iter().rev().find(|t| t.price > 0.0).map(|t| t.price);
        let sr = close
            .map(|close| self.chip.support_resistance(&distribution, close))
            .unwrap_or_default();

        // A session with no qualifying buy flow has nothing to validate.
        let validation_status = if weighted_cost > 0.0 {
            self.chip.validate_cost(weighted_cost, &distribution)
        } else {
            ValidationStatus::Valid
        };

        let history = cost_history(weighted_cost, prior_costs);
        let mut cost_ma_5 = 0.0;
        let mut cost_ma_10 = 0.0;
        let mut cost_ma_20 = 0.0;
        for &period in &self.config.ma_periods {
            let ma = CostCalculator::cost_ma(&history, period);
            match period {
                5 => cost_ma_5 = ma,
                10 => cost_ma_10 = ma,
                20 => cost_ma_20 = ma,
                _ => {}
            }
        }

        log::info!(
            "{symbol} {date}: {} ticks, {} orders, cost {:.2}, net flow {:.4}, validation {:?}",
            ticks.len(),
            stats.total_orders,
            weighted_cost,
            flow.value,
            validation_status
        );

        DayResult {
            symbol: symbol.to_string(),
            date,
            aggressive_buy_amount: stats.aggressive_buy_amount,
            aggressive_sell_amount: stats.aggressive_sell_amount,
            defensive_buy_amount: stats.defensive_buy_amount,
            defensive_sell_amount: stats.defensive_sell_amount,
            algo_buy_amount: stats.algo_buy_amount,
            algo_sell_amount: stats.algo_sell_amount,
            total_buy_amount: stats.total_buy_amount,
            total_sell_amount: stats.total_sell_amount,
            weighted_cost,
            cost_ma_5,
            cost_ma_10,
            cost_ma_20,
            net_flow: flow.value,
            net_flow_normalized: flow.normalized,
            concentration_ratio,
            chip_peak_price,
            support_price: sr.support,
            resistance_price: sr.resistance,
            validation_status,
            total_orders: stats.total_orders,
            original_order_count: stats.original_order_count,
            algo_order_count: stats.algo_order_count,
            quality,
        }
    }

    /// Analyze a chronological run of sessions for one symbol, threading
    /// the daily-cost history so the moving averages populate without an
    /// external store.
    ///
    /// Days are processed in ascending date order regardless of input
    /// order.
    pub fn analyze_period(
        &self,
        symbol: &str,
        days: &[(NaiveDate, Vec<Tick>)],
        float_market_cap: Option<f64>,
    ) -> Vec<DayResult> {
        let mut order: Vec<usize> = (0..days.len()).collect();
        order.sort_by_key(|&i| days[i].0);

        let mut history: Vec<f64> = Vec::with_capacity(days.len());
        let mut results = Vec::with_capacity(days.len());
        for i in order {
            let (date, ticks) = &days[i];
            let result = self.analyze_day(symbol, *date, ticks, &history, float_market_cap);
            history.insert(0, result.weighted_cost);
            results.push(result);
        }
        results
    }

    /// Weight map in effect (configuration override or defaults).
    pub fn weights(&self) -> &WeightMap {
        &self.config.weights
    }
}

/// Prepend today's cost to the prior history.
fn cost_history(today: f64, prior_costs: &[f64]) -> Vec<f64> {
    let mut history = Vec::with_capacity(prior_costs.len() + 1);
    history.push(today);
    history.extend_from_slice(prior_costs);
    history
}
