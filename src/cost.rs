//! Weighted cost basis, moving averages, and net-flow calculation.
//!
//! Stateless over one session's synthetic orders plus a caller-supplied
//! history of prior daily costs. Keeping the cross-day state outside the
//! calculator means every session is independently replayable.
//!
//! The cost estimate is an intent-weighted VWAP over BUY orders only —
//! it tracks accumulation cost, not distribution price — and is a
//! statistical support/resistance band, not an accounting figure.
//!
//! All currency/volume accumulations run in a single pass with
//! Kahan-compensated summation so the result is independent of the
//! magnitude drift a long session can build up.

use crate::classifier::Label;
use crate::synthetic::{OrderType, SyntheticOrder, TradeSide};
use serde::{Deserialize, Serialize};

/// Per-class scoring weights.
///
/// The label weights (`aggressive`, `defensive`, `small`, `noise`) apply at
/// classification time; the order weights (`algo`, `original`) apply to
/// emitted synthetic orders. Overridable via configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightMap {
    /// `AGG_BUY` / `AGG_SELL` prints.
    pub aggressive: f64,
    /// `DEF_BUY` / `DEF_SELL` prints.
    pub defensive: f64,
    /// `ALGO_TWAP` / `ALGO_VWAP` orders.
    pub algo: f64,
    /// `ORIGINAL` orders.
    pub original: f64,
    /// `SMALL_*` prints; they only count once aggregated.
    pub small: f64,
    /// `NOISE` prints.
    pub noise: f64,
}

impl Default for WeightMap {
    fn default() -> Self {
        Self {
            aggressive: 1.5,
            defensive: 0.8,
            algo: 1.3,
            original: 1.0,
            small: 0.0,
            noise: 0.0,
        }
    }
}

impl WeightMap {
    /// Base weight of a classification label.
    pub fn label_weight(&self, label: Label) -> f64 {
        match label {
            Label::AggBuy | Label::AggSell => self.aggressive,
            Label::DefBuy | Label::DefSell => self.defensive,
            Label::SmallBuy | Label::SmallSell => self.small,
            Label::Noise => self.noise,
        }
    }

    /// Base weight of a synthetic-order type.
    pub fn order_weight(&self, order_type: OrderType) -> f64 {
        match order_type {
            OrderType::Original => self.original,
            OrderType::AlgoTwap | OrderType::AlgoVwap => self.algo,
        }
    }

    /// Validate the map (all weights finite and non-negative).
    pub fn validate(&self) -> Result<(), String> {
        for (name, w) in [
            ("aggressive", self.aggressive),
            ("defensive", self.defensive),
            ("algo", self.algo),
            ("original", self.original),
            ("small", self.small),
            ("noise", self.noise),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(format!("weight '{name}' must be finite and >= 0"));
            }
        }
        Ok(())
    }
}

/// Kahan-compensated running sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    /// Create a zeroed accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one value, carrying the rounding compensation forward.
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    /// Current compensated total.
    pub fn value(&self) -> f64 {
        self.sum
    }
}

/// Weighted net flow for one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetFlow {
    /// `(in − out) / float_market_cap` when the cap is known, otherwise
    /// the raw `in − out`.
    pub value: f64,

    /// Whether `value` was normalized by the float market cap.
    pub normalized: bool,
}

/// Unweighted per-intent aggregates and order-type counts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderStatistics {
    pub total_orders: usize,
    pub original_order_count: usize,
    pub algo_order_count: usize,
    pub aggressive_buy_amount: f64,
    pub aggressive_sell_amount: f64,
    pub defensive_buy_amount: f64,
    pub defensive_sell_amount: f64,
    pub algo_buy_amount: f64,
    pub algo_sell_amount: f64,
    /// Total amount across BUY orders (all intent classes).
    pub total_buy_amount: f64,
    /// Total amount across SELL orders (all intent classes).
    pub total_sell_amount: f64,
}

/// Computes cost, flow, and intent aggregates over an order list.
#[derive(Debug, Clone)]
pub struct CostCalculator {
    weights: WeightMap,
}

impl CostCalculator {
    /// Create a calculator with the given weight map.
    pub fn new(weights: WeightMap) -> Self {
        Self { weights }
    }

    /// Effective scoring weight of one order.
    pub fn order_weight(&self, order: &SyntheticOrder) -> f64 {
        self.weights.order_weight(order.order_type) * order.confidence
    }

    /// Intent-weighted volume-weighted cost over BUY orders.
    ///
    /// ```text
    /// cost = Σ amountᵢ·Wᵢ / Σ volumeᵢ·Wᵢ   over BUY orders, Wᵢ > 0
    /// ```
    ///
    /// Returns 0 when no BUY order carries positive weight.
    pub fn weighted_cost(&self, orders: &[SyntheticOrder]) -> f64 {
        let mut numerator = KahanSum::new();
        let mut denominator = KahanSum::new();

        for order in orders {
            if order.side != TradeSide::Buy {
                continue;
            }
            let w = self.order_weight(order);
            if w == 0.0 {
                continue;
            }
            numerator.add(order.total_amount * w);
            denominator.add(order.total_volume as f64 * w);
        }

        if denominator.value() == 0.0 {
            log::debug!("no weighted buy flow; reporting zero cost");
            return 0.0;
        }
        numerator.value() / denominator.value()
    }

    /// Moving average over a chronological cost history.
    ///
    /// `daily_costs` is ordered most recent first (`[today, prev, …]`).
    /// With fewer than `period` entries the mean of what exists is used.
    /// Zero-cost days stay in the window rather than silently shifting it.
    pub fn cost_ma(daily_costs: &[f64], period: usize) -> f64 {
        if daily_costs.is_empty() || period == 0 {
            return 0.0;
        }
        let n = period.min(daily_costs.len());
        let mut sum = KahanSum::new();
        for &cost in &daily_costs[..n] {
            sum.add(cost);
        }
        sum.value() / n as f64
    }

    /// Weighted buy-minus-sell flow, normalized by float market cap when
    /// available.
    pub fn net_flow(&self, orders: &[SyntheticOrder], float_market_cap: Option<f64>) -> NetFlow {
        let mut inflow = KahanSum::new();
        let mut outflow = KahanSum::new();

        for order in orders {
            let w = self.order_weight(order);
            match order.side {
                TradeSide::Buy => inflow.add(order.total_amount * w),
                TradeSide::Sell => outflow.add(order.total_amount * w),
            }
        }

        let raw = inflow.value() - outflow.value();
        match float_market_cap {
            Some(cap) if cap > 0.0 => NetFlow {
                value: raw / cap,
                normalized: true,
            },
            _ => {
                log::debug!("float market cap unavailable; reporting unnormalized net flow");
                NetFlow {
                    value: raw,
                    normalized: false,
                }
            }
        }
    }

    /// Unweighted per-intent aggregates over the order list.
    ///
    /// These feed the per-intent UI slices and deliberately ignore
    /// weights.
    pub fn order_statistics(&self, orders: &[SyntheticOrder]) -> OrderStatistics {
        let mut stats = OrderStatistics {
            total_orders: orders.len(),
            ..Default::default()
        };

        let mut agg_buy = KahanSum::new();
        let mut agg_sell = KahanSum::new();
        let mut def_buy = KahanSum::new();
        let mut def_sell = KahanSum::new();
        let mut algo_buy = KahanSum::new();
        let mut algo_sell = KahanSum::new();
        let mut total_buy = KahanSum::new();
        let mut total_sell = KahanSum::new();

        for order in orders {
            if order.is_algo() {
                stats.algo_order_count += 1;
            } else {
                stats.original_order_count += 1;
            }
            match order.side {
                TradeSide::Buy => {
                    total_buy.add(order.total_amount);
                    agg_buy.add(order.aggressive_amount);
                    def_buy.add(order.defensive_amount);
                    if order.is_algo() {
                        algo_buy.add(order.total_amount);
                    }
                }
                TradeSide::Sell => {
                    total_sell.add(order.total_amount);
                    agg_sell.add(order.aggressive_amount);
                    def_sell.add(order.defensive_amount);
                    if order.is_algo() {
                        algo_sell.add(order.total_amount);
                    }
                }
            }
        }

        stats.aggressive_buy_amount = agg_buy.value();
        stats.aggressive_sell_amount = agg_sell.value();
        stats.defensive_buy_amount = def_buy.value();
        stats.defensive_sell_amount = def_sell.value();
        stats.algo_buy_amount = algo_buy.value();
        stats.algo_sell_amount = algo_sell.value();
        stats.total_buy_amount = total_buy.value();
        stats.total_sell_amount = total_sell.value();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(
        side: TradeSide,
        order_type: OrderType,
        confidence: f64,
        total_volume: u64,
        total_amount: f64,
    ) -> SyntheticOrder {
        SyntheticOrder {
            start_time_ms: 0,
            end_time_ms: 1_000,
            symbol: "600000".to_string(),
            side,
            total_volume,
            total_amount,
            vwap: total_amount / total_volume as f64,
            tick_count: 1,
            order_type,
            confidence,
            aggressive_amount: 0.0,
            defensive_amount: 0.0,
        }
    }

    #[test]
    fn test_weighted_cost_single_order() {
        let calc = CostCalculator::new(WeightMap::default());
        let orders = vec![order(TradeSide::Buy, OrderType::Original, 1.0, 60_000, 600_000.0)];
        assert!((calc.weighted_cost(&orders) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_cost_blends_by_weight() {
        let calc = CostCalculator::new(WeightMap::default());
        // Algo order at 10.0, original order at 20.0; same volume.
        // W_algo = 1.3 × 1.3 = 1.69, W_orig = 1.0.
        let orders = vec![
            order(TradeSide::Buy, OrderType::AlgoTwap, 1.3, 10_000, 100_000.0),
            order(TradeSide::Buy, OrderType::Original, 1.0, 10_000, 200_000.0),
        ];
        let cost = calc.weighted_cost(&orders);
        let expected = (100_000.0 * 1.69 + 200_000.0) / (10_000.0 * 1.69 + 10_000.0);
        assert!((cost - expected).abs() < 1e-9);
        // Invariant: cost lies between the two vwaps.
        assert!(cost > 10.0 && cost < 20.0);
    }

    #[test]
    fn test_weighted_cost_ignores_sells_and_zero_weight() {
        let calc = CostCalculator::new(WeightMap::default());
        let orders = vec![
            order(TradeSide::Sell, OrderType::Original, 1.0, 10_000, 100_000.0),
            order(TradeSide::Buy, OrderType::Original, 0.0, 10_000, 300_000.0),
        ];
        assert_eq!(calc.weighted_cost(&orders), 0.0);
    }

    #[test]
    fn test_weighted_cost_empty() {
        let calc = CostCalculator::new(WeightMap::default());
        assert_eq!(calc.weighted_cost(&[]), 0.0);
    }

    #[test]
    fn test_cost_ma_full_and_partial_window() {
        let history = [10.0, 11.0, 12.0, 13.0, 14.0, 100.0];
        assert!((CostCalculator::cost_ma(&history, 5) - 12.0).abs() < 1e-9);
        // Shorter history falls back to mean of what exists.
        assert!((CostCalculator::cost_ma(&history[..2], 5) - 10.5).abs() < 1e-9);
        assert_eq!(CostCalculator::cost_ma(&[], 5), 0.0);
    }

    #[test]
    fn test_cost_ma_keeps_zero_days() {
        // A no-flow day contributes a zero instead of shifting the window.
        let history = [10.0, 0.0, 14.0];
        assert!((CostCalculator::cost_ma(&history, 3) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_net_flow_balanced_session() {
        let calc = CostCalculator::new(WeightMap::default());
        let mut orders = Vec::new();
        for _ in 0..3 {
            orders.push(order(TradeSide::Buy, OrderType::Original, 1.0, 100_000, 1_000_000.0));
            orders.push(order(TradeSide::Sell, OrderType::Original, 1.0, 100_000, 1_000_000.0));
        }
        let flow = calc.net_flow(&orders, Some(1_000_000_000.0));
        assert_eq!(flow.value, 0.0);
        assert!(flow.normalized);
    }

    #[test]
    fn test_net_flow_unnormalized_when_cap_missing() {
        let calc = CostCalculator::new(WeightMap::default());
        let orders = vec![order(TradeSide::Buy, OrderType::Original, 1.0, 10_000, 100_000.0)];
        let flow = calc.net_flow(&orders, None);
        assert!((flow.value - 100_000.0).abs() < 1e-9);
        assert!(!flow.normalized);

        let flow = calc.net_flow(&orders, Some(0.0));
        assert!(!flow.normalized);
    }

    #[test]
    fn test_order_statistics() {
        let calc = CostCalculator::new(WeightMap::default());
        let mut buy = order(TradeSide::Buy, OrderType::Original, 1.0, 10_000, 100_000.0);
        buy.aggressive_amount = 80_000.0;
        buy.defensive_amount = 20_000.0;
        let mut sell = order(TradeSide::Sell, OrderType::Original, 1.0, 5_000, 50_000.0);
        sell.aggressive_amount = 50_000.0;
        let algo = order(TradeSide::Buy, OrderType::AlgoVwap, 1.3, 50_000, 500_000.0);

        let stats = calc.order_statistics(&[buy, sell, algo]);
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.original_order_count, 2);
        assert_eq!(stats.algo_order_count, 1);
        assert!((stats.aggressive_buy_amount - 80_000.0).abs() < 1e-9);
        assert!((stats.defensive_buy_amount - 20_000.0).abs() < 1e-9);
        assert!((stats.aggressive_sell_amount - 50_000.0).abs() < 1e-9);
        assert!((stats.algo_buy_amount - 500_000.0).abs() < 1e-9);
        assert_eq!(stats.algo_sell_amount, 0.0);
        assert!((stats.total_buy_amount - 600_000.0).abs() < 1e-9);
        assert!((stats.total_sell_amount - 50_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_kahan_sum_stability() {
        // Repeatedly adding a tiny value to a large one loses precision
        // with naive summation; the compensated sum keeps it.
        let mut kahan = KahanSum::new();
        kahan.add(1e9);
        for _ in 0..1_000 {
            kahan.add(1e-3);
        }
        assert!((kahan.value() - (1e9 + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_weight_map_validation() {
        assert!(WeightMap::default().validate().is_ok());
        let mut weights = WeightMap::default();
        weights.aggressive = -1.0;
        assert!(weights.validate().is_err());
        weights.aggressive = f64::NAN;
        assert!(weights.validate().is_err());
    }
}
