//! Synthetic parent-order reconstruction.
//!
//! Institutional parent orders are routinely sliced into child prints by
//! execution algorithms. This module rebuilds parent-order hypotheses by
//! aggregating same-side prints inside a rolling event-time window:
//!
//! ```text
//! (tick, label) ──► route by side ──► per-side rolling buffer
//!                                          │ evict entries older than
//!                                          │ window (event time)
//!                                          ▼
//!                      Σ amount ≥ threshold? ──► SyntheticOrder
//!                                                 │ pattern detection:
//!                                                 │ regular intervals → TWAP
//!                                                 │ regular sizes     → VWAP
//!                                                 ▼
//!                                             clear buffer
//! ```
//!
//! Eviction is driven by event time only — the high-water mark of the
//! timestamps fed so far — which makes historical replay deterministic
//! and keeps every emitted order inside the window even when tolerated
//! out-of-order ticks arrive.
//!
//! The builder never blocks and never fails; sub-threshold remnants at
//! session end are discarded with the small-print mass.

use crate::classifier::Label;
use crate::config::AnalysisConfig;
use crate::types::Tick;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Confidence assigned to detected algorithmic execution patterns.
const ALGO_CONFIDENCE: f64 = 1.3;

/// Side of an aggregated order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// How a synthetic order came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Plain aggregation (or a single large print) with no detected
    /// execution pattern.
    Original,
    /// Child prints arrive at near-constant time intervals.
    AlgoTwap,
    /// Child prints carry near-constant amounts.
    AlgoVwap,
}

/// An aggregated parent-order hypothesis.
///
/// Orders are immutable once emitted; the calculator consumes them as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticOrder {
    /// Timestamp of the earliest constituent print, milliseconds.
    pub start_time_ms: i64,

    /// Timestamp of the latest constituent print, milliseconds.
    pub end_time_ms: i64,

    /// Instrument identifier.
    pub symbol: String,

    /// Aggregated side.
    pub side: TradeSide,

    /// Total volume in lots.
    pub total_volume: u64,

    /// Total amount in currency units.
    pub total_amount: f64,

    /// `total_amount / total_volume`.
    pub vwap: f64,

    /// Number of constituent prints.
    pub tick_count: usize,

    /// Detected execution pattern.
    pub order_type: OrderType,

    /// Pattern confidence, multiplies the base weight when scoring.
    pub confidence: f64,

    /// Currency sum of the aggressive (`AGG_*`) constituents.
    pub aggressive_amount: f64,

    /// Currency sum of the defensive (`DEF_*`) constituents.
    pub defensive_amount: f64,
}

impl SyntheticOrder {
    /// Order duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.end_time_ms - self.start_time_ms) as f64 / 1_000.0
    }

    /// Average amount per constituent print.
    pub fn avg_amount_per_tick(&self) -> f64 {
        if self.tick_count == 0 {
            return 0.0;
        }
        self.total_amount / self.tick_count as f64
    }

    /// Whether an execution algorithm was detected.
    pub fn is_algo(&self) -> bool {
        matches!(self.order_type, OrderType::AlgoTwap | OrderType::AlgoVwap)
    }
}

/// Compact per-print record retained in the rolling buffers.
#[derive(Debug, Clone, Copy)]
struct BufferedTick {
    timestamp_ms: i64,
    volume: u64,
    amount: f64,
    label: Label,
}

/// One side's rolling buffer with an incrementally maintained amount sum.
#[derive(Debug, Default)]
struct SideBuffer {
    ticks: VecDeque<BufferedTick>,
    pending_amount: f64,
}

impl SideBuffer {
    fn push(&mut self, tick: BufferedTick) {
        // Buffers stay sorted by timestamp. Out-of-order arrivals are
        // rare; a localized sort keeps the hot path an O(1) append.
        let out_of_order = self
            .ticks
            .back()
            .is_some_and(|last| tick.timestamp_ms < last.timestamp_ms);
        self.pending_amount += tick.amount;
        self.ticks.push_back(tick);
        if out_of_order {
            self.ticks
                .make_contiguous()
                .sort_by_key(|t| t.timestamp_ms);
        }
    }

    fn evict_older_than(&mut self, cutoff_ms: i64) {
        while let Some(front) = self.ticks.front() {
            if front.timestamp_ms >= cutoff_ms {
                break;
            }
            self.pending_amount -= front.amount;
            self.ticks.pop_front();
        }
        if self.ticks.is_empty() {
            self.pending_amount = 0.0;
        }
    }

    fn clear(&mut self) {
        self.ticks.clear();
        self.pending_amount = 0.0;
    }
}

/// Snapshot of the builder's pending buffers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferStats {
    pub buy_ticks: usize,
    pub sell_ticks: usize,
    pub buy_amount: f64,
    pub sell_amount: f64,
}

/// Per-symbol stateful aggregator of labeled prints into synthetic orders.
///
/// Created at session start, destroyed after a final [`flush`]. `feed`
/// returns synchronously with zero or more emitted orders; buy-side
/// emission precedes sell-side emission within one call.
///
/// [`flush`]: SyntheticOrderBuilder::flush
#[derive(Debug)]
pub struct SyntheticOrderBuilder {
    symbol: String,
    window_ms: i64,
    threshold: f64,
    twap_interval_variance: f64,
    vwap_amount_dispersion: f64,
    buy: SideBuffer,
    sell: SideBuffer,
    /// Largest event timestamp fed so far; drives eviction.
    high_water_ms: Option<i64>,
}

impl SyntheticOrderBuilder {
    /// Create a builder for one symbol's session.
    pub fn new(symbol: impl Into<String>, config: &AnalysisConfig) -> Self {
        Self {
            symbol: symbol.into(),
            window_ms: config.window_ms(),
            threshold: config.synthetic_threshold,
            twap_interval_variance: config.twap_interval_variance,
            vwap_amount_dispersion: config.vwap_amount_dispersion,
            buy: SideBuffer::default(),
            sell: SideBuffer::default(),
            high_water_ms: None,
        }
    }

    /// Feed one labeled tick; returns any synthetic orders it triggers.
    ///
    /// `NOISE` prints still advance event time (and therefore eviction)
    /// but never enter a buffer.
    pub fn feed(&mut self, tick: &Tick, label: Label) -> Vec<SyntheticOrder> {
        self.high_water_ms = Some(
            self.high_water_ms
                .map_or(tick.timestamp_ms, |hw| hw.max(tick.timestamp_ms)),
        );

        if label.is_buy_side() || label.is_sell_side() {
            let buffered = BufferedTick {
                timestamp_ms: tick.timestamp_ms,
                volume: tick.volume,
                amount: tick.amount,
                label,
            };
            if label.is_buy_side() {
                self.buy.push(buffered);
            } else {
                self.sell.push(buffered);
            }
        }

        self.evict_expired();

        if label == Label::Noise {
            return Vec::new();
        }

        let mut orders = Vec::new();
        if let Some(order) = self.try_emit(TradeSide::Buy) {
            orders.push(order);
        }
        if let Some(order) = self.try_emit(TradeSide::Sell) {
            orders.push(order);
        }
        orders
    }

    /// Emit whatever still qualifies at session end.
    ///
    /// Buffers whose cumulative amount meets the threshold emit exactly as
    /// during the session; sub-threshold remnants are discarded — they
    /// belong to the small-print mass and were never meant to count.
    pub fn flush(&mut self) -> Vec<SyntheticOrder> {
        let mut orders = Vec::new();
        if let Some(order) = self.try_emit(TradeSide::Buy) {
            orders.push(order);
        }
        if let Some(order) = self.try_emit(TradeSide::Sell) {
            orders.push(order);
        }

        let discarded = self.buy.ticks.len() + self.sell.ticks.len();
        if discarded > 0 {
            log::debug!(
                "{}: discarding {} sub-threshold residual ticks at flush",
                self.symbol,
                discarded
            );
        }
        self.buy.clear();
        self.sell.clear();
        orders
    }

    /// Pending buffer counts and amounts.
    pub fn buffer_stats(&self) -> BufferStats {
        BufferStats {
            buy_ticks: self.buy.ticks.len(),
            sell_ticks: self.sell.ticks.len(),
            buy_amount: self.buy.pending_amount,
            sell_amount: self.sell.pending_amount,
        }
    }

    fn evict_expired(&mut self) {
        if let Some(hw) = self.high_water_ms {
            let cutoff = hw - self.window_ms;
            self.buy.evict_older_than(cutoff);
            self.sell.evict_older_than(cutoff);
        }
    }

    fn try_emit(&mut self, side: TradeSide) -> Option<SyntheticOrder> {
        let detector = DetectorParams {
            twap_interval_variance: self.twap_interval_variance,
            vwap_amount_dispersion: self.vwap_amount_dispersion,
        };
        let buffer = match side {
            TradeSide::Buy => &mut self.buy,
            TradeSide::Sell => &mut self.sell,
        };

        if buffer.ticks.is_empty() || buffer.pending_amount < self.threshold {
            return None;
        }

        let ticks = buffer.ticks.make_contiguous();
        let order = build_order(&self.symbol, side, ticks, &detector);
        log::debug!(
            "{}: emitted {:?} {:?} order, amount {:.0}, {} ticks",
            self.symbol,
            order.order_type,
            side,
            order.total_amount,
            order.tick_count
        );
        buffer.clear();
        Some(order)
    }
}

struct DetectorParams {
    twap_interval_variance: f64,
    vwap_amount_dispersion: f64,
}

fn build_order(
    symbol: &str,
    side: TradeSide,
    ticks: &[BufferedTick],
    detector: &DetectorParams,
) -> SyntheticOrder {
    let start_time_ms = ticks.first().map(|t| t.timestamp_ms).unwrap_or(0);
    let end_time_ms = ticks.last().map(|t| t.timestamp_ms).unwrap_or(0);

    let mut total_volume = 0u64;
    let mut total_amount = 0.0;
    let mut aggressive_amount = 0.0;
    let mut defensive_amount = 0.0;
    for t in ticks {
        total_volume += t.volume;
        total_amount += t.amount;
        if t.label.is_aggressive() {
            aggressive_amount += t.amount;
        } else if t.label.is_defensive() {
            defensive_amount += t.amount;
        }
    }

    let vwap = if total_volume > 0 {
        total_amount / total_volume as f64
    } else {
        0.0
    };

    let (order_type, confidence) = detect_algo_pattern(ticks, detector);

    SyntheticOrder {
        start_time_ms,
        end_time_ms,
        symbol: symbol.to_string(),
        side,
        total_volume,
        total_amount,
        vwap,
        tick_count: ticks.len(),
        order_type,
        confidence,
        aggressive_amount,
        defensive_amount,
    }
}

/// Detect TWAP/VWAP execution patterns in a run of child prints.
///
/// TWAP slicers leave near-constant inter-print intervals; VWAP slicers
/// leave near-constant print amounts. The amount test compares
/// `variance / mean` (not std-dev / mean) against its threshold; both
/// thresholds are configurable.
fn detect_algo_pattern(ticks: &[BufferedTick], detector: &DetectorParams) -> (OrderType, f64) {
    if ticks.len() < 3 {
        return (OrderType::Original, 1.0);
    }

    let intervals: Vec<f64> = ticks
        .windows(2)
        .map(|w| (w[1].timestamp_ms - w[0].timestamp_ms) as f64 / 1_000.0)
        .collect();
    if population_variance(&intervals) < detector.twap_interval_variance {
        return (OrderType::AlgoTwap, ALGO_CONFIDENCE);
    }

    let amounts: Vec<f64> = ticks.iter().map(|t| t.amount).collect();
    let mean_amount = mean(&amounts);
    if mean_amount > 0.0 && population_variance(&amounts) / mean_amount < detector.vwap_amount_dispersion
    {
        return (OrderType::AlgoVwap, ALGO_CONFIDENCE);
    }

    (OrderType::Original, 1.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}
