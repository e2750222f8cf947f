//! Core data model for Level-2 trade prints.
//!
//! A [`Tick`] is one executed trade with an optional best-level quote
//! snapshot attached. Ticks are read-only inputs to the pipeline; all
//! timestamps are event time in milliseconds, which keeps historical replay
//! deterministic (no wall clock anywhere in the core).

use serde::{Deserialize, Serialize};

/// Trade direction as reported by the exchange feed.
///
/// Heterogeneous source encodings (strings, flags) are resolved to this
/// closed variant at the adapter boundary; the core never inspects strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Active buy (taker lifted the ask).
    Buy,
    /// Active sell (taker hit the bid).
    Sell,
    /// Neutral or unknown.
    Neutral,
}

/// Ways a tick can be malformed.
///
/// Malformed ticks are tagged `NOISE` by the classifier and counted; they
/// never abort a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFault {
    /// Price is zero or negative.
    NonPositivePrice,
    /// Volume is zero.
    ZeroVolume,
    /// Amount is negative.
    NegativeAmount,
    /// Best ask below best bid.
    InvertedQuote,
}

/// One executed trade print with best-level quote context.
///
/// `amount` is authoritative for all currency accumulations; `amount /
/// volume` is the effective execution price used for VWAPs. Consistency
/// with `price × volume × lot_size` is checked but not enforced (some
/// feeds report rounded amounts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Event timestamp, milliseconds. Non-decreasing within a session.
    pub timestamp_ms: i64,

    /// Instrument identifier (opaque to the core).
    pub symbol: String,

    /// Execution price.
    pub price: f64,

    /// Executed volume in lots.
    pub volume: u64,

    /// Executed amount in currency units.
    pub amount: f64,

    /// Taker direction.
    pub direction: Direction,

    /// Best bid price at the moment of the print, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid1_price: Option<f64>,

    /// Best bid volume in lots, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid1_volume: Option<u64>,

    /// Best ask price at the moment of the print, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask1_price: Option<f64>,

    /// Best ask volume in lots, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask1_volume: Option<u64>,
}

impl Tick {
    /// Create a tick without quote context.
    pub fn new(
        timestamp_ms: i64,
        symbol: impl Into<String>,
        price: f64,
        volume: u64,
        amount: f64,
        direction: Direction,
    ) -> Self {
        Self {
            timestamp_ms,
            symbol: symbol.into(),
            price,
            volume,
            amount,
            direction,
            bid1_price: None,
            bid1_volume: None,
            ask1_price: None,
            ask1_volume: None,
        }
    }

    /// Attach a best-level quote snapshot.
    pub fn with_quote(
        mut self,
        bid1_price: f64,
        bid1_volume: u64,
        ask1_price: f64,
        ask1_volume: u64,
    ) -> Self {
        self.bid1_price = Some(bid1_price);
        self.bid1_volume = Some(bid1_volume);
        self.ask1_price = Some(ask1_price);
        self.ask1_volume = Some(ask1_volume);
        self
    }

    /// Check the tick for structural malformedness.
    ///
    /// Returns the first fault found, or `None` for a well-formed tick.
    pub fn fault(&self) -> Option<TickFault> {
        if self.price <= 0.0 {
            return Some(TickFault::NonPositivePrice);
        }
        if self.volume == 0 {
            return Some(TickFault::ZeroVolume);
        }
        if self.amount < 0.0 {
            return Some(TickFault::NegativeAmount);
        }
        if let (Some(bid), Some(ask)) = (self.bid1_price, self.ask1_price) {
            if ask < bid {
                return Some(TickFault::InvertedQuote);
            }
        }
        None
    }

    /// Whether both best-level prices are present.
    pub fn has_quote(&self) -> bool {
        self.bid1_price.is_some() && self.ask1_price.is_some()
    }

    /// Whether `amount` agrees with `price × volume × lot_size` within a
    /// relative tolerance.
    ///
    /// Rounded feed amounts make small discrepancies normal; large ones
    /// are counted as a quality signal. `amount` stays authoritative
    /// either way.
    pub fn amount_consistent(&self, lot_size: f64, tolerance: f64) -> bool {
        let expected = self.price * self.volume as f64 * lot_size;
        if expected <= 0.0 {
            return true;
        }
        (self.amount - expected).abs() <= tolerance * expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_tick() -> Tick {
        Tick::new(1_000, "600000", 10.0, 100, 1_000.0, Direction::Buy)
    }

    #[test]
    fn test_well_formed_tick_has_no_fault() {
        assert_eq!(base_tick().fault(), None);
    }

    #[test]
    fn test_fault_detection() {
        let mut t = base_tick();
        t.price = 0.0;
        assert_eq!(t.fault(), Some(TickFault::NonPositivePrice));

        let mut t = base_tick();
        t.volume = 0;
        assert_eq!(t.fault(), Some(TickFault::ZeroVolume));

        let mut t = base_tick();
        t.amount = -1.0;
        assert_eq!(t.fault(), Some(TickFault::NegativeAmount));

        let t = base_tick().with_quote(10.05, 100, 10.00, 100);
        assert_eq!(t.fault(), Some(TickFault::InvertedQuote));
    }

    #[test]
    fn test_quote_presence() {
        assert!(!base_tick().has_quote());
        assert!(base_tick().with_quote(9.99, 50, 10.01, 50).has_quote());
    }

    #[test]
    fn test_amount_consistency() {
        // 10.0 × 100 × 1.0 = 1000, exact
        assert!(base_tick().amount_consistent(1.0, 0.01));

        let mut t = base_tick();
        t.amount = 1_200.0; // 20% off
        assert!(!t.amount_consistent(1.0, 0.01));

        // Rounded amounts inside tolerance pass
        let mut t = base_tick();
        t.amount = 1_005.0;
        assert!(t.amount_consistent(1.0, 0.01));
    }
}
