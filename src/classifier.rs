//! Tick intent classification.
//!
//! Labels each trade print with an intent tag by comparing the execution
//! against the best-level quote snapshot:
//!
//! - **Aggressive** prints cross the quote (liquidity-taking): a buy at or
//!   through the ask, a sell at or through the bid.
//! - **Defensive** prints execute against a resting "wall" — a quote level
//!   whose volume is far above typical depth.
//! - Prints below the large-order threshold are tagged `SMALL_*` and carry
//!   zero weight on their own; they only matter once aggregated into
//!   synthetic orders.
//!
//! Classification is a pure function of the tick and the configured
//! thresholds. Malformed ticks degrade to `NOISE` and missing quote
//! context degrades to a direction-only fallback; neither raises.

use crate::config::AnalysisConfig;
use crate::cost::WeightMap;
use crate::types::{Direction, Tick};
use serde::{Deserialize, Serialize};

/// Intent label for a single trade print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Large buy crossing the quote.
    AggBuy,
    /// Large buy absorbed by a resting bid wall.
    DefBuy,
    /// Large sell crossing the quote.
    AggSell,
    /// Large sell absorbed by a resting ask wall.
    DefSell,
    /// Buy below the large-order threshold.
    SmallBuy,
    /// Sell below the large-order threshold.
    SmallSell,
    /// Unclassifiable or malformed.
    Noise,
}

impl Label {
    /// Whether this label routes to the buy-side buffer.
    pub fn is_buy_side(self) -> bool {
        matches!(self, Label::AggBuy | Label::DefBuy | Label::SmallBuy)
    }

    /// Whether this label routes to the sell-side buffer.
    pub fn is_sell_side(self) -> bool {
        matches!(self, Label::AggSell | Label::DefSell | Label::SmallSell)
    }

    /// Whether this is an aggressive (quote-crossing) label.
    pub fn is_aggressive(self) -> bool {
        matches!(self, Label::AggBuy | Label::AggSell)
    }

    /// Whether this is a defensive (wall-absorbing) label.
    pub fn is_defensive(self) -> bool {
        matches!(self, Label::DefBuy | Label::DefSell)
    }
}

/// Output of [`TickClassifier::classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Intent label.
    pub label: Label,

    /// Base weight of the label (before any synthetic-order confidence).
    pub base_weight: f64,

    /// Set when a large directional print had to fall back to
    /// direction-only classification because quote context was absent.
    pub quote_missing: bool,
}

/// Classifies trade prints against quote context.
///
/// Pure and stateless: identical inputs always yield identical labels,
/// which is what makes session replay deterministic.
#[derive(Debug, Clone)]
pub struct TickClassifier {
    big_order_threshold: f64,
    wall_threshold: u64,
    weights: WeightMap,
}

impl TickClassifier {
    /// Create a classifier with explicit thresholds.
    pub fn new(big_order_threshold: f64, wall_threshold: u64, weights: WeightMap) -> Self {
        Self {
            big_order_threshold,
            wall_threshold,
            weights,
        }
    }

    /// Create a classifier from an analysis configuration.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.big_order_threshold,
            config.wall_threshold,
            config.weights.clone(),
        )
    }

    /// Classify a single tick.
    ///
    /// Decision order: malformedness, size, then intent against the quote.
    /// A locked market (`price == bid1 == ask1`) resolves to the defensive
    /// side before the crossing test fires.
    pub fn classify(&self, tick: &Tick) -> Classification {
        if tick.fault().is_some() {
            return self.tag(Label::Noise, false);
        }

        if tick.amount < self.big_order_threshold {
            let label = match tick.direction {
                Direction::Buy => Label::SmallBuy,
                Direction::Sell => Label::SmallSell,
                Direction::Neutral => Label::Noise,
            };
            return self.tag(label, false);
        }

        match tick.direction {
            Direction::Buy => self.classify_large_buy(tick),
            Direction::Sell => self.classify_large_sell(tick),
            // Large prints with unknown direction stay out of the
            // statistics rather than polluting either side.
            Direction::Neutral => self.tag(Label::Noise, false),
        }
    }

    fn classify_large_buy(&self, tick: &Tick) -> Classification {
        let (bid, ask) = match (tick.bid1_price, tick.ask1_price) {
            (Some(bid), Some(ask)) => (bid, ask),
            // No quote context: we cannot prove passivity, so a large
            // active buy counts as aggressive.
            _ => {
                log::debug!(
                    "{}: large buy at {} without quote context, assuming aggressive",
                    tick.symbol,
                    tick.price
                );
                return self.tag(Label::AggBuy, true);
            }
        };

        // Locked market: resolve to the defensive side.
        if bid == ask && tick.price == bid {
            return self.tag(Label::DefBuy, false);
        }

        if tick.price >= ask {
            return self.tag(Label::AggBuy, false);
        }

        if tick.price <= bid && tick.bid1_volume.unwrap_or(0) >= self.wall_threshold {
            return self.tag(Label::DefBuy, false);
        }

        if (tick.price - ask).abs() < (tick.price - bid).abs() {
            self.tag(Label::AggBuy, false)
        } else {
            self.tag(Label::DefBuy, false)
        }
    }

    fn classify_large_sell(&self, tick: &Tick) -> Classification {
        let (bid, ask) = match (tick.bid1_price, tick.ask1_price) {
            (Some(bid), Some(ask)) => (bid, ask),
            _ => {
                log::debug!(
                    "{}: large sell at {} without quote context, assuming aggressive",
                    tick.symbol,
                    tick.price
                );
                return self.tag(Label::AggSell, true);
            }
        };

        if bid == ask && tick.price == ask {
            return self.tag(Label::DefSell, false);
        }

        if tick.price <= bid {
            return self.tag(Label::AggSell, false);
        }

        if tick.price >= ask && tick.ask1_volume.unwrap_or(0) >= self.wall_threshold {
            return self.tag(Label::DefSell, false);
        }

        if (tick.price - bid).abs() < (tick.price - ask).abs() {
            self.tag(Label::AggSell, false)
        } else {
            self.tag(Label::DefSell, false)
        }
    }

    fn tag(&self, label: Label, quote_missing: bool) -> Classification {
        Classification {
            label,
            base_weight: self.weights.label_weight(label),
            quote_missing,
        }
    }
}
