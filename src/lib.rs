//! # Capital Tracker
//!
//! Reconstructs the latent behavior of major-capital participants from
//! Level-2 tick-by-tick trade prints of a single equity.
//!
//! # Overview
//!
//! From a time-ordered stream of executions with best-bid/best-ask
//! context, the pipeline:
//!
//! - classifies each print by intent (aggressive vs defensive, buy vs
//!   sell, noise),
//! - aggregates contemporaneous prints into *synthetic orders* that
//!   approximate split parent orders, detecting TWAP/VWAP execution
//!   patterns,
//! - computes an intent-weighted volume-weighted cost basis and net
//!   flow,
//! - builds a price-bucketed holding distribution ("chip distribution")
//!   whose peaks cross-validate the cost estimate.
//!
//! The output is a statistical support/resistance band, not an
//! accounting figure: no counterparty identity is inferred and no
//! trading recommendation is produced.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Capital Tracker                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  classifier/  - per-tick intent labels against quote context    │
//! │  synthetic/   - rolling-window parent-order reconstruction      │
//! │  cost/        - weighted cost basis, moving averages, net flow  │
//! │  chip/        - price-bucketed holding histogram + validation   │
//! │  session/     - per-(symbol, date) driver producing DayResult   │
//! │  batch/       - rayon-parallel multi-symbol driver (optional)   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Determinism
//!
//! The core is single-threaded and event-driven per symbol. Window
//! eviction runs on event time, never the wall clock, so identical tick
//! sequences always yield identical results — a requirement for
//! reproducible historical replay. Across symbols, sessions share
//! nothing mutable and may run in parallel (see [`batch`]).
//!
//! # Example
//!
//! ```ignore
//! use capital_tracker::prelude::*;
//!
//! let analyzer = SessionAnalyzer::new(AnalysisConfig::default())?;
//! let result = analyzer.analyze_day("600000", date, &ticks, &prior_costs, float_cap);
//! println!("cost {:.2} ({:?})", result.weighted_cost, result.validation_status);
//! ```

pub mod chip;
pub mod classifier;
pub mod config;
pub mod cost;
pub mod error;
pub mod prelude;
pub mod session;
pub mod synthetic;
pub mod types;

#[cfg(feature = "parallel")]
pub mod batch;

// Re-exports - Data model
pub use types::{Direction, Tick, TickFault};

// Re-exports - Classifier
pub use classifier::{Classification, Label, TickClassifier};

// Re-exports - Synthetic orders
pub use synthetic::{BufferStats, OrderType, SyntheticOrder, SyntheticOrderBuilder, TradeSide};

// Re-exports - Cost / flow
pub use cost::{CostCalculator, KahanSum, NetFlow, OrderStatistics, WeightMap};

// Re-exports - Chip analysis
pub use chip::{
    ChipAnalyzer, ChipDistribution, ChipMigration, ChipPeak, MigrationDirection,
    SupportResistance, ValidationStatus,
};

// Re-exports - Session driver
pub use session::{DayResult, QualityCounters, SessionAnalyzer};

// Re-exports - Configuration and errors
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};

#[cfg(feature = "parallel")]
pub use batch::{BatchConfig, BatchOutput, BatchProcessor, ErrorMode, SessionFailure, SessionJob};
