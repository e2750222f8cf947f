//! Prelude module for convenient imports.
//!
//! Re-exports the most commonly used types for ergonomic usage of the
//! analysis pipeline.
//!
//! # Usage
//!
//! ```ignore
//! use capital_tracker::prelude::*;
//!
//! let analyzer = SessionAnalyzer::new(AnalysisConfig::default())?;
//! let result = analyzer.analyze_day(symbol, date, &ticks, &history, cap);
//! ```

// ============================================================================
// Data model
// ============================================================================

pub use crate::types::{Direction, Tick, TickFault};

// ============================================================================
// Pipeline stages
// ============================================================================

pub use crate::chip::{
    ChipAnalyzer, ChipDistribution, ChipMigration, ChipPeak, MigrationDirection,
    SupportResistance, ValidationStatus,
};
pub use crate::classifier::{Classification, Label, TickClassifier};
pub use crate::cost::{CostCalculator, NetFlow, OrderStatistics, WeightMap};
pub use crate::synthetic::{
    BufferStats, OrderType, SyntheticOrder, SyntheticOrderBuilder, TradeSide,
};

// ============================================================================
// Session driver
// ============================================================================

pub use crate::session::{DayResult, QualityCounters, SessionAnalyzer};

// ============================================================================
// Configuration and errors
// ============================================================================

pub use crate::config::AnalysisConfig;
pub use crate::error::{AnalysisError, Result};

// ============================================================================
// Batch processing (parallel feature)
// ============================================================================

#[cfg(feature = "parallel")]
pub use crate::batch::{
    BatchConfig, BatchOutput, BatchProcessor, ErrorMode, SessionFailure, SessionJob,
};
