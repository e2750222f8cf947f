//! Parallel batch processing for multi-symbol session sets.
//!
//! Sessions are independent by construction — one symbol, one date, one
//! tick stream — so a day's universe can be analyzed on Rayon's
//! work-stealing pool with no shared mutable state. Each job carries its
//! own tick data and cost history; the analyzer itself holds only
//! immutable configuration and is shared read-only across threads.
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                BatchProcessor                  │
//! │  ┌──────────────────────────────────────────┐  │
//! │  │            Rayon thread pool             │  │
//! │  │   job(600000)   job(000651)   job(…)     │  │
//! │  │       │             │            │       │  │
//! │  │       ▼             ▼            ▼       │  │
//! │  │   DayResult     DayResult    DayResult   │  │
//! │  └───────────────────┬──────────────────────┘  │
//! │                      ▼                         │
//! │                 BatchOutput                    │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! A job with no tick data counts as a per-symbol failure; whether that
//! stops the run is governed by [`ErrorMode`]. Partial failures never
//! abort the other sessions under [`ErrorMode::CollectErrors`].

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::session::{DayResult, SessionAnalyzer};
use crate::types::Tick;
use ahash::AHashMap;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Error handling mode for batch processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Stop on the first failed job (default).
    #[default]
    FailFast,

    /// Analyze every job that can be analyzed, collect the failures.
    CollectErrors,
}

/// Batch processing configuration.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    /// Worker threads; `None` uses Rayon's global default.
    pub num_threads: Option<usize>,

    /// Failure handling policy.
    pub error_mode: ErrorMode,
}

impl BatchConfig {
    /// Create a batch configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Set the failure handling policy.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Threads that will actually be used.
    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

/// One session's worth of input.
#[derive(Debug, Clone)]
pub struct SessionJob {
    pub symbol: String,
    pub date: NaiveDate,
    pub ticks: Vec<Tick>,
    /// Daily-cost history for the moving averages, most recent first.
    pub prior_costs: Vec<f64>,
    /// Float market cap for net-flow normalization, when known.
    pub float_market_cap: Option<f64>,
}

impl SessionJob {
    /// Create a job without history or market-cap context.
    pub fn new(symbol: impl Into<String>, date: NaiveDate, ticks: Vec<Tick>) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            ticks,
            prior_costs: Vec::new(),
            float_market_cap: None,
        }
    }

    /// Attach the daily-cost history.
    pub fn with_prior_costs(mut self, prior_costs: Vec<f64>) -> Self {
        self.prior_costs = prior_costs;
        self
    }

    /// Attach the float market cap.
    pub fn with_float_market_cap(mut self, cap: f64) -> Self {
        self.float_market_cap = Some(cap);
        self
    }
}

/// A failed job.
#[derive(Debug, Clone)]
pub struct SessionFailure {
    pub symbol: String,
    pub date: NaiveDate,
    pub reason: String,
}

/// Aggregated batch results.
#[derive(Debug)]
pub struct BatchOutput {
    /// Successful sessions, in input order.
    pub results: Vec<DayResult>,

    /// Failed sessions (populated under [`ErrorMode::CollectErrors`]).
    pub failures: Vec<SessionFailure>,

    /// Wall time of the batch (reporting only; results are independent
    /// of timing).
    pub elapsed: Duration,
}

impl BatchOutput {
    /// Number of successful sessions.
    pub fn successful_count(&self) -> usize {
        self.results.len()
    }

    /// Number of failed sessions.
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// Whether every job succeeded.
    pub fn all_successful(&self) -> bool {
        self.failures.is_empty()
    }

    /// Results grouped by symbol.
    pub fn by_symbol(&self) -> AHashMap<&str, Vec<&DayResult>> {
        let mut map: AHashMap<&str, Vec<&DayResult>> = AHashMap::new();
        for result in &self.results {
            map.entry(result.symbol.as_str()).or_default().push(result);
        }
        map
    }

    /// Iterate successful results.
    pub fn iter(&self) -> impl Iterator<Item = &DayResult> {
        self.results.iter()
    }
}

/// Runs many sessions in parallel with one shared configuration.
pub struct BatchProcessor {
    analyzer: SessionAnalyzer,
    batch_config: BatchConfig,
}

impl BatchProcessor {
    /// Create a processor, validating the analysis configuration.
    pub fn new(config: AnalysisConfig, batch_config: BatchConfig) -> Result<Self> {
        let analyzer = SessionAnalyzer::new(config)?;
        Ok(Self {
            analyzer,
            batch_config,
        })
    }

    /// Process all jobs, one task per (symbol, date).
    ///
    /// Under [`ErrorMode::FailFast`] the first failure aborts the run;
    /// under [`ErrorMode::CollectErrors`] failures are reported alongside
    /// the successful results.
    pub fn process_jobs(&self, jobs: &[SessionJob]) -> Result<BatchOutput> {
        let start = Instant::now();

        let run = || -> Vec<std::result::Result<DayResult, SessionFailure>> {
            jobs.par_iter().map(|job| self.run_job(job)).collect()
        };

        let outcomes = match self.batch_config.num_threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| AnalysisError::generic(format!("thread pool: {e}")))?
                .install(run),
            None => run(),
        };

        let mut results = Vec::with_capacity(jobs.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(failure) => {
                    log::warn!(
                        "session {} {} failed: {}",
                        failure.symbol,
                        failure.date,
                        failure.reason
                    );
                    if self.batch_config.error_mode == ErrorMode::FailFast {
                        return Err(AnalysisError::Session {
                            symbol: failure.symbol,
                            date: failure.date.to_string(),
                            reason: failure.reason,
                        });
                    }
                    failures.push(failure);
                }
            }
        }

        let output = BatchOutput {
            results,
            failures,
            elapsed: start.elapsed(),
        };
        log::info!(
            "batch: {} sessions ok, {} failed, {:?} on {} threads",
            output.successful_count(),
            output.failed_count(),
            output.elapsed,
            self.batch_config.effective_threads()
        );
        Ok(output)
    }

    fn run_job(&self, job: &SessionJob) -> std::result::Result<DayResult, SessionFailure> {
        if job.ticks.is_empty() {
            return Err(SessionFailure {
                symbol: job.symbol.clone(),
                date: job.date,
                reason: "no tick data available".to_string(),
            });
        }
        Ok(self.analyzer.analyze_day(
            &job.symbol,
            job.date,
            &job.ticks,
            &job.prior_costs,
            job.float_market_cap,
        ))
    }
}
