//! Analysis chain construction and batched aggregation
//!
//! ## Chain order
//!
//! Dimensions are chained by descending cardinality, so the dimension with
//! the most distinct values branches first and the smallest one is nested
//! last. Unknown cardinality counts as the largest.
//!
//! ## Time bounds
//!
//! The aggregation API only answers time-series queries whose bounds fall on
//! whole intervals and only keeps data for a limited retention window. Start
//! bounds are therefore clamped to the newest of (recording creation, now
//! minus retention, requested start) and rounded up to an interval boundary;
//! end bounds are clamped to now and rounded down.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socialboard_core::analysis::{Analyzer, AnalysisCollection, AnalysisParameters, AnalysisType};
//!
//! let analyzer = Analyzer::new(client, config.analysis.clone());
//! let head = analyzer.build_analysis(
//!     Some(&recording),
//!     &dimensions,
//!     AnalysisType::FrequencyDistribution,
//!     None,
//!     None,
//!     &AnalysisParameters::default(),
//!     None,
//! )?;
//! let batch = analyzer
//!     .analyze_collection([head].into_iter().collect(), config.aggregation.deadline())
//!     .await?;
//! ```

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::client::AggregationClient;
use super::{Analysis, AnalysisCollection, AnalysisKind, AnalysisParameters, AnalysisType, Recording};
use crate::config::AnalysisConfig;
use crate::dimension::{Dimension, DimensionCollection, DimensionOrder};
use crate::error::{Error, Result};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Length of a time-series interval in seconds.
///
/// Unrecognized names fall back to one minute.
pub fn interval_duration(interval: &str) -> i64 {
    match interval {
        "minute" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 604_800,
        _ => 60,
    }
}

/// Saturates at `i64::MAX` when the next boundary is out of range. Such a
/// start is always past the end bound, which is clamped to now.
fn align_up(timestamp: i64, step: i64) -> i64 {
    match timestamp.rem_euclid(step) {
        0 => timestamp,
        rem => (timestamp - rem).checked_add(step).unwrap_or(i64::MAX),
    }
}

fn align_down(timestamp: i64, step: i64) -> i64 {
    timestamp - timestamp.rem_euclid(step)
}

/// Builds analysis chains and sends them to an [`AggregationClient`].
pub struct Analyzer<C, K = SystemClock> {
    client: C,
    clock: K,
    config: AnalysisConfig,
}

impl<C: AggregationClient> Analyzer<C, SystemClock> {
    pub fn new(client: C, config: AnalysisConfig) -> Self {
        Self::with_clock(client, config, SystemClock)
    }
}

impl<C: AggregationClient, K: Clock> Analyzer<C, K> {
    pub fn with_clock(client: C, config: AnalysisConfig, clock: K) -> Self {
        Self {
            client,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Build one analysis per dimension, chained by descending cardinality.
    ///
    /// Returns the head of the chain, i.e. the analysis of the
    /// highest-cardinality dimension.
    #[allow(clippy::too_many_arguments)]
    pub fn build_analysis(
        &self,
        recording: Option<&Recording>,
        dimensions: &DimensionCollection,
        analysis_type: AnalysisType,
        start: Option<i64>,
        end: Option<i64>,
        parameters: &AnalysisParameters,
        filter: Option<&str>,
    ) -> Result<Analysis> {
        let ordered = dimensions.dimensions(DimensionOrder::CardinalityDesc);

        // Build from the innermost dimension outwards so each analysis owns its child
        let mut head: Option<Analysis> = None;
        for dimension in ordered.iter().rev() {
            let analysis = self.create_analysis(
                recording,
                dimension,
                analysis_type,
                start,
                end,
                parameters,
                filter,
            )?;
            head = Some(match head.take() {
                Some(child) => analysis.with_child(child),
                None => analysis,
            });
        }

        let head = head.ok_or_else(|| {
            Error::InvalidArgument("an analysis needs at least one dimension".to_string())
        })?;

        tracing::debug!(
            analysis_type = %analysis_type,
            chain = ?head.chain().map(|a| a.target()).collect::<Vec<_>>(),
            "Built analysis chain"
        );

        Ok(head)
    }

    /// Build the analysis of a single dimension.
    #[allow(clippy::too_many_arguments)]
    pub fn create_analysis(
        &self,
        recording: Option<&Recording>,
        dimension: &Dimension,
        analysis_type: AnalysisType,
        start: Option<i64>,
        end: Option<i64>,
        parameters: &AnalysisParameters,
        filter: Option<&str>,
    ) -> Result<Analysis> {
        let (kind, start, end) = match analysis_type {
            AnalysisType::TimeSeries => {
                let interval = parameters
                    .interval
                    .clone()
                    .unwrap_or_else(|| self.config.default_interval.clone());
                let span = parameters.span.unwrap_or(self.config.default_span);
                if span == 0 {
                    return Err(Error::InvalidArgument(format!(
                        "time-series span for {} must be at least 1",
                        dimension.target()
                    )));
                }

                let duration = interval_duration(&interval) * i64::from(span);
                let start = self.adjust_time_series_start(start, duration, recording);
                let end = self.adjust_time_series_end(end, duration);
                (AnalysisKind::TimeSeries { interval, span }, start, end)
            }
            AnalysisType::FrequencyDistribution => {
                let threshold = dimension
                    .threshold
                    .unwrap_or(self.config.frequency_threshold);
                if threshold == 0 {
                    return Err(Error::InvalidArgument(format!(
                        "threshold for {} must be at least 1",
                        dimension.target()
                    )));
                }
                (AnalysisKind::FrequencyDistribution { threshold }, start, end)
            }
        };

        Ok(Analysis::new(
            kind,
            dimension.target(),
            recording.cloned(),
            start,
            end,
            filter.map(str::to_string),
        ))
    }

    /// Clamp a time-series start bound and round it up to a whole interval.
    pub fn adjust_time_series_start(
        &self,
        start: Option<i64>,
        interval_duration: i64,
        recording: Option<&Recording>,
    ) -> Option<i64> {
        let requested = start?;
        let retention_floor = self.clock.now().timestamp() - self.config.retention_secs();
        let created_at = recording.map_or(i64::MIN, |r| r.created_at.timestamp());

        let clamped = requested.max(retention_floor).max(created_at);
        let adjusted = align_up(clamped, interval_duration.max(1));

        tracing::debug!(requested, adjusted, interval_duration, "Adjusted time-series start");
        Some(adjusted)
    }

    /// Clamp a time-series end bound to now and round it down to a whole interval.
    pub fn adjust_time_series_end(&self, end: Option<i64>, interval_duration: i64) -> Option<i64> {
        let requested = end?;
        let clamped = requested.min(self.clock.now().timestamp());
        let adjusted = align_down(clamped, interval_duration.max(1));

        tracing::debug!(requested, adjusted, interval_duration, "Adjusted time-series end");
        Some(adjusted)
    }

    /// Populate the results of every analysis in `collection` with one
    /// client call.
    ///
    /// `deadline` bounds the whole call. Client errors are returned as they
    /// are and the collection is dropped with them.
    pub async fn analyze_collection(
        &self,
        mut collection: AnalysisCollection,
        deadline: Option<Duration>,
    ) -> Result<AnalysisCollection> {
        let started = Instant::now();
        let count = collection.len();

        let outcome = {
            let call = self.client.analyze(collection.as_mut_slice());
            match deadline {
                Some(deadline) => match tokio::time::timeout(deadline, call).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(Error::Timeout {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    }),
                },
                None => call.await,
            }
        };
        outcome?;

        if let Some(missing) = collection.iter().find(|a| !a.has_results()) {
            return Err(Error::Upstream(format!(
                "aggregation client returned no results for {}",
                missing.target()
            )));
        }

        tracing::info!(
            analyses = count,
            duration_ms = started.elapsed().as_millis() as u64,
            "Aggregation batch completed"
        );

        Ok(collection)
    }

    /// Populate the results of a single analysis.
    pub async fn analyze(&self, analysis: Analysis, deadline: Option<Duration>) -> Result<Analysis> {
        let collection: AnalysisCollection = std::iter::once(analysis).collect();
        self.analyze_collection(collection, deadline)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Upstream("aggregation client dropped the analysis".to_string()))
    }
}
