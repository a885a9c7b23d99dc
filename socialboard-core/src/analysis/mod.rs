//! Analysis requests
//!
//! An [`Analysis`] asks the aggregation API for a breakdown of one dimension.
//! Nested breakdowns (e.g. gender, then age) are expressed as a chain: each
//! analysis owns the analysis of the next dimension as its `child`.
//!
//! ```text
//! Analysis(fb.author.age) ── child ──▶ Analysis(fb.author.gender) ── child ──▶ None
//! ```
//!
//! See [`analyzer`] for how chains are built and how batches are sent to an
//! [`AggregationClient`].

pub mod analyzer;
pub mod client;

pub use analyzer::{interval_duration, Analyzer, Clock, FixedClock, SystemClock};
pub use client::AggregationClient;

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================
// Recording
// ============================================

/// Data source an analysis runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    /// When the recording started collecting data
    pub created_at: DateTime<Utc>,
}

impl Recording {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ============================================
// Analysis types
// ============================================

/// Kind of aggregation requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisType {
    #[serde(rename = "freqDist")]
    FrequencyDistribution,
    #[serde(rename = "timeSeries")]
    TimeSeries,
}

impl AnalysisType {
    /// Identifier used by the aggregation API
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::FrequencyDistribution => "freqDist",
            AnalysisType::TimeSeries => "timeSeries",
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnalysisType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "freqDist" => Ok(AnalysisType::FrequencyDistribution),
            "timeSeries" => Ok(AnalysisType::TimeSeries),
            _ => Err(Error::InvalidArgument(format!(
                "unknown analysis type: {}",
                s
            ))),
        }
    }
}

/// Per-type request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnalysisKind {
    #[serde(rename = "freqDist")]
    FrequencyDistribution {
        /// Maximum number of result rows
        threshold: u32,
    },
    #[serde(rename = "timeSeries")]
    TimeSeries {
        interval: String,
        span: u32,
    },
}

impl AnalysisKind {
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            AnalysisKind::FrequencyDistribution { .. } => AnalysisType::FrequencyDistribution,
            AnalysisKind::TimeSeries { .. } => AnalysisType::TimeSeries,
        }
    }
}

/// Caller-supplied parameters for building analyses.
///
/// Unset time-series fields fall back to the analyzer's configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisParameters {
    /// `minute`, `hour`, `day` or `week`
    #[serde(default)]
    pub interval: Option<String>,
    /// Number of intervals per time-series bucket
    #[serde(default)]
    pub span: Option<u32>,
}

impl AnalysisParameters {
    pub fn time_series(interval: impl Into<String>, span: u32) -> Self {
        Self {
            interval: Some(interval.into()),
            span: Some(span),
        }
    }
}

// ============================================
// Analysis
// ============================================

/// One aggregation request, possibly with a nested child request.
///
/// Target, recording, bounds and filter are fixed at construction. Results
/// are set once by the aggregation client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    kind: AnalysisKind,
    target: String,
    recording: Option<Recording>,
    start: Option<i64>,
    end: Option<i64>,
    filter: Option<String>,
    results: Option<Value>,
    child: Option<Box<Analysis>>,
}

impl Analysis {
    pub fn new(
        kind: AnalysisKind,
        target: impl Into<String>,
        recording: Option<Recording>,
        start: Option<i64>,
        end: Option<i64>,
        filter: Option<String>,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            recording,
            start,
            end,
            filter,
            results: None,
            child: None,
        }
    }

    /// Nest `child` below this analysis.
    pub fn with_child(mut self, child: Analysis) -> Self {
        self.child = Some(Box::new(child));
        self
    }

    pub fn kind(&self) -> &AnalysisKind {
        &self.kind
    }

    pub fn analysis_type(&self) -> AnalysisType {
        self.kind.analysis_type()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    /// Lower bound as a unix timestamp, `None` for unbounded
    pub fn start(&self) -> Option<i64> {
        self.start
    }

    /// Upper bound as a unix timestamp, `None` for unbounded
    pub fn end(&self) -> Option<i64> {
        self.end
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn child(&self) -> Option<&Analysis> {
        self.child.as_deref()
    }

    /// This analysis followed by every nested child, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &Analysis> {
        std::iter::successors(Some(self), |analysis| analysis.child())
    }

    pub fn results(&self) -> Option<&Value> {
        self.results.as_ref()
    }

    pub fn has_results(&self) -> bool {
        self.results.is_some()
    }

    /// Store the raw aggregation result.
    ///
    /// Results can only be set once.
    pub fn set_results(&mut self, results: Value) -> Result<()> {
        if self.results.is_some() {
            return Err(Error::InvalidArgument(format!(
                "results of the {} analysis of {} are already set",
                self.kind.analysis_type(),
                self.target
            )));
        }
        self.results = Some(results);
        Ok(())
    }
}

// ============================================
// Analysis collection
// ============================================

/// Batch of analyses submitted to the aggregation client in one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisCollection {
    analyses: Vec<Analysis>,
}

impl AnalysisCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, analysis: Analysis) {
        self.analyses.push(analysis);
    }

    pub fn len(&self) -> usize {
        self.analyses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Analysis> {
        self.analyses.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Analysis> {
        self.analyses.iter()
    }

    pub fn as_mut_slice(&mut self) -> &mut [Analysis] {
        &mut self.analyses
    }

    pub fn into_inner(self) -> Vec<Analysis> {
        self.analyses
    }
}

impl FromIterator<Analysis> for AnalysisCollection {
    fn from_iter<I: IntoIterator<Item = Analysis>>(iter: I) -> Self {
        Self {
            analyses: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for AnalysisCollection {
    type Item = Analysis;
    type IntoIter = std::vec::IntoIter<Analysis>;

    fn into_iter(self) -> Self::IntoIter {
        self.analyses.into_iter()
    }
}
