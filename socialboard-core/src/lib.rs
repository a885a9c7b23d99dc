//! # socialboard-core
//!
//! Core engine for socialboard - analytical dashboards over aggregated
//! social data.
//!
//! This library provides:
//! - Dimensions and ordered dimension collections
//! - Data sets that pivot aggregation trees into any dimension order
//! - Analysis chain construction and batched aggregation calls
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Data flow
//!
//! ```text
//! dimensions ─▶ Analyzer::build_analysis ─▶ analysis chain
//!                                              │
//!                 AggregationClient (batched) ◀┘
//!                                              │
//!            DataSet::from_analysis ◀──────────┘
//!                   │
//!                   ├─▶ pivot (chart axis order)
//!                   └─▶ simple (bare values)
//! ```
//!
//! The engine never performs I/O itself; the aggregation API is reached only
//! through an [`AggregationClient`] supplied by the caller.

// Re-export commonly used items at the crate root
pub use analysis::{
    AggregationClient, Analysis, AnalysisCollection, AnalysisKind, AnalysisParameters,
    AnalysisType, Analyzer, Recording,
};
pub use config::Config;
pub use dataset::{DataSet, Measure};
pub use dimension::{Dimension, DimensionCollection, DimensionOrder};
pub use error::{Error, Result};

// Public modules
pub mod analysis;
pub mod config;
pub mod dataset;
pub mod dimension;
pub mod error;
pub mod logging;
