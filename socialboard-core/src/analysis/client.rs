//! Aggregation client boundary
//!
//! The engine does not talk to the aggregation API itself. Implementations
//! of [`AggregationClient`] do, and are handed whole batches so they can issue
//! one request (or their own concurrent sub-requests) per batch.

use std::future::Future;

use super::Analysis;
use crate::error::Result;

/// Fills in the results of a batch of analyses.
///
/// On success every analysis in `analyses` must have its results set. Errors
/// are returned to the caller as they are; retries belong to the
/// implementation.
///
/// ## Example
///
/// ```rust,ignore
/// use socialboard_core::analysis::{AggregationClient, Analysis};
///
/// struct ApiClient { /* http client, credentials */ }
///
/// impl AggregationClient for ApiClient {
///     async fn analyze(&self, analyses: &mut [Analysis]) -> Result<()> {
///         for analysis in analyses.iter_mut() {
///             let raw = self.fetch(analysis).await?;
///             analysis.set_results(raw)?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait AggregationClient: Send + Sync {
    fn analyze(&self, analyses: &mut [Analysis]) -> impl Future<Output = Result<()>> + Send;
}
