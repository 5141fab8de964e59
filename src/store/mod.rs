//! Metrics store for computed stint rows
//!
//! A store keeps exactly one [`StintMetric`] per [`StintKey`]. Writes are
//! whole-row replacements. A concurrent reader sees either the previous row or
//! the new one, never a mix of their fields. Concurrent upserts to the same
//! key resolve last-writer-wins. This is safe because computation is
//! deterministic for a fixed lap set.

pub mod memory;

pub use memory::MemoryMetricsStore;

use std::sync::Arc;

use crate::Result;
use crate::types::{DriverRaceKey, StintKey, StintMetric};

/// Persistence seam for stint metrics.
#[async_trait::async_trait]
pub trait MetricsStore: Send + Sync + 'static {
    /// Insert or atomically replace the row for `metric.key`
    async fn upsert(&self, metric: StintMetric) -> Result<()>;

    /// Current row for a key
    async fn get(&self, key: &StintKey) -> Result<Option<Arc<StintMetric>>>;

    /// All rows of one driver's race ordered by stint number
    async fn metrics_for(&self, key: DriverRaceKey) -> Result<Vec<Arc<StintMetric>>>;
}
