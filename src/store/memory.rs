//! In-memory metrics store

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::MetricsStore;
use crate::Result;
use crate::types::{DriverRaceKey, StintKey, StintMetric};

/// Metrics store held in memory.
///
/// Rows are stored behind `Arc`, so an upsert swaps one pointer under the
/// write lock and readers keep whichever complete row they already cloned.
#[derive(Debug, Default)]
pub struct MemoryMetricsStore {
    rows: RwLock<BTreeMap<StintKey, Arc<StintMetric>>>,
}

impl MemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Every row ordered by key
    pub async fn snapshot(&self) -> Vec<Arc<StintMetric>> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl MetricsStore for MemoryMetricsStore {
    async fn upsert(&self, metric: StintMetric) -> Result<()> {
        let key = metric.key;
        let replaced = self.rows.write().await.insert(key, Arc::new(metric)).is_some();
        if replaced {
            debug!(%key, "Replaced stint metric");
        } else {
            trace!(%key, "Inserted stint metric");
        }
        Ok(())
    }

    async fn get(&self, key: &StintKey) -> Result<Option<Arc<StintMetric>>> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn metrics_for(&self, key: DriverRaceKey) -> Result<Vec<Arc<StintMetric>>> {
        let first = StintKey::new(key.race_id, key.driver_id, 0);
        let last = StintKey::new(key.race_id, key.driver_id, u32::MAX);
        let rows = self.rows.read().await;
        Ok(rows.range(first..=last).map(|(_, metric)| Arc::clone(metric)).collect())
    }
}
