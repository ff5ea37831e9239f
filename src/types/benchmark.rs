//! Benchmark Metric Row (spec.md §3) — the Benchmark Store's unit of storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkMetricRow {
    pub model_id: String,
    pub source: String,
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl BenchmarkMetricRow {
    /// The `(model_id, source, metric)` conflict/uniqueness key (invariant I2).
    pub fn key(&self) -> (String, String, String) {
        (self.model_id.clone(), self.source.clone(), self.metric_name.clone())
    }
}
