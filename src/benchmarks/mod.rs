//! Benchmark Store (C2) — durable per-(model, source, metric) upsert, range
//! queries, and loose/fuzzy lookup (spec.md §4.2).
//!
//! The "durable key/value shape" spec.md §6 asks for is expressed as the
//! [`BenchmarkBackend`] trait; [`MemoryBenchmarkBackend`] is the default,
//! in-process implementation. Swapping in a real persistence layer means
//! implementing the trait — the storage engine choice itself is out of
//! scope (spec.md §1).

use crate::config::BenchmarkStoreConfig;
use crate::types::{BenchmarkMetricRow, RouterError, RouterResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// Storage contract for benchmark rows. Writers serialize per `source`;
/// reads may run concurrently (spec.md §4.2 "Policy").
pub trait BenchmarkBackend: Send + Sync {
    fn upsert_batch(&self, source: &str, rows: Vec<BenchmarkMetricRow>) -> RouterResult<()>;
    fn get_all(&self) -> Vec<BenchmarkMetricRow>;
    fn sources(&self) -> Vec<String>;
}

type SourceTable = HashMap<String, HashMap<(String, String), BenchmarkMetricRow>>;

#[derive(Default)]
pub struct MemoryBenchmarkBackend {
    // source -> (model_id, metric) -> row
    table: RwLock<SourceTable>,
}

impl BenchmarkBackend for MemoryBenchmarkBackend {
    fn upsert_batch(&self, source: &str, rows: Vec<BenchmarkMetricRow>) -> RouterResult<()> {
        let mut table = self
            .table
            .write()
            .map_err(|_| RouterError::ServiceUnavailable("benchmark store lock poisoned".into()))?;
        let bucket = table.entry(source.to_string()).or_default();
        for row in rows {
            let (_, _, metric) = row.key();
            bucket.insert((row.model_id.clone(), metric), row);
        }
        Ok(())
    }

    fn get_all(&self) -> Vec<BenchmarkMetricRow> {
        self.table
            .read()
            .map(|t| t.values().flat_map(|m| m.values().cloned()).collect())
            .unwrap_or_default()
    }

    fn sources(&self) -> Vec<String> {
        self.table.read().map(|t| t.keys().cloned().collect()).unwrap_or_default()
    }
}

pub struct BenchmarkStore {
    backend: Box<dyn BenchmarkBackend>,
    config: BenchmarkStoreConfig,
}

impl BenchmarkStore {
    pub fn new(config: BenchmarkStoreConfig) -> Self {
        Self { backend: Box::new(MemoryBenchmarkBackend::default()), config }
    }

    pub fn with_backend(backend: Box<dyn BenchmarkBackend>, config: BenchmarkStoreConfig) -> Self {
        Self { backend, config }
    }

    /// Atomic batch upsert; `(model_id, source, metric)` is the conflict key
    /// (invariant I2/P4).
    pub fn upsert(&self, source: &str, rows: Vec<BenchmarkMetricRow>) -> RouterResult<()> {
        self.backend.upsert_batch(source, rows)
    }

    pub fn list_models(&self, source: Option<&str>) -> Vec<String> {
        let mut ids: Vec<String> = self
            .backend
            .get_all()
            .into_iter()
            .filter(|r| source.map_or(true, |s| r.source == s))
            .map(|r| r.model_id)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, model_id: &str) -> Vec<BenchmarkMetricRow> {
        self.backend.get_all().into_iter().filter(|r| r.model_id == model_id).collect()
    }

    /// Loose lookup: exact, then case-insensitive exact. No false positives.
    pub fn get_loose(&self, slug: &str) -> Vec<BenchmarkMetricRow> {
        let exact = self.get(slug);
        if !exact.is_empty() {
            return exact;
        }
        let lower = slug.to_ascii_lowercase();
        self.backend
            .get_all()
            .into_iter()
            .filter(|r| r.model_id.to_ascii_lowercase() == lower)
            .collect()
    }

    /// Fuzzy, best-effort lookup: raw substring, whitespace-insensitive
    /// substring, then a lowercased/hyphenated slug match.
    pub fn get_fuzzy(&self, slug: &str, limit: Option<usize>) -> Vec<BenchmarkMetricRow> {
        let limit = limit.unwrap_or(self.config.fuzzy_match_limit);
        let all = self.backend.get_all();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();

        let candidates = [
            slug.to_string(),
            slug.split_whitespace().collect::<Vec<_>>().join(""),
            slug.to_ascii_lowercase().replace(' ', "-"),
        ];

        for row in all {
            if out.len() >= limit {
                break;
            }
            let haystack = row.model_id.to_ascii_lowercase();
            if candidates.iter().any(|c| haystack.contains(&c.to_ascii_lowercase())) {
                let key = row.key();
                if seen.insert(key) {
                    out.push(row);
                }
            }
        }
        out
    }

    pub fn get_all(&self) -> Vec<BenchmarkMetricRow> {
        self.backend.get_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(model: &str, source: &str, metric: &str, value: f64) -> BenchmarkMetricRow {
        BenchmarkMetricRow {
            model_id: model.into(),
            source: source.into(),
            metric_name: metric.into(),
            value,
            unit: "score".into(),
            task: None,
            difficulty: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn upsert_overwrites_on_conflict_key_p4() {
        let store = BenchmarkStore::new(BenchmarkStoreConfig::default());
        store.upsert("analytics", vec![row("gpt-5", "analytics", "humaneval", 0.8)]).unwrap();
        store.upsert("analytics", vec![row("gpt-5", "analytics", "humaneval", 0.95)]).unwrap();

        let rows = store.get("gpt-5");
        assert_eq!(rows.len(), 1, "re-upserting the same key must overwrite, not duplicate");
        assert_eq!(rows[0].value, 0.95);
    }

    #[test]
    fn loose_then_fuzzy_lookup_order() {
        let store = BenchmarkStore::new(BenchmarkStoreConfig::default());
        store.upsert("analytics", vec![row("Claude-Sonnet-4", "analytics", "mmlu", 0.9)]).unwrap();

        assert_eq!(store.get("Claude-Sonnet-4").len(), 1);
        assert_eq!(store.get_loose("claude-sonnet-4").len(), 1);
        assert_eq!(store.get_loose("nonexistent-model").len(), 0);
        assert_eq!(store.get_fuzzy("claude sonnet", None).len(), 1);
    }

    #[test]
    fn list_models_is_distinct_and_ordered() {
        let store = BenchmarkStore::new(BenchmarkStoreConfig::default());
        store
            .upsert("analytics", vec![row("b-model", "analytics", "mmlu", 0.5), row("a-model", "analytics", "mmlu", 0.4)])
            .unwrap();
        assert_eq!(store.list_models(None), vec!["a-model".to_string(), "b-model".to_string()]);
    }
}
