//! Fusion Service (C4) — merges the static catalog with the live analytics
//! feed into a single immutable snapshot, published by atomic pointer swap
//! the way `registry::ModelRegistry` publishes its catalog.

use crate::feed::FeedModelRow;
use crate::registry::ModelRegistry;
use crate::types::{ModelProfile, ProvenanceSource};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const VENDOR_TOKENS: [&str; 5] = ["openai", "anthropic", "google", "gemini", "meta"];
const MATCH_KEYWORDS: [&str; 10] =
    ["gpt", "claude", "gemini", "llama", "turbo", "pro", "ultra", "opus", "sonnet", "haiku"];

pub struct FusedSnapshot {
    pub models: Vec<ModelProfile>,
    pub generated_at: DateTime<Utc>,
    pub source_etag: Option<String>,
}

pub struct FusionService {
    registry: Arc<ModelRegistry>,
    snapshot: ArcSwap<FusedSnapshot>,
    max_snapshot_age_days: i64,
    stale_quality_penalty: f64,
    keyword_overlap_min: usize,
    pub feed_fallback_count: AtomicU64,
}

impl FusionService {
    pub fn new(registry: Arc<ModelRegistry>, max_snapshot_age_days: i64, stale_quality_penalty: f64, keyword_overlap_min: usize) -> Self {
        let catalog_only = Self::catalog_only_snapshot(&registry);
        Self {
            registry,
            snapshot: ArcSwap::from_pointee(catalog_only),
            max_snapshot_age_days,
            stale_quality_penalty,
            keyword_overlap_min,
            feed_fallback_count: AtomicU64::new(0),
        }
    }

    fn catalog_only_snapshot(registry: &ModelRegistry) -> FusedSnapshot {
        let models = registry
            .all()
            .iter()
            .cloned()
            .map(|mut m| {
                m.provenance.data_quality = 0.8;
                m
            })
            .collect();
        FusedSnapshot { models, generated_at: Utc::now(), source_etag: None }
    }

    /// Read the current snapshot, applying the 7-day staleness discount
    /// (spec.md §4.4) without mutating the stored copy.
    pub fn snapshot(&self) -> Arc<FusedSnapshot> {
        let snap = self.snapshot.load_full();
        let age_days = (Utc::now() - snap.generated_at).num_days();
        if age_days > self.max_snapshot_age_days {
            let models = snap
                .models
                .iter()
                .cloned()
                .map(|mut m| {
                    m.provenance.data_quality = (m.provenance.data_quality - self.stale_quality_penalty).max(0.0);
                    m
                })
                .collect();
            return Arc::new(FusedSnapshot { models, generated_at: snap.generated_at, source_etag: snap.source_etag.clone() });
        }
        snap
    }

    /// Record feed failure, keeping the previous snapshot (spec.md §4.4
    /// "Failure semantics").
    pub fn note_feed_failure(&self) {
        self.feed_fallback_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Build and atomically publish a new fused snapshot from the current
    /// catalog plus the given feed rows (spec.md §4.4).
    pub fn refresh(&self, feed_rows: Vec<FeedModelRow>, etag: Option<String>) {
        let catalog = self.registry.all();
        let mut matched_feed = vec![false; feed_rows.len()];
        let mut fused = Vec::with_capacity(catalog.len());

        for model in catalog.iter() {
            let mut candidate = model.clone();
            let mut matched = false;
            for (i, row) in feed_rows.iter().enumerate() {
                if matched_feed[i] {
                    continue;
                }
                if self.matches(model, row) {
                    candidate = merge(model, row);
                    matched_feed[i] = true;
                    matched = true;
                    break;
                }
            }
            if !matched {
                candidate.provenance.data_quality = 0.8;
                candidate.provenance.source = ProvenanceSource::Static;
            }
            fused.push(candidate);
        }

        for (i, row) in feed_rows.iter().enumerate() {
            if matched_feed[i] {
                continue;
            }
            fused.push(feed_sourced(row));
        }

        let new_snapshot =
            FusedSnapshot { models: fused, generated_at: Utc::now(), source_etag: etag };
        self.snapshot.store(Arc::new(new_snapshot));
    }

    /// Matching cascade: exact id, then canonical name, then
    /// provider+keyword overlap (spec.md §4.4 "Matching rules").
    fn matches(&self, model: &ModelProfile, row: &FeedModelRow) -> bool {
        if model.id.eq_ignore_ascii_case(&row.slug) {
            return true;
        }
        if canonical_name(&model.id) == canonical_name(&row.slug)
            || canonical_name(&model.display_name) == canonical_name(&row.slug)
        {
            return true;
        }
        if model.provider.eq_ignore_ascii_case(&row.provider) {
            let overlap = keyword_overlap(&model.id, &row.slug);
            if overlap >= self.keyword_overlap_min {
                return true;
            }
        }
        false
    }
}

fn canonical_name(s: &str) -> String {
    let lower = s.to_ascii_lowercase();
    let mut stripped = lower;
    for token in VENDOR_TOKENS {
        stripped = stripped.replace(token, "");
    }
    stripped.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

fn keyword_overlap(a: &str, b: &str) -> usize {
    let a = a.to_ascii_lowercase();
    let b = b.to_ascii_lowercase();
    MATCH_KEYWORDS.iter().filter(|kw| a.contains(*kw) && b.contains(*kw)).count()
}

/// Merge a matched pair: feed wins for dynamic fields, catalog wins for
/// `context_window` and provider spelling (spec.md §4.4 "Merge policy").
fn merge(catalog: &ModelProfile, row: &FeedModelRow) -> ModelProfile {
    let mut model = catalog.clone();

    for (key, _) in row.composite_indices.iter() {
        if let Some(v) = row.normalized_composite(key) {
            model.composite_indices.insert(key.clone(), v);
            model.capabilities.insert(key.clone(), v);
        }
    }
    for (key, value) in row.benchmarks.iter() {
        model.benchmarks.insert(key.clone(), *value);
    }
    if let Some(cost_in) = row.cost_in_per_1k() {
        model.economics.cost_in_per_1k = cost_in;
    }
    if let Some(cost_out) = row.cost_out_per_1k() {
        model.economics.cost_out_per_1k = cost_out;
    }
    if let Some(throughput) = row.median_throughput_tokens_sec {
        model.latency.throughput_tokens_sec = Some(throughput);
    }
    if let Some(latency) = row.avg_latency_ms() {
        model.latency.avg_latency_ms = latency;
    }

    model.provenance.source = ProvenanceSource::Fused;
    model.provenance.last_consolidated = Utc::now();
    model.provenance.data_quality = 0.95;
    model
}

fn feed_sourced(row: &FeedModelRow) -> ModelProfile {
    let mut capabilities = std::collections::HashMap::new();
    let mut composite_indices = std::collections::HashMap::new();
    for key in row.composite_indices.keys() {
        if let Some(v) = row.normalized_composite(key) {
            capabilities.insert(key.clone(), v);
            composite_indices.insert(key.clone(), v);
        }
    }

    ModelProfile {
        id: row.slug.clone(),
        provider: row.provider.clone(),
        display_name: row.slug.clone(),
        api_alias: None,
        context_window: 4096,
        max_output_tokens: None,
        model_type: row.model_type.unwrap_or(crate::types::ModelType::Text),
        open_source: false,
        release_date: row.release_date,
        economics: crate::types::Economics {
            cost_in_per_1k: row.cost_in_per_1k().unwrap_or(0.0),
            cost_out_per_1k: row.cost_out_per_1k().unwrap_or(0.0),
            ..Default::default()
        },
        latency: crate::types::LatencyProfile {
            avg_latency_ms: row.avg_latency_ms().unwrap_or(0),
            throughput_tokens_sec: row.median_throughput_tokens_sec,
            ..Default::default()
        },
        capabilities,
        task_capabilities: std::collections::HashMap::new(),
        benchmarks: row.benchmarks.clone(),
        composite_indices,
        community: None,
        routing: None,
        tags: vec!["feed-sourced".to_string()],
        provenance: crate::types::Provenance {
            source: ProvenanceSource::Feed,
            last_consolidated: Utc::now(),
            data_quality: 1.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Economics, LatencyProfile, ModelType, Provenance};
    use std::collections::HashMap;

    fn model(id: &str, provider: &str) -> ModelProfile {
        ModelProfile {
            id: id.into(),
            provider: provider.into(),
            display_name: id.into(),
            api_alias: None,
            context_window: 8192,
            max_output_tokens: None,
            model_type: ModelType::Text,
            open_source: false,
            release_date: None,
            economics: Economics::default(),
            latency: LatencyProfile::default(),
            capabilities: HashMap::new(),
            task_capabilities: HashMap::new(),
            benchmarks: HashMap::new(),
            composite_indices: HashMap::new(),
            community: None,
            routing: None,
            tags: vec![],
            provenance: Provenance::default(),
        }
    }

    fn feed_row(slug: &str, provider: &str) -> FeedModelRow {
        FeedModelRow {
            slug: slug.into(),
            provider: provider.into(),
            release_date: None,
            model_type: None,
            composite_indices: HashMap::from([("coding".to_string(), 88.0)]),
            benchmarks: HashMap::new(),
            price_1m_input: Some(3.0),
            price_1m_output: Some(9.0),
            median_throughput_tokens_sec: Some(100.0),
            median_ttft_seconds: Some(0.3),
        }
    }

    #[test]
    fn exact_id_match_fuses_and_preserves_context_window() {
        let registry = ModelRegistry::load_for_test(vec![model("gpt-5", "openai")]);
        let fusion = FusionService::new(Arc::new(registry), 7, 0.1, 2);
        fusion.refresh(vec![feed_row("gpt-5", "openai")], Some("abc".into()));

        let snap = fusion.snapshot();
        assert_eq!(snap.models.len(), 1, "matched feed row must not duplicate the catalog entry");
        let m = &snap.models[0];
        assert_eq!(m.context_window, 8192, "catalog wins context_window");
        assert_eq!(m.capabilities["coding"], 0.88);
        assert_eq!(m.provenance.data_quality, 0.95);
    }

    #[test]
    fn unmatched_catalog_row_survives_i3() {
        let registry = ModelRegistry::load_for_test(vec![model("obscure-model", "smallco")]);
        let fusion = FusionService::new(Arc::new(registry), 7, 0.1, 2);
        fusion.refresh(vec![feed_row("gpt-5", "openai")], None);

        let snap = fusion.snapshot();
        assert_eq!(snap.models.len(), 2, "fusion must never evict a catalog model");
        assert!(snap.models.iter().any(|m| m.id == "obscure-model"));
        assert!(snap.models.iter().any(|m| m.id == "gpt-5" && m.tags.contains(&"feed-sourced".to_string())));
    }

    #[test]
    fn stale_snapshot_discounts_quality() {
        let registry = ModelRegistry::load_for_test(vec![model("m1", "acme")]);
        let fusion = FusionService::new(Arc::new(registry), 7, 0.1, 2);
        fusion.refresh(vec![], None);
        // Force an old snapshot by swapping one in directly.
        let old = FusedSnapshot {
            models: fusion.snapshot().models.clone(),
            generated_at: Utc::now() - chrono::Duration::days(10),
            source_etag: None,
        };
        fusion.snapshot.store(Arc::new(old));

        let snap = fusion.snapshot();
        assert!(snap.models[0].provenance.data_quality < 0.8);
    }
}
