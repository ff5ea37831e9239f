//! Model Profile — the atomic unit of the registry (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Text,
    Image,
    Video,
    Audio,
    Multimodal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Hard,
    Expert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceSource {
    Static,
    Feed,
    Fused,
}

/// Capability score for a generative (non-text) task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeTaskCapability {
    pub score: f64,
    pub confidence: f64,
    pub max_complexity: Complexity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Economics {
    pub cost_in_per_1k: f64,
    pub cost_out_per_1k: f64,
    #[serde(default)]
    pub cost_per_image: Option<f64>,
    #[serde(default)]
    pub cost_per_second: Option<f64>,
    #[serde(default)]
    pub cost_per_minute: Option<f64>,
    #[serde(default)]
    pub free_tier: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyProfile {
    pub avg_latency_ms: u32,
    #[serde(default)]
    pub time_to_first_token_ms: Option<u32>,
    #[serde(default)]
    pub throughput_tokens_sec: Option<f64>,
    /// Already normalized to [0,1]; absent treated as unknown by the scorer.
    #[serde(default)]
    pub uptime_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommunitySignals {
    #[serde(default)]
    pub sentiment: Option<f64>,
    #[serde(default)]
    pub developer_rating: Option<f64>,
    #[serde(default)]
    pub popularity: Option<u64>,
    #[serde(default)]
    pub reported_weaknesses: Vec<String>,
    #[serde(default)]
    pub top_use_cases: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingMetadata {
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub success_rate: Option<f64>,
    #[serde(default)]
    pub specializations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub source: ProvenanceSource,
    pub last_consolidated: DateTime<Utc>,
    pub data_quality: f64,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            source: ProvenanceSource::Static,
            last_consolidated: Utc::now(),
            data_quality: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProfile {
    // Identity
    pub id: String,
    pub provider: String,
    pub display_name: String,
    #[serde(default)]
    pub api_alias: Option<String>,

    // Technical
    pub context_window: u32,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    pub model_type: ModelType,
    #[serde(default)]
    pub open_source: bool,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,

    // Economics / latency
    #[serde(default)]
    pub economics: Economics,
    #[serde(default)]
    pub latency: LatencyProfile,

    // Capabilities: category -> score for text tasks.
    #[serde(default)]
    pub capabilities: HashMap<String, f64>,
    /// For generative model types: task -> capability.
    #[serde(default)]
    pub task_capabilities: HashMap<String, GenerativeTaskCapability>,

    // Benchmarks: raw metric name -> value, plus composite indices.
    #[serde(default)]
    pub benchmarks: HashMap<String, f64>,
    #[serde(default)]
    pub composite_indices: HashMap<String, f64>,

    #[serde(default)]
    pub community: Option<CommunitySignals>,
    #[serde(default)]
    pub routing: Option<RoutingMetadata>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub provenance: Provenance,
}

impl ModelProfile {
    /// Clamp every capability score into [0,1] (invariant I1) and apply the
    /// 0.2 data-quality discount for any field the loader had to default.
    pub fn normalize(mut self) -> Self {
        for v in self.capabilities.values_mut() {
            *v = v.clamp(0.0, 1.0);
        }
        for cap in self.task_capabilities.values_mut() {
            cap.score = cap.score.clamp(0.0, 1.0);
            cap.confidence = cap.confidence.clamp(0.0, 1.0);
        }

        let mut discounted = false;
        if self.context_window == 0 {
            self.context_window = 4096;
            discounted = true;
        }
        if self.economics.cost_in_per_1k < 0.0 {
            self.economics.cost_in_per_1k = 0.0;
            discounted = true;
        }
        if self.economics.cost_out_per_1k < 0.0 {
            self.economics.cost_out_per_1k = 0.0;
            discounted = true;
        }
        if self.latency.avg_latency_ms == 0 {
            discounted = true;
        }
        if discounted {
            self.provenance.data_quality = (self.provenance.data_quality - 0.2).max(0.0);
        }
        self
    }

    pub fn capability_for(&self, category: &str) -> Option<f64> {
        self.capabilities.get(category).copied()
    }

    pub fn best_composite(&self, names: &[&str]) -> Option<f64> {
        names
            .iter()
            .filter_map(|n| self.composite_indices.get(*n).or_else(|| self.benchmarks.get(*n)))
            .cloned()
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ModelProfile {
        ModelProfile {
            id: "m1".into(),
            provider: "acme".into(),
            display_name: "M1".into(),
            api_alias: None,
            context_window: 0,
            max_output_tokens: None,
            model_type: ModelType::Text,
            open_source: false,
            release_date: None,
            economics: Economics { cost_in_per_1k: -1.0, ..Default::default() },
            latency: LatencyProfile::default(),
            capabilities: HashMap::from([("coding".to_string(), 1.5)]),
            task_capabilities: HashMap::new(),
            benchmarks: HashMap::new(),
            composite_indices: HashMap::new(),
            community: None,
            routing: None,
            tags: vec![],
            provenance: Provenance::default(),
        }
    }

    #[test]
    fn normalize_clamps_capabilities_and_discounts_quality() {
        let m = base().normalize();
        assert_eq!(m.capabilities["coding"], 1.0);
        assert_eq!(m.context_window, 4096);
        assert!(m.provenance.data_quality < 0.8);
    }
}
