//! Scoring Engine (C6) — normalizes per-candidate signals into five
//! component scores and blends them into a single utility under a
//! priority-dependent weight vector (spec.md §4.6). Stateless aside from
//! its `ScoringConfig`, matching the pure-function shape the teacher uses
//! for `pipeline` stage transforms.

use crate::config::{PriorityWeights, ScoringConfig};
use crate::types::{ClassificationResult, ComponentScores, ModelProfile, ModelType, Priority, RankedCandidate};

const CODING_METRICS: [&str; 3] = ["humaneval", "livecodebench", "swe-bench"];
const MATH_METRICS: [&str; 3] = ["gsm8k", "math500", "aime"];
const REASONING_METRICS: [&str; 3] = ["mmlu", "mmlu-pro", "arc"];
const GENERATIVE_METRICS: [&str; 4] = ["clip_score", "user_preference", "temporal_consistency", "user_studies"];

pub struct ScoringEngine {
    config: ScoringConfig,
}

pub struct FleetRange {
    pub cost_min: f64,
    pub cost_max: f64,
    pub latency_min: f64,
    pub latency_max: f64,
}

impl FleetRange {
    pub fn from_candidates(models: &[&ModelProfile]) -> Self {
        let costs: Vec<f64> = models.iter().map(|m| m.economics.cost_out_per_1k).collect();
        let latencies: Vec<f64> = models.iter().map(|m| m.latency.avg_latency_ms as f64).collect();
        Self {
            cost_min: costs.iter().cloned().fold(f64::INFINITY, f64::min),
            cost_max: costs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            latency_min: latencies.iter().cloned().fold(f64::INFINITY, f64::min),
            latency_max: latencies.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    fn norm_cost(&self, cost: f64) -> f64 {
        normalize(cost, self.cost_min, self.cost_max)
    }

    fn norm_latency(&self, latency: f64) -> f64 {
        normalize(latency, self.latency_min, self.latency_max)
    }
}

fn normalize(v: f64, min: f64, max: f64) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        return 0.0;
    }
    ((v - min) / (max - min)).clamp(0.0, 1.0)
}

fn task_type_key(t: ModelType) -> &'static str {
    match t {
        ModelType::Text => "text",
        ModelType::Image => "image",
        ModelType::Video => "video",
        ModelType::Audio => "audio",
        ModelType::Multimodal => "multimodal",
    }
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn weights_for(&self, priority: Priority) -> &PriorityWeights {
        match priority {
            Priority::Quality => &self.config.quality,
            Priority::Speed => &self.config.speed,
            Priority::Cost => &self.config.cost,
            Priority::Balanced => &self.config.balanced,
        }
    }

    pub fn drop_threshold(&self) -> f64 {
        self.config.drop_below_overall_score
    }

    pub fn score(&self, model: &ModelProfile, classification: &ClassificationResult, priority: Priority, range: &FleetRange) -> RankedCandidate {
        let capability = capability_score(model, classification);
        let complexity = complexity_match_score(model, classification);
        let (performance, performance_present) = performance_score(model, priority);
        let (community, community_present) = community_score(model, classification);
        let (benchmark, benchmark_present) = benchmark_score(model, classification);

        let component_scores = ComponentScores { capability, complexity, performance, community, benchmark };

        let sparse = !community_present && !benchmark_present;
        let mut overall = if sparse {
            0.72 * capability + 0.18 * (1.0 - range.norm_cost(model.economics.cost_out_per_1k)) + 0.10 * (1.0 - range.norm_latency(model.latency.avg_latency_ms as f64))
        } else {
            let w = self.weights_for(priority);
            capability * w.capability + complexity * w.complexity + performance * w.performance + community * w.community + benchmark * w.benchmark
        };

        overall = apply_priority_modifiers(overall, model, priority);
        overall = overall.clamp(0.0, 1.0);

        let completeness = [true, performance_present, community_present, benchmark_present].iter().filter(|p| **p).count() as f64 * 0.3;
        let analytics_bonus = if !matches!(model.provenance.source, crate::types::ProvenanceSource::Static) { 0.1 } else { 0.0 };
        let confidence = (model.provenance.data_quality * completeness + analytics_bonus).clamp(0.0, 1.0);

        let cost_estimate = cost_estimate(model, classification.task_type);
        let reasoning = build_reasoning(classification, &component_scores, model);
        let warnings = build_warnings(model, classification, priority);

        RankedCandidate { model: model.clone(), overall_score: overall, component_scores, reasoning, confidence, cost_estimate, warnings }
    }

    /// Stable ordering per spec.md §4.6 "Tie-break".
    pub fn compare(a: &RankedCandidate, b: &RankedCandidate) -> std::cmp::Ordering {
        b.overall_score
            .partial_cmp(&a.overall_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cost_estimate.partial_cmp(&b.cost_estimate).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.model.latency.avg_latency_ms.cmp(&b.model.latency.avg_latency_ms))
            .then_with(|| a.model.id.cmp(&b.model.id))
    }
}

fn capability_score(model: &ModelProfile, classification: &ClassificationResult) -> f64 {
    if classification.task_type == ModelType::Text {
        model
            .capabilities
            .get(&classification.category)
            .copied()
            .or_else(|| model.best_composite(&[classification.category.as_str()]))
            .unwrap_or(0.7)
    } else {
        model
            .task_capabilities
            .get(task_type_key(classification.task_type))
            .map(|c| c.score)
            .or_else(|| model.capabilities.get(&classification.category).copied())
            .or_else(|| model.best_composite(&[classification.category.as_str()]))
            .unwrap_or(0.7)
    }
}

fn complexity_match_score(model: &ModelProfile, classification: &ClassificationResult) -> f64 {
    if classification.task_type == ModelType::Text {
        return 0.5;
    }
    match model.task_capabilities.get(task_type_key(classification.task_type)) {
        Some(cap) => {
            if classification.complexity == cap.max_complexity {
                1.0
            } else if classification.complexity <= cap.max_complexity {
                0.8
            } else {
                0.3
            }
        }
        None => 0.5,
    }
}

fn performance_score(model: &ModelProfile, priority: Priority) -> (f64, bool) {
    let latency_sub = 1.0 - (model.latency.avg_latency_ms as f64 / 10_000.0).min(1.0);
    let mut parts = vec![latency_sub];
    let mut present = model.latency.avg_latency_ms > 0;

    if let Some(throughput) = model.latency.throughput_tokens_sec {
        parts.push((throughput / 200.0).min(1.0));
        present = true;
    }
    if let Some(uptime) = model.latency.uptime_percentage {
        parts.push(uptime);
        present = true;
    }

    let mut avg = parts.iter().sum::<f64>() / parts.len() as f64;
    if priority == Priority::Speed {
        avg = (avg * 1.2).min(1.0);
    }
    (avg, present)
}

fn community_score(model: &ModelProfile, classification: &ClassificationResult) -> (f64, bool) {
    let Some(community) = &model.community else {
        return (0.6, false);
    };

    let mut parts = Vec::new();
    if let Some(sentiment) = community.sentiment {
        parts.push(((sentiment + 1.0) / 2.0).clamp(0.0, 1.0));
    }
    if let Some(rating) = community.developer_rating {
        parts.push(((rating - 1.0) / 4.0).clamp(0.0, 1.0));
    }
    if let Some(popularity) = community.popularity {
        parts.push(((popularity as f64 + 1.0).log10() / 5.0).min(1.0));
    }

    if parts.is_empty() {
        return (0.6, false);
    }

    let mut avg = parts.iter().sum::<f64>() / parts.len() as f64;
    if community.top_use_cases.iter().any(|u| u == &classification.category) {
        avg = (avg + 0.2).min(1.0);
    }
    (avg, true)
}

fn benchmark_score(model: &ModelProfile, classification: &ClassificationResult) -> (f64, bool) {
    if classification.task_type != ModelType::Text {
        if let Some(v) = model.best_composite(&GENERATIVE_METRICS) {
            return (v, true);
        }
        return (0.7, false);
    }

    let candidates: &[&str] = match classification.category.as_str() {
        "coding" => &CODING_METRICS,
        "math" => &MATH_METRICS,
        "reasoning" => &REASONING_METRICS,
        _ => &[],
    };
    if let Some(v) = model.best_composite(candidates) {
        return (v, true);
    }
    (0.7, false)
}

fn apply_priority_modifiers(overall: f64, model: &ModelProfile, priority: Priority) -> f64 {
    let mut score = overall;
    match priority {
        Priority::Cost => {
            if model.economics.free_tier {
                score *= 1.1;
            }
            if model.economics.cost_out_per_1k < 0.01 {
                score *= 1.1;
            }
        }
        Priority::Quality => {
            if model.provenance.data_quality > 0.9 {
                score *= 1.05;
            }
        }
        _ => {}
    }
    score.min(1.0)
}

/// `cost_estimate` by task type (spec.md §4.7 "Assemble").
pub fn cost_estimate(model: &ModelProfile, task_type: ModelType) -> f64 {
    match task_type {
        ModelType::Text => model.economics.cost_out_per_1k,
        ModelType::Image => model.economics.cost_per_image.unwrap_or(model.economics.cost_out_per_1k),
        ModelType::Video => model.economics.cost_per_second.map(|c| c * 10.0).unwrap_or(model.economics.cost_out_per_1k),
        ModelType::Audio => model.economics.cost_per_minute.unwrap_or(model.economics.cost_out_per_1k),
        ModelType::Multimodal => model.economics.cost_out_per_1k,
    }
}

fn build_reasoning(classification: &ClassificationResult, scores: &ComponentScores, model: &ModelProfile) -> String {
    let mut phrases = vec![format!("matched category '{}'", classification.category)];
    if scores.capability >= 0.8 {
        phrases.push(format!("strong capability fit ({:.2})", scores.capability));
    }
    if scores.benchmark >= 0.8 {
        phrases.push("backed by strong benchmark results".to_string());
    }
    if model.economics.free_tier {
        phrases.push("available on a free tier".to_string());
    }
    phrases.join(". ")
}

fn build_warnings(model: &ModelProfile, classification: &ClassificationResult, priority: Priority) -> Vec<String> {
    let mut warnings = Vec::new();
    if priority == Priority::Cost && model.economics.cost_out_per_1k > 0.02 {
        warnings.push("cost above the typical threshold for a cost-optimized request".to_string());
    }
    if let Some(uptime) = model.latency.uptime_percentage {
        if uptime < 0.95 {
            warnings.push("reported availability below 95%".to_string());
        }
    }
    if let Some(community) = &model.community {
        for weakness in &community.reported_weaknesses {
            if weakness.to_ascii_lowercase().contains(classification.category.as_str()) {
                warnings.push(format!("community reports a weakness in {}: {}", classification.category, weakness));
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Complexity, Economics, LatencyProfile, Provenance, ProvenanceSource};
    use std::collections::HashMap;

    fn model(id: &str, coding: f64, cost: f64, latency: u32) -> ModelProfile {
        ModelProfile {
            id: id.into(),
            provider: "acme".into(),
            display_name: id.into(),
            api_alias: None,
            context_window: 8192,
            max_output_tokens: None,
            model_type: ModelType::Text,
            open_source: false,
            release_date: None,
            economics: Economics { cost_in_per_1k: cost, cost_out_per_1k: cost, ..Default::default() },
            latency: LatencyProfile { avg_latency_ms: latency, ..Default::default() },
            capabilities: HashMap::from([("coding".to_string(), coding)]),
            task_capabilities: HashMap::new(),
            benchmarks: HashMap::new(),
            composite_indices: HashMap::new(),
            community: None,
            routing: None,
            tags: vec![],
            provenance: Provenance { source: ProvenanceSource::Static, data_quality: 0.8, ..Provenance::default() },
        }
    }

    fn classification() -> ClassificationResult {
        ClassificationResult {
            task_type: ModelType::Text,
            category: "coding".into(),
            complexity: Complexity::Medium,
            priority: Some(Priority::Balanced),
            requirements: Default::default(),
            sentiment: None,
            confidence: 0.8,
            detected_keywords: vec![],
            reasoning_steps: vec![],
        }
    }

    #[test]
    fn overall_score_in_bounds_p1() {
        let engine = ScoringEngine::new(ScoringConfig::default());
        let m = model("m1", 0.95, 0.01, 300);
        let range = FleetRange::from_candidates(&[&m]);
        let candidate = engine.score(&m, &classification(), Priority::Balanced, &range);
        assert!((0.0..=1.0).contains(&candidate.overall_score));
        assert!((0.0..=1.0).contains(&candidate.confidence));
    }

    #[test]
    fn weight_rows_sum_to_one_p2() {
        let engine = ScoringEngine::new(ScoringConfig::default());
        for p in [Priority::Quality, Priority::Speed, Priority::Cost, Priority::Balanced] {
            let w = engine.weights_for(p);
            let sum = w.capability + w.complexity + w.performance + w.community + w.benchmark;
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn tie_break_prefers_lower_cost_then_latency_then_id() {
        let engine = ScoringEngine::new(ScoringConfig::default());
        let cheap = RankedCandidate {
            model: model("a", 0.9, 0.01, 200),
            overall_score: 0.8,
            component_scores: ComponentScores::default(),
            reasoning: String::new(),
            confidence: 0.8,
            cost_estimate: 0.01,
            warnings: vec![],
        };
        let pricier = RankedCandidate {
            model: model("b", 0.9, 0.02, 100),
            overall_score: 0.8,
            component_scores: ComponentScores::default(),
            reasoning: String::new(),
            confidence: 0.8,
            cost_estimate: 0.02,
            warnings: vec![],
        };
        assert_eq!(ScoringEngine::compare(&cheap, &pricier), std::cmp::Ordering::Less);
    }
}
