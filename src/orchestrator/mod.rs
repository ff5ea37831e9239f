//! Recommendation Orchestrator (C7) — the per-request pipeline: classify,
//! snapshot, filter, score, drop, sort, assemble (spec.md §4.7). Holds
//! only read references to its collaborators, mirroring the no-cycles
//! ownership rule in spec.md §9 and the teacher's `execute_pipeline`
//! request-scoped borrow-then-release shape.

use crate::classifier::Classifier;
use crate::fusion::FusionService;
use crate::scoring::{FleetRange, ScoringEngine};
use crate::types::{ModelProfile, ModelType, Priority, RecommendationRequest, RecommendationResponse, ResponseMetadata, RouterError, RouterResult};
use std::sync::Arc;
use std::time::Instant;

pub struct Orchestrator {
    classifier: Arc<Classifier>,
    fusion: Arc<FusionService>,
    scoring: Arc<ScoringEngine>,
}

impl Orchestrator {
    pub fn new(classifier: Arc<Classifier>, fusion: Arc<FusionService>, scoring: Arc<ScoringEngine>) -> Self {
        Self { classifier, fusion, scoring }
    }

    pub fn recommend(&self, request: &RecommendationRequest) -> RouterResult<RecommendationResponse> {
        let start = Instant::now();
        request.validate().map_err(RouterError::InvalidRequest)?;

        // Step 1: classify, explicit request fields take precedence.
        let mut classification = self.classifier.classify(&request.prompt);
        if let Some(task_type) = request.task_type {
            classification.task_type = task_type;
        }
        if let Some(category) = &request.category {
            classification.category = category.clone();
        }
        if let Some(complexity) = request.complexity {
            classification.complexity = complexity;
        }
        classification.priority = Some(request.priority.unwrap_or(Priority::Balanced));
        let priority = classification.priority.unwrap();

        // Step 2: snapshot the fused view.
        let snapshot = self.fusion.snapshot();
        let total_models = snapshot.models.len();

        // Step 3: filter.
        let mut applied_filters = vec!["task_type".to_string()];
        let survivors: Vec<&ModelProfile> = snapshot
            .models
            .iter()
            .filter(|m| task_type_matches(m.model_type, classification.task_type))
            .filter(|m| generative_bucket_supported(m, classification.task_type))
            .filter(|m| apply_constraints(m, request, &mut applied_filters))
            .collect();
        let filtered_models = total_models.saturating_sub(survivors.len());

        if survivors.is_empty() {
            return Ok(RecommendationResponse {
                classification,
                recommendations: vec![],
                metadata: self.metadata(priority, &applied_filters, total_models, filtered_models, start),
            });
        }

        // Step 4: score.
        let range = FleetRange::from_candidates(&survivors);
        let mut scored: Vec<_> = survivors.iter().map(|m| self.scoring.score(m, &classification, priority, &range)).collect();

        // Step 5: drop low scores.
        scored.retain(|c| c.overall_score > self.scoring.drop_threshold());

        // Step 6: sort, truncate.
        scored.sort_by(ScoringEngine::compare);
        scored.truncate(request.max_results.max(1));

        // Step 7: assemble.
        Ok(RecommendationResponse {
            classification,
            recommendations: scored,
            metadata: self.metadata(priority, &applied_filters, total_models, filtered_models, start),
        })
    }

    fn metadata(&self, priority: Priority, applied_filters: &[String], total_models: usize, filtered_models: usize, start: Instant) -> ResponseMetadata {
        let w = self.scoring.weights_for(priority);
        let weights = std::collections::HashMap::from([
            ("capability".to_string(), w.capability),
            ("complexity".to_string(), w.complexity),
            ("performance".to_string(), w.performance),
            ("community".to_string(), w.community),
            ("benchmark".to_string(), w.benchmark),
        ]);
        ResponseMetadata {
            request_id: uuid::Uuid::new_v4().to_string(),
            algorithm_version: "2.0".to_string(),
            data_sources: vec!["catalog".to_string(), "analytics_feed".to_string()],
            weights,
            applied_filters: applied_filters.to_vec(),
            total_models,
            filtered_models,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

fn task_type_matches(model_type: ModelType, requested: ModelType) -> bool {
    model_type == requested || model_type == ModelType::Multimodal || requested == ModelType::Multimodal
}

/// For generative task types, the model must expose a capability entry
/// for that task bucket; text capability gaps are left to the scorer's
/// 0.7 default rather than hard-filtered (spec.md §4.6 capability fallback).
fn generative_bucket_supported(model: &ModelProfile, task_type: ModelType) -> bool {
    if task_type == ModelType::Text || task_type == ModelType::Multimodal {
        return true;
    }
    let key = match task_type {
        ModelType::Image => "image",
        ModelType::Video => "video",
        ModelType::Audio => "audio",
        _ => return true,
    };
    model.model_type != task_type || model.task_capabilities.contains_key(key) || model.task_capabilities.is_empty()
}

fn apply_constraints(model: &ModelProfile, request: &RecommendationRequest, applied_filters: &mut Vec<String>) -> bool {
    let c = &request.constraints;

    if let Some(allowed) = &c.allowed_models {
        note_filter(applied_filters, "model_whitelist");
        if !allowed.iter().any(|id| id == &model.id) {
            return false;
        }
    }
    if let Some(excluded) = &c.excluded_models {
        note_filter(applied_filters, "model_blacklist");
        if excluded.iter().any(|id| id == &model.id) {
            return false;
        }
    }
    if let Some(providers) = &c.allowed_providers {
        note_filter(applied_filters, "provider_whitelist");
        if !providers.iter().any(|p| p.eq_ignore_ascii_case(&model.provider)) {
            return false;
        }
    }
    if let Some(max_cost) = c.max_cost_per_1k {
        note_filter(applied_filters, "max_cost_per_1k");
        if model.economics.cost_out_per_1k > max_cost {
            return false;
        }
    }
    if let Some(max_latency) = c.max_latency_ms {
        note_filter(applied_filters, "max_latency_ms");
        if model.latency.avg_latency_ms > max_latency {
            return false;
        }
    }
    if let Some(min_ctx) = c.min_context_window {
        note_filter(applied_filters, "min_context_window");
        if model.context_window < min_ctx {
            return false;
        }
    }
    if let Some(open_source) = c.open_source {
        note_filter(applied_filters, "open_source");
        if model.open_source != open_source {
            return false;
        }
    }
    if let Some(free_tier) = c.free_tier {
        note_filter(applied_filters, "free_tier");
        if model.economics.free_tier != free_tier {
            return false;
        }
    }

    true
}

fn note_filter(applied_filters: &mut Vec<String>, name: &str) {
    if !applied_filters.iter().any(|f| f == name) {
        applied_filters.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::config::{FusionConfig, ScoringConfig};
    use crate::registry::ModelRegistry;
    use crate::types::{Constraints, Economics, LatencyProfile, Provenance};
    use std::collections::HashMap;

    fn model(id: &str, provider: &str, coding: f64, cost: f64) -> ModelProfile {
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
            economics: Economics { cost_in_per_1k: cost, cost_out_per_1k: cost, ..Default::default() },
            latency: LatencyProfile { avg_latency_ms: 300, ..Default::default() },
            capabilities: HashMap::from([("coding".to_string(), coding)]),
            task_capabilities: HashMap::new(),
            benchmarks: HashMap::new(),
            composite_indices: HashMap::new(),
            community: None,
            routing: None,
            tags: vec![],
            provenance: Provenance::default(),
        }
    }

    fn build_orchestrator(models: Vec<ModelProfile>) -> Orchestrator {
        let registry = Arc::new(ModelRegistry::load_for_test(models));
        let fusion_cfg = FusionConfig::default();
        let fusion = Arc::new(FusionService::new(registry, fusion_cfg.max_snapshot_age_days, fusion_cfg.stale_quality_penalty, fusion_cfg.keyword_overlap_min));
        fusion.refresh(vec![], None);
        let classifier = Arc::new(Classifier::new_with_defaults());
        let scoring = Arc::new(ScoringEngine::new(ScoringConfig::default()));
        Orchestrator::new(classifier, fusion, scoring)
    }

    fn request(prompt: &str) -> RecommendationRequest {
        RecommendationRequest {
            prompt: prompt.to_string(),
            task_type: None,
            category: None,
            complexity: None,
            priority: Some(Priority::Cost),
            constraints: Constraints::default(),
            max_results: 10,
        }
    }

    #[test]
    fn coding_cost_priority_scenario() {
        let orchestrator = build_orchestrator(vec![model("cheap-coder", "acme", 0.85, 0.002), model("pricey-coder", "acme", 0.9, 0.05)]);
        let response = orchestrator.recommend(&request("Write a Python function to implement binary search")).unwrap();

        assert_eq!(response.classification.task_type, ModelType::Text);
        assert_eq!(response.classification.category, "coding");
        assert!(!response.recommendations.is_empty());
        assert_eq!(response.recommendations[0].model.id, "cheap-coder");
    }

    #[test]
    fn constraint_rejection_scenario() {
        let orchestrator = build_orchestrator(vec![model("m1", "acme", 0.8, 0.01)]);
        let mut req = request("Summarize this log file");
        req.constraints.allowed_providers = Some(vec!["nonexistent".to_string()]);

        let response = orchestrator.recommend(&req).unwrap();
        assert!(response.recommendations.is_empty());
        assert!(response.metadata.applied_filters.contains(&"provider_whitelist".to_string()));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let orchestrator = build_orchestrator(vec![model("m1", "acme", 0.8, 0.01)]);
        let err = orchestrator.recommend(&request("   ")).unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }

    #[test]
    fn tightening_cost_filter_never_expands_result_set_p6() {
        let orchestrator = build_orchestrator(vec![model("cheap", "acme", 0.8, 0.005), model("mid", "acme", 0.8, 0.02)]);

        let mut loose = request("Write code");
        loose.constraints.max_cost_per_1k = Some(1.0);
        let loose_result = orchestrator.recommend(&loose).unwrap();

        let mut tight = request("Write code");
        tight.constraints.max_cost_per_1k = Some(0.01);
        let tight_result = orchestrator.recommend(&tight).unwrap();

        assert!(tight_result.recommendations.len() <= loose_result.recommendations.len());
    }
}
