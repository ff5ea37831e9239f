//! Recommendation Request (spec.md §3/§6).

use super::classification::{Priority, TaskType};
use super::model::Complexity;
use serde::{Deserialize, Serialize};

fn default_max_results() -> usize {
    10
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub max_cost_per_1k: Option<f64>,
    #[serde(default)]
    pub max_latency_ms: Option<u32>,
    #[serde(default)]
    pub allowed_providers: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_models: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_models: Option<Vec<String>>,
    #[serde(default)]
    pub open_source: Option<bool>,
    #[serde(default)]
    pub free_tier: Option<bool>,
    #[serde(default)]
    pub min_context_window: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendationRequest {
    pub prompt: String,
    #[serde(default)]
    pub task_type: Option<TaskType>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub complexity: Option<Complexity>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl RecommendationRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt must not be empty".into());
        }
        Ok(())
    }
}
