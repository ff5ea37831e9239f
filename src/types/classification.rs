//! Classification Result (spec.md §3/§4.5).

use serde::{Deserialize, Serialize};
pub use super::model::ModelType as TaskType;
use super::model::Complexity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Quality,
    Speed,
    Cost,
    Balanced,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Balanced
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationRequirements {
    #[serde(default)]
    pub min_context_window: Option<u32>,
    #[serde(default)]
    pub requires_code: bool,
    #[serde(default)]
    pub requires_reasoning: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub task_type: TaskType,
    pub category: String,
    pub complexity: Complexity,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub requirements: ClassificationRequirements,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    pub confidence: f64,
    pub detected_keywords: Vec<String>,
    pub reasoning_steps: Vec<String>,
}
