//! Ranked Candidate (spec.md §3/§4.6).

use super::model::ModelProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    pub capability: f64,
    pub complexity: f64,
    pub performance: f64,
    pub community: f64,
    pub benchmark: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub model: ModelProfile,
    pub overall_score: f64,
    pub component_scores: ComponentScores,
    pub reasoning: String,
    pub confidence: f64,
    pub cost_estimate: f64,
    pub warnings: Vec<String>,
}
