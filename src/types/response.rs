//! Recommendation Response (spec.md §6) — the `/v1/recommend` response
//! envelope, including the metadata block §4.7 step 7 describes.

use super::candidate::RankedCandidate;
use super::classification::ClassificationResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub request_id: String,
    pub algorithm_version: String,
    pub data_sources: Vec<String>,
    pub weights: HashMap<String, f64>,
    pub applied_filters: Vec<String>,
    pub total_models: usize,
    pub filtered_models: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub classification: ClassificationResult,
    pub recommendations: Vec<RankedCandidate>,
    pub metadata: ResponseMetadata,
}
