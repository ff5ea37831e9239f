//! Core type definitions for the LLM router.

pub mod benchmark;
pub mod candidate;
pub mod classification;
pub mod error;
pub mod model;
pub mod request;
pub mod response;
pub mod rules;

pub use benchmark::BenchmarkMetricRow;
pub use candidate::{ComponentScores, RankedCandidate};
pub use classification::{ClassificationRequirements, ClassificationResult, Priority, Sentiment, TaskType};
pub use error::{ErrorBody, ErrorDetail, RouterError, RouterResult};
pub use model::{
    CommunitySignals, Complexity, Economics, GenerativeTaskCapability, LatencyProfile,
    ModelProfile, ModelType, Provenance, ProvenanceSource, RoutingMetadata,
};
pub use request::{Constraints, RecommendationRequest};
pub use response::{RecommendationResponse, ResponseMetadata};
pub use rules::{
    CategoryRule, ClassifierRuleSet, CooccurrenceRule, DifficultyRule, RegexRule, SentimentRule,
    TaskTypeRules, TermGroup,
};
