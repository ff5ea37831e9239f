//! Classifier Rules (spec.md §3/§4.5/§6) — the JSON shape for hot-reloadable
//! classification rules: `{priority, categories, difficulty, sentiment}`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermGroup {
    pub terms: Vec<String>,
    pub weight: f64,
    #[serde(default)]
    pub max_matches: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegexRule {
    pub pattern: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CooccurrenceRule {
    pub any_of_a: Vec<String>,
    pub any_of_b: Vec<String>,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRule {
    #[serde(default)]
    pub contains: Vec<TermGroup>,
    #[serde(default)]
    pub startswith: Vec<TermGroup>,
    #[serde(default)]
    pub endswith: Vec<TermGroup>,
    #[serde(default)]
    pub regex: Vec<RegexRule>,
    #[serde(default)]
    pub cooccurrence: Vec<CooccurrenceRule>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_scalar")]
    pub weight_scalar: f64,
}

fn default_threshold() -> f64 {
    0.0
}

fn default_scalar() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyRule {
    #[serde(default = "default_length_weight")]
    pub length_weight: f64,
    #[serde(default = "default_struct_weight")]
    pub struct_weight: f64,
    #[serde(default = "default_req_weight")]
    pub req_weight: f64,
    #[serde(default = "default_domain_weight")]
    pub domain_weight: f64,
    #[serde(default = "default_length_cap")]
    pub length_cap_tokens: f64,
    #[serde(default = "default_newline_cap")]
    pub newline_cap: f64,
    #[serde(default)]
    pub requirement_terms: Vec<String>,
    #[serde(default)]
    pub domain_hard_terms: HashMap<String, Vec<String>>,
    #[serde(default = "default_domain_base")]
    pub domain_base: f64,
    #[serde(default = "default_domain_increment")]
    pub domain_increment: f64,
    #[serde(default = "default_domain_max")]
    pub domain_max: f64,
    #[serde(default = "default_simple_threshold")]
    pub simple_threshold: f64,
    #[serde(default = "default_hard_threshold")]
    pub hard_threshold: f64,
    #[serde(default = "default_expert_hard_term_count")]
    pub expert_hard_term_count: usize,
}

fn default_length_weight() -> f64 {
    0.45
}
fn default_struct_weight() -> f64 {
    0.15
}
fn default_req_weight() -> f64 {
    0.25
}
fn default_domain_weight() -> f64 {
    0.15
}
fn default_length_cap() -> f64 {
    500.0
}
fn default_newline_cap() -> f64 {
    20.0
}
fn default_domain_base() -> f64 {
    0.0
}
fn default_domain_increment() -> f64 {
    0.15
}
fn default_domain_max() -> f64 {
    1.0
}
fn default_simple_threshold() -> f64 {
    0.33
}
fn default_hard_threshold() -> f64 {
    0.66
}
fn default_expert_hard_term_count() -> usize {
    3
}

impl Default for DifficultyRule {
    fn default() -> Self {
        Self {
            length_weight: default_length_weight(),
            struct_weight: default_struct_weight(),
            req_weight: default_req_weight(),
            domain_weight: default_domain_weight(),
            length_cap_tokens: default_length_cap(),
            newline_cap: default_newline_cap(),
            requirement_terms: Vec::new(),
            domain_hard_terms: HashMap::new(),
            domain_base: default_domain_base(),
            domain_increment: default_domain_increment(),
            domain_max: default_domain_max(),
            simple_threshold: default_simple_threshold(),
            hard_threshold: default_hard_threshold(),
            expert_hard_term_count: default_expert_hard_term_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRule {
    #[serde(default)]
    pub positive_terms: Vec<String>,
    #[serde(default)]
    pub negative_terms: Vec<String>,
    #[serde(default = "default_negation_pattern")]
    pub negation_pattern: String,
    #[serde(default = "default_min_gap")]
    pub min_gap: i64,
}

fn default_negation_pattern() -> String {
    r"\bnot\s+(\w+)".to_string()
}

fn default_min_gap() -> i64 {
    1
}

impl Default for SentimentRule {
    fn default() -> Self {
        Self {
            positive_terms: Vec::new(),
            negative_terms: Vec::new(),
            negation_pattern: default_negation_pattern(),
            min_gap: default_min_gap(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskTypeRules {
    #[serde(default)]
    pub image: CategoryRule,
    #[serde(default)]
    pub video: CategoryRule,
    #[serde(default)]
    pub audio: CategoryRule,
    #[serde(default)]
    pub text: CategoryRule,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierRuleSet {
    #[serde(default)]
    pub category_priority: Vec<String>,
    #[serde(default)]
    pub categories: HashMap<String, CategoryRule>,
    #[serde(default)]
    pub task_types: TaskTypeRules,
    #[serde(default)]
    pub difficulty: DifficultyRule,
    #[serde(default)]
    pub sentiment: SentimentRule,
}
