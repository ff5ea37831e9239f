//! Classifier (C5) — rules-driven task/category/complexity/sentiment
//! detection with hot-reloadable rules, published the way
//! `registry::ModelRegistry` publishes its catalog (`ArcSwap` pointer
//! swap), matching invariant I5: a parse failure never stops the service
//! from classifying.

use crate::types::{
    CategoryRule, ClassificationRequirements, ClassificationResult, ClassifierRuleSet, Complexity,
    CooccurrenceRule, DifficultyRule, ModelType, Sentiment, SentimentRule, TaskTypeRules, TermGroup,
};
use arc_swap::ArcSwap;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

const VISUAL_TERMS: [&str; 5] = ["image", "picture", "photo", "visual", "graphic"];

struct CompiledRegex {
    regex: Regex,
    weight: f64,
}

struct CompiledCategoryRule {
    contains: Vec<TermGroup>,
    startswith: Vec<TermGroup>,
    endswith: Vec<TermGroup>,
    regex: Vec<CompiledRegex>,
    cooccurrence: Vec<CooccurrenceRule>,
    threshold: f64,
    weight_scalar: f64,
}

impl CompiledCategoryRule {
    fn compile(raw: &CategoryRule, label: &str) -> Self {
        let regex = raw
            .regex
            .iter()
            .filter_map(|r| match Regex::new(&r.pattern) {
                Ok(re) => Some(CompiledRegex { regex: re, weight: r.weight }),
                Err(e) => {
                    tracing::warn!(pattern = %r.pattern, category = label, error = %e, "skipping rule with invalid regex");
                    None
                }
            })
            .collect();
        Self {
            contains: raw.contains.clone(),
            startswith: raw.startswith.clone(),
            endswith: raw.endswith.clone(),
            regex,
            cooccurrence: raw.cooccurrence.clone(),
            threshold: raw.threshold,
            weight_scalar: raw.weight_scalar,
        }
    }

    /// `score(R, s)` from spec.md §4.5.
    fn score(&self, prompt_lower: &str) -> (f64, Vec<String>) {
        let mut score = 0.0;
        let mut keywords = Vec::new();

        for group in &self.contains {
            let mut hits = 0usize;
            for term in &group.terms {
                let count = prompt_lower.matches(term.as_str()).count();
                if count > 0 {
                    hits += count;
                    keywords.push(term.clone());
                }
            }
            if let Some(cap) = group.max_matches {
                hits = hits.min(cap);
            }
            score += hits as f64 * group.weight;
        }

        for group in &self.startswith {
            let matched = group.terms.iter().filter(|t| prompt_lower.starts_with(t.as_str())).count();
            score += matched as f64 * group.weight;
        }

        for group in &self.endswith {
            let matched = group.terms.iter().filter(|t| prompt_lower.ends_with(t.as_str())).count();
            score += matched as f64 * group.weight;
        }

        for re in &self.regex {
            if re.regex.is_match(prompt_lower) {
                score += re.weight;
            }
        }

        for c in &self.cooccurrence {
            let a = c.any_of_a.iter().any(|t| prompt_lower.contains(t.as_str()));
            let b = c.any_of_b.iter().any(|t| prompt_lower.contains(t.as_str()));
            if a && b {
                score += c.weight;
            }
        }

        (score * self.weight_scalar, keywords)
    }
}

struct CompiledSentiment {
    positive_terms: Vec<String>,
    negative_terms: Vec<String>,
    negation: Option<Regex>,
    min_gap: i64,
}

struct CompiledRuleSet {
    raw: ClassifierRuleSet,
    category_priority: Vec<String>,
    categories: HashMap<String, CompiledCategoryRule>,
    image: CompiledCategoryRule,
    video: CompiledCategoryRule,
    audio: CompiledCategoryRule,
    text: CompiledCategoryRule,
    sentiment: CompiledSentiment,
}

impl CompiledRuleSet {
    fn compile(raw: ClassifierRuleSet) -> Self {
        let categories = raw.categories.iter().map(|(k, v)| (k.clone(), CompiledCategoryRule::compile(v, k))).collect();
        let image = CompiledCategoryRule::compile(&raw.task_types.image, "task_type:image");
        let video = CompiledCategoryRule::compile(&raw.task_types.video, "task_type:video");
        let audio = CompiledCategoryRule::compile(&raw.task_types.audio, "task_type:audio");
        let text = CompiledCategoryRule::compile(&raw.task_types.text, "task_type:text");

        let negation = match Regex::new(&raw.sentiment.negation_pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(pattern = %raw.sentiment.negation_pattern, error = %e, "skipping invalid negation pattern");
                None
            }
        };
        let sentiment = CompiledSentiment {
            positive_terms: raw.sentiment.positive_terms.clone(),
            negative_terms: raw.sentiment.negative_terms.clone(),
            negation,
            min_gap: raw.sentiment.min_gap,
        };

        Self { category_priority: raw.category_priority.clone(), categories, image, video, audio, text, sentiment, raw }
    }
}

pub struct Classifier {
    rules: ArcSwap<CompiledRuleSet>,
}

impl Classifier {
    pub fn new_with_defaults() -> Self {
        Self { rules: ArcSwap::from_pointee(CompiledRuleSet::compile(default_rules())) }
    }

    /// Parse `path` and swap in the compiled rules atomically. On failure
    /// the previous rule set is retained and the built-in defaults are
    /// used only if no rule set has ever loaded successfully (I5).
    pub fn reload(&self, path: &std::path::Path) -> Result<(), String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let raw: ClassifierRuleSet = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        self.rules.store(Arc::new(CompiledRuleSet::compile(raw)));
        Ok(())
    }

    pub fn rules_snapshot(&self) -> ClassifierRuleSet {
        self.rules.load().raw.clone()
    }

    /// Per-category raw scores, for `/admin/classifier/explain`.
    pub fn explain(&self, prompt: &str) -> HashMap<String, f64> {
        let rules = self.rules.load();
        let lower = prompt.to_ascii_lowercase();
        rules.categories.iter().map(|(name, rule)| (name.clone(), rule.score(&lower).0)).collect()
    }

    pub fn classify(&self, prompt: &str) -> ClassificationResult {
        let rules = self.rules.load();
        let lower = prompt.to_ascii_lowercase();

        let (task_type, mut task_reasoning) = detect_task_type(&rules, &lower);
        let (category, mut category_keywords, confidence_base) =
            pick_category(&rules, &lower, task_type);
        let complexity = classify_complexity(&rules.raw, &lower, &category);
        let sentiment = classify_sentiment(&rules.sentiment, &lower);

        let mut reasoning_steps = Vec::new();
        reasoning_steps.append(&mut task_reasoning);
        reasoning_steps.push(format!("category '{category}' selected (score {confidence_base:.2})"));
        reasoning_steps.push(format!("complexity bucket: {complexity:?}"));
        if let Some(s) = sentiment {
            reasoning_steps.push(format!("sentiment: {s:?}"));
        }

        let requirements = ClassificationRequirements {
            min_context_window: None,
            requires_code: category == "coding",
            requires_reasoning: category == "math" || category == "reasoning",
        };

        category_keywords.sort();
        category_keywords.dedup();

        ClassificationResult {
            task_type,
            category,
            complexity,
            priority: None,
            requirements,
            sentiment,
            confidence: confidence_base,
            detected_keywords: category_keywords,
            reasoning_steps,
        }
    }
}

/// Task-type detection and tie-break (spec.md §4.5 "Task-type detection").
fn detect_task_type(rules: &CompiledRuleSet, lower: &str) -> (ModelType, Vec<String>) {
    let (mut image_score, _) = rules.image.score(lower);
    let (video_score, _) = rules.video.score(lower);
    let (audio_score, _) = rules.audio.score(lower);
    let (mut text_score, _) = rules.text.score(lower);
    let mut steps = Vec::new();

    let has_visual_term = VISUAL_TERMS.iter().any(|t| lower.contains(t));
    if image_score > 0.2 && has_visual_term {
        text_score *= 0.3;
        steps.push("visual term detected, discounting text score".to_string());
    }

    let mut multimodal_score = None;
    if image_score > 0.4 && text_score > 0.4 {
        multimodal_score = Some(image_score + 0.5 * text_score);
        steps.push("both image and text signals strong, synthesizing multimodal".to_string());
    }
    if image_score > 0.4 && text_score < 0.3 {
        image_score *= 1.5;
        steps.push("boosting pure-image signal".to_string());
    }

    let mut best = (ModelType::Text, 0.3_f64);
    let mut candidates: Vec<(ModelType, f64)> =
        vec![(ModelType::Text, text_score), (ModelType::Image, image_score), (ModelType::Video, video_score), (ModelType::Audio, audio_score)];
    if let Some(m) = multimodal_score {
        candidates.push((ModelType::Multimodal, m));
    }
    for (t, s) in candidates {
        if s > best.1 {
            best = (t, s);
        }
    }
    if best.1 <= 0.0 {
        best = (ModelType::Text, 0.3);
        steps.push("no task-type signal, defaulting to text".to_string());
    }
    (best.0, steps)
}

/// Category tie-break (spec.md §4.5 "Category tie-break").
fn pick_category(rules: &CompiledRuleSet, lower: &str, task_type: ModelType) -> (String, Vec<String>, f64) {
    let mut scored: Vec<(String, f64, Vec<String>)> = rules
        .categories
        .iter()
        .map(|(name, rule)| {
            let (score, keywords) = rule.score(lower);
            (name.clone(), score, keywords)
        })
        .filter(|(name, score, _)| *score > rules.categories[name].threshold)
        .collect();

    if scored.is_empty() {
        if task_type != ModelType::Text {
            return ("creative".to_string(), Vec::new(), 0.3);
        }
        return ("general".to_string(), Vec::new(), 0.3);
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let top1 = scored[0].1;
    let top2 = scored.get(1).map(|s| s.1).unwrap_or(0.0);

    // Tie-break by priority list when scores are effectively equal.
    let winner = if (top1 - top2).abs() < 1e-9 {
        rules
            .category_priority
            .iter()
            .find(|p| scored.iter().any(|(name, score, _)| name == *p && (score - top1).abs() < 1e-9))
            .cloned()
            .unwrap_or_else(|| scored[0].0.clone())
    } else {
        scored[0].0.clone()
    };

    let keywords = scored.iter().find(|(name, _, _)| *name == winner).map(|(_, _, kw)| kw.clone()).unwrap_or_default();
    let confidence = (0.6 + 0.4 * (top1 - top2) / (top1 + 1e-9)).clamp(0.0, 1.0);
    (winner, keywords, confidence)
}

/// Complexity bucketing (spec.md §4.5 "Complexity").
fn classify_complexity(raw: &ClassifierRuleSet, lower: &str, category: &str) -> Complexity {
    let d = &raw.difficulty;
    let tokens = lower.chars().count() as f64 / 4.0;
    let length_score = (tokens / d.length_cap_tokens).clamp(0.0, 1.0);

    let newlines = lower.matches('\n').count() as f64;
    let struct_score = (newlines / d.newline_cap).clamp(0.0, 1.0);

    let req_hits = d.requirement_terms.iter().filter(|t| lower.contains(t.as_str())).count();
    let req_score = (req_hits as f64 / 5.0).clamp(0.0, 1.0);

    let hard_term_hits = d
        .domain_hard_terms
        .get(category)
        .map(|terms| terms.iter().filter(|t| lower.contains(t.as_str())).count())
        .unwrap_or(0);
    let domain_bonus = (d.domain_base + d.domain_increment * hard_term_hits as f64).min(d.domain_max);

    let raw_score = d.length_weight * length_score + d.struct_weight * struct_score + d.req_weight * req_score + d.domain_weight * domain_bonus;

    if hard_term_hits >= d.expert_hard_term_count {
        return Complexity::Expert;
    }
    if raw_score < d.simple_threshold {
        Complexity::Simple
    } else if raw_score > d.hard_threshold {
        Complexity::Hard
    } else {
        Complexity::Medium
    }
}

/// Sentiment with negation handling (spec.md §4.5 "Sentiment").
fn classify_sentiment(rule: &CompiledSentiment, lower: &str) -> Option<Sentiment> {
    let mut pos_hits = rule.positive_terms.iter().filter(|t| lower.contains(t.as_str())).count() as i64;
    let mut neg_hits = rule.negative_terms.iter().filter(|t| lower.contains(t.as_str())).count() as i64;

    if let Some(negation) = &rule.negation {
        for cap in negation.captures_iter(lower) {
            if let Some(word) = cap.get(1) {
                let word = word.as_str();
                if rule.positive_terms.iter().any(|t| t == word) {
                    pos_hits -= 1;
                    neg_hits += 1;
                } else if rule.negative_terms.iter().any(|t| t == word) {
                    neg_hits -= 1;
                    pos_hits += 1;
                }
            }
        }
    }

    let gap = pos_hits - neg_hits;
    if gap.abs() < rule.min_gap {
        if pos_hits == 0 && neg_hits == 0 {
            None
        } else {
            Some(Sentiment::Neutral)
        }
    } else if gap > 0 {
        Some(Sentiment::Positive)
    } else {
        Some(Sentiment::Negative)
    }
}

/// Built-in default rule set used when no rules file is configured or the
/// configured file fails to parse (invariant I5).
pub fn default_rules() -> ClassifierRuleSet {
    let mut categories = HashMap::new();
    categories.insert(
        "coding".to_string(),
        CategoryRule {
            contains: vec![TermGroup {
                terms: vec!["code".into(), "function".into(), "python".into(), "rust".into(), "javascript".into(), "bug".into(), "compile".into(), "algorithm".into()],
                weight: 0.3,
                max_matches: Some(5),
            }],
            startswith: vec![],
            endswith: vec![],
            regex: vec![],
            cooccurrence: vec![],
            threshold: 0.0,
            weight_scalar: 1.0,
        },
    );
    categories.insert(
        "math".to_string(),
        CategoryRule {
            contains: vec![TermGroup {
                terms: vec!["calculate".into(), "equation".into(), "integral".into(), "derivative".into(), "solve for".into(), "proof".into()],
                weight: 0.3,
                max_matches: Some(5),
            }],
            startswith: vec![],
            endswith: vec![],
            regex: vec![],
            cooccurrence: vec![],
            threshold: 0.0,
            weight_scalar: 1.0,
        },
    );
    categories.insert(
        "reasoning".to_string(),
        CategoryRule {
            contains: vec![TermGroup {
                terms: vec!["why".into(), "explain".into(), "logic".into(), "reason".into(), "analyze".into()],
                weight: 0.25,
                max_matches: Some(5),
            }],
            startswith: vec![],
            endswith: vec![],
            regex: vec![],
            cooccurrence: vec![],
            threshold: 0.0,
            weight_scalar: 1.0,
        },
    );
    categories.insert(
        "writing".to_string(),
        CategoryRule {
            contains: vec![TermGroup { terms: vec!["write".into(), "essay".into(), "draft".into(), "email".into(), "letter".into()], weight: 0.25, max_matches: Some(5) }],
            startswith: vec![],
            endswith: vec![],
            regex: vec![],
            cooccurrence: vec![],
            threshold: 0.0,
            weight_scalar: 1.0,
        },
    );
    categories.insert(
        "business".to_string(),
        CategoryRule {
            contains: vec![TermGroup { terms: vec!["business".into(), "strategy".into(), "market".into(), "revenue".into(), "customer".into()], weight: 0.25, max_matches: Some(5) }],
            startswith: vec![],
            endswith: vec![],
            regex: vec![],
            cooccurrence: vec![],
            threshold: 0.0,
            weight_scalar: 1.0,
        },
    );
    categories.insert(
        "chat".to_string(),
        CategoryRule {
            contains: vec![TermGroup { terms: vec!["hello".into(), "hi".into(), "how are you".into(), "chat".into()], weight: 0.2, max_matches: Some(3) }],
            startswith: vec![],
            endswith: vec![],
            regex: vec![],
            cooccurrence: vec![],
            threshold: 0.0,
            weight_scalar: 1.0,
        },
    );

    ClassifierRuleSet {
        category_priority: vec!["coding".into(), "math".into(), "question".into(), "reasoning".into(), "business".into(), "chat".into(), "general".into()],
        categories,
        task_types: TaskTypeRules {
            image: CategoryRule {
                contains: vec![TermGroup { terms: vec!["image".into(), "picture".into(), "photo".into(), "draw".into(), "illustration".into()], weight: 0.3, max_matches: Some(4) }],
                threshold: 0.0,
                weight_scalar: 1.0,
                ..Default::default()
            },
            video: CategoryRule {
                contains: vec![TermGroup { terms: vec!["video".into(), "animation".into(), "clip".into(), "footage".into()], weight: 0.3, max_matches: Some(4) }],
                threshold: 0.0,
                weight_scalar: 1.0,
                ..Default::default()
            },
            audio: CategoryRule {
                contains: vec![TermGroup { terms: vec!["audio".into(), "music".into(), "speech".into(), "voice".into(), "sound".into()], weight: 0.3, max_matches: Some(4) }],
                threshold: 0.0,
                weight_scalar: 1.0,
                ..Default::default()
            },
            text: CategoryRule { threshold: 0.0, weight_scalar: 1.0, ..Default::default() },
        },
        difficulty: DifficultyRule::default(),
        sentiment: SentimentRule {
            positive_terms: vec!["good".into(), "great".into(), "excellent".into(), "love".into(), "helpful".into()],
            negative_terms: vec!["bad".into(), "terrible".into(), "hate".into(), "broken".into(), "useless".into()],
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_total_p5() {
        let classifier = Classifier::new_with_defaults();
        let result = classifier.classify("Write a Python function to implement binary search");
        assert_eq!(result.task_type, ModelType::Text);
        assert_eq!(result.category, "coding");
        assert!((0.0..=1.0).contains(&result.confidence));
    }

    #[test]
    fn image_prompt_detected() {
        let classifier = Classifier::new_with_defaults();
        let result = classifier.classify("Generate a photorealistic image of a sunset over mountains");
        assert_eq!(result.task_type, ModelType::Image);
    }

    #[test]
    fn invalid_rules_file_falls_back_to_defaults_i5() {
        let classifier = Classifier::new_with_defaults();
        let path = std::env::temp_dir().join(format!("bad_rules_{}.json", std::process::id()));
        std::fs::write(&path, "not json").unwrap();
        let err = classifier.reload(&path).unwrap_err();
        assert!(!err.is_empty());
        // Classifier must still classify using whatever rules it had before.
        let result = classifier.classify("hello there");
        assert!(!result.category.is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn reload_is_idempotent_p7() {
        let classifier = Classifier::new_with_defaults();
        let rules = serde_json::to_string(&default_rules()).unwrap();
        let path = std::env::temp_dir().join(format!("rules_{}.json", std::process::id()));
        std::fs::write(&path, &rules).unwrap();

        classifier.reload(&path).unwrap();
        let first = classifier.explain("write some code");
        classifier.reload(&path).unwrap();
        let second = classifier.explain("write some code");

        assert_eq!(first, second);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn sentiment_negation_flips_gap() {
        let compiled = CompiledRuleSet::compile(default_rules());
        let result = classify_sentiment(&compiled.sentiment, "this is not good");
        assert_eq!(result, Some(Sentiment::Negative));
    }
}
