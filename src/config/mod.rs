//! Configuration for the LLM router.
//!
//! Loaded the way `ozone_studio::config` loads its settings: a TOML file on
//! disk with `Default` impls per section, overridden by the environment
//! variables spec.md §6 names (`PORT`, `MODEL_PATH`, `CLASSIFIER_RULES_PATH`,
//! `ANALYTICS_API_KEY`, `ANALYTICS_BASE_URL`).

use crate::types::RouterError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub classifier: ClassifierConfig,
    pub feed: FeedConfig,
    pub fusion: FusionConfig,
    pub scoring: ScoringConfig,
    pub benchmark_store: BenchmarkStoreConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            catalog: CatalogConfig::default(),
            classifier: ClassifierConfig::default(),
            feed: FeedConfig::default(),
            fusion: FusionConfig::default(),
            scoring: ScoringConfig::default(),
            benchmark_store: BenchmarkStoreConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from a TOML file, falling back to `Default` when
    /// the file doesn't exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, RouterError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| RouterError::Config(format!("failed to read config: {}", e)))?;
            toml::from_str(&content).map_err(|e| RouterError::Config(format!("failed to parse config: {}", e)))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(path) = std::env::var("MODEL_PATH") {
            self.catalog.path = path;
        }
        if let Ok(path) = std::env::var("CLASSIFIER_RULES_PATH") {
            self.classifier.rules_path = Some(path);
        }
        if let Ok(key) = std::env::var("ANALYTICS_API_KEY") {
            self.feed.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("ANALYTICS_BASE_URL") {
            self.feed.base_url = url;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 8080 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { path: "catalog.json".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub rules_path: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { rules_path: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub refresh_hour_local: u32,
    pub cache_ttl_hours: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.analytics.example/v1/models".into(),
            api_key: None,
            timeout_secs: 15,
            refresh_hour_local: 2,
            cache_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    pub keyword_overlap_min: usize,
    pub max_snapshot_age_days: i64,
    pub stale_quality_penalty: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            keyword_overlap_min: 2,
            max_snapshot_age_days: 7,
            stale_quality_penalty: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub capability: f64,
    pub complexity: f64,
    pub performance: f64,
    pub community: f64,
    pub benchmark: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub quality: PriorityWeights,
    pub speed: PriorityWeights,
    pub cost: PriorityWeights,
    pub balanced: PriorityWeights,
    pub drop_below_overall_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            quality: PriorityWeights { capability: 0.50, complexity: 0.25, performance: 0.10, community: 0.10, benchmark: 0.05 },
            speed: PriorityWeights { capability: 0.30, complexity: 0.15, performance: 0.40, community: 0.10, benchmark: 0.05 },
            cost: PriorityWeights { capability: 0.30, complexity: 0.20, performance: 0.10, community: 0.25, benchmark: 0.15 },
            balanced: PriorityWeights { capability: 0.40, complexity: 0.25, performance: 0.20, community: 0.10, benchmark: 0.05 },
            drop_below_overall_score: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkStoreConfig {
    pub fuzzy_match_limit: usize,
}

impl Default for BenchmarkStoreConfig {
    fn default() -> Self {
        Self { fuzzy_match_limit: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_weights_sum_to_one() {
        let s = ScoringConfig::default();
        for w in [&s.quality, &s.speed, &s.cost, &s.balanced] {
            let sum = w.capability + w.complexity + w.performance + w.community + w.benchmark;
            assert!((sum - 1.0).abs() < 1e-9, "weights summed to {sum}");
        }
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("PORT", "9999");
        let mut cfg = RouterConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.server.port, 9999);
        std::env::remove_var("PORT");
    }
}
