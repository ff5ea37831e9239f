//! Model Registry (C1) — loads the static catalog and exposes read-only
//! accessors. Grounded on `ozone_studio::zsei::ZSEI`'s load-then-swap shape
//! and `PipelineRegistry`'s read accessors.

use crate::types::{ModelProfile, ModelType, RouterError, RouterResult};
use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub struct ModelRegistry {
    catalog_path: PathBuf,
    models: ArcSwap<Vec<ModelProfile>>,
}

impl ModelRegistry {
    /// Load the static catalog at `path`. A successful load replaces any
    /// prior catalog atomically (the instance is freshly constructed here,
    /// so this is also the initial load).
    pub fn load(path: &Path) -> RouterResult<Self> {
        let models = load_catalog(path)?;
        tracing::info!(count = models.len(), path = %path.display(), "model catalog loaded");
        Ok(Self {
            catalog_path: path.to_path_buf(),
            models: ArcSwap::from_pointee(models),
        })
    }

    /// Re-read the catalog file and swap it in atomically. On failure the
    /// previous catalog is retained (spec.md §7: reload failures are
    /// reported to the operator, not fatal).
    pub fn reload(&self) -> RouterResult<()> {
        let models = load_catalog(&self.catalog_path)?;
        tracing::info!(count = models.len(), "model catalog reloaded");
        self.models.store(Arc::new(models));
        Ok(())
    }

    pub fn all(&self) -> Arc<Vec<ModelProfile>> {
        self.models.load_full()
    }

    pub fn by_id(&self, id: &str) -> Option<ModelProfile> {
        self.models.load().iter().find(|m| m.id == id).cloned()
    }

    pub fn by_type(&self, model_type: ModelType) -> Vec<ModelProfile> {
        self.models
            .load()
            .iter()
            .filter(|m| m.model_type == model_type)
            .cloned()
            .collect()
    }

    pub fn by_provider(&self, provider: &str) -> Vec<ModelProfile> {
        self.models
            .load()
            .iter()
            .filter(|m| m.provider.eq_ignore_ascii_case(provider))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
impl ModelRegistry {
    /// Test-only constructor that skips the filesystem.
    pub(crate) fn load_for_test(models: Vec<ModelProfile>) -> Self {
        Self {
            catalog_path: PathBuf::new(),
            models: ArcSwap::from_pointee(models),
        }
    }
}

fn load_catalog(path: &Path) -> RouterResult<Vec<ModelProfile>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RouterError::CatalogLoadFailed(format!("failed to read {}: {}", path.display(), e)))?;
    let raw: Vec<ModelProfile> = serde_json::from_str(&content)
        .map_err(|e| RouterError::CatalogLoadFailed(format!("failed to parse {}: {}", path.display(), e)))?;
    Ok(raw.into_iter().map(ModelProfile::normalize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(json: &str) -> tempfile_path::TempJsonFile {
        tempfile_path::TempJsonFile::new(json)
    }

    mod tempfile_path {
        use std::path::PathBuf;

        pub struct TempJsonFile {
            pub path: PathBuf,
        }

        impl TempJsonFile {
            pub fn new(content: &str) -> Self {
                let mut path = std::env::temp_dir();
                path.push(format!("llm_router_test_catalog_{}.json", std::process::id()));
                std::fs::write(&path, content).unwrap();
                Self { path }
            }
        }

        impl Drop for TempJsonFile {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }

    fn sample_catalog() -> &'static str {
        r#"[
            {
                "id": "m1",
                "provider": "acme",
                "display_name": "M1",
                "context_window": 8192,
                "model_type": "text",
                "capabilities": {"coding": 0.9}
            }
        ]"#
    }

    #[test]
    fn loads_and_reloads_catalog() {
        let f = write_catalog(sample_catalog());
        let registry = ModelRegistry::load(&f.path).unwrap();
        assert_eq!(registry.all().len(), 1);
        assert!(registry.by_id("m1").is_some());
        assert_eq!(registry.by_type(ModelType::Text).len(), 1);
        assert!(registry.by_provider("ACME").len() == 1);

        registry.reload().unwrap();
        assert_eq!(registry.all().len(), 1);
    }

    #[test]
    fn missing_file_fails_load() {
        let missing = PathBuf::from("/nonexistent/catalog.json");
        let err = ModelRegistry::load(&missing).unwrap_err();
        assert_eq!(err.code(), "catalog_load_failed");
    }

    #[test]
    fn bad_json_reload_keeps_previous_catalog() {
        let f = write_catalog(sample_catalog());
        let registry = ModelRegistry::load(&f.path).unwrap();
        let mut bad = std::fs::File::create(&f.path).unwrap();
        bad.write_all(b"not json").unwrap();

        let err = registry.reload().unwrap_err();
        assert_eq!(err.code(), "catalog_load_failed");
        assert_eq!(registry.all().len(), 1, "previous catalog must survive a bad reload");
    }
}
