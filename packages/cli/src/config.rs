use anyhow::Context;
use fxom_dom::{ClassLoadingContext, ResourceBundle, SaveOptions, StaticCatalog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const DEFAULT_CONFIG_NAME: &str = "fxom.config.json";

/// fxom configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Class catalog (JSON), relative to the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    /// Options applied when documents are written back
    #[serde(default)]
    pub save: SaveOptions,

    /// Values for `%key` resource references
    #[serde(default)]
    pub resources: BTreeMap<String, String>,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Absolute path to the class catalog, if one is configured
    pub fn catalog_path(&self, cwd: &str) -> Option<PathBuf> {
        self.catalog.as_ref().map(|catalog| PathBuf::from(cwd).join(catalog))
    }

    /// Build the class-loading context shared by every document of a run.
    /// `catalog` overrides the configured catalog.
    pub fn context(&self, cwd: &str, catalog: Option<&Path>) -> anyhow::Result<Rc<ClassLoadingContext>> {
        let path = catalog.map(Path::to_path_buf).or_else(|| self.catalog_path(cwd));
        let catalog = match path {
            Some(path) => StaticCatalog::from_path(&path)
                .with_context(|| format!("Cannot read class catalog {}", path.display()))?,
            None => {
                tracing::warn!("no class catalog configured, every class will be unresolved");
                StaticCatalog::new()
            }
        };

        let mut resources = ResourceBundle::new();
        for (key, value) in &self.resources {
            resources.insert(key, value);
        }

        Ok(ClassLoadingContext::new(Rc::new(catalog))
            .with_resources(resources)
            .shared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "catalog": "catalog.json",
            "save": { "runtimeVersion": "17", "wildcardImports": true },
            "resources": { "greeting": "Hello" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.catalog.as_deref(), Some("catalog.json"));
        assert_eq!(config.save.runtime_version, "17");
        assert!(config.save.wildcard_imports);
        assert_eq!(config.resources.get("greeting").map(String::as_str), Some("Hello"));
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.catalog.is_none());
        assert_eq!(config.save, SaveOptions::default());
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().display().to_string()).unwrap();
        assert!(config.catalog.is_none());
    }

    #[test]
    fn test_context_uses_resources() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        std::fs::write(dir.path().join("catalog.json"), r#"{ "classes": [] }"#).unwrap();
        let config: Config = serde_json::from_str(
            r#"{ "catalog": "catalog.json", "resources": { "title": "Main" } }"#,
        )
        .unwrap();

        let context = config.context(&cwd, None).unwrap();
        assert_eq!(context.resources.get("title"), Some("Main"));
    }
}
