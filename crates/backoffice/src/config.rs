use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use backoffice_api::{ArticleStatus, Editable, Filter, Record};

use crate::core::draft::DraftEditor;
use crate::core::gateway::{AssetGateway, RecordGateway};
use crate::core::synchronizer::{CollectionSynchronizer, SyncSession};

/// Environment variable overriding `store.url`
pub const ENV_STORE_URL: &str = "BACKOFFICE_STORE_URL";
/// Environment variable overriding `store.api_key`
pub const ENV_API_KEY: &str = "BACKOFFICE_API_KEY";
/// Environment variable overriding `log.filter`
pub const ENV_LOG: &str = "BACKOFFICE_LOG";

/// Top-level console configuration, usually read from `backoffice.yaml`.
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub store: StoreConfig,
    pub products: CollectionConfig,
    pub articles: CollectionConfig,
    pub comments: CommentsConfig,
    pub log: LogConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            products: CollectionConfig::products(),
            articles: CollectionConfig::articles(),
            comments: CommentsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Connection to the hosted record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// One editable collection: where it lives and how it is loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub table: String,
    /// Rows per load; absent means the whole collection
    #[serde(default)]
    pub page_size: Option<usize>,
    pub bucket: String,
    /// Key prefix inside the bucket for uploaded images
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub default_filter: Option<Filter>,
}

impl CollectionConfig {
    pub fn products() -> Self {
        Self {
            table: "products".to_string(),
            page_size: Some(10),
            bucket: "product-images".to_string(),
            folder: None,
            default_filter: None,
        }
    }

    pub fn articles() -> Self {
        Self {
            table: "articles".to_string(),
            page_size: None,
            bucket: "images".to_string(),
            folder: Some("public".to_string()),
            default_filter: Some(ArticleStatus::Published.into()),
        }
    }

    /// Synchronizer loading at most `page_size` rows per load
    pub fn synchronizer<T: Record>(
        &self,
        gateway: Arc<dyn RecordGateway<T>>,
    ) -> CollectionSynchronizer<T> {
        CollectionSynchronizer::new(gateway).with_page_size(self.page_size)
    }

    /// Fresh session starting at `default_filter`
    pub fn session<T: Record>(&self) -> SyncSession<T> {
        SyncSession::new(self.default_filter.clone())
    }

    /// Editor uploading images under `folder`
    pub fn editor<T: Editable>(&self, assets: Arc<dyn AssetGateway>) -> DraftEditor<T> {
        DraftEditor::new(assets).with_folder(self.folder.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub table: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            table: "comments".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e)
        })?;

        let config: ConsoleConfig = serde_yaml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config YAML {}: {}", path.display(), e)
        })?;

        Ok(config)
    }

    /// Apply `BACKOFFICE_*` overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_STORE_URL) {
            self.store.url = url;
        }
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.store.api_key = Some(api_key);
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log.filter = filter;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{}}").unwrap();

        let config = ConsoleConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.products.page_size, Some(10));
        assert_eq!(config.products.bucket, "product-images");
        assert_eq!(config.articles.folder.as_deref(), Some("public"));
        assert_eq!(
            config.articles.default_filter,
            Some(Filter::eq("status", "published"))
        );
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
store:
  url: https://abc.supabase.co
  api_key: anon-key
products:
  table: products
  bucket: catalog
  page_size: 25
log:
  json: true
"#
        )
        .unwrap();

        let config = ConsoleConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.store.url, "https://abc.supabase.co");
        assert_eq!(config.store.api_key.as_deref(), Some("anon-key"));
        assert_eq!(config.store.timeout_secs, 30);
        assert_eq!(config.products.bucket, "catalog");
        assert_eq!(config.products.page_size, Some(25));
        assert_eq!(config.products.default_filter, None);
        assert_eq!(config.articles, CollectionConfig::articles());
        assert!(config.log.json);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn collection_sections_configure_components() {
        use crate::testing::{MemoryAssetStore, MemoryGateway};
        use backoffice_api::{Article, Product};

        let config = ConsoleConfig::default();

        let products = config
            .products
            .synchronizer::<Product>(Arc::new(MemoryGateway::new()));
        let articles = config.articles.session::<Article>();
        let editor = config
            .articles
            .editor::<Article>(Arc::new(MemoryAssetStore::new("https://cdn.test")));

        assert_eq!(products.page_size(), Some(10));
        assert_eq!(articles.filter(), Some(&Filter::eq("status", "published")));
        assert_eq!(editor.folder(), Some("public"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let err = ConsoleConfig::load_from_file(&path).unwrap_err();

        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn env_overrides_replace_non_empty_values() {
        let env: HashMap<&str, &str> = [
            (ENV_STORE_URL, "https://override.example"),
            (ENV_API_KEY, "  "),
            (ENV_LOG, "backoffice=debug"),
        ]
        .into_iter()
        .collect();

        let config = ConsoleConfig::default()
            .with_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.url, "https://override.example");
        assert_eq!(config.store.api_key, None);
        assert_eq!(config.log.filter, "backoffice=debug");
    }
}
