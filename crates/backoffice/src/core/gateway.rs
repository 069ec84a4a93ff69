//! Contracts for the remote collaborators
//!
//! The synchronizer and draft editor only ever talk to these traits. The
//! Supabase crate implements them over HTTP; `crate::testing` implements them
//! in memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;

use backoffice_api::{Filter, GatewayError, Payload, Record, RecordId, Selection};

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Typed access to one table of the remote store
#[async_trait]
pub trait RecordGateway<T>: Send + Sync
where
    T: Record,
{
    /// Name of the remote table, used in logs and not-found errors
    fn collection(&self) -> &str;

    async fn select(&self, selection: &Selection) -> GatewayResult<Vec<T>>;

    async fn get(&self, id: &RecordId) -> GatewayResult<Option<T>>;

    /// Insert a new row; the returned record carries the store-assigned id
    async fn insert(&self, payload: Payload) -> GatewayResult<T>;

    /// Overwrite the row keyed by `id`. `GatewayError::NotFound` if it is gone.
    async fn update(&self, id: &RecordId, payload: Payload) -> GatewayResult<T>;

    async fn delete(&self, id: &RecordId) -> GatewayResult<()>;

    /// Exact number of rows matching `filter`
    async fn count(&self, filter: Option<&Filter>) -> GatewayResult<usize>;
}

/// Binary object storage for record images
#[async_trait]
pub trait AssetGateway: Send + Sync {
    /// Store the asset at `key`. Must fail rather than overwrite an existing object.
    async fn upload(&self, key: &AssetKey, asset: &PendingAsset) -> GatewayResult<()>;

    /// Reference under which an uploaded asset is publicly served
    fn public_url(&self, key: &AssetKey) -> String;

    async fn remove(&self, key: &AssetKey) -> GatewayResult<()>;
}

/// Object path inside a storage bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// `<folder>/<unix_millis>_<file_name>`, so repeated uploads of the same
    /// file never land on the same path
    pub fn unique(folder: Option<&str>, file_name: &str) -> Self {
        Self::unique_at(folder, file_name, Utc::now())
    }

    pub fn unique_at(folder: Option<&str>, file_name: &str, at: DateTime<Utc>) -> Self {
        let name = format!("{}_{}", at.timestamp_millis(), sanitize_file_name(file_name));
        match folder.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
            Some(folder) => Self(format!("{}/{}", folder, name)),
            None => Self(name),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keep only the final path component and replace whitespace
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() {
        return "upload".to_string();
    }
    base.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// A locally selected file that has not been uploaded yet
#[derive(Clone, PartialEq, Eq)]
pub struct PendingAsset {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingAsset {
    /// Content type is guessed from the file extension
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// File contents stay out of logs
impl fmt::Debug for PendingAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAsset")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
