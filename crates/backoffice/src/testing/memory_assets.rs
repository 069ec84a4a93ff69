use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use backoffice_api::GatewayError;

use super::{lock, CallLog, FailurePlan, Operation, RemoteCall};
use crate::core::gateway::{AssetGateway, AssetKey, GatewayResult, PendingAsset};

/// Storage bucket held in memory. Uploading to an existing key fails.
#[derive(Debug)]
pub struct MemoryAssetStore {
    base_url: String,
    objects: Mutex<HashMap<String, PendingAsset>>,
    log: CallLog,
    failures: FailurePlan,
}

impl MemoryAssetStore {
    /// `base_url` prefixes every public URL handed out
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
            log: CallLog::new(),
            failures: FailurePlan::default(),
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: Operation, error: GatewayError) {
        self.failures.push(operation, error);
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        lock(&self.objects).contains_key(key.as_str())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.objects).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.objects).is_empty()
    }
}

#[async_trait]
impl AssetGateway for MemoryAssetStore {
    async fn upload(&self, key: &AssetKey, asset: &PendingAsset) -> GatewayResult<()> {
        self.log.record(RemoteCall::Upload {
            key: key.to_string(),
            file_name: asset.file_name.clone(),
            bytes: asset.bytes.clone(),
        });
        self.failures.take(Operation::Upload)?;

        let mut objects = lock(&self.objects);
        if objects.contains_key(key.as_str()) {
            return Err(GatewayError::validation(format!(
                "The resource already exists: {}",
                key
            )));
        }
        objects.insert(key.to_string(), asset.clone());
        Ok(())
    }

    fn public_url(&self, key: &AssetKey) -> String {
        format!("{}/{}", self.base_url, key)
    }

    async fn remove(&self, key: &AssetKey) -> GatewayResult<()> {
        self.log.record(RemoteCall::Remove {
            key: key.to_string(),
        });
        self.failures.take(Operation::Remove)?;

        match lock(&self.objects).remove(key.as_str()) {
            Some(_) => Ok(()),
            None => Err(GatewayError::not_found("storage", key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_never_overwrites() {
        let store = MemoryAssetStore::new("https://cdn.test/");
        let key = AssetKey::new("1_a.png");

        store
            .upload(&key, &PendingAsset::new("a.png", vec![1]))
            .await
            .unwrap();
        let second = store.upload(&key, &PendingAsset::new("a.png", vec![2])).await;

        assert!(matches!(second, Err(GatewayError::Validation { .. })));
        assert_eq!(store.public_url(&key), "https://cdn.test/1_a.png");
        assert_eq!(store.len(), 1);
    }
}
