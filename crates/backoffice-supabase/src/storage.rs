//! Supabase Storage bucket as an asset gateway

use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tracing::info;

use backoffice::core::gateway::GatewayResult;
use backoffice::{AssetGateway, AssetKey, PendingAsset};
use backoffice_api::GatewayError;

use crate::client::SupabaseClient;

/// A bucket with public read access. Uploads never overwrite.
pub struct SupabaseBucket {
    client: Arc<SupabaseClient>,
    bucket: String,
}

impl SupabaseBucket {
    pub fn new(client: Arc<SupabaseClient>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, prefix: &[&str], key: &AssetKey) -> reqwest::Url {
        let segments = ["storage", "v1", "object"]
            .into_iter()
            .chain(prefix.iter().copied())
            .chain([self.bucket.as_str()])
            .chain(key.as_str().split('/'));
        self.client.url(segments)
    }
}

#[async_trait]
impl AssetGateway for SupabaseBucket {
    #[tracing::instrument(name = "supabase.upload", skip(self, asset), fields(bucket = %self.bucket, key = %key))]
    async fn upload(&self, key: &AssetKey, asset: &PendingAsset) -> GatewayResult<()> {
        let request = self
            .client
            .request(Method::POST, self.object_url(&[], key))
            .header("Content-Type", asset.content_type.as_str())
            .header("x-upsert", "false")
            .body(asset.bytes.clone());

        self.client
            .send(request, "upload object", || {
                GatewayError::not_found("bucket", &self.bucket)
            })
            .await?;
        info!(
            "[SupabaseBucket] Uploaded {} ({} bytes) to {}",
            key,
            asset.len(),
            self.bucket
        );
        Ok(())
    }

    fn public_url(&self, key: &AssetKey) -> String {
        self.object_url(&["public"], key).to_string()
    }

    async fn remove(&self, key: &AssetKey) -> GatewayResult<()> {
        let url = self.client.url(["storage", "v1", "object", self.bucket.as_str()]);
        let request = self
            .client
            .request(Method::DELETE, url.clone())
            .json(&serde_json::json!({ "prefixes": [key.as_str()] }));

        let response = self
            .client
            .send(request, "remove object", || {
                GatewayError::not_found("bucket", &self.bucket)
            })
            .await?;

        // The API lists the objects it actually deleted
        let removed: Vec<serde_json::Value> = response.json(url.as_str())?;
        if removed.is_empty() {
            return Err(GatewayError::not_found(&self.bucket, key));
        }
        info!("[SupabaseBucket] Removed {} from {}", key, self.bucket);
        Ok(())
    }
}
