//! Wires every console component to one Supabase project from `ConsoleConfig`

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use backoffice::config::CollectionConfig;
use backoffice::{CollectionSynchronizer, CommentThread, ConsoleConfig, DraftEditor, SyncSession};
use backoffice_api::{Article, Comment, Editable, Product, RecordId};

use crate::client::SupabaseClient;
use crate::config::SupabaseConfig;
use crate::storage::SupabaseBucket;
use crate::table::SupabaseTable;

/// Synchronizer and editor of one editable collection
pub struct CollectionHandle<T: Editable> {
    pub sync: CollectionSynchronizer<T>,
    pub editor: DraftEditor<T>,
    config: CollectionConfig,
}

impl<T: Editable> CollectionHandle<T> {
    fn connect(client: &Arc<SupabaseClient>, config: &CollectionConfig) -> Self {
        let table = SupabaseTable::<T>::named(client.clone(), config.table.clone());
        let bucket = SupabaseBucket::new(client.clone(), config.bucket.clone());
        Self {
            sync: config.synchronizer::<T>(Arc::new(table)),
            editor: config.editor::<T>(Arc::new(bucket)),
            config: config.clone(),
        }
    }

    /// New view on the collection, starting at its configured filter
    pub fn session(&self) -> SyncSession<T> {
        self.config.session()
    }
}

/// Products, articles and comments of one Supabase project
pub struct SupabaseConsole {
    pub products: CollectionHandle<Product>,
    pub articles: CollectionHandle<Article>,
    comments: Arc<SupabaseTable<Comment>>,
}

impl SupabaseConsole {
    pub fn connect(config: &ConsoleConfig) -> Result<Self> {
        let supabase = SupabaseConfig::from_store(&config.store)?;
        let client = Arc::new(SupabaseClient::new(&supabase)?);
        info!("[SupabaseConsole] Connected to {}", supabase.url);

        Ok(Self {
            products: CollectionHandle::connect(&client, &config.products),
            articles: CollectionHandle::connect(&client, &config.articles),
            comments: Arc::new(SupabaseTable::named(client, config.comments.table.clone())),
        })
    }

    pub fn comment_thread(&self, article_id: RecordId) -> CommentThread {
        CommentThread::new(self.comments.clone(), article_id)
    }
}
