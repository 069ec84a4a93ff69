//! Shared fixtures for the console integration tests

#![allow(dead_code)]

use std::sync::Arc;

use backoffice::api::{Article, ArticleStatus, Product, RecordId};
use backoffice::testing::{CallLog, MemoryAssetStore, MemoryGateway};
use backoffice::{CollectionSynchronizer, DraftEditor, SyncSession};

pub const CDN: &str = "https://cdn.test/storage/v1/object/public/product-images";

pub fn article(title: &str, status: ArticleStatus) -> Article {
    Article {
        id: None,
        title: title.to_string(),
        content: format!("{} body", title),
        status,
        image_ref: None,
        created_at: None,
    }
}

pub fn product(name: &str, price: &str) -> Product {
    Product {
        id: None,
        name: name.to_string(),
        description: String::new(),
        price: price.parse().ok(),
        quantity: Some(1),
        image_ref: None,
        created_at: None,
    }
}

/// One editing view of the product catalog wired to in-memory gateways
/// that share a single call log
pub struct ProductConsole {
    pub log: CallLog,
    pub store: Arc<MemoryGateway<Product>>,
    pub assets: Arc<MemoryAssetStore>,
    pub sync: CollectionSynchronizer<Product>,
    pub session: SyncSession<Product>,
    pub editor: DraftEditor<Product>,
}

impl ProductConsole {
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        let log = CallLog::new();
        let store = Arc::new(
            MemoryGateway::<Product>::new()
                .with_log(log.clone())
                .with_records(products),
        );
        let assets = Arc::new(MemoryAssetStore::new(CDN).with_log(log.clone()));
        Self {
            sync: CollectionSynchronizer::new(store.clone()).with_page_size(Some(10)),
            session: SyncSession::new(None),
            editor: DraftEditor::new(assets.clone()),
            log,
            store,
            assets,
        }
    }

    /// Id of the first stored product named `name`
    pub fn id_of(&self, name: &str) -> RecordId {
        self.store
            .records()
            .into_iter()
            .find(|p| p.name == name)
            .and_then(|p| p.id)
            .unwrap_or_else(|| panic!("no stored product named {}", name))
    }
}

pub struct ArticleConsole {
    pub log: CallLog,
    pub store: Arc<MemoryGateway<Article>>,
    pub assets: Arc<MemoryAssetStore>,
    pub sync: CollectionSynchronizer<Article>,
    pub session: SyncSession<Article>,
    pub editor: DraftEditor<Article>,
}

impl ArticleConsole {
    pub fn new(articles: impl IntoIterator<Item = Article>, filter: Option<ArticleStatus>) -> Self {
        let log = CallLog::new();
        let store = Arc::new(
            MemoryGateway::<Article>::new()
                .with_log(log.clone())
                .with_records(articles),
        );
        let assets = Arc::new(
            MemoryAssetStore::new("https://cdn.test/storage/v1/object/public/images")
                .with_log(log.clone()),
        );
        Self {
            sync: CollectionSynchronizer::new(store.clone()),
            session: SyncSession::new(filter.map(Into::into)),
            editor: DraftEditor::new(assets.clone()).with_folder(Some("public".to_string())),
            log,
            store,
            assets,
        }
    }

    pub fn titles(&self) -> Vec<String> {
        self.session.records().iter().map(|a| a.title.clone()).collect()
    }
}
