mod support;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use backoffice::api::{
    ArticleStatus, ConsoleError, Filter, GatewayError, Payload, Product, RecordId, Selection,
    ValidationError,
};
use backoffice::core::gateway::{GatewayResult, RecordGateway};
use backoffice::testing::{CallLog, MemoryAssetStore, MemoryGateway, Operation, RemoteCall};
use backoffice::{CollectionSynchronizer, DraftEditor, PendingAsset, SyncSession};

use support::{ArticleConsole, CDN, ProductConsole, article, product};

fn photo(name: &str) -> PendingAsset {
    PendingAsset::new(name, vec![0x89, b'P', b'N', b'G'])
}

#[tokio::test]
async fn test_upload_precedes_insert() -> Result<()> {
    let mut console = ProductConsole::new([]);
    console.editor.open_for_create();
    console.editor.set_field("name", "Widget")?;
    console.editor.attach_pending_asset(photo("widget.png"))?;

    console
        .editor
        .commit(&console.sync, &mut console.session)
        .await?;

    let ops = console.log.operations();
    assert_eq!(
        ops,
        vec![Operation::Upload, Operation::Insert, Operation::Select]
    );
    assert!(!console.editor.is_open());

    Ok(())
}

#[tokio::test]
async fn test_upload_precedes_update() -> Result<()> {
    let mut console = ProductConsole::new([product("Chair", "40")]);
    console.sync.load(&mut console.session).await?;
    let chair = console.session.records()[0].clone();
    console.log.clear();

    console.editor.open_for_edit(&chair);
    console.editor.attach_pending_asset(photo("chair.jpg"))?;
    let outcome = console
        .editor
        .commit(&console.sync, &mut console.session)
        .await?;

    assert_eq!(
        console.log.operations(),
        vec![Operation::Upload, Operation::Update, Operation::Select]
    );
    let image = outcome.record.image_ref.expect("uploaded image is referenced");
    assert!(image.starts_with(CDN));
    assert!(image.ends_with("_chair.jpg"));
    assert_eq!(console.assets.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_failed_upload_aborts_write_and_keeps_draft() -> Result<()> {
    let mut existing = product("Desk", "120");
    existing.image_ref = Some(format!("{}/1_desk.png", CDN));
    let mut console = ProductConsole::new([existing]);
    console.sync.load(&mut console.session).await?;
    let desk = console.session.records()[0].clone();
    console.log.clear();

    console.editor.open_for_edit(&desk);
    console.editor.set_field("price", "99")?;
    console.editor.attach_pending_asset(photo("desk-v2.png"))?;
    console
        .assets
        .fail_next(Operation::Upload, GatewayError::network("upload timed out"));

    let err = console
        .editor
        .commit(&console.sync, &mut console.session)
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Upload(GatewayError::Network { .. })));
    assert_eq!(console.log.operations(), vec![Operation::Upload]);
    let draft = console.editor.draft().expect("draft survives");
    assert_eq!(draft.image_ref(), desk.image_ref.as_deref());
    assert_eq!(draft.field("price"), Some("99"));
    assert_eq!(draft.pending_asset().map(|a| a.file_name.as_str()), Some("desk-v2.png"));

    Ok(())
}

#[tokio::test]
async fn test_failed_write_removes_uploaded_asset() -> Result<()> {
    let mut console = ProductConsole::new([]);
    console.editor.open_for_create();
    console.editor.set_field("name", "Orphan")?;
    console.editor.attach_pending_asset(photo("orphan.png"))?;
    console
        .store
        .fail_next(Operation::Insert, GatewayError::validation("name too short"));

    let err = console
        .editor
        .commit(&console.sync, &mut console.session)
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Write(GatewayError::Validation { .. })));
    assert_eq!(
        console.log.operations(),
        vec![Operation::Upload, Operation::Insert, Operation::Remove]
    );
    assert!(console.assets.is_empty());
    assert!(console.editor.is_open());

    // Nothing was lost; a second attempt goes through
    console
        .editor
        .commit(&console.sync, &mut console.session)
        .await?;
    assert_eq!(console.store.len(), 1);
    assert_eq!(console.assets.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_failed_cleanup_still_reports_write_error() -> Result<()> {
    let mut console = ProductConsole::new([]);
    console.editor.open_for_create();
    console.editor.attach_pending_asset(photo("stuck.png"))?;
    console
        .store
        .fail_next(Operation::Insert, GatewayError::validation("null value in column"));
    console
        .assets
        .fail_next(Operation::Remove, GatewayError::network("reset"));

    let err = console
        .editor
        .commit(&console.sync, &mut console.session)
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Write(_)));
    assert_eq!(console.log.count(Operation::Remove), 1);
    assert_eq!(console.assets.len(), 1);

    Ok(())
}

/// Applies every insert, then reports the connection as lost
struct LostResponseGateway {
    inner: Arc<MemoryGateway<Product>>,
}

#[async_trait]
impl RecordGateway<Product> for LostResponseGateway {
    fn collection(&self) -> &str {
        self.inner.collection()
    }

    async fn select(&self, selection: &Selection) -> GatewayResult<Vec<Product>> {
        self.inner.select(selection).await
    }

    async fn get(&self, id: &RecordId) -> GatewayResult<Option<Product>> {
        self.inner.get(id).await
    }

    async fn insert(&self, payload: Payload) -> GatewayResult<Product> {
        self.inner.insert(payload).await?;
        Err(GatewayError::network("timeout"))
    }

    async fn update(&self, id: &RecordId, payload: Payload) -> GatewayResult<Product> {
        self.inner.update(id, payload).await
    }

    async fn delete(&self, id: &RecordId) -> GatewayResult<()> {
        self.inner.delete(id).await
    }

    async fn count(&self, filter: Option<&Filter>) -> GatewayResult<usize> {
        self.inner.count(filter).await
    }
}

#[tokio::test]
async fn test_unknown_write_outcome_keeps_uploaded_asset() -> Result<()> {
    let log = CallLog::new();
    let store = Arc::new(MemoryGateway::<Product>::new().with_log(log.clone()));
    let assets = Arc::new(MemoryAssetStore::new(CDN).with_log(log.clone()));
    let sync = CollectionSynchronizer::new(Arc::new(LostResponseGateway {
        inner: store.clone(),
    }));
    let mut session = SyncSession::new(None);
    let mut editor: DraftEditor<Product> = DraftEditor::new(assets.clone());

    editor.open_for_create();
    editor.set_field("name", "Widget")?;
    editor.attach_pending_asset(photo("w.png"))?;
    let err = editor.commit(&sync, &mut session).await.unwrap_err();

    assert!(matches!(err, ConsoleError::Write(GatewayError::Network { .. })));
    assert_eq!(log.count(Operation::Remove), 0);
    let saved = store.records();
    assert_eq!(saved.len(), 1);
    let key = assets.keys().pop().expect("uploaded asset is kept");
    assert_eq!(saved[0].image_ref, Some(format!("{}/{}", CDN, key)));
    assert!(editor.is_open());

    Ok(())
}

#[tokio::test]
async fn test_unparseable_number_is_left_to_the_store() -> Result<()> {
    let mut console = ProductConsole::new([]);
    console.editor.open_for_create();
    console.editor.set_field("name", "Bolt")?;
    console.editor.set_field("quantity", "lots")?;

    let err = console
        .editor
        .commit(&console.sync, &mut console.session)
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Write(GatewayError::Validation { .. })));
    match &console.log.calls()[0] {
        RemoteCall::Insert { payload, .. } => {
            assert_eq!(payload["quantity"], serde_json::json!("lots"))
        }
        other => panic!("expected insert, got {:?}", other),
    }
    assert_eq!(console.editor.draft().and_then(|d| d.field("quantity")), Some("lots"));

    Ok(())
}

#[tokio::test]
async fn test_update_of_deleted_record_keeps_draft() -> Result<()> {
    let mut console = ProductConsole::new([product("Vanishing", "3")]);
    console.sync.load(&mut console.session).await?;
    let record = console.session.records()[0].clone();
    console.editor.open_for_edit(&record);

    let id = console.id_of("Vanishing");
    let mut other = backoffice::SyncSession::new(None);
    console.sync.delete(&mut other, &id).await?;

    let err = console
        .editor
        .commit(&console.sync, &mut console.session)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(console.editor.draft().and_then(|d| d.id()), Some(&id));

    Ok(())
}

#[tokio::test]
async fn test_discard_makes_no_remote_calls() -> Result<()> {
    let mut console = ProductConsole::new([]);
    console.editor.open_for_create();
    console.editor.attach_pending_asset(photo("never.png"))?;

    let discarded = console.editor.discard();

    assert!(discarded.is_some());
    assert!(console.log.calls().is_empty());
    let err = console
        .editor
        .commit(&console.sync, &mut console.session)
        .await
        .unwrap_err();
    assert_eq!(err, ConsoleError::Validation(ValidationError::NoOpenDraft));

    Ok(())
}

#[tokio::test]
async fn test_article_images_go_under_public_folder() -> Result<()> {
    let mut console = ArticleConsole::new([], Some(ArticleStatus::Draft));
    console.editor.open_for_create();
    console.editor.set_field("title", "Launch")?;
    console.editor.attach_pending_asset(photo("launch day.png"))?;

    let outcome = console
        .editor
        .commit(&console.sync, &mut console.session)
        .await?;

    let key = console.assets.keys().pop().expect("one upload");
    assert!(key.starts_with("public/"));
    assert!(key.ends_with("_launch_day.png"));
    assert_eq!(
        outcome.record.image_ref.as_deref(),
        Some(format!("https://cdn.test/storage/v1/object/public/images/{}", key).as_str())
    );
    assert_eq!(outcome.record.status, ArticleStatus::Draft);
    assert_eq!(console.titles(), vec!["Launch"]);

    Ok(())
}

#[tokio::test]
async fn test_edit_without_new_image_keeps_reference() -> Result<()> {
    let mut seeded = article("Old", ArticleStatus::Published);
    seeded.image_ref = Some("https://cdn.test/old.png".into());
    let mut console = ArticleConsole::new([seeded], Some(ArticleStatus::Published));
    console.sync.load(&mut console.session).await?;
    let old = console.session.records()[0].clone();

    console.editor.open_for_edit(&old);
    console.editor.set_field("title", "New")?;
    let outcome = console
        .editor
        .commit(&console.sync, &mut console.session)
        .await?;

    assert_eq!(outcome.record.image_ref.as_deref(), Some("https://cdn.test/old.png"));
    assert_eq!(console.log.count(Operation::Upload), 0);
    assert_eq!(console.titles(), vec!["New"]);

    Ok(())
}
