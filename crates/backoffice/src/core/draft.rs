//! The record being created or edited, plus any image waiting to be uploaded
//!
//! Committing is a two-step protocol: the pending image is uploaded first and
//! its public URL becomes the record's `img_url`; only then is the record
//! written. A record therefore never points at an asset that does not exist.
//! If the store refuses the write after the upload, the fresh asset is
//! removed again on a best-effort basis; when that removal fails too, the
//! asset stays orphaned and a warning is logged. A network or decode failure
//! leaves the asset in place, since the row may have been written anyway.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, warn};

use backoffice_api::{encode_draft, ConsoleError, Editable, Payload, RecordId, ValidationError};

use super::gateway::{AssetGateway, AssetKey, PendingAsset};
use super::synchronizer::{CollectionSynchronizer, SyncSession, WriteOutcome};

/// In-progress edit of a record. Field values stay raw text until commit.
#[derive(Debug, Clone)]
pub struct Draft<T> {
    id: Option<RecordId>,
    fields: BTreeMap<String, String>,
    image_ref: Option<String>,
    pending: Option<PendingAsset>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Editable> Draft<T> {
    /// Unsaved record with every field at its default
    pub fn blank() -> Self {
        Self {
            id: None,
            fields: T::fields()
                .iter()
                .map(|spec| (spec.name.to_string(), spec.default.to_string()))
                .collect(),
            image_ref: None,
            pending: None,
            _record: PhantomData,
        }
    }

    pub fn from_record(record: &T) -> Self {
        Self {
            id: record.id().cloned(),
            fields: record.draft_fields(),
            image_ref: record.image_ref().map(str::to_string),
            pending: None,
            _record: PhantomData,
        }
    }

    /// `None` for a record that has never been persisted
    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Reference of the already-stored image, if any
    pub fn image_ref(&self) -> Option<&str> {
        self.image_ref.as_deref()
    }

    pub fn pending_asset(&self) -> Option<&PendingAsset> {
        self.pending.as_ref()
    }

    /// Payload as it would be written with the current image reference
    pub fn payload(&self) -> Payload {
        encode_draft::<T>(&self.fields, self.image_ref.as_deref())
    }
}

/// Holds at most one draft of `T` and commits it through a synchronizer
pub struct DraftEditor<T: Editable> {
    assets: Arc<dyn AssetGateway>,
    folder: Option<String>,
    draft: Option<Draft<T>>,
}

impl<T: Editable> DraftEditor<T> {
    pub fn new(assets: Arc<dyn AssetGateway>) -> Self {
        Self {
            assets,
            folder: None,
            draft: None,
        }
    }

    /// Bucket folder uploaded images are placed under
    pub fn with_folder(mut self, folder: Option<String>) -> Self {
        self.folder = folder;
        self
    }

    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    pub fn draft(&self) -> Option<&Draft<T>> {
        self.draft.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn pending_asset(&self) -> Option<&PendingAsset> {
        self.draft.as_ref().and_then(|d| d.pending.as_ref())
    }

    pub fn open_for_create(&mut self) -> &Draft<T> {
        self.draft.insert(Draft::blank())
    }

    pub fn open_for_edit(&mut self, record: &T) -> &Draft<T> {
        self.draft.insert(Draft::from_record(record))
    }

    /// Replace the raw text of one field. Values are not checked here.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), ConsoleError> {
        let draft = self.draft.as_mut().ok_or(ValidationError::NoOpenDraft)?;
        if T::field_spec(name).is_none() {
            return Err(ValidationError::UnknownField(name.to_string()).into());
        }
        draft.fields.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Hold `asset` for upload on commit; returns the asset it replaces
    pub fn attach_pending_asset(
        &mut self,
        asset: PendingAsset,
    ) -> Result<Option<PendingAsset>, ConsoleError> {
        let draft = self.draft.as_mut().ok_or(ValidationError::NoOpenDraft)?;
        Ok(draft.pending.replace(asset))
    }

    /// Drop the draft and its pending asset. No remote effect.
    pub fn discard(&mut self) -> Option<Draft<T>> {
        self.draft.take()
    }

    /// Upload the pending asset (if any), then create or update the record.
    ///
    /// On success the draft is cleared. On any failure it is left exactly as
    /// it was, so the caller can retry without re-entering data.
    #[tracing::instrument(name = "draft.commit", skip_all, fields(collection = %sync.collection()))]
    pub async fn commit(
        &mut self,
        sync: &CollectionSynchronizer<T>,
        session: &mut SyncSession<T>,
    ) -> Result<WriteOutcome<T>, ConsoleError> {
        let draft = self.draft.as_ref().ok_or(ValidationError::NoOpenDraft)?;

        let mut image_ref = draft.image_ref.clone();
        let mut uploaded = None;
        if let Some(asset) = &draft.pending {
            let key = AssetKey::unique(self.folder.as_deref(), &asset.file_name);
            info!(
                "[DraftEditor] Uploading {} ({} bytes) to {}",
                asset.file_name,
                asset.len(),
                key
            );
            if let Err(e) = self.assets.upload(&key, asset).await {
                warn!("[DraftEditor] Upload to {} failed, record not written: {}", key, e);
                return Err(ConsoleError::Upload(e));
            }
            image_ref = Some(self.assets.public_url(&key));
            uploaded = Some(key);
        }

        let payload = encode_draft::<T>(&draft.fields, image_ref.as_deref());
        let result = sync.save(session, draft.id.as_ref(), payload).await;
        match result {
            Ok(outcome) => {
                self.draft = None;
                Ok(outcome)
            }
            Err(e) => {
                if let Some(key) = uploaded {
                    match e.gateway_error() {
                        Some(cause) if cause.is_rejection() => self.remove_orphan(&key).await,
                        _ => warn!(
                            "[DraftEditor] Outcome of write is unknown ({}); keeping asset {}",
                            e, key
                        ),
                    }
                }
                Err(e)
            }
        }
    }

    async fn remove_orphan(&self, key: &AssetKey) {
        match self.assets.remove(key).await {
            Ok(()) => info!("[DraftEditor] Removed {} after failed record write", key),
            Err(e) => warn!(
                "[DraftEditor] Asset {} is orphaned; removal after failed record write failed: {}",
                key, e
            ),
        }
    }
}
