//! Comment list and submission form of one article

use std::sync::Arc;
use tracing::debug;

use backoffice_api::{Comment, ConsoleError, Filter, NewComment, RecordId, ValidationError};

use super::gateway::RecordGateway;
use super::synchronizer::{CollectionSynchronizer, LoadOutcome, SyncSession, WriteOutcome};

/// Comments of a single article plus the form for adding one.
///
/// Comments are only ever created. A submission with an empty name, email
/// or content never reaches the store.
pub struct CommentThread {
    article_id: RecordId,
    sync: CollectionSynchronizer<Comment>,
    session: SyncSession<Comment>,
    form: NewComment,
}

impl CommentThread {
    pub fn new(gateway: Arc<dyn RecordGateway<Comment>>, article_id: RecordId) -> Self {
        let filter = Filter::eq("article_id", article_id.to_string());
        Self {
            article_id,
            sync: CollectionSynchronizer::new(gateway),
            session: SyncSession::new(Some(filter)),
            form: NewComment::default(),
        }
    }

    pub fn article_id(&self) -> &RecordId {
        &self.article_id
    }

    pub fn comments(&self) -> &[Comment] {
        self.session.records()
    }

    pub fn form(&self) -> &NewComment {
        &self.form
    }

    pub fn set_form(&mut self, form: NewComment) {
        self.form = form;
    }

    pub fn set_form_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), ConsoleError> {
        let slot = match name {
            "name" => &mut self.form.name,
            "email" => &mut self.form.email,
            "content" => &mut self.form.content,
            other => return Err(ValidationError::UnknownField(other.to_string()).into()),
        };
        *slot = value.into();
        Ok(())
    }

    pub async fn load(&mut self) -> Result<LoadOutcome, ConsoleError> {
        self.sync.load(&mut self.session).await
    }

    /// Validate the form, insert the comment and reload the thread.
    ///
    /// The form is cleared only when the insert succeeds.
    pub async fn submit(&mut self) -> Result<WriteOutcome<Comment>, ConsoleError> {
        if let Err(e) = self.form.validate() {
            debug!(
                "[CommentThread] Rejected comment on article {}: {}",
                self.article_id, e
            );
            return Err(e.into());
        }

        let payload = self.form.to_payload(&self.article_id);
        let outcome = self.sync.create(&mut self.session, payload).await?;
        self.form = NewComment::default();
        Ok(outcome)
    }
}
