//! Local view of a remote collection
//!
//! `SyncSession` is the state the presentation layer owns: the current filter
//! and the records loaded for it. `CollectionSynchronizer` performs the remote
//! calls and applies their results to a session.
//!
//! Every load is tagged with a `LoadTicket` (filter + generation). A result is
//! applied only if its filter is still the session's filter and no newer load
//! has been applied since, so a slow fetch can never overwrite fresher data.
//!
//! Writes follow one policy: every successful create or update is followed by
//! a full reload of the session's current filter. Deletes remove the entry
//! locally, and only once the store has confirmed.

use std::sync::Arc;
use tracing::{debug, info, warn};

use backoffice_api::{
    ConsoleError, Editable, Filter, GatewayError, Payload, Record, RecordId, Selection,
    ValidationError,
};

use super::gateway::{GatewayResult, RecordGateway};

/// Identifies one in-flight load of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    filter: Option<Filter>,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}

/// What happened to a completed load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The collection was replaced with `count` records
    Applied { count: usize },
    /// A newer load or a filter change made this result obsolete; nothing changed
    Superseded,
}

/// Result of a successful create or update
#[derive(Debug)]
pub struct WriteOutcome<T> {
    /// The record as persisted by the store
    pub record: T,
    /// Outcome of the follow-up reload. A failed reload leaves the collection
    /// as it was; the write itself still succeeded.
    pub reload: Result<LoadOutcome, ConsoleError>,
}

impl<T> WriteOutcome<T> {
    /// Whether the local collection reflects the write
    pub fn is_synced(&self) -> bool {
        matches!(self.reload, Ok(LoadOutcome::Applied { .. }))
    }
}

/// Filter state and loaded records of one view (e.g. one open tab)
#[derive(Debug, Clone)]
pub struct SyncSession<T> {
    filter: Option<Filter>,
    records: Vec<T>,
    issued: u64,
    applied: u64,
    /// Filter the current `records` were loaded for; `None` before the first load
    applied_filter: Option<Option<Filter>>,
}

impl<T: Record> SyncSession<T> {
    pub fn new(filter: Option<Filter>) -> Self {
        Self {
            filter,
            records: Vec::new(),
            issued: 0,
            applied: 0,
            applied_filter: None,
        }
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// The local collection, read-only
    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &RecordId) -> Option<&T> {
        self.records.iter().find(|r| r.id() == Some(id))
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.find(id).is_some()
    }

    /// True when the records on display were not loaded for the current filter
    /// (nothing loaded yet, or the last load after a filter change failed)
    pub fn is_stale(&self) -> bool {
        self.applied_filter.as_ref() != Some(&self.filter)
    }

    /// Start a load for the current filter
    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket {
            generation: self.issued,
            filter: self.filter.clone(),
        }
    }

    /// Switch filters. Loads issued for the previous filter become obsolete.
    pub fn set_filter(&mut self, filter: Option<Filter>) -> LoadTicket {
        self.filter = filter;
        self.begin_load()
    }

    /// Whether a result for `ticket` would still be applied
    pub fn accepts(&self, ticket: &LoadTicket) -> bool {
        ticket.filter == self.filter && ticket.generation > self.applied
    }

    /// Apply the result of a load, unless it has been superseded.
    ///
    /// A failed load leaves the collection untouched and is reported as
    /// `ConsoleError::Fetch`. Failures of superseded loads are dropped along
    /// with their data.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        result: GatewayResult<Vec<T>>,
    ) -> Result<LoadOutcome, ConsoleError> {
        if !self.accepts(&ticket) {
            debug!(
                "[SyncSession] Discarding load #{} (filter {:?}); current filter {:?}, last applied #{}",
                ticket.generation, ticket.filter, self.filter, self.applied
            );
            return Ok(LoadOutcome::Superseded);
        }

        let records = result.map_err(ConsoleError::Fetch)?;
        let count = records.len();
        self.records = records;
        self.applied = ticket.generation;
        self.applied_filter = Some(ticket.filter);
        Ok(LoadOutcome::Applied { count })
    }

    pub(crate) fn remove(&mut self, id: &RecordId) -> Option<T> {
        let index = self.records.iter().position(|r| r.id() == Some(id))?;
        Some(self.records.remove(index))
    }
}

impl<T: Record> Default for SyncSession<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Performs remote reads and writes for one collection and keeps sessions in step
pub struct CollectionSynchronizer<T: Record> {
    gateway: Arc<dyn RecordGateway<T>>,
    page_size: Option<usize>,
}

impl<T: Record> CollectionSynchronizer<T> {
    pub fn new(gateway: Arc<dyn RecordGateway<T>>) -> Self {
        Self {
            gateway,
            page_size: None,
        }
    }

    /// Cap every load at `page_size` rows
    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    pub fn collection(&self) -> &str {
        self.gateway.collection()
    }

    pub fn selection(&self, filter: Option<&Filter>) -> Selection {
        Selection::new(filter.cloned(), self.page_size)
    }

    /// Fetch the rows for `ticket` without touching any session.
    ///
    /// Pair with `SyncSession::complete` when several loads may be in flight.
    #[tracing::instrument(
        name = "synchronizer.fetch",
        skip(self, ticket),
        fields(collection = %self.collection(), generation = ticket.generation())
    )]
    pub async fn fetch(&self, ticket: &LoadTicket) -> GatewayResult<Vec<T>> {
        self.gateway.select(&self.selection(ticket.filter())).await
    }

    /// Reload the session's current filter
    pub async fn load(&self, session: &mut SyncSession<T>) -> Result<LoadOutcome, ConsoleError> {
        let ticket = session.begin_load();
        self.run_load(session, ticket).await
    }

    /// Switch the session to `filter` and load it
    pub async fn change_filter(
        &self,
        session: &mut SyncSession<T>,
        filter: Option<Filter>,
    ) -> Result<LoadOutcome, ConsoleError> {
        let ticket = session.set_filter(filter);
        self.run_load(session, ticket).await
    }

    async fn run_load(
        &self,
        session: &mut SyncSession<T>,
        ticket: LoadTicket,
    ) -> Result<LoadOutcome, ConsoleError> {
        let result = self.fetch(&ticket).await;
        if let Err(e) = &result {
            warn!(
                "[CollectionSynchronizer] Load of {} ({:?}) failed: {}",
                self.collection(),
                ticket.filter(),
                e
            );
        }
        let outcome = session.complete(ticket, result)?;
        debug!(
            "[CollectionSynchronizer] Load of {} finished: {:?}",
            self.collection(),
            outcome
        );
        Ok(outcome)
    }

    /// Read a single record, e.g. for a detail page
    pub async fn get(&self, id: &RecordId) -> Result<Option<T>, ConsoleError> {
        self.gateway.get(id).await.map_err(ConsoleError::Fetch)
    }

    /// Exact number of remote rows matching `filter`, ignoring the page size
    pub async fn count(&self, filter: Option<&Filter>) -> Result<usize, ConsoleError> {
        self.gateway.count(filter).await.map_err(ConsoleError::Fetch)
    }

    /// Insert a never-persisted record, then reload
    #[tracing::instrument(name = "synchronizer.create", skip_all, fields(collection = %self.collection()))]
    pub async fn create(
        &self,
        session: &mut SyncSession<T>,
        mut payload: Payload,
    ) -> Result<WriteOutcome<T>, ConsoleError> {
        payload.remove("id");

        let record = self
            .gateway
            .insert(payload)
            .await
            .map_err(ConsoleError::Write)?;

        if record.id().is_none() {
            return Err(ConsoleError::Write(GatewayError::decode(format!(
                "{} insert returned a record without an id",
                self.collection()
            ))));
        }

        info!(
            "[CollectionSynchronizer] Created {} record {:?}",
            self.collection(),
            record.id()
        );
        Ok(self.reload_after_write(session, record).await)
    }

    /// Overwrite the record keyed by `id`, then reload
    #[tracing::instrument(name = "synchronizer.update", skip(self, session, payload), fields(collection = %self.collection()))]
    pub async fn update(
        &self,
        session: &mut SyncSession<T>,
        id: &RecordId,
        mut payload: Payload,
    ) -> Result<WriteOutcome<T>, ConsoleError> {
        payload.remove("id");

        let record = self
            .gateway
            .update(id, payload)
            .await
            .map_err(ConsoleError::Write)?;

        info!(
            "[CollectionSynchronizer] Updated {} record {}",
            self.collection(),
            id
        );
        Ok(self.reload_after_write(session, record).await)
    }

    /// Send a full persisted record back to the store
    pub async fn update_record(
        &self,
        session: &mut SyncSession<T>,
        record: &T,
    ) -> Result<WriteOutcome<T>, ConsoleError>
    where
        T: Editable,
    {
        let id = record.id().ok_or(ValidationError::MissingId)?;
        self.update(session, id, record.to_payload()).await
    }

    /// Create when `id` is `None`, update otherwise
    pub async fn save(
        &self,
        session: &mut SyncSession<T>,
        id: Option<&RecordId>,
        payload: Payload,
    ) -> Result<WriteOutcome<T>, ConsoleError> {
        match id {
            Some(id) => self.update(session, id, payload).await,
            None => self.create(session, payload).await,
        }
    }

    /// Delete remotely; the local entry goes only after confirmation
    #[tracing::instrument(name = "synchronizer.delete", skip(self, session), fields(collection = %self.collection()))]
    pub async fn delete(
        &self,
        session: &mut SyncSession<T>,
        id: &RecordId,
    ) -> Result<(), ConsoleError> {
        if let Err(e) = self.gateway.delete(id).await {
            warn!(
                "[CollectionSynchronizer] Delete of {} record {} failed: {}",
                self.collection(),
                id,
                e
            );
            return Err(ConsoleError::Write(e));
        }

        session.remove(id);
        info!(
            "[CollectionSynchronizer] Deleted {} record {}",
            self.collection(),
            id
        );
        Ok(())
    }

    async fn reload_after_write(&self, session: &mut SyncSession<T>, record: T) -> WriteOutcome<T> {
        let reload = self.load(session).await;
        if let Err(e) = &reload {
            warn!(
                "[CollectionSynchronizer] Write to {} succeeded but reload failed: {}",
                self.collection(),
                e
            );
        }
        WriteOutcome { record, reload }
    }
}
