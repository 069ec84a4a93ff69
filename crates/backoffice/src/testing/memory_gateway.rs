use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::marker::PhantomData;
use std::sync::Mutex;

use backoffice_api::{Filter, GatewayError, Payload, Record, RecordId, Selection};

use super::{lock, CallLog, FailurePlan, Operation, RemoteCall};
use crate::core::gateway::{GatewayResult, RecordGateway};

#[derive(Debug, Default)]
struct MemoryState {
    /// Rows in insertion order, as the store would serialize them
    rows: Vec<JsonValue>,
    next_id: i64,
}

/// A remote table held in memory.
///
/// Rows are validated by deserializing into `T`, which stands in for the
/// store's column constraints: a payload whose `quantity` is `"lots"` is
/// rejected with `GatewayError::Validation`, exactly like a typed column.
#[derive(Debug)]
pub struct MemoryGateway<T> {
    collection: String,
    state: Mutex<MemoryState>,
    log: CallLog,
    failures: FailurePlan,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> MemoryGateway<T> {
    pub fn new() -> Self {
        Self::named(T::COLLECTION)
    }

    pub fn named(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            state: Mutex::new(MemoryState {
                rows: Vec::new(),
                next_id: 1,
            }),
            log: CallLog::new(),
            failures: FailurePlan::default(),
            _record: PhantomData,
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Pre-populate rows without logging. Records without an id get one assigned.
    pub fn with_records(self, records: impl IntoIterator<Item = T>) -> Self {
        for record in records {
            self.seed(record);
        }
        self
    }

    pub fn seed(&self, record: T) -> T {
        let mut state = lock(&self.state);
        let mut row = match serde_json::to_value(&record) {
            Ok(row) => row,
            Err(_) => return record,
        };
        match record.id() {
            Some(RecordId::Int(id)) => state.next_id = state.next_id.max(id + 1),
            Some(RecordId::Text(_)) => {}
            None => {
                let id = state.next_id;
                state.next_id += 1;
                row["id"] = JsonValue::from(id);
            }
        }
        let stored = serde_json::from_value(row.clone()).unwrap_or(record);
        state.rows.push(row);
        stored
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: Operation, error: GatewayError) {
        self.failures.push(operation, error);
    }

    /// Snapshot of every stored row
    pub fn records(&self) -> Vec<T> {
        lock(&self.state)
            .rows
            .iter()
            .filter_map(|row| serde_json::from_value(row.clone()).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).rows.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).rows.is_empty()
    }

    fn decode(&self, row: JsonValue) -> GatewayResult<T> {
        serde_json::from_value(row).map_err(|e| {
            GatewayError::validation(format!("{} rejected row: {}", self.collection, e))
        })
    }

    fn matches(filter: Option<&Filter>, row: &JsonValue) -> bool {
        filter.is_none_or(|f| f.matches(row))
    }

    fn id_matches(row: &JsonValue, id: &RecordId) -> bool {
        match (row.get("id"), id) {
            (Some(JsonValue::Number(n)), RecordId::Int(i)) => n.as_i64() == Some(*i),
            (Some(JsonValue::String(s)), RecordId::Text(t)) => s == t,
            _ => false,
        }
    }
}

impl<T: Record> Default for MemoryGateway<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> RecordGateway<T> for MemoryGateway<T> {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn select(&self, selection: &Selection) -> GatewayResult<Vec<T>> {
        self.log.record(RemoteCall::Select {
            collection: self.collection.clone(),
            filter: selection.filter.clone(),
            limit: selection.limit,
        });
        self.failures.take(Operation::Select)?;

        let rows: Vec<JsonValue> = lock(&self.state)
            .rows
            .iter()
            .filter(|row| Self::matches(selection.filter.as_ref(), row))
            .take(selection.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| GatewayError::decode(e.to_string())))
            .collect()
    }

    async fn get(&self, id: &RecordId) -> GatewayResult<Option<T>> {
        self.log.record(RemoteCall::Get {
            collection: self.collection.clone(),
            id: id.clone(),
        });
        self.failures.take(Operation::Get)?;

        let row = lock(&self.state)
            .rows
            .iter()
            .find(|row| Self::id_matches(row, id))
            .cloned();
        row.map(|row| serde_json::from_value(row).map_err(|e| GatewayError::decode(e.to_string())))
            .transpose()
    }

    async fn insert(&self, payload: Payload) -> GatewayResult<T> {
        self.log.record(RemoteCall::Insert {
            collection: self.collection.clone(),
            payload: payload.clone(),
        });
        self.failures.take(Operation::Insert)?;

        let mut state = lock(&self.state);
        let mut row = payload;
        row.insert("id".into(), JsonValue::from(state.next_id));
        row.insert("created_at".into(), JsonValue::from(Utc::now().to_rfc3339()));

        let record = self.decode(JsonValue::Object(row))?;
        let stored = serde_json::to_value(&record).map_err(|e| GatewayError::decode(e.to_string()))?;
        state.next_id += 1;
        state.rows.push(stored);
        Ok(record)
    }

    async fn update(&self, id: &RecordId, payload: Payload) -> GatewayResult<T> {
        self.log.record(RemoteCall::Update {
            collection: self.collection.clone(),
            id: id.clone(),
            payload: payload.clone(),
        });
        self.failures.take(Operation::Update)?;

        let mut state = lock(&self.state);
        let index = state
            .rows
            .iter()
            .position(|row| Self::id_matches(row, id))
            .ok_or_else(|| GatewayError::not_found(&self.collection, id))?;

        let mut row = state.rows[index].clone();
        if let JsonValue::Object(columns) = &mut row {
            for (column, value) in payload {
                if column != "id" {
                    columns.insert(column, value);
                }
            }
        }

        let record = self.decode(row)?;
        state.rows[index] =
            serde_json::to_value(&record).map_err(|e| GatewayError::decode(e.to_string()))?;
        Ok(record)
    }

    async fn delete(&self, id: &RecordId) -> GatewayResult<()> {
        self.log.record(RemoteCall::Delete {
            collection: self.collection.clone(),
            id: id.clone(),
        });
        self.failures.take(Operation::Delete)?;

        let mut state = lock(&self.state);
        let index = state
            .rows
            .iter()
            .position(|row| Self::id_matches(row, id))
            .ok_or_else(|| GatewayError::not_found(&self.collection, id))?;
        state.rows.remove(index);
        Ok(())
    }

    async fn count(&self, filter: Option<&Filter>) -> GatewayResult<usize> {
        self.log.record(RemoteCall::Count {
            collection: self.collection.clone(),
            filter: filter.cloned(),
        });
        self.failures.take(Operation::Count)?;

        Ok(lock(&self.state)
            .rows
            .iter()
            .filter(|row| Self::matches(filter, row))
            .count())
    }
}
