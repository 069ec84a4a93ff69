use backoffice_api::{Filter, Payload, RecordId};
use std::sync::{Arc, Mutex};

use super::lock;

/// Kind of remote call, used to target failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Get,
    Insert,
    Update,
    Delete,
    Count,
    Upload,
    Remove,
}

/// One call as seen by an in-memory gateway
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Select {
        collection: String,
        filter: Option<Filter>,
        limit: Option<usize>,
    },
    Get {
        collection: String,
        id: RecordId,
    },
    Insert {
        collection: String,
        payload: Payload,
    },
    Update {
        collection: String,
        id: RecordId,
        payload: Payload,
    },
    Delete {
        collection: String,
        id: RecordId,
    },
    Count {
        collection: String,
        filter: Option<Filter>,
    },
    Upload {
        key: String,
        file_name: String,
        bytes: Vec<u8>,
    },
    Remove {
        key: String,
    },
}

impl RemoteCall {
    pub fn operation(&self) -> Operation {
        match self {
            RemoteCall::Select { .. } => Operation::Select,
            RemoteCall::Get { .. } => Operation::Get,
            RemoteCall::Insert { .. } => Operation::Insert,
            RemoteCall::Update { .. } => Operation::Update,
            RemoteCall::Delete { .. } => Operation::Delete,
            RemoteCall::Count { .. } => Operation::Count,
            RemoteCall::Upload { .. } => Operation::Upload,
            RemoteCall::Remove { .. } => Operation::Remove,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            RemoteCall::Insert { .. } | RemoteCall::Update { .. } | RemoteCall::Delete { .. }
        )
    }
}

/// Shared, ordered log of remote calls
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<RemoteCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: RemoteCall) {
        lock(&self.calls).push(call);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        lock(&self.calls).clone()
    }

    pub fn operations(&self) -> Vec<Operation> {
        lock(&self.calls).iter().map(RemoteCall::operation).collect()
    }

    pub fn count(&self, operation: Operation) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Index of the first call of `operation`
    pub fn position(&self, operation: Operation) -> Option<usize> {
        lock(&self.calls)
            .iter()
            .position(|c| c.operation() == operation)
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}
