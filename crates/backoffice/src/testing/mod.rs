//! In-memory gateways for tests and offline demos
//!
//! - `MemoryGateway<T>` - a table with store-assigned integer ids
//! - `MemoryAssetStore` - a storage bucket that refuses overwrites
//! - `CallLog` - ordered record of every remote call, shareable between both
//!
//! Both gateways support one-shot failure injection via `fail_next`.

mod call_log;
mod memory_assets;
mod memory_gateway;

pub use call_log::{CallLog, Operation, RemoteCall};
pub use memory_assets::MemoryAssetStore;
pub use memory_gateway::MemoryGateway;

use backoffice_api::GatewayError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Test state is plain data; a panic in another test thread does not make it invalid
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Queued one-shot failures per operation
#[derive(Debug, Default)]
pub(crate) struct FailurePlan {
    queued: Mutex<HashMap<Operation, VecDeque<GatewayError>>>,
}

impl FailurePlan {
    pub(crate) fn push(&self, operation: Operation, error: GatewayError) {
        lock(&self.queued)
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub(crate) fn take(&self, operation: Operation) -> Result<(), GatewayError> {
        match lock(&self.queued).get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
