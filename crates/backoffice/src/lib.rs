//! Client-side CRUD synchronization for the back-office console
//!
//! - `core::gateway` - contracts for the remote record store and asset storage
//! - `core::synchronizer` - `SyncSession` and `CollectionSynchronizer`
//! - `core::draft` - `DraftEditor` and its upload-then-write commit
//! - `core::comments` - per-article comment thread
//! - `config` / `telemetry` - YAML configuration and tracing setup
//! - `testing` - in-memory gateways with call recording and failure injection

pub mod config;
pub mod core;
pub mod telemetry;
pub mod testing;

pub use backoffice_api as api;
pub use config::ConsoleConfig;
pub use core::comments::CommentThread;
pub use core::draft::{Draft, DraftEditor};
pub use core::gateway::{AssetGateway, AssetKey, PendingAsset, RecordGateway};
pub use core::synchronizer::{
    CollectionSynchronizer, LoadOutcome, LoadTicket, SyncSession, WriteOutcome,
};
