//! Supabase implementation of the console gateways
//!
//! - `client` - SupabaseClient (HTTP client, auth headers, status mapping)
//! - `table` - SupabaseTable<T>, a `RecordGateway` over the PostgREST API
//! - `storage` - SupabaseBucket, an `AssetGateway` over the Storage API
//! - `config` - SupabaseConfig built from the console's store section
//! - `console` - SupabaseConsole, every component wired from `ConsoleConfig`

pub mod client;
pub mod config;
pub mod console;
pub mod storage;
pub mod table;

pub use client::SupabaseClient;
pub use config::SupabaseConfig;
pub use console::{CollectionHandle, SupabaseConsole};
pub use storage::SupabaseBucket;
pub use table::SupabaseTable;
