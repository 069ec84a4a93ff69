//! Shared data types for the back-office console
//!
//! This crate holds everything the synchronization layer and the remote
//! gateways agree on:
//! - `record` - `RecordId` and the `Record` / `Editable` traits
//! - `models` - Product, Article and Comment rows
//! - `selection` - the single-valued `Filter` and the `Selection` sent to `select`
//! - `payload` - raw draft text to wire payload encoding
//! - `error` - the error taxonomy surfaced to the presentation layer

pub mod error;
pub mod models;
pub mod payload;
pub mod record;
pub mod selection;

pub use error::{ConsoleError, GatewayError, ValidationError};
pub use models::{Article, ArticleStatus, Comment, NewComment, Product};
pub use payload::{encode_draft, Payload, IMAGE_REF_COLUMN};
pub use record::{Editable, FieldKind, FieldSpec, Record, RecordId};
pub use selection::{Filter, Selection};
