use serde::{Deserialize, Serialize};
use std::fmt;

use crate::payload::{encode_draft, Payload};
use std::collections::BTreeMap;

/// Opaque identifier assigned by the remote store on creation.
///
/// Stores hand out either integer keys or text keys (uuid); both are kept
/// verbatim so the id round-trips unchanged into filters and URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::Text(id)
    }
}

/// How raw draft text for a field is turned into a wire value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Decimal,
    Integer,
    /// One of a fixed set of lowercase tags (e.g. article status)
    Choice(&'static [&'static str]),
}

/// Editable column of a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Raw text a fresh draft starts with
    pub default: &'static str,
}

impl FieldSpec {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            default: "",
        }
    }

    pub const fn decimal(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Decimal,
            default: "",
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
            default: "",
        }
    }

    pub const fn choice(
        name: &'static str,
        options: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Choice(options),
            default,
        }
    }
}

/// A row of a remote collection
pub trait Record:
    Serialize + serde::de::DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Default table name in the remote store
    const COLLECTION: &'static str;

    /// `None` until the store has persisted the row
    fn id(&self) -> Option<&RecordId>;
}

/// Records that can be opened in the draft editor
pub trait Editable: Record {
    fn fields() -> &'static [FieldSpec];

    /// Render a field as the raw text a draft holds for it
    fn field_text(&self, name: &str) -> Option<String>;

    fn image_ref(&self) -> Option<&str>;

    fn field_spec(name: &str) -> Option<&'static FieldSpec> {
        Self::fields().iter().find(|spec| spec.name == name)
    }

    /// Draft text for every editable field of this record
    fn draft_fields(&self) -> BTreeMap<String, String> {
        Self::fields()
            .iter()
            .map(|spec| {
                (
                    spec.name.to_string(),
                    self.field_text(spec.name).unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Full write payload for this record (everything except `id`)
    fn to_payload(&self) -> Payload {
        encode_draft::<Self>(&self.draft_fields(), self.image_ref())
    }
}
