use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::payload::Payload;
use crate::record::{Editable, FieldSpec, Record, RecordId};
use crate::selection::Filter;

/// Text columns are nullable in the store; the console treats null as ""
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,

    #[serde(default)]
    pub price: Option<Decimal>,

    #[serde(default)]
    pub quantity: Option<i64>,

    #[serde(rename = "img_url", default)]
    pub image_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

const PRODUCT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name"),
    FieldSpec::text("description"),
    FieldSpec::decimal("price"),
    FieldSpec::integer("quantity"),
];

impl Record for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }
}

impl Editable for Product {
    fn fields() -> &'static [FieldSpec] {
        PRODUCT_FIELDS
    }

    fn field_text(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.clone()),
            "description" => Some(self.description.clone()),
            "price" => Some(self.price.map(|p| p.to_string()).unwrap_or_default()),
            "quantity" => Some(self.quantity.map(|q| q.to_string()).unwrap_or_default()),
            _ => None,
        }
    }

    fn image_ref(&self) -> Option<&str> {
        self.image_ref.as_deref()
    }
}

/// Publication state of an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
}

impl ArticleStatus {
    pub const TAGS: &'static [&'static str] = &["draft", "published"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ArticleStatus::Draft),
            "published" => Ok(ArticleStatus::Published),
            other => Err(format!("Unknown article status: {}", other)),
        }
    }
}

impl From<ArticleStatus> for Filter {
    fn from(status: ArticleStatus) -> Self {
        Filter::eq("status", status.as_str())
    }
}

/// Editorial content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,

    #[serde(default)]
    pub status: ArticleStatus,

    #[serde(rename = "img_url", default)]
    pub image_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

const ARTICLE_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title"),
    FieldSpec::text("content"),
    FieldSpec::choice("status", ArticleStatus::TAGS, "draft"),
];

impl Record for Article {
    const COLLECTION: &'static str = "articles";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }
}

impl Editable for Article {
    fn fields() -> &'static [FieldSpec] {
        ARTICLE_FIELDS
    }

    fn field_text(&self, name: &str) -> Option<String> {
        match name {
            "title" => Some(self.title.clone()),
            "content" => Some(self.content.clone()),
            "status" => Some(self.status.as_str().to_string()),
            _ => None,
        }
    }

    fn image_ref(&self) -> Option<&str> {
        self.image_ref.as_deref()
    }
}

/// Reader comment attached to an article. Created only, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    pub article_id: RecordId,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Comment {
    const COLLECTION: &'static str = "comments";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }
}

/// Comment form contents before submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewComment {
    pub name: String,
    pub email: String,
    pub content: String,
}

impl NewComment {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            content: content.into(),
        }
    }

    /// All three fields are required before an insert may be attempted
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("content", &self.content),
        ] {
            if value.is_empty() {
                return Err(ValidationError::MissingField(field.to_string()));
            }
        }
        Ok(())
    }

    pub fn to_payload(&self, article_id: &RecordId) -> Payload {
        let mut payload = Payload::new();
        payload.insert("article_id".into(), serde_json::json!(article_id));
        payload.insert("name".into(), self.name.clone().into());
        payload.insert("email".into(), self.email.clone().into());
        payload.insert("content".into(), self.content.clone().into());
        payload
    }
}
