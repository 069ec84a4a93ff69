use serde::{Deserialize, Serialize};

/// Failure reported by a remote gateway.
///
/// Callers must be able to tell a transport failure from a missing row from
/// a constraint violation, so each gets its own variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum GatewayError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Not found: {collection} with id {id}")]
    NotFound { collection: String, id: String },

    #[error("Rejected by store constraints: {message}")]
    Validation { message: String },

    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed response: {message}")]
    Decode { message: String },
}

impl GatewayError {
    pub fn network(message: impl Into<String>) -> Self {
        GatewayError::Network {
            message: message.into(),
        }
    }

    pub fn not_found(collection: impl Into<String>, id: impl ToString) -> Self {
        GatewayError::NotFound {
            collection: collection.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        GatewayError::Decode {
            message: message.into(),
        }
    }

    /// Whether the store answered and refused the request.
    ///
    /// Network and decode failures may follow a write the store already
    /// applied, so they say nothing about the remote state.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GatewayError::NotFound { .. }
                | GatewayError::Validation { .. }
                | GatewayError::Rejected { .. }
        )
    }
}

/// Local precondition failures; no remote call was made
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Record has no id; it must be created before it can be updated")]
    MissingId,

    #[error("No draft is open")]
    NoOpenDraft,
}

/// Errors surfaced to the presentation layer. None of them is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ConsoleError {
    #[error("Failed to load records: {0}")]
    Fetch(#[source] GatewayError),

    #[error("Failed to save record: {0}")]
    Write(#[source] GatewayError),

    #[error("Failed to upload image: {0}")]
    Upload(#[source] GatewayError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

impl ConsoleError {
    /// The underlying gateway failure, if a remote call was made
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            ConsoleError::Fetch(e) | ConsoleError::Write(e) | ConsoleError::Upload(e) => Some(e),
            ConsoleError::Validation(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.gateway_error(), Some(GatewayError::NotFound { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_visible_through_write_error() {
        let err = ConsoleError::Write(GatewayError::not_found("products", 42));

        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Failed to save record: Not found: products with id 42"
        );
    }

    #[test]
    fn only_store_answers_count_as_rejections() {
        assert!(GatewayError::validation("bad").is_rejection());
        assert!(GatewayError::not_found("products", 1).is_rejection());
        assert!(GatewayError::Rejected {
            status: 500,
            message: "boom".into()
        }
        .is_rejection());
        assert!(!GatewayError::network("timeout").is_rejection());
        assert!(!GatewayError::decode("truncated body").is_rejection());
    }

    #[test]
    fn validation_errors_have_no_gateway_cause() {
        let err = ConsoleError::from(ValidationError::MissingId);
        assert!(err.gateway_error().is_none());
        assert!(!err.is_not_found());
    }
}
