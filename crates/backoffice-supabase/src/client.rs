use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, error};

use backoffice::core::gateway::GatewayResult;
use backoffice_api::GatewayError;

use crate::config::SupabaseConfig;

/// Longest response body quoted in an error message
const MAX_ERROR_BODY: usize = 500;

/// HTTP access to one Supabase project, shared by every table and bucket
pub struct SupabaseClient {
    base_url: Url,
    default_headers: HeaderMap,
    client: reqwest::Client,
}

/// A successful response, fully read
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn json<T: serde::de::DeserializeOwned>(&self, url: &str) -> GatewayResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            GatewayError::decode(format!(
                "Unexpected response from {}: {} (body: {})",
                url,
                e,
                truncate(&self.body)
            ))
        })
    }
}

/// Error body shared by PostgREST (`message`, `details`, `hint`) and
/// Storage (`error`, `message`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> GatewayResult<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            GatewayError::network(format!("Invalid Supabase URL {}: {}", config.url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::network(format!(
                "Invalid Supabase URL {}: expected an http(s) project URL",
                config.url
            )));
        }

        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| GatewayError::network("Invalid API key format"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| GatewayError::network("Invalid API key format"))?;
        headers.insert("apikey", api_key);
        headers.insert("Authorization", bearer);

        let mut builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder.timeout(std::time::Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            default_headers: headers,
            client,
        })
    }

    /// URL under the project root; each segment is percent-encoded.
    ///
    /// `new` only accepts base URLs, so the path is always extensible.
    pub fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Request with the project's auth headers attached
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .headers(self.default_headers.clone())
    }

    /// Send a request and read the whole body.
    ///
    /// Non-success statuses become `GatewayError`s; `on_not_found` supplies the
    /// error for a 404 since only the caller knows which record was addressed.
    pub async fn send(
        &self,
        request: RequestBuilder,
        operation: &str,
        on_not_found: impl FnOnce() -> GatewayError,
    ) -> GatewayResult<RawResponse> {
        let request = request
            .build()
            .map_err(|e| GatewayError::network(format_reqwest_error(&e, "?", operation)))?;
        let url = request.url().to_string();
        debug!("[SupabaseClient] {} {} ({})", request.method(), url, operation);

        let response = self.client.execute(request).await.map_err(|e| {
            let message = format_reqwest_error(&e, &url, operation);
            error!("[SupabaseClient] {}", message);
            GatewayError::network(message)
        })?;

        Self::handle_response(response, &url, on_not_found).await
    }

    async fn handle_response(
        response: reqwest::Response,
        url: &str,
        on_not_found: impl FnOnce() -> GatewayError,
    ) -> GatewayResult<RawResponse> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| {
            GatewayError::network(format!("Failed to read response body from {}: {}", url, e))
        })?;

        if !status.is_success() {
            let err = error_for_status(status, &body, on_not_found);
            error!("[SupabaseClient] HTTP {} from {}: {}", status.as_u16(), url, err);
            return Err(err);
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Map a failed HTTP exchange to the gateway taxonomy.
///
/// - 404 is a missing row or object
/// - 400, 409 and 422 are constraint violations reported by the store
/// - anything else is passed through with its status
pub fn error_for_status(
    status: StatusCode,
    body: &str,
    on_not_found: impl FnOnce() -> GatewayError,
) -> GatewayError {
    let message = error_message(body);
    match status {
        StatusCode::NOT_FOUND => on_not_found(),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::validation(message)
        }
        _ => GatewayError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
            details,
            ..
        }) => match details {
            Some(details) if !details.is_empty() => format!("{} ({})", message, details),
            _ => message,
        },
        Ok(ErrorBody {
            error: Some(error), ..
        }) => error,
        _ => truncate(body),
    }
}

fn truncate(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... (truncated)", &body[..cut])
    } else {
        body.to_string()
    }
}

fn format_reqwest_error(e: &reqwest::Error, url: &str, operation: &str) -> String {
    if e.is_timeout() {
        format!(
            "Failed to {} for {}: timeout - request took too long",
            operation, url
        )
    } else if e.is_request() {
        format!(
            "Failed to {} for {}: request error - invalid URL or malformed request. Error: {}",
            operation, url, e
        )
    } else if {
        #[cfg(not(target_arch = "wasm32"))]
        {
            e.is_connect()
        }
        #[cfg(target_arch = "wasm32")]
        {
            false
        }
    } {
        format!(
            "Failed to {} for {}: connection error - check network connectivity. Error: {}",
            operation, url, e
        )
    } else {
        format!("Failed to {} for {}: {}", operation, url, e)
    }
}
