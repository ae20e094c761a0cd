//! HTTP base query backed by [`reqwest`].
//!
//! The request method decides where the payload goes:
//!
//! | method        | payload channel    |
//! |---------------|--------------------|
//! | `GET`, `DELETE` | query parameters |
//! | `POST`, `PUT`   | JSON body        |
//! | anything else   | not sent         |
//!
//! Non-2xx responses are failures. Their decoded payload is handed to
//! [`parse_api_error`], which extracts `message` and `code` when present.

use std::collections::BTreeMap;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::{Client, Method};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{BaseQuery, QueryOutcome, RequestOptions, uses_body, uses_params};
use crate::config::ApiConfig;
use crate::error::{ApiError, UNKNOWN_MESSAGE};

/// A failure below the normalization boundary.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("Request failed with status code {status}")]
    Status { status: u16, payload: Value },

    /// The request never produced a response.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The request could not be built.
    #[error("{0}")]
    Invalid(String),
}

/// Normalizes a transport failure into `{message, code}`.
///
/// A response payload that is a plain string becomes the message. An object
/// payload contributes its `message` and `code` fields when they are set;
/// empty strings, zero, `false` and `null` leave the default in place, and
/// other scalars are used as text. Failures without a response use their own
/// text as the message.
#[must_use]
pub fn parse_api_error(error: &TransportError) -> ApiError {
    match error {
        TransportError::Status { payload, .. } => {
            let mut parsed = ApiError::unknown(UNKNOWN_MESSAGE);

            match payload {
                Value::String(message) => parsed.message.clone_from(message),
                Value::Object(fields) => {
                    if let Some(code) = fields.get("code").and_then(field_text) {
                        parsed.code = code;
                    }
                    if let Some(message) = fields.get("message").and_then(field_text) {
                        parsed.message = message;
                    }
                }
                _ => {}
            }

            parsed
        }
        TransportError::Http(_) | TransportError::Invalid(_) => {
            ApiError::unknown(error.to_string())
        }
    }
}

/// Text of an error payload field, or `None` if it is unset or empty.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// A [`BaseQuery`] that performs real HTTP requests.
#[derive(Debug, Clone)]
pub struct ReqwestBaseQuery {
    client: Client,
    default_headers: BTreeMap<String, String>,
}

impl ReqwestBaseQuery {
    /// Wraps an existing client. No default headers are added.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self {
            client,
            default_headers: BTreeMap::new(),
        }
    }

    /// Builds a client from the configured timeout and default headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn from_config(config: &ApiConfig) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            default_headers: config.default_headers.clone(),
        })
    }

    /// Adds a header sent with every request unless the request overrides it.
    #[must_use]
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    async fn execute(&self, options: RequestOptions) -> Result<Value, TransportError> {
        let method = Method::from_bytes(options.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| {
                TransportError::Invalid(format!("Invalid HTTP method: {}", options.method))
            })?;

        let mut headers = self.default_headers.clone();
        headers.extend(options.headers);

        let mut request = self.client.request(method, &options.url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if let Some(body) = options.body.as_ref().filter(|body| !body.is_null()) {
            if uses_params(&options.method) {
                request = request.query(&query_pairs(body));
            } else if uses_body(&options.method) {
                request = request.json(body);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        let payload = decode_payload(&response.bytes().await?);

        if status.is_success() {
            Ok(payload)
        } else {
            Err(TransportError::Status {
                status: status.as_u16(),
                payload,
            })
        }
    }
}

impl Default for ReqwestBaseQuery {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl BaseQuery for ReqwestBaseQuery {
    fn query(&self, options: RequestOptions) -> BoxFuture<'static, QueryOutcome> {
        let this = self.clone();

        async move {
            debug!(method = %options.method, url = %options.url, "base query request");

            match this.execute(options).await {
                Ok(data) => QueryOutcome::Data(data),
                Err(e) => {
                    debug!(error = %e, "base query failed");
                    QueryOutcome::Error(parse_api_error(&e))
                }
            }
        }
        .boxed()
    }
}

/// Flattens an object payload into query parameters.
///
/// Null fields are dropped and arrays repeat their key. Non-object payloads
/// produce no parameters.
fn query_pairs(body: &Value) -> Vec<(String, String)> {
    let Value::Object(fields) = body else {
        return Vec::new();
    };

    let mut pairs = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                pairs.extend(items.iter().map(|item| (name.clone(), param_text(item))));
            }
            other => pairs.push((name.clone(), param_text(other))),
        }
    }
    pairs
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON bodies decode as JSON, anything else as a string, empty as null.
fn decode_payload(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
