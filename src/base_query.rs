//! The injected transport capability.
//!
//! A [`BaseQuery`] turns [`RequestOptions`] into a [`QueryOutcome`]. It never
//! fails past its own boundary: transport problems come back as
//! [`QueryOutcome::Error`] holding a normalized [`ApiError`].
//!
//! Two implementations ship with the crate:
//!
//! - [`ReqwestBaseQuery`] performs real HTTP calls.
//! - [`MockBaseQuery`] answers from a script and records every call.
//!
//! Any `Fn(RequestOptions) -> BoxFuture<'static, QueryOutcome>` closure is a
//! base query as well.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

pub mod mock;
pub mod http;

pub use self::mock::MockBaseQuery;
pub use self::http::{ReqwestBaseQuery, parse_api_error};

/// What a request needs: target, verb, optional payload and headers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestOptions {
    pub url: String,
    pub method: String,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    /// Creates options for `method` against `url`.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            body: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("get", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("post", url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new("put", url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new("delete", url)
    }

    /// Sets the payload. Values that fail to serialize leave the body empty.
    #[must_use]
    pub fn body(mut self, body: impl Serialize) -> Self {
        self.body = serde_json::to_value(body).ok();
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns `true` if the payload travels as query parameters.
    #[must_use]
    pub fn uses_params(&self) -> bool {
        uses_params(&self.method)
    }

    /// Returns `true` if the payload travels as the request body.
    #[must_use]
    pub fn uses_body(&self) -> bool {
        uses_body(&self.method)
    }
}

/// GET and DELETE carry their payload as query parameters.
#[must_use]
pub fn uses_params(method: &str) -> bool {
    method.eq_ignore_ascii_case("get") || method.eq_ignore_ascii_case("delete")
}

/// POST and PUT carry their payload as the request body.
#[must_use]
pub fn uses_body(method: &str) -> bool {
    method.eq_ignore_ascii_case("post") || method.eq_ignore_ascii_case("put")
}

/// The result of one base query call: either data or a normalized error.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Data(Value),
    Error(ApiError),
}

impl QueryOutcome {
    /// Returns the data if the call succeeded.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::Data(data) => Some(data),
            Self::Error(_) => None,
        }
    }

    /// Returns the error if the call failed.
    #[must_use]
    pub const fn error(&self) -> Option<&ApiError> {
        match self {
            Self::Data(_) => None,
            Self::Error(e) => Some(e),
        }
    }

    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    /// Converts into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] if the call failed.
    pub fn into_result(self) -> Result<Value, ApiError> {
        match self {
            Self::Data(data) => Ok(data),
            Self::Error(e) => Err(e),
        }
    }
}

impl From<Result<Value, ApiError>> for QueryOutcome {
    fn from(result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(data) => Self::Data(data),
            Err(e) => Self::Error(e),
        }
    }
}

/// Performs the actual network call for an endpoint.
pub trait BaseQuery: Send + Sync + 'static {
    /// Runs the request described by `options`.
    fn query(&self, options: RequestOptions) -> BoxFuture<'static, QueryOutcome>;
}

impl<F> BaseQuery for F
where
    F: Fn(RequestOptions) -> BoxFuture<'static, QueryOutcome> + Send + Sync + 'static,
{
    fn query(&self, options: RequestOptions) -> BoxFuture<'static, QueryOutcome> {
        self(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    #[test]
    fn test_channel_selection() {
        assert!(uses_params("get"));
        assert!(uses_params("GET"));
        assert!(uses_params("Delete"));
        assert!(!uses_params("post"));

        assert!(uses_body("post"));
        assert!(uses_body("PUT"));
        assert!(!uses_body("get"));
        assert!(!uses_body("patch"));
        assert!(!uses_params("patch"));
    }

    #[test]
    fn test_request_options_builder() {
        let options = RequestOptions::post("https://example.com/posts")
            .body(json!({ "title": "hello" }))
            .header("X-Trace", "1");

        assert_eq!(options.method, "post");
        assert_eq!(options.body, Some(json!({ "title": "hello" })));
        assert_eq!(options.headers.get("X-Trace").map(String::as_str), Some("1"));
        assert!(options.uses_body());
        assert!(!options.uses_params());
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = QueryOutcome::Data(json!(1));
        assert_eq!(ok.data(), Some(&json!(1)));
        assert!(ok.error().is_none());
        assert!(ok.is_data());

        let err = QueryOutcome::Error(ApiError::unknown("down"));
        assert!(err.data().is_none());
        assert_eq!(err.clone().into_result(), Err(ApiError::unknown("down")));
        assert!(!err.is_data());
    }

    #[tokio::test]
    async fn test_closure_is_base_query() {
        let base = |options: RequestOptions| {
            async move { QueryOutcome::Data(json!({ "url": options.url })) }.boxed()
        };

        let outcome = base.query(RequestOptions::get("/a")).await;
        assert_eq!(outcome, QueryOutcome::Data(json!({ "url": "/a" })));
    }
}
