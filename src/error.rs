//! Error types shared by the base query, the store and the bindings.
//!
//! There are two tiers:
//!
//! - [`ApiError`] is what a [`BaseQuery`](crate::base_query::BaseQuery) produces
//!   when the transport fails. It is never raised past the base query; it is
//!   returned as a value.
//! - [`QueryError`] is what a cache entry stores. It wraps an [`ApiError`] or
//!   describes a failure to build the request options.
//!
//! [`ApiStoreError`] is the error returned from store operations. A query
//! failure only surfaces through it when the caller asked for a throwable
//! initiate; otherwise the entry's flags are the only signal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::key::CacheKey;

/// Code used when the transport gave no structured error code.
pub const UNKNOWN_CODE: &str = "unknown";

/// Message used when a failed response carried no usable message.
pub const UNKNOWN_MESSAGE: &str = "An unknown error occurred!";

/// A normalized transport error.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message} ({code})")]
pub struct ApiError {
    pub message: String,
    pub code: String,
}

impl ApiError {
    /// Creates an error with an explicit code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }

    /// Creates an error carrying the `"unknown"` code.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(message, UNKNOWN_CODE)
    }
}

/// The error stored in a cache entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The base query reported a transport failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The endpoint could not turn its arguments into request options.
    #[error("Request options failed: {0}")]
    Request(String),
}

impl QueryError {
    /// Returns the transport error, if this is one.
    #[must_use]
    pub const fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            Self::Request(_) => None,
        }
    }
}

/// Errors returned from store and binding operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiStoreError {
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Endpoint {endpoint} is a {actual}, not a {expected}")]
    KindMismatch {
        endpoint: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Query {key} failed: {source}")]
    Query {
        key: CacheKey,
        #[source]
        source: QueryError,
    },
}

impl ApiStoreError {
    /// Returns the query error carried by a throwable failure.
    #[must_use]
    pub const fn query_error(&self) -> Option<&QueryError> {
        match self {
            Self::Query { source, .. } => Some(source),
            _ => None,
        }
    }
}
