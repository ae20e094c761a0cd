//! Prelude module for convenient imports.
//!
//! ```
//! use apistore::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`Api`] and [`EndpointHandle`] - The facade
//! - [`EndpointRegistry`] and [`EndpointDefinition`] - Endpoint declarations
//! - [`BaseQuery`], [`RequestOptions`], [`QueryOutcome`] - The transport seam
//! - [`QueryStore`], [`QueryResult`], [`InitiateOptions`] - Cached state
//! - [`UseQuery`], [`UseMutation`], [`Subscription`] - Bindings

pub use crate::api::{Api, EndpointHandle};
pub use crate::base_query::{
    BaseQuery, MockBaseQuery, QueryOutcome, ReqwestBaseQuery, RequestOptions,
};
pub use crate::config::ApiConfig;
pub use crate::endpoint::{
    BoxError, EndpointDefinition, EndpointKind, EndpointRegistry, PendingResult,
};
pub use crate::error::{ApiError, ApiStoreError, QueryError};
pub use crate::key::{CacheKey, cache_key};
pub use crate::store::{InitiateOptions, QueryResult, QueryStatus, QueryStore};
pub use crate::subscription::{
    MutateOptions, QueryOptions, Subscription, SubscriptionId, SubscriptionSource, UseMutation,
    UseQuery,
};
