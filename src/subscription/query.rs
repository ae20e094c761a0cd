//! Query binding: a cached read that follows a changing argument value.
//!
//! A [`UseQuery`] holds the current arguments for one query endpoint. It
//! initiates a fetch when it is created and again every time the arguments
//! change to a different value. Setting the same value again does nothing;
//! the store decides whether a change needs the network or can be served
//! from cache.
//!
//! Reading is always synchronous: the accessors look up the slot for the
//! current arguments. Use the binding as a [`SubscriptionSource`] to be told
//! when that slot changes.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use futures::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use super::view::result_stream;
use super::{SubscriptionId, SubscriptionSource};
use crate::error::{ApiStoreError, QueryError};
use crate::key::cache_key;
use crate::store::{InitiateOptions, QueryResult, QueryStore};

/// Options that apply to every fetch a [`UseQuery`] initiates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Fetch on every argument change even when a result is cached.
    pub force_refetch: bool,
}

impl QueryOptions {
    #[must_use]
    pub const fn forced() -> Self {
        Self {
            force_refetch: true,
        }
    }
}

/// A reactive view of one query endpoint.
///
/// Dropping the binding stops it from initiating further fetches and ends
/// its streams. Requests already in flight still complete and are cached.
pub struct UseQuery {
    store: Arc<QueryStore>,
    endpoint: String,
    args: watch::Sender<Value>,
    options: QueryOptions,
}

impl UseQuery {
    /// Binds `endpoint` to `args` and starts the first fetch.
    ///
    /// The endpoint is expected to be a registered query; see
    /// [`EndpointHandle::use_query`](crate::api::EndpointHandle::use_query)
    /// for the checked constructor.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new<A>(store: Arc<QueryStore>, endpoint: impl Into<String>, args: &A) -> Self
    where
        A: Serialize + ?Sized,
    {
        Self::with_options(store, endpoint, args, QueryOptions::default())
    }

    /// Like [`new`](Self::new), with `options` applied to every fetch.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn with_options<A>(
        store: Arc<QueryStore>,
        endpoint: impl Into<String>,
        args: &A,
        options: QueryOptions,
    ) -> Self
    where
        A: Serialize + ?Sized,
    {
        let endpoint = endpoint.into();
        let (tx, rx) = watch::channel(to_value(args));
        let initiate = InitiateOptions {
            force_refetch: options.force_refetch,
            throwable: false,
        };
        tokio::spawn(drive(Arc::clone(&store), endpoint.clone(), rx, initiate));

        Self {
            store,
            endpoint,
            args: tx,
            options,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub const fn options(&self) -> QueryOptions {
        self.options
    }

    /// Returns the current argument value.
    #[must_use]
    pub fn args(&self) -> Value {
        self.args.borrow().clone()
    }

    /// Replaces the arguments.
    ///
    /// A fetch is initiated only if the new value differs from the current
    /// one. Returns `true` if the value changed.
    pub fn set_args<A>(&self, args: &A) -> bool
    where
        A: Serialize + ?Sized,
    {
        let next = to_value(args);
        self.args.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }

    /// Fetches the current arguments again, even if a result is cached.
    ///
    /// # Errors
    ///
    /// Returns [`ApiStoreError::UnknownEndpoint`] if the endpoint is not
    /// registered. A failed request is not an error here; it is recorded in
    /// the result.
    pub async fn refetch(&self) -> Result<Option<QueryResult>, ApiStoreError> {
        let args = self.args();
        self.store
            .initiate(&self.endpoint, &args, InitiateOptions::forced(), None)
            .await
    }

    /// Returns the result for the current arguments.
    #[must_use]
    pub fn result(&self) -> QueryResult {
        self.store.result(&self.endpoint, &*self.args.borrow())
    }

    #[must_use]
    pub fn data(&self) -> Option<Value> {
        self.result().data
    }

    /// Returns the data deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data does not have the shape of `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.result().data_as()
    }

    #[must_use]
    pub fn error(&self) -> Option<QueryError> {
        self.result().error
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.result().is_loading
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result().is_success
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.result().is_error
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.result().is_initialized
    }
}

impl SubscriptionSource for UseQuery {
    type Output = QueryResult;

    fn stream(&self) -> BoxStream<'static, QueryResult> {
        let endpoint = self.endpoint.clone();
        result_stream(Arc::clone(&self.store), self.args.subscribe(), move |args| {
            Some(cache_key(&endpoint, args))
        })
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}

impl Hash for UseQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        cache_key(&self.endpoint, &*self.args.borrow()).hash(state);
    }
}

impl std::fmt::Debug for UseQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UseQuery")
            .field("endpoint", &self.endpoint)
            .field("args", &*self.args.borrow())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn to_value<A: Serialize + ?Sized>(args: &A) -> Value {
    serde_json::to_value(args).unwrap_or(Value::Null)
}

/// Initiates a fetch for the initial arguments and for every change.
///
/// Each fetch runs as its own task so a slow request does not hold back the
/// next argument value.
async fn drive(
    store: Arc<QueryStore>,
    endpoint: String,
    mut args: watch::Receiver<Value>,
    options: InitiateOptions,
) {
    loop {
        let current = args.borrow_and_update().clone();
        let store = Arc::clone(&store);
        let task_endpoint = endpoint.clone();

        tokio::spawn(async move {
            if let Err(e) = store
                .initiate(&task_endpoint, &current, options, None)
                .await
            {
                debug!(endpoint = %task_endpoint, error = %e, "query initiate failed");
            }
        });

        if args.changed().await.is_err() {
            debug!(%endpoint, "query binding dropped");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_query::{MockBaseQuery, RequestOptions};
    use crate::config::ApiConfig;
    use crate::endpoint::EndpointRegistry;
    use serde_json::json;

    fn store() -> Arc<QueryStore> {
        let registry = EndpointRegistry::builder()
            .query("getPokemon", |args: Value| {
                Ok(RequestOptions::get(format!("/pokemon/{}", args["name"].as_str().unwrap_or(""))))
            })
            .build();
        Arc::new(QueryStore::new(&ApiConfig::default(), MockBaseQuery::new(), registry))
    }

    #[tokio::test]
    async fn test_set_args_is_edge_driven() {
        let query = UseQuery::new(store(), "getPokemon", &json!({ "name": "pikachu" }));

        assert!(!query.set_args(&json!({ "name": "pikachu" })));
        assert!(query.set_args(&json!({ "name": "ditto" })));
        assert_eq!(query.args(), json!({ "name": "ditto" }));
    }

    #[tokio::test]
    async fn test_id_follows_key() {
        let store = store();
        let a = UseQuery::new(Arc::clone(&store), "getPokemon", &json!({ "name": "pikachu" }));
        let b = UseQuery::new(Arc::clone(&store), "getPokemon", &json!({ "name": "pikachu" }));
        let c = UseQuery::new(store, "getPokemon", &json!({ "name": "ditto" }));

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_query_options() {
        assert!(!QueryOptions::default().force_refetch);
        assert!(QueryOptions::forced().force_refetch);
    }

    #[tokio::test]
    async fn test_debug() {
        let query = UseQuery::new(store(), "getPokemon", &json!({ "name": "pikachu" }));
        let debug = format!("{query:?}");
        assert!(debug.contains("getPokemon"));
        assert!(debug.contains("pikachu"));
    }
}
